//! Hierarchy snapshots: how content units are organized for one variant.
//!
//! A [`HierarchySnapshot`] is a tree of [`HierarchyNode`]s plus two indexes
//! built once at construction: page id to content reference, and content
//! reference to the page ids carrying it. Snapshots are immutable after
//! construction; a changed hierarchy is published as a new snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::CoreError;
use crate::id::{ContentRef, PageId, SnapshotId};

/// The loaded snapshots of one project, in publication order.
pub type SnapshotSet = IndexMap<SnapshotId, Arc<HierarchySnapshot>>;

/// A single node in a hierarchy tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    /// Page identifier, unique within its snapshot.
    pub id: PageId,
    /// Optional human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Reference to the underlying content, shared across snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<ContentRef>,
    /// Child nodes, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    /// Creates a leaf node with an optional content reference.
    pub fn new(id: impl Into<PageId>, content_ref: Option<&str>) -> Self {
        HierarchyNode {
            id: id.into(),
            title: None,
            content_ref: content_ref.map(ContentRef::from),
            children: Vec::new(),
        }
    }

    /// Appends a child node.
    pub fn with_child(mut self, child: HierarchyNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Serialized form of a snapshot: just the id and the node tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotDef {
    id: SnapshotId,
    nodes: Vec<HierarchyNode>,
}

/// An indexed hierarchy tree for one output variant of a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SnapshotDef", into = "SnapshotDef")]
pub struct HierarchySnapshot {
    id: SnapshotId,
    nodes: Vec<HierarchyNode>,
    /// Page id -> the node's content reference (if any).
    by_page: HashMap<PageId, Option<ContentRef>>,
    /// Content reference -> page ids carrying it, in document order.
    by_ref: HashMap<ContentRef, SmallVec<[PageId; 2]>>,
}

impl HierarchySnapshot {
    /// Builds a snapshot and its lookup indexes from a node forest.
    ///
    /// Fails if the id is empty or if two nodes share a page id.
    pub fn new(id: SnapshotId, nodes: Vec<HierarchyNode>) -> Result<Self, CoreError> {
        if id.as_str().is_empty() {
            return Err(CoreError::EmptySnapshotId);
        }

        let mut by_page = HashMap::new();
        let mut by_ref: HashMap<ContentRef, SmallVec<[PageId; 2]>> = HashMap::new();

        let mut stack: Vec<&HierarchyNode> = nodes.iter().rev().collect();
        while let Some(node) = stack.pop() {
            if by_page
                .insert(node.id.clone(), node.content_ref.clone())
                .is_some()
            {
                return Err(CoreError::DuplicatePageId {
                    snapshot_id: id,
                    page_id: node.id.clone(),
                });
            }
            if let Some(content_ref) = &node.content_ref {
                by_ref
                    .entry(content_ref.clone())
                    .or_default()
                    .push(node.id.clone());
            }
            // Pre-order: push children reversed so the first child pops next.
            stack.extend(node.children.iter().rev());
        }

        Ok(HierarchySnapshot {
            id,
            nodes,
            by_page,
            by_ref,
        })
    }

    pub fn id(&self) -> &SnapshotId {
        &self.id
    }

    pub fn nodes(&self) -> &[HierarchyNode] {
        &self.nodes
    }

    /// Total number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.by_page.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_page.is_empty()
    }

    /// Returns true if a node with this page id exists.
    pub fn contains(&self, page_id: &PageId) -> bool {
        self.by_page.contains_key(page_id)
    }

    /// Returns the content reference of a page.
    ///
    /// `None` means the page is absent; `Some(None)` means the page exists
    /// but carries no reference.
    pub fn content_ref_of(&self, page_id: &PageId) -> Option<Option<&ContentRef>> {
        self.by_page.get(page_id).map(Option::as_ref)
    }

    /// Reverse lookup: page ids carrying the given content reference.
    pub fn pages_with_ref(&self, content_ref: &ContentRef) -> &[PageId] {
        self.by_ref
            .get(content_ref)
            .map(|pages| pages.as_slice())
            .unwrap_or(&[])
    }
}

impl TryFrom<SnapshotDef> for HierarchySnapshot {
    type Error = CoreError;

    fn try_from(def: SnapshotDef) -> Result<Self, Self::Error> {
        HierarchySnapshot::new(def.id, def.nodes)
    }
}

impl From<HierarchySnapshot> for SnapshotDef {
    fn from(snapshot: HierarchySnapshot) -> Self {
        SnapshotDef {
            id: snapshot.id,
            nodes: snapshot.nodes,
        }
    }
}
