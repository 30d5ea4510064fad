//! Correlation of page identifiers across hierarchy snapshots.
//!
//! The same content unit can be reachable under different page ids in
//! different snapshots. [`resolve`] finds every `(snapshot, page)` pair that
//! shares the requested page's content reference. Resolution is best-effort:
//! when nothing can be correlated the result still contains the requested
//! page, together with a [`CorrelationWarning`] describing why.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::CorrelationWarning;
use crate::hierarchy::SnapshotSet;
use crate::id::{ContentRef, PageId, SnapshotId};

/// A page id tagged with the snapshot it was resolved from.
///
/// `snapshot_id` is `None` only for a requested page that could not be
/// located in any snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelatedPage {
    pub snapshot_id: Option<SnapshotId>,
    pub page_id: PageId,
}

impl CorrelatedPage {
    pub fn new(snapshot_id: Option<SnapshotId>, page_id: PageId) -> Self {
        CorrelatedPage {
            snapshot_id,
            page_id,
        }
    }
}

/// Result of a correlation lookup.
#[derive(Debug, Clone)]
pub struct Correlation {
    /// The content reference shared by all pages, when one was found.
    pub content_ref: Option<ContentRef>,
    /// Correlated pages, de-duplicated by `(snapshot, page)`. The requested
    /// page is always first.
    pub pages: IndexSet<CorrelatedPage>,
    /// Set when resolution degraded to the requested page only.
    pub warning: Option<CorrelationWarning>,
}

impl Correlation {
    fn degraded(page_id: &PageId, snapshot_id: Option<SnapshotId>, warning: CorrelationWarning) -> Self {
        let mut pages = IndexSet::new();
        pages.insert(CorrelatedPage::new(snapshot_id, page_id.clone()));
        Correlation {
            content_ref: None,
            pages,
            warning: Some(warning),
        }
    }

    /// Returns true if any correlated entry carries this page id.
    pub fn contains_page(&self, page_id: &PageId) -> bool {
        self.pages.iter().any(|p| &p.page_id == page_id)
    }
}

/// Resolves every page across `snapshots` denoting the same content as `page_id`.
///
/// The origin is the first node, in snapshot order, with id `page_id` that
/// carries a content reference. Every snapshot (the origin's included) is
/// then searched for nodes with that reference.
pub fn resolve(page_id: &PageId, snapshots: &SnapshotSet) -> Correlation {
    let mut first_hit: Option<&SnapshotId> = None;
    let mut origin: Option<(&SnapshotId, &ContentRef)> = None;

    for (snapshot_id, snapshot) in snapshots {
        match snapshot.content_ref_of(page_id) {
            Some(Some(content_ref)) => {
                origin = Some((snapshot_id, content_ref));
                break;
            }
            Some(None) => {
                first_hit.get_or_insert(snapshot_id);
            }
            None => {}
        }
    }

    let Some((origin_snapshot, content_ref)) = origin else {
        return match first_hit {
            Some(snapshot_id) => Correlation::degraded(
                page_id,
                Some(snapshot_id.clone()),
                CorrelationWarning::MissingContentReference {
                    snapshot_id: snapshot_id.clone(),
                    page_id: page_id.clone(),
                },
            ),
            None => Correlation::degraded(
                page_id,
                None,
                CorrelationWarning::PageNotFound {
                    page_id: page_id.clone(),
                },
            ),
        };
    };

    let mut pages = IndexSet::new();
    pages.insert(CorrelatedPage::new(
        Some(origin_snapshot.clone()),
        page_id.clone(),
    ));

    for (snapshot_id, snapshot) in snapshots {
        for correlated in snapshot.pages_with_ref(content_ref) {
            pages.insert(CorrelatedPage::new(
                Some(snapshot_id.clone()),
                correlated.clone(),
            ));
        }
    }

    Correlation {
        content_ref: Some(content_ref.clone()),
        pages,
        warning: None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::hierarchy::{HierarchyNode, HierarchySnapshot};

    fn snapshot(id: &str, nodes: Vec<HierarchyNode>) -> (SnapshotId, Arc<HierarchySnapshot>) {
        let id = SnapshotId::new(id);
        let snap = HierarchySnapshot::new(id.clone(), nodes).unwrap();
        (id, Arc::new(snap))
    }

    fn en_fr() -> SnapshotSet {
        [
            snapshot(
                "en",
                vec![HierarchyNode::new("doc-en", None)
                    .with_child(HierarchyNode::new("sec-en-1", Some("ref-42")))
                    .with_child(HierarchyNode::new("sec-en-2", Some("ref-43")))],
            ),
            snapshot(
                "fr",
                vec![HierarchyNode::new("doc-fr", None)
                    .with_child(HierarchyNode::new("sec-fr-1", Some("ref-42")))
                    .with_child(HierarchyNode::new("sec-fr-2", Some("ref-43")))],
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn correlates_across_snapshots() {
        let result = resolve(&PageId::new("sec-en-1"), &en_fr());
        assert!(result.warning.is_none());
        assert_eq!(result.content_ref, Some(ContentRef::new("ref-42")));
        let pages: Vec<_> = result.pages.iter().map(|p| p.page_id.as_str()).collect();
        assert_eq!(pages, vec!["sec-en-1", "sec-fr-1"]);
        assert_eq!(
            result.pages[1].snapshot_id,
            Some(SnapshotId::new("fr"))
        );
    }

    #[test]
    fn no_snapshots_degrades_to_requested_page() {
        let result = resolve(&PageId::new("p1"), &SnapshotSet::new());
        assert_eq!(result.pages.len(), 1);
        assert_eq!(result.pages[0], CorrelatedPage::new(None, PageId::new("p1")));
        assert!(matches!(
            result.warning,
            Some(CorrelationWarning::PageNotFound { .. })
        ));
    }

    #[test]
    fn missing_reference_degrades_with_origin_tag() {
        let result = resolve(&PageId::new("doc-fr"), &en_fr());
        assert_eq!(result.pages.len(), 1);
        assert_eq!(
            result.pages[0],
            CorrelatedPage::new(Some(SnapshotId::new("fr")), PageId::new("doc-fr"))
        );
        assert!(matches!(
            result.warning,
            Some(CorrelationWarning::MissingContentReference { .. })
        ));
    }

    #[test]
    fn same_page_id_in_two_snapshots_kept_per_snapshot() {
        let snapshots: SnapshotSet = [
            snapshot("html", vec![HierarchyNode::new("s1", Some("r"))]),
            snapshot("pdf", vec![HierarchyNode::new("s1", Some("r"))]),
        ]
        .into_iter()
        .collect();

        let result = resolve(&PageId::new("s1"), &snapshots);
        assert_eq!(result.pages.len(), 2);
        assert!(result.pages.contains(&CorrelatedPage::new(
            Some(SnapshotId::new("html")),
            PageId::new("s1")
        )));
        assert!(result.pages.contains(&CorrelatedPage::new(
            Some(SnapshotId::new("pdf")),
            PageId::new("s1")
        )));
    }

    #[test]
    fn origin_prefers_node_with_reference() {
        let snapshots: SnapshotSet = [
            snapshot("a", vec![HierarchyNode::new("x", None)]),
            snapshot(
                "b",
                vec![
                    HierarchyNode::new("x", Some("r")),
                    HierarchyNode::new("y", Some("r")),
                ],
            ),
        ]
        .into_iter()
        .collect();

        let result = resolve(&PageId::new("x"), &snapshots);
        assert!(result.warning.is_none());
        assert!(result.contains_page(&PageId::new("y")));
    }

    prop_compose! {
        // Two snapshots whose nodes are paired by index and share a reference
        // whenever `shared[i]` is set.
        fn paired_snapshots()(shared in prop::collection::vec(any::<bool>(), 1..12))
            -> (SnapshotSet, Vec<bool>)
        {
            let left = shared
                .iter()
                .enumerate()
                .map(|(i, _)| HierarchyNode::new(format!("a{i}"), Some(format!("ref-{i}").as_str())))
                .collect();
            let right = shared
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    let r = if *s { format!("ref-{i}") } else { format!("other-{i}") };
                    HierarchyNode::new(format!("b{i}"), Some(r.as_str()))
                })
                .collect();
            let set: SnapshotSet = [snapshot("A", left), snapshot("B", right)]
                .into_iter()
                .collect();
            (set, shared)
        }
    }

    proptest! {
        #[test]
        fn correlation_is_symmetric((set, shared) in paired_snapshots()) {
            for (i, s) in shared.iter().enumerate() {
                let a = PageId::new(format!("a{i}"));
                let b = PageId::new(format!("b{i}"));
                let from_a = resolve(&a, &set);
                let from_b = resolve(&b, &set);
                prop_assert_eq!(from_a.contains_page(&b), *s);
                prop_assert_eq!(from_b.contains_page(&a), *s);
                prop_assert!(from_a.contains_page(&a));
                prop_assert!(from_b.contains_page(&b));
            }
        }
    }
}
