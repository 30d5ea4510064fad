pub mod id;
pub mod error;
pub mod hierarchy;
pub mod correlation;

// Re-export commonly used types
pub use id::{ContentRef, OwnerId, PageId, ProjectId, SnapshotId};
pub use error::{CoreError, CorrelationWarning};
pub use hierarchy::{HierarchyNode, HierarchySnapshot, SnapshotSet};
pub use correlation::{resolve, CorrelatedPage, Correlation};
