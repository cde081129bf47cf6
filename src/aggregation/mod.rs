//! Client-side tabular aggregation for chart data.
//!
//! Pure functions over backend record lists: no I/O, no shared state, and the
//! input is never modified.

mod filters;
mod focus;
mod hierarchy;
mod record;
mod stacked;

pub use filters::FilterSet;
pub use focus::{HierarchyFocus, HierarchyView};
pub use hierarchy::{
    aggregate_hierarchy, Bucket, BucketCatalog, HierarchyAggregate, HierarchyLeaf, HierarchyNode,
    DEFAULT_VISUAL_FLOOR, GENERAL_LABEL, UNASSIGNED_LABEL,
};
pub use record::{category, measure, number, Record, COUNT_FIELD};
pub use stacked::{aggregate_stacked, StackedAggregate, StackedRow, STACK_FALLBACK_LABEL};
