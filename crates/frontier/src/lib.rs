pub mod dup_filter;
pub mod queue;

pub use dup_filter::DuplicateFilter;
pub use queue::{WorkItem, WorkQueue};
