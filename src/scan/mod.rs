//! Scan planning: snapshot resolution, manifest pruning, and the
//! ADD/DELETE fold that reconstructs the live file set.

pub mod plan;
pub mod planner;

pub use plan::{Plan, ScanRequest};
pub use planner::SnapshotScanner;
