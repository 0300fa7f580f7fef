//! Recognition and rewriting of issue submission URLs.

mod classifier;
mod remap;

pub use classifier::{Classification, IngestPattern, IssueSubmission};
pub use remap::{rewrite_path_and_query, RemapOutcome, RouteRemapper, RouteTarget};
