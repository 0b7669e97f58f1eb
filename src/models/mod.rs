//! Data models for docsnaps.

mod graph;
mod job;
mod snapshot;

pub use graph::{CompanyNode, DocumentInstanceGraph, DocumentNode, LanguageNode, ServiceNode};
pub use job::{FailureCause, Job, TransformRegistration};
pub use snapshot::Snapshot;
