//! Service layer: installing plugins and running watch jobs.
//!
//! Services sit between the repositories and the CLI and hold no UI logic.

pub mod executor;
pub mod install;
pub mod runner;
pub mod transform;

pub use executor::{JobExecutor, JobOutcome, JobReport, JobState};
pub use install::{InstallError, InstallReport, Installer};
pub use runner::{JobFailure, RunCoordinator, RunError, RunSummary};
pub use transform::{TransformOutput, TransformPipeline};
