//! Per-job execution: fetch, transform, compare, persist.
//!
//! A job never returns an error. Every failure is classified and reported
//! in the job's [`JobReport`] so sibling jobs are unaffected.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use super::transform::{TransformOutput, TransformPipeline};
use crate::http_client::Fetcher;
use crate::models::{FailureCause, Job, Snapshot, TransformRegistration};
use crate::repository::SnapshotRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Fetching,
    Transforming,
    Comparing,
    Unchanged,
    Persisting,
    Persisted,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Unchanged | Self::Persisted | Self::Failed)
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Transforming => "transforming",
            Self::Comparing => "comparing",
            Self::Unchanged => "unchanged",
            Self::Persisting => "persisting",
            Self::Persisted => "persisted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Saved { snapshot_id: i32 },
    Unchanged,
    Failed { cause: FailureCause, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub instance_id: i32,
    /// Display name of the job, e.g. `Test Inc / Test / Terms of Use [en]`.
    pub label: String,
    pub outcome: JobOutcome,
    pub warnings: Vec<String>,
}

impl JobReport {
    pub fn failed(job: &Job, cause: FailureCause, message: impl Into<String>) -> Self {
        Self {
            instance_id: job.instance_id,
            label: job.to_string(),
            outcome: JobOutcome::Failed {
                cause,
                message: message.into(),
            },
            warnings: Vec::new(),
        }
    }
}

/// Tracks and logs one job's progress through its states.
struct Progress<'a> {
    job: &'a Job,
    state: JobState,
}

impl<'a> Progress<'a> {
    fn new(job: &'a Job) -> Self {
        Self {
            job,
            state: JobState::Pending,
        }
    }

    fn enter(&mut self, next: JobState) {
        debug_assert!(!self.state.is_terminal(), "job already finished");
        tracing::debug!(
            instance_id = self.job.instance_id,
            from = %self.state,
            to = %next,
            "{}",
            self.job
        );
        self.state = next;
    }

    fn finish(mut self, state: JobState, outcome: JobOutcome, warnings: Vec<String>) -> JobReport {
        self.enter(state);
        match &outcome {
            JobOutcome::Failed { cause, message } => tracing::error!(
                instance_id = self.job.instance_id,
                url = %self.job.url,
                cause = %cause,
                "{}: {}",
                self.job,
                message
            ),
            JobOutcome::Saved { snapshot_id } => tracing::info!(
                instance_id = self.job.instance_id,
                snapshot_id,
                "{}: snapshot saved",
                self.job
            ),
            JobOutcome::Unchanged => tracing::info!(
                instance_id = self.job.instance_id,
                "{}: no change",
                self.job
            ),
        }
        JobReport {
            instance_id: self.job.instance_id,
            label: self.job.to_string(),
            outcome,
            warnings,
        }
    }
}

pub struct JobExecutor {
    fetcher: Arc<dyn Fetcher>,
    snapshots: SnapshotRepository,
    pipeline: TransformPipeline,
}

impl JobExecutor {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        snapshots: SnapshotRepository,
        pipeline: TransformPipeline,
    ) -> Self {
        Self {
            fetcher,
            snapshots,
            pipeline,
        }
    }

    /// Run one job against its latest stored snapshot.
    ///
    /// Writes at most one snapshot, and only when the transformed text
    /// differs from `latest`. Empty text is stored as a snapshot without
    /// text.
    pub async fn execute(
        &self,
        job: &Job,
        latest: Option<&Snapshot>,
        registrations: &[TransformRegistration],
    ) -> JobReport {
        let mut progress = Progress::new(job);

        progress.enter(JobState::Fetching);
        let raw = match self.fetcher.fetch(&job.url).await {
            Ok(raw) => raw,
            Err(e) => {
                let outcome = JobOutcome::Failed {
                    cause: e.cause(),
                    message: e.to_string(),
                };
                return progress.finish(JobState::Failed, outcome, Vec::new());
            }
        };

        progress.enter(JobState::Transforming);
        let TransformOutput { text, warnings } = self.pipeline.apply(job, registrations, raw);
        let text = (!text.is_empty()).then_some(text);

        progress.enter(JobState::Comparing);
        let changed = latest.map_or(true, |snapshot| !snapshot.matches(text.as_deref()));
        if !changed {
            return progress.finish(JobState::Unchanged, JobOutcome::Unchanged, warnings);
        }

        progress.enter(JobState::Persisting);
        match self
            .snapshots
            .insert(job.instance_id, text.as_deref(), Utc::now())
            .await
        {
            Ok(snapshot) => progress.finish(
                JobState::Persisted,
                JobOutcome::Saved {
                    snapshot_id: snapshot.id,
                },
                warnings,
            ),
            Err(e) => progress.finish(
                JobState::Failed,
                JobOutcome::Failed {
                    cause: FailureCause::StorageError,
                    message: e.to_string(),
                },
                warnings,
            ),
        }
    }
}
