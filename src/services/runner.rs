//! Run coordinator: executes every enabled job concurrently and aggregates
//! the outcomes.

use std::sync::Arc;

use thiserror::Error;

use super::executor::{JobExecutor, JobOutcome, JobReport};
use super::transform::TransformPipeline;
use crate::http_client::Fetcher;
use crate::models::{FailureCause, Job};
use crate::plugins::PluginRegistry;
use crate::repository::{DbContext, DbError, JobRepository, SnapshotRepository};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub instance_id: i32,
    pub label: String,
    pub cause: FailureCause,
    pub message: String,
}

/// Aggregate result of one run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub saved: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub failures: Vec<JobFailure>,
    pub warnings: Vec<String>,
    /// One report per job, in job id order.
    pub reports: Vec<JobReport>,
}

impl RunSummary {
    pub fn no_active_jobs(&self) -> bool {
        self.reports.is_empty()
    }

    fn record(&mut self, report: JobReport) {
        match &report.outcome {
            JobOutcome::Saved { .. } => self.saved += 1,
            JobOutcome::Unchanged => self.unchanged += 1,
            JobOutcome::Failed { cause, message } => {
                self.failed += 1;
                self.failures.push(JobFailure {
                    instance_id: report.instance_id,
                    label: report.label.clone(),
                    cause: *cause,
                    message: message.clone(),
                });
            }
        }
        self.warnings.extend(report.warnings.iter().cloned());
        self.reports.push(report);
    }
}

pub struct RunCoordinator {
    jobs: JobRepository,
    snapshots: SnapshotRepository,
    executor: Arc<JobExecutor>,
}

impl RunCoordinator {
    pub fn new(ctx: &DbContext, registry: Arc<PluginRegistry>, fetcher: Arc<dyn Fetcher>) -> Self {
        let snapshots = ctx.snapshots();
        let executor = JobExecutor::new(
            fetcher,
            snapshots.clone(),
            TransformPipeline::new(registry),
        );
        Self {
            jobs: ctx.jobs(),
            snapshots,
            executor: Arc::new(executor),
        }
    }

    /// Execute every enabled job and wait for all of them.
    ///
    /// Only failures to read the job set are errors. Individual job failures,
    /// including panics, are recorded in the summary.
    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let jobs = self.jobs.enabled_jobs().await?;
        if jobs.is_empty() {
            tracing::info!("No active jobs found");
            return Ok(RunSummary::default());
        }

        let instance_ids: Vec<i32> = jobs.iter().map(|job| job.instance_id).collect();
        let mut document_ids: Vec<i32> = jobs.iter().map(|job| job.document_id).collect();
        document_ids.sort_unstable();
        document_ids.dedup();

        let latest = Arc::new(self.snapshots.latest_for_instances(&instance_ids).await?);
        let transforms = Arc::new(self.jobs.transforms_for_documents(&document_ids).await?);

        tracing::info!(jobs = jobs.len(), "Starting run");

        let handles: Vec<_> = jobs
            .iter()
            .cloned()
            .map(|job: Job| {
                let executor = Arc::clone(&self.executor);
                let latest = Arc::clone(&latest);
                let transforms = Arc::clone(&transforms);
                tokio::spawn(async move {
                    let registrations = transforms
                        .get(&job.document_id)
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    executor
                        .execute(&job, latest.get(&job.instance_id), registrations)
                        .await
                })
            })
            .collect();

        let results = futures::future::join_all(handles).await;

        let mut summary = RunSummary::default();
        for (job, result) in jobs.iter().zip(results) {
            let report = match result {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(instance_id = job.instance_id, "{} aborted: {}", job, e);
                    JobReport::failed(job, FailureCause::Panicked, e.to_string())
                }
            };
            summary.record(report);
        }

        tracing::info!(
            saved = summary.saved,
            unchanged = summary.unchanged,
            failed = summary.failed,
            "Run complete"
        );

        Ok(summary)
    }
}
