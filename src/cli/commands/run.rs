//! Run command.

use std::sync::Arc;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::helpers::{http_fetcher, load_registry, open_database};
use crate::config::Settings;
use crate::services::{JobOutcome, RunCoordinator};

/// Execute every enabled job once.
///
/// Individual job failures are reported but do not fail the command.
pub async fn cmd_run(settings: &Settings) -> anyhow::Result<()> {
    let registry = load_registry(settings)?;
    let ctx = open_database(settings).await?;
    let fetcher = Arc::new(http_fetcher(settings)?);

    let coordinator = RunCoordinator::new(&ctx, registry, fetcher);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.set_message("Fetching documents...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let summary = coordinator.run().await;
    spinner.finish_and_clear();
    let summary = summary?;

    if summary.no_active_jobs() {
        println!("{} No active jobs found.", style("!").yellow());
        return Ok(());
    }

    for report in &summary.reports {
        match &report.outcome {
            JobOutcome::Saved { snapshot_id } => println!(
                "  {} {} (snapshot {})",
                style("✓").green(),
                report.label,
                snapshot_id
            ),
            JobOutcome::Unchanged => println!(
                "  {} {} {}",
                style("=").dim(),
                report.label,
                style("(unchanged)").dim()
            ),
            JobOutcome::Failed { cause, message } => println!(
                "  {} {} [{}] {}",
                style("✗").red(),
                report.label,
                cause,
                message
            ),
        }
        for warning in &report.warnings {
            println!("    {} {}", style("!").yellow(), warning);
        }
    }

    let mark = if summary.failed == 0 {
        style("✓").green()
    } else {
        style("!").yellow()
    };
    println!(
        "{} Run complete: {} saved, {} unchanged, {} failed",
        mark, summary.saved, summary.unchanged, summary.failed
    );

    Ok(())
}
