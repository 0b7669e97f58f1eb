//! Snapshot history command.

use console::style;

use crate::cli::helpers::open_database;
use crate::config::Settings;

pub async fn cmd_history(settings: &Settings, instance_id: i32) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;

    let Some(job) = ctx.jobs().job(instance_id).await? else {
        println!("{} Document instance {} not found", style("✗").red(), instance_id);
        anyhow::bail!("unknown document instance {}", instance_id);
    };

    let snapshots = ctx.snapshots().history(instance_id).await?;

    let status = if job.is_enabled {
        style("enabled").green()
    } else {
        style("disabled").dim()
    };
    println!("{} ({})", style(&job).bold(), status);
    println!("  {}", job.url);

    if snapshots.is_empty() {
        println!("{} No snapshots yet", style("!").yellow());
        return Ok(());
    }

    for snapshot in &snapshots {
        let size = match snapshot.text {
            Some(_) => format!("{} chars", snapshot.text_len()),
            None => "no text".to_string(),
        };
        println!(
            "  {:>6}  {}  {}",
            snapshot.id,
            snapshot.datetime.format("%Y-%m-%d %H:%M:%S UTC"),
            size
        );
    }

    Ok(())
}
