//! Initialize command.

use console::style;

use crate::cli::helpers::open_database;
use crate::config::Settings;

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    open_database(settings).await?;

    let plugin_dirs = settings.plugin_search_paths();
    if plugin_dirs.iter().all(|p| !p.exists()) {
        println!(
            "{} No plugin manifests found in {}",
            style("!").yellow(),
            plugin_dirs
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    println!(
        "{} Initialized docsnaps database at {}",
        style("✓").green(),
        settings.database_url()
    );

    Ok(())
}
