//! Install command.

use console::style;

use crate::cli::helpers::{load_registry, open_database};
use crate::config::Settings;
use crate::services::{InstallError, Installer};

/// Install the watch jobs of one plugin module.
///
/// Prints one line per stage and per loader warning. Any failure ends the
/// command with an error after reporting it.
pub async fn cmd_install(settings: &Settings, module: &str, disabled: bool) -> anyhow::Result<()> {
    let registry = load_registry(settings)?;
    let ctx = open_database(settings).await?;
    let installer = Installer::new(registry, ctx.loader());

    let plugin = installer.resolve(module).inspect_err(report)?;
    println!("{} Found module {}", style("✓").green(), module);

    let models = installer
        .prepare(plugin.as_ref(), disabled)
        .inspect_err(report)?;
    println!(
        "{} Validated {} model{}",
        style("✓").green(),
        models.len(),
        if models.len() == 1 { "" } else { "s" }
    );

    let mut created = 0;
    for (index, graph) in models.iter().enumerate() {
        let load = installer
            .load_graph(module, index, graph)
            .await
            .inspect_err(report)?;

        let verb = if load.created { "Created" } else { "Updated" };
        if load.created {
            created += 1;
        }
        println!(
            "{} {} {} (id {})",
            style("✓").green(),
            verb,
            graph.instance_key(),
            load.document_instance_id
        );
        for warning in &load.warnings {
            println!("  {} {}", style("!").yellow(), warning);
        }
    }

    println!(
        "{} Installed {}: {} created, {} existing{}",
        style("✓").green(),
        module,
        created,
        models.len() - created,
        if disabled { " (disabled)" } else { "" }
    );

    Ok(())
}

fn report(err: &InstallError) {
    println!("{} {}", style("✗").red(), err);
}
