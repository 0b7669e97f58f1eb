//! Plugin listing command.

use console::style;

use crate::cli::helpers::load_registry;
use crate::config::Settings;

pub async fn cmd_plugins(settings: &Settings) -> anyhow::Result<()> {
    let registry = load_registry(settings)?;

    if registry.is_empty() {
        println!("{} No plugins found", style("!").yellow());
        return Ok(());
    }

    println!("{}", style("Plugins").bold());
    for module in registry.modules() {
        let Some(plugin) = registry.get(module) else {
            continue;
        };
        let count = plugin.get_models().len();
        println!(
            "  {:<32} {} document instance{}",
            style(module).cyan(),
            count,
            if count == 1 { "" } else { "s" }
        );
    }

    Ok(())
}
