//! Shared helper functions for CLI commands.

use std::sync::Arc;

use anyhow::Context;

use crate::config::Settings;
use crate::http_client::HttpFetcher;
use crate::plugins::PluginRegistry;
use crate::repository::DbContext;

/// Open the database, creating the data directory and schema when missing.
pub async fn open_database(settings: &Settings) -> anyhow::Result<DbContext> {
    if settings.database_url.is_none() {
        settings.ensure_directories().with_context(|| {
            format!(
                "Failed to create data directory {}",
                settings.data_dir.display()
            )
        })?;
    }

    let ctx = settings.create_db_context();
    ctx.init_schema()
        .await
        .with_context(|| format!("Failed to open database {}", settings.database_url()))?;
    Ok(ctx)
}

/// Load every plugin manifest found on the configured search paths.
pub fn load_registry(settings: &Settings) -> anyhow::Result<Arc<PluginRegistry>> {
    let registry = PluginRegistry::from_paths(&settings.plugin_search_paths())?;
    tracing::debug!(plugins = registry.len(), "Plugin registry ready");
    Ok(Arc::new(registry))
}

pub fn http_fetcher(settings: &Settings) -> anyhow::Result<HttpFetcher> {
    Ok(HttpFetcher::new(
        &settings.user_agent,
        settings.request_timeout_duration(),
    )?)
}
