//! Plugin installation: module lookup, model validation and loading.

use std::sync::Arc;

use thiserror::Error;

use crate::models::DocumentInstanceGraph;
use crate::plugins::{validate_models, Plugin, PluginRegistry, ValidationError};
use crate::repository::{HierarchicalLoader, LoadError, LoadReport};

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Module \"{0}\" not found")]
    ModuleNotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Model {index} ({key}) failed to load: {source}")]
    Load {
        index: usize,
        key: String,
        #[source]
        source: LoadError,
    },
}

/// Result of a completed install.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub module: String,
    /// One report per graph, in plugin order.
    pub loads: Vec<LoadReport>,
}

impl InstallReport {
    pub fn created(&self) -> usize {
        self.loads.iter().filter(|l| l.created).count()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.loads
            .iter()
            .flat_map(|l| l.warnings.iter().map(String::as_str))
    }
}

pub struct Installer {
    registry: Arc<PluginRegistry>,
    loader: HierarchicalLoader,
}

impl Installer {
    pub fn new(registry: Arc<PluginRegistry>, loader: HierarchicalLoader) -> Self {
        Self { registry, loader }
    }

    pub fn resolve(&self, module: &str) -> Result<Arc<dyn Plugin>, InstallError> {
        self.registry
            .get(module)
            .ok_or_else(|| InstallError::ModuleNotFound(module.to_string()))
    }

    /// Collect and validate the plugin's graphs. Nothing is written.
    pub fn prepare(
        &self,
        plugin: &dyn Plugin,
        disabled: bool,
    ) -> Result<Vec<DocumentInstanceGraph>, InstallError> {
        let mut models = plugin.get_models();
        validate_models(plugin.module(), &models)?;
        if disabled {
            models = models.into_iter().map(DocumentInstanceGraph::disabled).collect();
        }
        Ok(models)
    }

    /// Load one prepared graph in its own transaction.
    pub async fn load_graph(
        &self,
        module: &str,
        index: usize,
        graph: &DocumentInstanceGraph,
    ) -> Result<LoadReport, InstallError> {
        self.loader
            .upsert(graph, module)
            .await
            .map_err(|source| InstallError::Load {
                index,
                key: graph.instance_key(),
                source,
            })
    }

    /// Resolve, validate and load every graph of `module`.
    ///
    /// Validation covers all graphs before the first one is loaded. A load
    /// failure stops the install; graphs loaded before it stay committed.
    pub async fn install(&self, module: &str, disabled: bool) -> Result<InstallReport, InstallError> {
        let plugin = self.resolve(module)?;
        let models = self.prepare(plugin.as_ref(), disabled)?;

        tracing::info!(module = %module, models = models.len(), "Installing module");

        let mut loads = Vec::with_capacity(models.len());
        for (index, graph) in models.iter().enumerate() {
            loads.push(self.load_graph(module, index, graph).await?);
        }

        Ok(InstallReport {
            module: module.to_string(),
            loads,
        })
    }
}
