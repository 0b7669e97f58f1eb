//! Plugin contract and registry.
//!
//! A plugin is identified by its module name. It supplies the entity graphs
//! to install and the text transform applied to its documents before change
//! detection. Plugins are registered explicitly at startup; a module that is
//! not registered is simply absent.

pub mod builtin;
pub mod manifest;
pub mod validate;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::DocumentInstanceGraph;

pub use builtin::BuiltinTransform;
pub use manifest::{ManifestError, ManifestPlugin};
pub use validate::{validate_models, ValidationError};

/// A text-to-text normalization step.
pub trait Transform: Send + Sync {
    fn apply(&self, text: &str) -> String;
}

impl<F> Transform for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn apply(&self, text: &str) -> String {
        self(text)
    }
}

/// Installable module that watches a set of documents.
pub trait Plugin: Send + Sync {
    /// Module identifier the plugin is registered under.
    fn module(&self) -> &str;

    /// Entity graphs to install. Must not be empty.
    fn get_models(&self) -> Vec<DocumentInstanceGraph>;

    /// Default transform for every document of this plugin.
    fn transform(&self, text: &str) -> String;

    /// Transform specific to a document, or to a document in one language
    /// when `language` is given.
    fn variant(&self, _document: &str, _language: Option<&str>) -> Option<&dyn Transform> {
        None
    }
}

/// Module identifier to plugin lookup table.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin, replacing any plugin with the same module name.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        let module = plugin.module().to_string();
        if self.plugins.insert(module.clone(), plugin).is_some() {
            tracing::warn!(module = %module, "Plugin registered twice, keeping the later one");
        }
    }

    pub fn get(&self, module: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.get(module).cloned()
    }

    /// Registered module names, sorted.
    pub fn modules(&self) -> Vec<&str> {
        let mut modules: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        modules.sort_unstable();
        modules
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Build a registry from manifest files.
    ///
    /// Each path is either a manifest file or a directory scanned (not
    /// recursively) for `.toml`, `.yaml`, `.yml` and `.json` manifests.
    /// Missing paths are skipped.
    pub fn from_paths(paths: &[PathBuf]) -> Result<Self, ManifestError> {
        let mut registry = Self::new();
        for path in paths {
            for file in manifest_files(path)? {
                let plugin = ManifestPlugin::load(&file)?;
                tracing::debug!(module = plugin.module(), path = %file.display(), "Loaded plugin manifest");
                registry.register(Arc::new(plugin));
            }
        }
        Ok(registry)
    }
}

fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| matches!(ext, "toml" | "yaml" | "yml" | "json"))
}

fn manifest_files(path: &Path) -> Result<Vec<PathBuf>, ManifestError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        tracing::debug!(path = %path.display(), "Plugin path does not exist, skipping");
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_manifest(p))
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LanguageNode;

    struct Upper;

    impl Plugin for Upper {
        fn module(&self) -> &str {
            "tests.upper"
        }

        fn get_models(&self) -> Vec<DocumentInstanceGraph> {
            vec![DocumentInstanceGraph::new(
                "Test Inc",
                "Test",
                "Terms of Use",
                LanguageNode::new("English", "en"),
                "example.test/tos",
            )]
        }

        fn transform(&self, text: &str) -> String {
            text.to_uppercase()
        }
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(Upper));

        let plugin = registry.get("tests.upper").unwrap();
        assert_eq!(plugin.transform("abc"), "ABC");
        assert!(plugin.variant("Terms of Use", Some("en")).is_none());
        assert!(registry.get("tests.missing").is_none());
        assert_eq!(registry.modules(), vec!["tests.upper"]);
    }

    #[test]
    fn test_closures_are_transforms() {
        let strip = |text: &str| text.trim().to_string();
        assert_eq!(strip.apply("  x  "), "x");
    }

    #[test]
    fn test_from_paths_scans_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("acme.toml"),
            r#"
module = "acme.tos"
company = { name = "Acme" }
service = { name = "Cloud" }

[[documents]]
name = "Terms"
languages = [{ code = "en", name = "English", url = "acme.test/terms" }]
"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a manifest").unwrap();

        let registry = PluginRegistry::from_paths(&[
            dir.path().to_path_buf(),
            dir.path().join("does-not-exist"),
        ])
        .unwrap();

        assert_eq!(registry.modules(), vec!["acme.tos"]);
    }
}
