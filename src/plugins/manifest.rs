//! Declarative plugins described by a TOML, YAML or JSON manifest.
//!
//! ```toml
//! module = "acme.legal"
//! transforms = ["html_text", "trim_lines"]
//! company = { name = "Acme Inc", website = "acme.example" }
//! service = { name = "Acme Cloud" }
//!
//! [[documents]]
//! name = "Terms of Service"
//!
//! [[documents.languages]]
//! code = "en"
//! name = "English"
//! url = "acme.example/terms"
//! transforms = ["html_text", "collapse_whitespace"]
//! ```
//!
//! `transforms` may appear at the top level, on a document, or on one
//! language of a document. The most specific chain wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::builtin::{BuiltinTransform, TransformChain};
use super::{Plugin, Transform};
use crate::models::{CompanyNode, DocumentInstanceGraph, DocumentNode, LanguageNode, ServiceNode};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read plugin manifest {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse plugin manifest {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Unknown transform \"{name}\" in plugin manifest {}", .path.display())]
    UnknownTransform { path: PathBuf, name: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    module: String,
    company: EntityEntry,
    service: EntityEntry,
    #[serde(default)]
    transforms: Vec<String>,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    documents: Vec<DocumentEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntityEntry {
    name: String,
    #[serde(default)]
    website: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentEntry {
    name: String,
    #[serde(default)]
    transforms: Option<Vec<String>>,
    #[serde(default)]
    languages: Vec<LanguageEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LanguageEntry {
    code: String,
    name: String,
    url: String,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    transforms: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

/// Plugin built from a manifest file.
#[derive(Debug)]
pub struct ManifestPlugin {
    module: String,
    models: Vec<DocumentInstanceGraph>,
    default_chain: TransformChain,
    document_chains: HashMap<String, TransformChain>,
    /// Keyed by document name, then language code.
    language_chains: HashMap<String, HashMap<String, TransformChain>>,
}

impl ManifestPlugin {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    /// Parse manifest text. The format follows the extension of `path`,
    /// defaulting to TOML.
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ManifestError> {
        let parse_error = |message: String| ManifestError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        let file: ManifestFile = match ext {
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| parse_error(e.to_string()))?,
            "json" => serde_json::from_str(contents).map_err(|e| parse_error(e.to_string()))?,
            _ => toml::from_str(contents).map_err(|e| parse_error(e.to_string()))?,
        };

        let chain = |names: &[String]| -> Result<TransformChain, ManifestError> {
            names
                .iter()
                .map(|name| {
                    name.parse::<BuiltinTransform>()
                        .map_err(|name| ManifestError::UnknownTransform {
                            path: path.to_path_buf(),
                            name,
                        })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(TransformChain)
        };

        let default_chain = chain(&file.transforms)?;
        let mut document_chains = HashMap::new();
        let mut language_chains: HashMap<String, HashMap<String, TransformChain>> = HashMap::new();
        let mut models = Vec::new();

        for document in &file.documents {
            if let Some(names) = &document.transforms {
                document_chains.insert(document.name.clone(), chain(names)?);
            }

            for language in &document.languages {
                if let Some(names) = &language.transforms {
                    language_chains
                        .entry(document.name.clone())
                        .or_default()
                        .insert(language.code.clone(), chain(names)?);
                }

                models.push(DocumentInstanceGraph {
                    company: CompanyNode {
                        name: file.company.name.clone(),
                        website: file.company.website.clone(),
                    },
                    service: ServiceNode {
                        name: file.service.name.clone(),
                        website: file.service.website.clone(),
                    },
                    document: DocumentNode {
                        name: document.name.clone(),
                    },
                    language: LanguageNode::new(&language.name, &language.code),
                    url: language.url.clone(),
                    is_enabled: language.enabled,
                    transform_priority: file.priority,
                });
            }
        }

        Ok(Self {
            module: file.module,
            models,
            default_chain,
            document_chains,
            language_chains,
        })
    }
}

impl Plugin for ManifestPlugin {
    fn module(&self) -> &str {
        &self.module
    }

    fn get_models(&self) -> Vec<DocumentInstanceGraph> {
        self.models.clone()
    }

    fn transform(&self, text: &str) -> String {
        self.default_chain.apply(text)
    }

    fn variant(&self, document: &str, language: Option<&str>) -> Option<&dyn Transform> {
        let chain = match language {
            Some(code) => self.language_chains.get(document)?.get(code)?,
            None => self.document_chains.get(document)?,
        };
        Some(chain)
    }
}
