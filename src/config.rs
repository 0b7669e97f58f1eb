//! Configuration management for docsnaps using the prefer crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repository::DbContext;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "docsnaps.db";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 10;

const PLUGINS_SUBDIR: &str = "plugins";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {name}: \"{value}\"")]
    InvalidEnv { name: &'static str, value: String },
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    pub database_url: Option<String>,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Plugin manifest files or directories. Empty means `<data_dir>/plugins`.
    pub plugin_paths: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docsnaps");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            user_agent: format!("docsnaps/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            plugin_paths: Vec::new(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        match self.database_url {
            Some(ref url) => url.clone(),
            None => format!("sqlite:{}", self.database_path().display()),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Where plugin manifests are looked up.
    pub fn plugin_search_paths(&self) -> Vec<PathBuf> {
        if self.plugin_paths.is_empty() {
            vec![self.data_dir.join(PLUGINS_SUBDIR)]
        } else {
            self.plugin_paths.clone()
        }
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }

    /// Create a database context using the configured database URL or path.
    pub fn create_db_context(&self) -> DbContext {
        DbContext::new(&self.database_url())
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "target")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// User agent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Plugin manifest files or directories.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover a docsnaps config file in the standard locations.
    ///
    /// A discovered file that fails to parse is logged and ignored.
    pub async fn load() -> Self {
        let Ok(pref_config) = prefer::load("docsnaps").await else {
            return Self::default();
        };
        let Some(path) = pref_config.source_path() else {
            return Self::default();
        };

        match Self::load_from_path(path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file path, parsed by extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let mut config = Self::parse(path, &contents)?;
        if config.request_timeout == Some(0) {
            return Err(ConfigError::Parse {
                path: path.to_path_buf(),
                message: "request_timeout must be at least 1 second".to_string(),
            });
        }
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let parse_error = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        match path.extension().and_then(|e| e.to_str()).unwrap_or("toml") {
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| parse_error(e.to_string())),
            "json" => serde_json::from_str(contents).map_err(|e| parse_error(e.to_string())),
            _ => toml::from_str(contents).map_err(|e| parse_error(e.to_string())),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if !self.plugins.is_empty() {
            settings.plugin_paths = self
                .plugins
                .iter()
                .map(|p| self.resolve_path(p, base_dir))
                .collect();
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Data directory or database file (--target flag).
    pub target: Option<PathBuf>,
}

/// Where `--target` points: a database file or a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub data_dir: PathBuf,
    pub database_filename: String,
}

impl ResolvedTarget {
    pub fn from_path(path: &Path) -> Self {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(path)
        };

        let is_db_file = path
            .extension()
            .is_some_and(|ext| ext == "db" || ext == "sqlite" || ext == "sqlite3")
            || path.is_file();

        if is_db_file {
            let database_filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(DEFAULT_DATABASE_FILENAME)
                .to_string();
            let data_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
            Self {
                data_dir,
                database_filename,
            }
        } else {
            Self {
                data_dir: path,
                database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            }
        }
    }
}

/// Apply `DATABASE_URL` and `DOCSNAPS_REQUEST_TIMEOUT`. Empty values are
/// ignored; the timeout must be a positive number of seconds.
pub fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let var = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());

    if let Some(database_url) = var("DATABASE_URL") {
        tracing::debug!("Using DATABASE_URL from environment: {}", database_url);
        settings.database_url = Some(database_url);
    }

    if let Some(timeout) = var("DOCSNAPS_REQUEST_TIMEOUT") {
        settings.request_timeout = timeout
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| ConfigError::InvalidEnv {
                name: "DOCSNAPS_REQUEST_TIMEOUT",
                value: timeout.clone(),
            })?;
    }

    Ok(())
}

/// Load settings with explicit options.
///
/// Precedence, lowest first: defaults, config file, `--target`, environment.
pub async fn load_settings_with_options(
    options: LoadOptions,
) -> Result<(Settings, Config), ConfigError> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let mut settings = Settings::default();
    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    config.apply_to_settings(&mut settings, &base_dir);

    if let Some(ref target) = options.target {
        let resolved = ResolvedTarget::from_path(target);
        settings.data_dir = resolved.data_dir;
        settings.database_filename = resolved.database_filename;
    }

    apply_env(&mut settings, |name| std::env::var(name).ok())?;

    Ok((settings, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::with_data_dir(PathBuf::from("/srv/docsnaps"));
        assert_eq!(settings.request_timeout, 10);
        assert_eq!(settings.database_url(), "sqlite:/srv/docsnaps/docsnaps.db");
        assert_eq!(
            settings.plugin_search_paths(),
            vec![PathBuf::from("/srv/docsnaps/plugins")]
        );
    }

    #[tokio::test]
    async fn test_toml_relative_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docsnaps.toml");
        std::fs::write(
            &path,
            "data_dir = \"data\"\nrequest_timeout = 3\nplugins = [\"manifests\"]\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, &config.base_dir().unwrap());

        assert_eq!(settings.data_dir, dir.path().join("data"));
        assert_eq!(settings.request_timeout, 3);
        assert_eq!(settings.plugin_paths, vec![dir.path().join("manifests")]);
    }

    #[tokio::test]
    async fn test_yaml_and_json() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("docsnaps.yaml");
        std::fs::write(&yaml, "user_agent: tester\n").unwrap();
        let json = dir.path().join("docsnaps.json");
        std::fs::write(&json, r#"{"database": "watch.db"}"#).unwrap();

        let yaml = Config::load_from_path(&yaml).await.unwrap();
        let json = Config::load_from_path(&json).await.unwrap();
        assert_eq!(yaml.user_agent.as_deref(), Some("tester"));
        assert_eq!(json.database.as_deref(), Some("watch.db"));
    }

    #[tokio::test]
    async fn test_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docsnaps.toml");
        std::fs::write(&path, "request_timeout = \"soon\"").unwrap();

        assert!(matches!(
            Config::load_from_path(&path).await,
            Err(ConfigError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_zero_timeout_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docsnaps.toml");
        std::fs::write(&path, "request_timeout = 0\n").unwrap();

        assert!(matches!(
            Config::load_from_path(&path).await,
            Err(ConfigError::Parse { .. })
        ));

        let mut settings = Settings::default();
        let err = apply_env(&mut settings, env(&[("DOCSNAPS_REQUEST_TIMEOUT", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
        assert_eq!(settings.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_target_file_and_directory() {
        let file = ResolvedTarget::from_path(Path::new("/srv/watch/custom.sqlite"));
        assert_eq!(file.data_dir, PathBuf::from("/srv/watch"));
        assert_eq!(file.database_filename, "custom.sqlite");

        let dir = ResolvedTarget::from_path(Path::new("/srv/watch"));
        assert_eq!(dir.data_dir, PathBuf::from("/srv/watch"));
        assert_eq!(dir.database_filename, DEFAULT_DATABASE_FILENAME);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        apply_env(
            &mut settings,
            env(&[
                ("DATABASE_URL", "sqlite:/tmp/other.db"),
                ("DOCSNAPS_REQUEST_TIMEOUT", "25"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.database_url(), "sqlite:/tmp/other.db");
        assert_eq!(settings.request_timeout, 25);
    }

    #[test]
    fn test_env_ignores_empty_and_rejects_garbage() {
        let mut settings = Settings::default();
        apply_env(&mut settings, env(&[("DATABASE_URL", "")])).unwrap();
        assert_eq!(settings.database_url, None);

        let err = apply_env(&mut settings, env(&[("DOCSNAPS_REQUEST_TIMEOUT", "ten")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                name: "DOCSNAPS_REQUEST_TIMEOUT",
                ..
            }
        ));
    }
}
