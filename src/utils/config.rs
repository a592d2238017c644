//! Service configuration
//!
//! Values are layered: environment variables override the TOML config file,
//! which overrides the built-in defaults.

use serde::Deserialize;
use std::fs;

use crate::utils::app_data::get_config_path;

/// Default directory name of the index inside the build output directory
pub const DEFAULT_INDEX_DIR_NAME: &str = "refindex";

/// Default number of entries kept per derived-query cache
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Configuration file format (TOML)
/// Located at ~/Library/Application Support/refindex/config.toml (macOS)
/// or %LOCALAPPDATA%/refindex/config.toml (Windows)
/// or ~/.local/share/refindex/config.toml (Linux)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub service: ServiceConfigFile,
}

/// `[service]` section of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfigFile {
    pub enabled: Option<bool>,
    pub index_dir_name: Option<String>,
    pub cache_capacity: Option<usize>,
    pub hierarchy_limit: Option<usize>,
    pub delete_on_corruption: Option<bool>,
}

/// Runtime configuration of the reference service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// When false the service never opens a reader and every query is unavailable
    pub enabled: bool,
    /// Index directory name, relative to the build output directory
    pub index_dir_name: String,
    /// Entries kept per derived-query cache
    pub cache_capacity: usize,
    /// Node cap for service-level hierarchy traversals (None = unbounded)
    pub hierarchy_limit: Option<usize>,
    /// Delete the on-disk index after a storage fault
    pub delete_on_corruption: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            index_dir_name: DEFAULT_INDEX_DIR_NAME.to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            hierarchy_limit: None,
            delete_on_corruption: true,
        }
    }
}

impl ServiceConfig {
    /// Load config from file in the app data directory
    /// Returns None if file doesn't exist or can't be parsed
    fn load_from_file() -> Option<ConfigFile> {
        let config_path = get_config_path().ok()?;

        if !config_path.exists() {
            return None;
        }

        let content = fs::read_to_string(&config_path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %config_path.display(), error = %e, "ignoring malformed config file");
                None
            }
        }
    }

    /// Load config with priority: environment variables > config file > defaults
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(file_config) = Self::load_from_file() {
            config.apply_file(file_config.service);
        }

        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn apply_file(&mut self, file: ServiceConfigFile) {
        if let Some(v) = file.enabled {
            self.enabled = v;
        }
        if let Some(v) = file.index_dir_name {
            self.index_dir_name = v;
        }
        if let Some(v) = file.cache_capacity {
            self.cache_capacity = v;
        }
        if let Some(v) = file.hierarchy_limit {
            self.hierarchy_limit = Some(v);
        }
        if let Some(v) = file.delete_on_corruption {
            self.delete_on_corruption = v;
        }
    }

    /// Apply environment overrides through a lookup function so tests do
    /// not have to mutate the process environment.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("REFINDEX_ENABLED") {
            if let Ok(enabled) = val.parse() {
                self.enabled = enabled;
            }
        }

        if let Some(val) = lookup("REFINDEX_CACHE_SIZE") {
            if let Ok(size) = val.parse() {
                self.cache_capacity = size;
            }
        }

        if let Some(val) = lookup("REFINDEX_HIERARCHY_LIMIT") {
            if let Ok(limit) = val.parse() {
                self.hierarchy_limit = Some(limit);
            }
        }

        if let Some(val) = lookup("REFINDEX_INDEX_DIR") {
            if !val.is_empty() {
                self.index_dir_name = val;
            }
        }
    }
}
