use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "refindex";
const CONFIG_FILE: &str = "config.toml";

/// Name of the metadata file that marks a directory as a reference index
pub const META_FILE: &str = "meta.json";

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the per-user application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    Ok(base.join(APP_NAME))
}

/// Get the index directory inside a build output directory
pub fn get_index_dir(build_output: &Path, index_dir_name: &str) -> PathBuf {
    build_output.join(index_dir_name)
}

/// Check if a directory holds an index (its metadata file exists)
pub fn is_indexed(index_dir: &Path) -> bool {
    index_dir.join(META_FILE).exists()
}

/// Remove an index directory wholesale
pub fn remove_index(index_dir: &Path) -> Result<()> {
    if index_dir.exists() {
        fs::remove_dir_all(index_dir)
            .with_context(|| format!("Failed to remove index at {}", index_dir.display()))?;
    }
    Ok(())
}
