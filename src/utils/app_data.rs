use crate::index::types::IndexConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "dynbwt";
const CONFIG_FILE: &str = "config.json";

/// Get the path to the default config file
pub fn get_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join(APP_NAME).join(CONFIG_FILE))
}

/// Load the index configuration.
///
/// Reads `path` if given, otherwise the default config file. A missing
/// default config file yields the default configuration.
pub fn load_config(path: Option<&Path>) -> Result<IndexConfig> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => match get_config_path() {
            Ok(path) if path.exists() => path,
            _ => return Ok(IndexConfig::default()),
        },
    };

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
    let config: IndexConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
    Ok(config)
}

/// Save the configuration to `path`
pub fn save_config(config: &IndexConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)
        .context("Failed to serialize config")?;
    fs::write(path, content)
        .context("Failed to write config file")?;
    Ok(())
}

/// Write the default configuration to `path`, or to the default config file.
///
/// An existing file is only replaced with `force`. Returns the path written.
pub fn init_config(path: Option<&Path>, force: bool) -> Result<PathBuf> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => get_config_path()?,
    };
    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file {} already exists (use --force to replace it)",
            config_path.display()
        );
    }
    save_config(&IndexConfig::default(), &config_path)?;
    Ok(config_path)
}
