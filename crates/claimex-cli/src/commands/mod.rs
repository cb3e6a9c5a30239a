//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod templates;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use claimex_core::{
    ClaimexConfig, DataExtractionService, DataExtractionServiceBuilder, ExtractionTemplate,
    TracingObserver,
};

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("claimex")
        .join("config.json")
}

/// The config file in use: the `--config` path, else the default location.
pub fn config_file(config_path: Option<&str>) -> PathBuf {
    config_path.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration. A missing default file means defaults; a missing
/// file given with `--config` is an error.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ClaimexConfig> {
    let path = config_file(config_path);

    if path.exists() {
        debug!("Loading configuration from {}", path.display());
        return Ok(ClaimexConfig::from_file(&path)?);
    }
    if config_path.is_some() {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    Ok(ClaimexConfig::default())
}

/// Service builder from configuration, logging lifecycle events.
pub fn service_builder(config: ClaimexConfig) -> DataExtractionServiceBuilder {
    DataExtractionService::builder()
        .with_config(config)
        .with_observer(Arc::new(TracingObserver))
}

/// Read a template from a JSON file.
pub fn load_template(path: &Path) -> anyhow::Result<ExtractionTemplate> {
    if !path.exists() {
        anyhow::bail!("Template file not found: {}", path.display());
    }
    let content = std::fs::read_to_string(path)?;
    let template: ExtractionTemplate = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid template {}: {}", path.display(), e))?;
    Ok(template)
}
