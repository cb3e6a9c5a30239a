//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for claimex.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimexConfig {
    /// Extraction configuration.
    pub extraction: ExtractionConfig,

    /// Batch processing configuration.
    pub batch: BatchConfig,

    /// Template source configuration.
    pub templates: TemplateConfig,
}

/// Extraction and history configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum results kept per document type for statistics.
    pub history_capacity: usize,

    /// Results with lower overall confidence are routed to human review.
    pub review_threshold: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
            review_threshold: 0.75,
        }
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads for batch extraction (0 = one per core).
    pub max_parallelism: usize,
}

/// Where templates come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Register the shipped medical_bill, prescription and lab_result templates.
    pub include_baseline: bool,

    /// Directory of additional `*.json` templates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            include_baseline: true,
            template_dir: None,
        }
    }
}

impl ClaimexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ClaimexConfig =
            serde_json::from_str(r#"{"extraction": {"history_capacity": 10}}"#).unwrap();
        assert_eq!(config.extraction.history_capacity, 10);
        assert_eq!(config.extraction.review_threshold, 0.75);
        assert!(config.templates.include_baseline);
        assert_eq!(config.batch.max_parallelism, 0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = ClaimexConfig::default();
        config.batch.max_parallelism = 3;
        config.save(&path).unwrap();

        let loaded = ClaimexConfig::from_file(&path).unwrap();
        assert_eq!(loaded.batch.max_parallelism, 3);
    }
}
