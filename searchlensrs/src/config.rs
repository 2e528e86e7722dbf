//! Configuration for searchlens.
//!
//! TOML-based, with defaults that match the backends' documented limits.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchlensConfig {
    pub api: ApiConfig,
    pub warehouse: WarehouseConfig,
}

/// Settings for the paginated analytics API executor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Rows requested per page. 25 000 is the API maximum.
    pub page_size: usize,
    /// Pause between consecutive page requests, as a soft guard against the
    /// per-minute quota. Set to 0 to disable.
    pub pause_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            page_size: 25_000,
            pause_ms: 1_000,
        }
    }
}

/// Settings for the warehouse SQL executor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// On-demand query price per terabyte scanned, used to turn a dry-run
    /// byte count into a monetary estimate. Pricing varies by region and
    /// over time, so this is configuration rather than a constant.
    pub price_per_terabyte: f64,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            price_per_terabyte: 5.0,
        }
    }
}

impl SearchlensConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_api_limits() {
        let cfg = SearchlensConfig::default();
        assert_eq!(cfg.api.page_size, 25_000);
        assert_eq!(cfg.warehouse.price_per_terabyte, 5.0);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg = SearchlensConfig::from_toml_str(
            r#"
            [api]
            page_size = 1000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.api.page_size, 1000);
        assert_eq!(cfg.api.pause_ms, 1_000);
        assert_eq!(cfg.warehouse.price_per_terabyte, 5.0);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(SearchlensConfig::from_toml_str("api = 12").is_err());
    }

    #[test]
    fn loads_from_a_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("searchlens.toml");
        std::fs::write(&path, "[warehouse]\nprice_per_terabyte = 6.25\n").unwrap();
        let cfg = SearchlensConfig::from_file(&path).unwrap();
        assert_eq!(cfg.warehouse.price_per_terabyte, 6.25);
        assert_eq!(cfg.api.page_size, 25_000);
    }
}
