//! Runtime configuration.
//!
//! An [`ImageUtil`](crate::util::ImageUtil) is built from a `RuntimeConfig`,
//! either constructed with the builder methods or loaded from TOML:
//!
//! ```toml
//! device_id = 0
//! device_memory_limit = 268435456
//! resample_filter = "bilinear"
//! parallel_threshold = 16384
//! ```

use crate::core::error::{RuntimeError, RuntimeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Element count above which kernels split work across the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 16 * 1024;

/// Interpolation used by `resample`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    /// Nearest source pixel
    Nearest,
    /// Bilinear interpolation between the four nearest source pixels
    #[default]
    Bilinear,
}

/// Construction-time configuration for a device context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Accelerator to bind.
    pub device_id: u32,
    /// Upper bound on accelerator memory in bytes (`None` = unbounded).
    pub device_memory_limit: Option<usize>,
    /// Interpolation used by `resample`.
    pub resample_filter: ResampleFilter,
    /// Element count above which kernels run in parallel.
    pub parallel_threshold: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            device_memory_limit: None,
            resample_filter: ResampleFilter::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl RuntimeConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device id.
    pub fn with_device(mut self, device_id: u32) -> Self {
        self.device_id = device_id;
        self
    }

    /// Set the accelerator memory limit in bytes.
    pub fn with_memory_limit(mut self, limit: usize) -> Self {
        self.device_memory_limit = Some(limit);
        self
    }

    /// Set the accelerator memory limit in megabytes.
    pub fn with_memory_limit_mb(mut self, mb: usize) -> Self {
        self.device_memory_limit = Some(mb * 1024 * 1024);
        self
    }

    /// Set the resampling filter.
    pub fn with_resample_filter(mut self, filter: ResampleFilter) -> Self {
        self.resample_filter = filter;
        self
    }

    /// Set the parallel threshold.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> RuntimeResult<Self> {
        toml::from_str(source).map_err(|e| RuntimeError::Config(e.to_string()))
    }

    /// Parse a JSON document.
    pub fn from_json_str(source: &str) -> RuntimeResult<Self> {
        serde_json::from_str(source).map_err(|e| RuntimeError::Config(e.to_string()))
    }

    /// Load from a `.toml` or `.json` file, chosen by extension.
    pub fn from_file(path: impl AsRef<Path>) -> RuntimeResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&source),
            _ => Self::from_toml_str(&source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.device_id, 0);
        assert_eq!(config.device_memory_limit, None);
        assert_eq!(config.resample_filter, ResampleFilter::Bilinear);
    }

    #[test]
    fn test_builder() {
        let config = RuntimeConfig::new()
            .with_device(2)
            .with_memory_limit_mb(4)
            .with_resample_filter(ResampleFilter::Nearest);
        assert_eq!(config.device_id, 2);
        assert_eq!(config.device_memory_limit, Some(4 * 1024 * 1024));
        assert_eq!(config.resample_filter, ResampleFilter::Nearest);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = RuntimeConfig::from_toml_str(
            "device_id = 1\nresample_filter = \"nearest\"\n",
        )
        .unwrap();
        assert_eq!(config.device_id, 1);
        assert_eq!(config.resample_filter, ResampleFilter::Nearest);
        assert_eq!(config.parallel_threshold, DEFAULT_PARALLEL_THRESHOLD);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = RuntimeConfig::from_toml_str("resample_filter = \"cubic\"").unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"device_id": 3, "device_memory_limit": 1024}}"#).unwrap();
        let config = RuntimeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.device_id, 3);
        assert_eq!(config.device_memory_limit, Some(1024));
    }
}
