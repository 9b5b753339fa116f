//! Configuration for the volume loader.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default metadata resource name of a chunked array.
pub const DEFAULT_METADATA_FILENAME: &str = ".zarray";

/// Default upper bound on the bytes of one loaded volume (1 GiB).
pub const DEFAULT_MAX_VOLUME_BYTES: usize = 1 << 30;

/// Configuration for the volume loading pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Half extent of the symmetric display box the local focus point is
    /// mapped into.
    pub box_half_extent: f32,

    /// Name of the metadata resource under the array (or level) directory.
    pub metadata_filename: String,

    /// Byte emitted for every sample of a flat (constant-valued) wide volume.
    pub flat_fill: u8,

    /// Internal threads used by blosc when decompressing a chunk.
    pub blosc_threads: usize,

    /// Largest volume, in bytes, a single load may allocate. Remote chunks
    /// whose decoded size exceeds it are rejected before they are fetched.
    pub max_volume_bytes: usize,

    /// Optional whole-request timeout for HTTP fetches, in seconds.
    pub request_timeout_secs: Option<u64>,

    /// User agent sent with HTTP fetches.
    pub user_agent: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            box_half_extent: 50.0,
            metadata_filename: DEFAULT_METADATA_FILENAME.to_string(),
            flat_fill: 128,
            blosc_threads: 1,
            max_volume_bytes: DEFAULT_MAX_VOLUME_BYTES,
            request_timeout_secs: None,
            user_agent: concat!("volume-stream/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("VOLUME_BOX_HALF_EXTENT") {
            if let Ok(extent) = val.parse() {
                config.box_half_extent = extent;
            }
        }

        if let Ok(val) = std::env::var("VOLUME_METADATA_FILENAME") {
            if !val.is_empty() {
                config.metadata_filename = val;
            }
        }

        if let Ok(val) = std::env::var("VOLUME_FLAT_FILL") {
            if let Ok(fill) = val.parse() {
                config.flat_fill = fill;
            }
        }

        if let Ok(val) = std::env::var("VOLUME_BLOSC_THREADS") {
            if let Ok(threads) = val.parse() {
                config.blosc_threads = threads;
            }
        }

        if let Ok(val) = std::env::var("VOLUME_MAX_BYTES") {
            if let Ok(max) = val.parse() {
                config.max_volume_bytes = max;
            }
        }

        if let Ok(val) = std::env::var("VOLUME_HTTP_TIMEOUT_SECS") {
            config.request_timeout_secs = val.parse().ok().filter(|secs| *secs > 0);
        }

        if let Ok(val) = std::env::var("VOLUME_USER_AGENT") {
            if !val.is_empty() {
                config.user_agent = val;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.box_half_extent.is_finite() || self.box_half_extent <= 0.0 {
            return Err("box_half_extent must be a positive finite number".to_string());
        }

        if self.metadata_filename.is_empty() || self.metadata_filename.contains('/') {
            return Err("metadata_filename must be a single non-empty path segment".to_string());
        }

        if self.blosc_threads == 0 {
            return Err("blosc_threads must be > 0".to_string());
        }

        if self.max_volume_bytes == 0 {
            return Err("max_volume_bytes must be > 0".to_string());
        }

        Ok(())
    }

    /// Get the HTTP request timeout, if one is configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();
        assert_eq!(config.box_half_extent, 50.0);
        assert_eq!(config.metadata_filename, ".zarray");
        assert_eq!(config.flat_fill, 128);
        assert_eq!(config.blosc_threads, 1);
        assert_eq!(config.max_volume_bytes, 1 << 30);
        assert!(config.request_timeout().is_none());
        assert!(config.user_agent.starts_with("volume-stream/"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = LoaderConfig::default();
        assert!(config.validate().is_ok());

        config.box_half_extent = 0.0;
        assert!(config.validate().is_err());

        config = LoaderConfig::default();
        config.box_half_extent = f32::NAN;
        assert!(config.validate().is_err());

        config = LoaderConfig::default();
        config.metadata_filename = "a/.zarray".to_string();
        assert!(config.validate().is_err());

        config = LoaderConfig::default();
        config.blosc_threads = 0;
        assert!(config.validate().is_err());

        config = LoaderConfig::default();
        config.max_volume_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_request_timeout() {
        let config = LoaderConfig {
            request_timeout_secs: Some(30),
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }
}
