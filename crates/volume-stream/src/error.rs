//! Error types for volume loading.

use thiserror::Error;

/// Errors that can occur while resolving, decoding or normalizing a volume.
///
/// Payloads are plain strings so a failure can be cloned into a
/// [`LoadResult`](crate::LoadResult) and broadcast to every subscriber.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VolumeError {
    /// The chunked-array metadata cannot be used for addressing.
    #[error("metadata unusable: {0}")]
    MetadataUnusable(String),

    /// The chunk compressor is not one this crate can decode.
    #[error("unsupported compressor: {0}")]
    UnsupportedCompressor(String),

    /// The compressor is known but the chunk failed to decompress.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// The element type is not one of the supported numeric encodings.
    #[error("unsupported element type: {0}")]
    UnsupportedElementType(String),

    /// A remote resource could not be fetched.
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// A local volume file could not be decoded.
    #[error("local volume decode failed: {0}")]
    LocalDecode(String),

    /// The locator does not name any known kind of source.
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    /// The requested volume is larger than the configured limit.
    #[error("volume too large: {0}")]
    VolumeTooLarge(String),

    /// A chunk key could not be parsed back into a coordinate.
    #[error("invalid chunk key: {0}")]
    InvalidChunkKey(String),

    /// Filesystem or other I/O error.
    #[error("io error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The loader's driver task is no longer running.
    #[error("volume loader is closed")]
    LoaderClosed,
}

impl VolumeError {
    /// Create a MetadataUnusable error.
    pub fn metadata_unusable(msg: impl Into<String>) -> Self {
        Self::MetadataUnusable(msg.into())
    }

    /// Create an UnsupportedCompressor error.
    pub fn unsupported_compressor(id: impl Into<String>) -> Self {
        Self::UnsupportedCompressor(id.into())
    }

    /// Create a Decompression error.
    pub fn decompression(msg: impl Into<String>) -> Self {
        Self::Decompression(msg.into())
    }

    /// Create a Fetch error.
    pub fn fetch(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a LocalDecode error.
    pub fn local_decode(msg: impl Into<String>) -> Self {
        Self::LocalDecode(msg.into())
    }
}

impl From<std::io::Error> for VolumeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VolumeError {
    fn from(err: serde_json::Error) -> Self {
        Self::MetadataUnusable(err.to_string())
    }
}

impl From<reqwest::Error> for VolumeError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        Self::Fetch {
            url,
            reason: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for VolumeError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Io(format!("background task failed: {}", err))
    }
}

/// Result type for volume operations.
pub type Result<T> = std::result::Result<T, VolumeError>;
