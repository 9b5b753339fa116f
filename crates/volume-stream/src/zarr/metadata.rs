//! Chunked-array metadata model.
//!
//! Parsing is lenient: every field is optional and a missing or malformed
//! field keeps its default instead of failing the whole document.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::types::ElementType;

/// Order in which the per-axis chunk indices appear in a chunk key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DimensionOrder {
    /// Row-major: `z, y, x`.
    #[default]
    C,
    /// Non-standard `y, x, z` ordering used by some hosted datasets.
    Yxz,
}

impl DimensionOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::C => "C",
            Self::Yxz => "yxz",
        }
    }
}

impl FromStr for DimensionOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C" => Ok(Self::C),
            "yxz" => Ok(Self::Yxz),
            other => Err(format!("unknown dimension order '{}'", other)),
        }
    }
}

impl fmt::Display for DimensionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `compressor` object of the metadata.
///
/// Only `id` drives decoding; the blosc parameters are kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompressorConfig {
    /// Codec identifier, empty when chunks are stored uncompressed.
    pub id: String,
    pub cname: Option<String>,
    pub clevel: Option<i64>,
    pub shuffle: Option<i64>,
    pub blocksize: Option<i64>,
}

/// Descriptive attributes of a chunked 3D array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayMetadata {
    /// Format version, `-1` when the document carried none.
    pub format_version: i64,
    /// Array shape (z, y, x).
    pub shape: [u64; 3],
    /// Chunk shape (z, y, x).
    pub chunks: [u64; 3],
    /// Element type code, e.g. `<f4`.
    pub dtype: String,
    /// Chunk key ordering.
    pub order: DimensionOrder,
    /// Separator joining chunk indices in a key.
    pub dimension_separator: String,
    /// Chunk compressor.
    pub compressor: CompressorConfig,
    /// Legacy `compression` field, informational only.
    pub compression: Option<String>,
}

impl Default for ArrayMetadata {
    fn default() -> Self {
        Self {
            format_version: -1,
            shape: [0; 3],
            chunks: [0; 3],
            dtype: String::new(),
            order: DimensionOrder::C,
            dimension_separator: ".".to_string(),
            compressor: CompressorConfig::default(),
            compression: None,
        }
    }
}

impl ArrayMetadata {
    /// Parse metadata from raw bytes.
    ///
    /// Bytes that are not a JSON object yield the default (invalid) metadata.
    pub fn from_slice(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => Self::from_json(&value),
            Err(e) => {
                warn!(error = %e, "Array metadata is not valid JSON");
                Self::default()
            }
        }
    }

    /// Parse metadata from a JSON value, field by field.
    pub fn from_json(json: &Value) -> Self {
        let mut meta = Self::default();

        let Some(obj) = json.as_object() else {
            warn!("Array metadata is not a JSON object");
            return meta;
        };

        if let Some(version) = obj.get("zarr_format").and_then(Value::as_i64) {
            meta.format_version = version;
        }

        // Version 3 defaults to nested chunk keys.
        meta.dimension_separator = if meta.format_version == 3 { "/" } else { "." }.to_string();

        if let Some(sep) = obj.get("dimension_separator").and_then(Value::as_str) {
            meta.dimension_separator = sep.to_string();
        }

        if let Some(shape) = obj.get("shape").and_then(parse_triplet) {
            meta.shape = shape;
        }

        if let Some(chunks) = obj.get("chunks").and_then(parse_triplet) {
            meta.chunks = chunks;
        }

        if let Some(dtype) = obj.get("dtype").and_then(Value::as_str) {
            meta.dtype = dtype.to_string();
        }

        if let Some(order) = obj.get("order").and_then(Value::as_str) {
            match order.parse() {
                Ok(order) => meta.order = order,
                Err(e) => warn!(error = %e, "Keeping default dimension order"),
            }
        }

        if let Some(compression) = obj.get("compression").and_then(Value::as_str) {
            meta.compression = Some(compression.to_string());
        }

        if let Some(compressor) = obj.get("compressor").and_then(Value::as_object) {
            meta.compressor = CompressorConfig {
                id: compressor
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                cname: compressor
                    .get("cname")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                clevel: compressor.get("clevel").and_then(Value::as_i64),
                shuffle: compressor.get("shuffle").and_then(Value::as_i64),
                blocksize: compressor.get("blocksize").and_then(Value::as_i64),
            };
        }

        meta
    }

    /// The compressor id, empty when chunks are uncompressed.
    pub fn compressor_id(&self) -> &str {
        &self.compressor.id
    }

    /// Whether every chunk dimension is non-zero, i.e. the metadata can be
    /// used for chunk addressing.
    pub fn is_usable(&self) -> bool {
        self.chunks.iter().all(|&c| c > 0)
    }

    /// The element type named by `dtype`, if it is one of the supported codes.
    pub fn element_type(&self) -> Option<ElementType> {
        ElementType::from_zarr_dtype(&self.dtype)
    }

    /// Number of chunks along each axis (z, y, x).
    pub fn chunk_grid_shape(&self) -> [u64; 3] {
        let mut grid = [0; 3];
        for axis in 0..3 {
            if self.chunks[axis] > 0 {
                grid[axis] = self.shape[axis].div_ceil(self.chunks[axis]);
            }
        }
        grid
    }
}

/// Parse a JSON array of exactly three non-negative integers.
fn parse_triplet(value: &Value) -> Option<[u64; 3]> {
    let arr = value.as_array()?;
    if arr.len() != 3 {
        return None;
    }
    Some([arr[0].as_u64()?, arr[1].as_u64()?, arr[2].as_u64()?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_document() {
        let meta = ArrayMetadata::from_json(&json!({
            "zarr_format": 2,
            "shape": [512, 512, 512],
            "chunks": [64, 64, 64],
            "dtype": "|u1",
            "order": "C",
            "compressor": {"id": "blosc", "cname": "lz4", "clevel": 5, "shuffle": 1, "blocksize": 0},
            "fill_value": 0
        }));

        assert_eq!(meta.format_version, 2);
        assert_eq!(meta.shape, [512, 512, 512]);
        assert_eq!(meta.chunks, [64, 64, 64]);
        assert_eq!(meta.dtype, "|u1");
        assert_eq!(meta.order, DimensionOrder::C);
        assert_eq!(meta.dimension_separator, ".");
        assert_eq!(meta.compressor_id(), "blosc");
        assert_eq!(meta.compressor.cname.as_deref(), Some("lz4"));
        assert_eq!(meta.compressor.clevel, Some(5));
        assert_eq!(meta.element_type(), Some(ElementType::UInt8));
        assert_eq!(meta.chunk_grid_shape(), [8, 8, 8]);
        assert!(meta.is_usable());
    }

    #[test]
    fn test_separator_defaults_follow_version() {
        let v2 = ArrayMetadata::from_json(&json!({"zarr_format": 2}));
        assert_eq!(v2.dimension_separator, ".");

        let v3 = ArrayMetadata::from_json(&json!({"zarr_format": 3}));
        assert_eq!(v3.dimension_separator, "/");

        let unset = ArrayMetadata::from_json(&json!({}));
        assert_eq!(unset.format_version, -1);
        assert_eq!(unset.dimension_separator, ".");

        let explicit = ArrayMetadata::from_json(&json!({
            "zarr_format": 3,
            "dimension_separator": "."
        }));
        assert_eq!(explicit.dimension_separator, ".");
    }

    #[test]
    fn test_malformed_fields_keep_defaults() {
        let meta = ArrayMetadata::from_json(&json!({
            "zarr_format": "two",
            "shape": [512, 512],
            "chunks": [64, -1, 64],
            "dtype": 4,
            "order": "F",
            "compressor": null
        }));

        assert_eq!(meta.format_version, -1);
        assert_eq!(meta.shape, [0, 0, 0]);
        assert_eq!(meta.chunks, [0, 0, 0]);
        assert_eq!(meta.dtype, "");
        assert_eq!(meta.order, DimensionOrder::C);
        assert_eq!(meta.compressor_id(), "");
        assert!(!meta.is_usable());
    }

    #[test]
    fn test_invalid_json_degrades_to_default() {
        let meta = ArrayMetadata::from_slice(b"<html>not found</html>");
        assert_eq!(meta, ArrayMetadata::default());

        let meta = ArrayMetadata::from_slice(b"[1, 2, 3]");
        assert_eq!(meta, ArrayMetadata::default());
    }

    #[test]
    fn test_nonstandard_order_and_unknown_compressor() {
        let meta = ArrayMetadata::from_json(&json!({
            "zarr_format": 2,
            "chunks": [8, 8, 8],
            "order": "yxz",
            "compressor": {"id": "zstd", "level": 3}
        }));

        assert_eq!(meta.order, DimensionOrder::Yxz);
        assert_eq!(meta.compressor_id(), "zstd");
        assert!(meta.is_usable());
    }

    #[test]
    fn test_legacy_compression_field() {
        let meta = ArrayMetadata::from_json(&json!({"compression": "blosc"}));
        assert_eq!(meta.compression.as_deref(), Some("blosc"));
        assert_eq!(meta.compressor_id(), "");
    }
}
