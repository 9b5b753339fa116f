//! Common test fixtures for volume-stream tests.
//!
//! Builders for chunked-array metadata documents and NRRD files, plus
//! pre-defined locators and scenarios.

use std::io::Write;

use serde_json::{json, Map, Value};
use tempfile::NamedTempFile;

/// Reserved and example locators.
pub mod locators {
    pub const HELIX: &str = "file:///default_helix";
    pub const BOX: &str = "file:///default_box";
    pub const COLORMAP: &str = "file:///default_colormap";

    /// Base of a remote array used by mock fetchers.
    pub const REMOTE_BASE: &str = "https://data.example.org/scroll.zarr";
}

/// The 512³ array with 64³ chunks used throughout the addressing tests.
pub mod scenario {
    pub const SHAPE: [u64; 3] = [512, 512, 512];
    pub const CHUNKS: [u64; 3] = [64, 64, 64];

    /// Focus (z, y, x) and the chunk it falls in.
    pub const FOCUS: (f64, f64, f64) = (130.0, 70.0, 10.0);
    pub const NEAREST_CHUNK: (i64, i64, i64) = (2, 1, 0);
    pub const REMAINDER: (f64, f64, f64) = (0.03125, 0.09375, 0.15625);

    /// Chunk path segment at level 0 with the version 2 separator.
    pub const CHUNK_PATH: &str = "/0/2.1.0";
}

/// Builds a `.zarray` metadata document.
///
/// # Example
///
/// ```
/// use test_utils::ZarrayBuilder;
///
/// let json = ZarrayBuilder::new([512, 512, 512], [64, 64, 64])
///     .dtype("<u2")
///     .compressor("blosc")
///     .build();
/// assert_eq!(json["zarr_format"], 2);
/// assert_eq!(json["compressor"]["id"], "blosc");
/// ```
#[derive(Debug, Clone)]
pub struct ZarrayBuilder {
    zarr_format: Option<i64>,
    shape: Value,
    chunks: Value,
    dtype: String,
    order: String,
    compressor: Option<String>,
    dimension_separator: Option<String>,
    extra: Map<String, Value>,
}

impl ZarrayBuilder {
    /// Version 2, `|u1`, order `C`, uncompressed.
    pub fn new(shape: [u64; 3], chunks: [u64; 3]) -> Self {
        Self {
            zarr_format: Some(2),
            shape: json!(shape),
            chunks: json!(chunks),
            dtype: "|u1".to_string(),
            order: "C".to_string(),
            compressor: None,
            dimension_separator: None,
            extra: Map::new(),
        }
    }

    pub fn zarr_format(mut self, version: i64) -> Self {
        self.zarr_format = Some(version);
        self
    }

    pub fn without_zarr_format(mut self) -> Self {
        self.zarr_format = None;
        self
    }

    pub fn dtype(mut self, dtype: &str) -> Self {
        self.dtype = dtype.to_string();
        self
    }

    pub fn order(mut self, order: &str) -> Self {
        self.order = order.to_string();
        self
    }

    /// Compressor id. Left unset, the document has `"compressor": null`.
    pub fn compressor(mut self, id: &str) -> Self {
        self.compressor = Some(id.to_string());
        self
    }

    pub fn dimension_separator(mut self, separator: &str) -> Self {
        self.dimension_separator = Some(separator.to_string());
        self
    }

    /// Replace the chunks field with an arbitrary value.
    pub fn raw_chunks(mut self, chunks: Value) -> Self {
        self.chunks = chunks;
        self
    }

    /// Add or replace any other top-level field.
    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    pub fn build(&self) -> Value {
        let mut obj = Map::new();
        if let Some(version) = self.zarr_format {
            obj.insert("zarr_format".into(), json!(version));
        }
        obj.insert("shape".into(), self.shape.clone());
        obj.insert("chunks".into(), self.chunks.clone());
        obj.insert("dtype".into(), json!(self.dtype));
        obj.insert("order".into(), json!(self.order));
        obj.insert("fill_value".into(), json!(0));
        obj.insert(
            "compressor".into(),
            match &self.compressor {
                Some(id) => json!({ "id": id }),
                None => Value::Null,
            },
        );
        if let Some(sep) = &self.dimension_separator {
            obj.insert("dimension_separator".into(), json!(sep));
        }
        for (key, value) in &self.extra {
            obj.insert(key.clone(), value.clone());
        }
        Value::Object(obj)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.build()).expect("serialize metadata")
    }
}

/// Builds an NRRD file with attached data.
///
/// # Example
///
/// ```
/// use test_utils::NrrdBuilder;
///
/// let bytes = NrrdBuilder::new("uchar", &[2, 2, 2]).payload(vec![0; 8]).build();
/// assert!(bytes.starts_with(b"NRRD0004\n"));
/// ```
#[derive(Debug, Clone)]
pub struct NrrdBuilder {
    type_name: String,
    sizes: Vec<usize>,
    encoding: String,
    endian: Option<String>,
    payload: Vec<u8>,
}

impl NrrdBuilder {
    pub fn new(type_name: &str, sizes: &[usize]) -> Self {
        Self {
            type_name: type_name.to_string(),
            sizes: sizes.to_vec(),
            encoding: "raw".to_string(),
            endian: None,
            payload: Vec::new(),
        }
    }

    /// Encoding name written to the header. The payload is not transformed.
    pub fn encoding(mut self, encoding: &str) -> Self {
        self.encoding = encoding.to_string();
        self
    }

    pub fn endian(mut self, endian: &str) -> Self {
        self.endian = Some(endian.to_string());
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let sizes: Vec<String> = self.sizes.iter().map(|s| s.to_string()).collect();
        let mut header = format!(
            "NRRD0004\n# generated test volume\ntype: {}\ndimension: {}\nsizes: {}\nencoding: {}\n",
            self.type_name,
            self.sizes.len(),
            sizes.join(" "),
            self.encoding
        );
        if let Some(endian) = &self.endian {
            header.push_str(&format!("endian: {}\n", endian));
        }
        header.push('\n');

        let mut bytes = header.into_bytes();
        bytes.extend_from_slice(&self.payload);
        bytes
    }
}

/// Write `bytes` to a fresh temporary file. The file lives as long as the
/// returned handle.
pub fn write_temp_file(bytes: &[u8], suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(bytes).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zarray_defaults() {
        let json = ZarrayBuilder::new(scenario::SHAPE, scenario::CHUNKS).build();
        assert_eq!(json["zarr_format"], 2);
        assert_eq!(json["chunks"], json!([64, 64, 64]));
        assert_eq!(json["dtype"], "|u1");
        assert!(json["compressor"].is_null());
        assert!(json.get("dimension_separator").is_none());
    }

    #[test]
    fn test_zarray_overrides() {
        let json = ZarrayBuilder::new([1, 1, 1], [1, 1, 1])
            .without_zarr_format()
            .order("yxz")
            .dimension_separator("/")
            .raw_chunks(json!([1, 1]))
            .field("compression", json!("none"))
            .build();
        assert!(json.get("zarr_format").is_none());
        assert_eq!(json["order"], "yxz");
        assert_eq!(json["dimension_separator"], "/");
        assert_eq!(json["chunks"], json!([1, 1]));
        assert_eq!(json["compression"], "none");
    }

    #[test]
    fn test_nrrd_builder_layout() {
        let bytes = NrrdBuilder::new("float", &[3])
            .endian("little")
            .payload(vec![1, 2, 3])
            .build();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("sizes: 3\n"));
        assert!(text.contains("endian: little\n\n"));
        assert!(bytes.ends_with(&[1, 2, 3]));
    }

    #[test]
    fn test_write_temp_file() {
        let file = write_temp_file(b"NRRD", ".nrrd");
        assert_eq!(std::fs::read(file.path()).unwrap(), b"NRRD");
        assert!(file.path().to_string_lossy().ends_with(".nrrd"));
    }
}
