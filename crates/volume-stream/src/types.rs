//! Core types for volume loading.

use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::VolumeError;
use crate::zarr::DimensionOrder;

/// A continuous coordinate in dataset space, axis order (z, y, x).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FocusPoint {
    pub z: f64,
    pub y: f64,
    pub x: f64,
}

impl FocusPoint {
    /// Create a new focus point.
    pub fn new(z: f64, y: f64, x: f64) -> Self {
        Self { z, y, x }
    }

    /// The origin (0, 0, 0).
    pub fn origin() -> Self {
        Self::default()
    }
}

/// Integer index of one chunk resource, axis order (z, y, x).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChunkCoordinate {
    pub z: i64,
    pub y: i64,
    pub x: i64,
}

impl ChunkCoordinate {
    /// Create a new chunk coordinate.
    pub fn new(z: i64, y: i64, x: i64) -> Self {
        Self { z, y, x }
    }
}

impl fmt::Display for ChunkCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.z, self.y, self.x)
    }
}

/// Fractional position of a focus point inside its chunk, each axis in [0, 1).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChunkRemainder {
    pub z: f64,
    pub y: f64,
    pub x: f64,
}

/// Numeric encoding of one raw sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    UInt8,
    UInt16,
    Int16,
    Float32,
    Float64,
}

impl ElementType {
    /// Size of one sample in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::UInt8 => 1,
            Self::UInt16 | Self::Int16 => 2,
            Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Canonical name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::Int16 => "int16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Map a chunked-array dtype code (e.g. `<f4`, `|u1`) to an element type.
    ///
    /// Only little-endian (`<`) and byte-order-agnostic (`|`) codes are
    /// accepted; anything outside the five supported encodings is `None`.
    pub fn from_zarr_dtype(code: &str) -> Option<Self> {
        let kind = code.strip_prefix('<').or_else(|| code.strip_prefix('|'))?;
        match kind {
            "u1" => Some(Self::UInt8),
            "u2" => Some(Self::UInt16),
            "i2" => Some(Self::Int16),
            "f4" => Some(Self::Float32),
            "f8" => Some(Self::Float64),
            _ => None,
        }
    }
}

impl FromStr for ElementType {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uint8" => Ok(Self::UInt8),
            "uint16" => Ok(Self::UInt16),
            "int16" => Ok(Self::Int16),
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            _ => Err(VolumeError::UnsupportedElementType(s.to_string())),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Width, height and depth of a volume in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VolumeDims {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl VolumeDims {
    /// Create new volume dimensions.
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// A cube with the given edge length.
    pub fn cube(size: usize) -> Self {
        Self::new(size, size, size)
    }

    /// Total number of samples, or `None` if it does not fit in `usize`.
    pub fn voxel_count(&self) -> Option<usize> {
        self.width.checked_mul(self.height)?.checked_mul(self.depth)
    }
}

impl fmt::Display for VolumeDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

/// An immutable description of one volume to load.
///
/// A new request is built for every configuration change and is never
/// mutated once handed to the loader.
///
/// # Example
///
/// ```rust,ignore
/// let request = LoadRequest::new(url, VolumeDims::cube(64))
///     .with_element_type("uint8")
///     .at_level(0)
///     .at_focus(FocusPoint::new(130.0, 70.0, 10.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    /// Locator of the volume.
    pub source: Url,
    /// Requested dimensions.
    pub dims: VolumeDims,
    /// Element type hint, by canonical name.
    pub element_type: String,
    /// Focus point in dataset coordinates.
    pub global_focus: FocusPoint,
    /// Pyramid level; `None` addresses the array root.
    pub level: Option<u32>,
    /// Overrides the dimension order found in the remote metadata.
    pub dimension_order: Option<DimensionOrder>,
    /// Overrides the dimension separator found in the remote metadata.
    pub dimension_separator: Option<String>,
}

impl LoadRequest {
    /// Create a request for `source` with single-byte samples, focused on the origin.
    pub fn new(source: Url, dims: VolumeDims) -> Self {
        Self {
            source,
            dims,
            element_type: ElementType::UInt8.as_str().to_string(),
            global_focus: FocusPoint::origin(),
            level: None,
            dimension_order: None,
            dimension_separator: None,
        }
    }

    /// Set the element type hint.
    pub fn with_element_type(mut self, element_type: impl Into<String>) -> Self {
        self.element_type = element_type.into();
        self
    }

    /// Set the global focus point.
    pub fn at_focus(mut self, focus: FocusPoint) -> Self {
        self.global_focus = focus;
        self
    }

    /// Set the pyramid level.
    pub fn at_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    /// Override the dimension order of remote chunk keys.
    pub fn with_dimension_order(mut self, order: DimensionOrder) -> Self {
        self.dimension_order = Some(order);
        self
    }

    /// Override the separator of remote chunk keys.
    pub fn with_dimension_separator(mut self, separator: impl Into<String>) -> Self {
        self.dimension_separator = Some(separator.into());
        self
    }

    /// The element type hint, if it names a supported type.
    pub fn element_type_hint(&self) -> Option<ElementType> {
        self.element_type.parse().ok()
    }
}

/// Outcome of running one [`LoadRequest`] through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadResult {
    /// Whether the volume was resolved and normalized.
    pub success: bool,
    /// Normalized single-byte samples; empty on failure.
    pub data: Vec<u8>,
    /// Resolved dimensions.
    pub dims: VolumeDims,
    /// Resolved element type of the raw samples, if known.
    pub element_type: Option<ElementType>,
    /// Focus point inside the display box.
    pub local_focus: FocusPoint,
    /// Focus point in dataset coordinates.
    pub global_focus: FocusPoint,
    /// Locator the result originates from.
    pub source: Url,
    /// Diagnostic for a failed load.
    pub error: Option<VolumeError>,
}

impl LoadResult {
    /// A failed result carrying the identifying fields of `request`.
    pub fn failed(request: &LoadRequest, error: VolumeError) -> Self {
        Self {
            success: false,
            data: Vec::new(),
            dims: request.dims,
            element_type: request.element_type_hint(),
            local_focus: FocusPoint::origin(),
            global_focus: request.global_focus,
            source: request.source.clone(),
            error: Some(error),
        }
    }
}
