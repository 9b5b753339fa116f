//! Resource locators and chunk selection for a chunked array.
//!
//! ```text
//! <base>[/<level>]/<metadata filename>
//! <base>[/<level>]/<c0><sep><c1><sep><c2>
//! ```

use reqwest::Url;

use crate::error::{Result, VolumeError};
use crate::types::{ChunkCoordinate, ChunkRemainder, FocusPoint};

use super::metadata::{ArrayMetadata, DimensionOrder};

/// Build the metadata locator of the array at `base`, optionally below a
/// pyramid level directory.
pub fn metadata_url(base: &Url, level: Option<u32>, filename: &str) -> Result<Url> {
    let mut path = base_path(base);
    if let Some(level) = level {
        path.push_str(&format!("/{}", level));
    }
    path.push('/');
    path.push_str(filename);
    resolve(base, &path)
}

/// Computes chunk locators and chunk selection for one array.
#[derive(Debug, Clone)]
pub struct ChunkAddressor {
    base: Url,
    metadata: ArrayMetadata,
}

impl ChunkAddressor {
    /// Create an addressor for the array at `base` described by `metadata`.
    pub fn new(base: Url, metadata: ArrayMetadata) -> Self {
        Self { base, metadata }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn metadata(&self) -> &ArrayMetadata {
        &self.metadata
    }

    /// Metadata locator for `level` under this addressor's base.
    pub fn metadata_url(&self, level: Option<u32>, filename: &str) -> Result<Url> {
        metadata_url(&self.base, level, filename)
    }

    /// Chunk key of `coord`: indices ordered per the dimension order and
    /// joined with the dimension separator.
    pub fn chunk_key(&self, coord: ChunkCoordinate) -> String {
        let ordered = match self.metadata.order {
            DimensionOrder::C => [coord.z, coord.y, coord.x],
            DimensionOrder::Yxz => [coord.y, coord.x, coord.z],
        };
        ordered
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(&self.metadata.dimension_separator)
    }

    /// Parse a chunk key produced by [`chunk_key`](Self::chunk_key) back into
    /// a coordinate under the same order and separator.
    pub fn parse_chunk_key(&self, key: &str) -> Result<ChunkCoordinate> {
        let key = key.trim_start_matches('/');
        let separator = &self.metadata.dimension_separator;
        if separator.is_empty() {
            return Err(VolumeError::InvalidChunkKey(format!(
                "empty dimension separator, cannot split '{}'",
                key
            )));
        }

        let parts = key
            .split(separator.as_str())
            .map(|part| {
                part.parse::<i64>()
                    .map_err(|_| VolumeError::InvalidChunkKey(key.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let [a, b, c]: [i64; 3] = parts
            .try_into()
            .map_err(|_| VolumeError::InvalidChunkKey(key.to_string()))?;

        Ok(match self.metadata.order {
            DimensionOrder::C => ChunkCoordinate::new(a, b, c),
            DimensionOrder::Yxz => ChunkCoordinate::new(c, a, b),
        })
    }

    /// Locator of the chunk at `coord` for `level`.
    pub fn chunk_url(&self, level: Option<u32>, coord: ChunkCoordinate) -> Result<Url> {
        let mut path = base_path(&self.base);
        if let Some(level) = level {
            path.push_str(&format!("/{}", level));
        }
        path.push('/');
        path.push_str(&self.chunk_key(coord));
        resolve(&self.base, &path)
    }

    /// Index of the chunk containing `focus`: floor(focus / chunks) per axis.
    pub fn nearest_chunk(&self, focus: FocusPoint) -> Result<ChunkCoordinate> {
        let [cz, cy, cx] = self.usable_chunks()?;
        Ok(ChunkCoordinate::new(
            (focus.z / cz).floor() as i64,
            (focus.y / cy).floor() as i64,
            (focus.x / cx).floor() as i64,
        ))
    }

    /// Fractional position of `focus` inside its chunk, each axis in [0, 1).
    ///
    /// A fraction that rounds up to 1.0 is clamped just below it, so there
    /// `focus / chunks == chunk + remainder` holds only approximately.
    pub fn nearest_chunk_remainder(&self, focus: FocusPoint) -> Result<ChunkRemainder> {
        let [cz, cy, cx] = self.usable_chunks()?;
        Ok(ChunkRemainder {
            z: fraction(focus.z / cz),
            y: fraction(focus.y / cy),
            x: fraction(focus.x / cx),
        })
    }

    /// Size in bytes of one decoded chunk.
    ///
    /// Uses the element size of the metadata dtype, or one byte when the
    /// dtype is not a supported code. A chunk shape whose size does not fit
    /// in `usize` is unusable.
    pub fn chunk_byte_size(&self) -> Result<usize> {
        let element_size = self
            .metadata
            .element_type()
            .map(|t| t.size_bytes())
            .unwrap_or(1);
        self.metadata
            .chunks
            .iter()
            .try_fold(element_size, |acc, &c| {
                usize::try_from(c).ok().and_then(|c| acc.checked_mul(c))
            })
            .ok_or_else(|| {
                VolumeError::metadata_unusable(format!(
                    "chunk shape {:?} overflows the addressable size",
                    self.metadata.chunks
                ))
            })
    }

    /// Decode a fetched chunk of this array with the codec its metadata names.
    pub fn decode_chunk(&self, data: &[u8], blosc_threads: usize) -> Result<Vec<u8>> {
        super::codec::decode_chunk(
            data,
            self.metadata.compressor_id(),
            self.chunk_byte_size()?,
            blosc_threads,
        )
    }

    fn usable_chunks(&self) -> Result<[f64; 3]> {
        if !self.metadata.is_usable() {
            return Err(VolumeError::metadata_unusable(format!(
                "chunk shape {:?} has a zero dimension",
                self.metadata.chunks
            )));
        }
        let [cz, cy, cx] = self.metadata.chunks;
        Ok([cz as f64, cy as f64, cx as f64])
    }
}

/// `q - floor(q)`, kept strictly below 1.0 where rounding would reach it.
fn fraction(q: f64) -> f64 {
    (q - q.floor()).min(1.0 - f64::EPSILON)
}

fn base_path(base: &Url) -> String {
    base.path().trim_end_matches('/').to_string()
}

fn resolve(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|e| VolumeError::UnsupportedSource(format!("{}: {}", base, e)))
}
