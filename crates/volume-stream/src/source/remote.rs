//! Remote chunked-array source: one chunk around the focus point.

use reqwest::Url;
use tracing::{debug, instrument, warn};

use crate::error::{Result, VolumeError};
use crate::types::{ChunkRemainder, FocusPoint, LoadRequest, VolumeDims};
use crate::zarr::{metadata_url, ArrayMetadata, ChunkAddressor};

use super::{RawVolume, VolumePipeline};

/// Map a chunk remainder into the symmetric display box of half extent `half`.
pub fn local_focus(remainder: ChunkRemainder, half: f64) -> FocusPoint {
    FocusPoint::new(
        2.0 * half * remainder.z - half,
        2.0 * half * remainder.y - half,
        2.0 * half * remainder.x - half,
    )
}

impl VolumePipeline {
    /// Fetch the array metadata for `request`, with the request's overrides applied.
    pub async fn fetch_metadata(&self, base: &Url, request: &LoadRequest) -> Result<ArrayMetadata> {
        let url = metadata_url(base, request.level, &self.config.metadata_filename)?;
        let bytes = self.fetcher.fetch(&url).await?;

        let mut metadata = ArrayMetadata::from_slice(&bytes);
        if let Some(order) = request.dimension_order {
            metadata.order = order;
        }
        if let Some(separator) = &request.dimension_separator {
            metadata.dimension_separator = separator.clone();
        }
        Ok(metadata)
    }

    #[instrument(skip(self, request), fields(level = ?request.level))]
    pub(super) async fn resolve_remote(&self, base: &Url, request: &LoadRequest) -> Result<RawVolume> {
        let metadata = self.fetch_metadata(base, request).await?;
        if !metadata.is_usable() {
            warn!(chunks = ?metadata.chunks, "Metadata unusable");
            return Err(VolumeError::metadata_unusable(format!(
                "chunk shape {:?} has a zero dimension",
                metadata.chunks
            )));
        }

        let element_type = metadata.element_type();
        if element_type.is_none() {
            warn!(dtype = %metadata.dtype, "Unsupported element type, treating samples as uint8");
        }

        let [cz, cy, cx] = metadata.chunks;
        let addressor = ChunkAddressor::new(base.clone(), metadata);

        let chunk_bytes = addressor.chunk_byte_size().map_err(|e| {
            warn!(chunks = ?[cz, cy, cx], "Chunk size overflows");
            e
        })?;
        let limit = self.config.max_volume_bytes;
        if chunk_bytes > limit {
            warn!(chunks = ?[cz, cy, cx], chunk_bytes, limit, "Chunk exceeds volume size limit");
            return Err(VolumeError::metadata_unusable(format!(
                "chunk of {} bytes exceeds the {} byte limit",
                chunk_bytes, limit
            )));
        }
        // Every axis fits in usize once the byte size does.
        let dims = VolumeDims::new(cx as usize, cy as usize, cz as usize);
        let coord = addressor.nearest_chunk(request.global_focus)?;
        let remainder = addressor.nearest_chunk_remainder(request.global_focus)?;
        let local_focus = local_focus(remainder, f64::from(self.config.box_half_extent));

        let chunk_url = addressor.chunk_url(request.level, coord)?;
        debug!(chunk = %coord, url = %chunk_url, "Nearest chunk");
        let encoded = self.fetcher.fetch(&chunk_url).await?;

        let threads = self.config.blosc_threads;
        let data =
            tokio::task::spawn_blocking(move || addressor.decode_chunk(&encoded, threads)).await??;

        Ok(RawVolume {
            data,
            element_type,
            dims,
            local_focus,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_focus_maps_into_box() {
        let centre = local_focus(
            ChunkRemainder {
                z: 0.5,
                y: 0.5,
                x: 0.5,
            },
            50.0,
        );
        assert_eq!(centre, FocusPoint::new(0.0, 0.0, 0.0));

        let corner = local_focus(ChunkRemainder::default(), 50.0);
        assert_eq!(corner, FocusPoint::new(-50.0, -50.0, -50.0));

        let p = local_focus(
            ChunkRemainder {
                z: 0.03125,
                y: 0.09375,
                x: 0.15625,
            },
            50.0,
        );
        assert!((p.z - -46.875).abs() < 1e-9);
        assert!((p.y - -40.625).abs() < 1e-9);
        assert!((p.x - -34.375).abs() < 1e-9);
    }
}
