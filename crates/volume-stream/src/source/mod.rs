//! Volume source dispatch.
//!
//! A locator is classified into one of three kinds of source, each of which
//! produces raw samples, an element type and dimensions. The pipeline then
//! normalizes the samples to one byte each and pads them to the volume size.

mod fetch;
mod nrrd;
mod procedural;
mod remote;

pub use fetch::{Fetcher, HttpFetcher};
pub use nrrd::{DecodedVolume, LocalVolumeDecoder, NrrdDecoder};
pub use procedural::{BuiltinVolume, BUILTIN_SIZE};
pub use remote::local_focus;

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Url;
use tracing::{debug, info, instrument, warn};

use crate::config::LoaderConfig;
use crate::error::{Result, VolumeError};
use crate::normalize::{normalize, pad_to};
use crate::types::{ElementType, FocusPoint, LoadRequest, LoadResult, VolumeDims};

/// The kind of source a locator names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeSource {
    /// One of the reserved procedural locators.
    Builtin(BuiltinVolume),
    /// A file on the local filesystem.
    LocalFile(PathBuf),
    /// The root of a remote chunked array.
    Remote(Url),
}

impl VolumeSource {
    /// Classify a locator. Reserved locators win over the local file rule.
    pub fn classify(url: &Url) -> Result<Self> {
        if let Some(builtin) = BuiltinVolume::from_url(url) {
            return Ok(Self::Builtin(builtin));
        }
        match url.scheme() {
            "file" => url
                .to_file_path()
                .map(Self::LocalFile)
                .map_err(|_| VolumeError::UnsupportedSource(url.to_string())),
            "http" | "https" => Ok(Self::Remote(url.clone())),
            _ => Err(VolumeError::UnsupportedSource(url.to_string())),
        }
    }
}

/// Raw samples produced by a source, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawVolume {
    pub data: Vec<u8>,
    /// `None` when the source's encoding is not one of the supported types.
    pub element_type: Option<ElementType>,
    pub dims: VolumeDims,
    pub local_focus: FocusPoint,
}

/// Resolves [`LoadRequest`]s into [`LoadResult`]s.
///
/// The pipeline holds no per-request state; any number of loads may share it.
#[derive(Clone)]
pub struct VolumePipeline {
    config: LoaderConfig,
    fetcher: Arc<dyn Fetcher>,
    decoder: Arc<dyn LocalVolumeDecoder>,
}

impl VolumePipeline {
    /// Create a pipeline using HTTP for remote arrays and NRRD for local files.
    pub fn new(config: LoaderConfig) -> Result<Self> {
        config.validate().map_err(VolumeError::Config)?;
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_collaborators(
            config,
            Arc::new(fetcher),
            Arc::new(NrrdDecoder),
        ))
    }

    /// Create a pipeline with explicit fetcher and local decoder.
    pub fn with_collaborators(
        config: LoaderConfig,
        fetcher: Arc<dyn Fetcher>,
        decoder: Arc<dyn LocalVolumeDecoder>,
    ) -> Self {
        Self {
            config,
            fetcher,
            decoder,
        }
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Run `request` to completion. Failures are reported in the result,
    /// never as a panic or an `Err`.
    #[instrument(skip(self, request), fields(source = %request.source, dims = %request.dims))]
    pub async fn load(&self, request: &LoadRequest) -> LoadResult {
        match self.try_load(request).await {
            Ok(result) => {
                info!(
                    element_type = ?result.element_type,
                    bytes = result.data.len(),
                    "Volume loaded"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "Volume load failed");
                LoadResult::failed(request, e)
            }
        }
    }

    async fn try_load(&self, request: &LoadRequest) -> Result<LoadResult> {
        let RawVolume {
            data,
            element_type,
            dims,
            local_focus,
        } = self.resolve(request).await?;

        let limit = self.config.max_volume_bytes;
        let expected = dims
            .voxel_count()
            .filter(|&n| n <= limit)
            .ok_or_else(|| {
                VolumeError::VolumeTooLarge(format!("{} exceeds the {} byte limit", dims, limit))
            })?;

        let flat_fill = self.config.flat_fill;
        let data = tokio::task::spawn_blocking(move || {
            pad_to(normalize(data, element_type, flat_fill), expected)
        })
        .await?;

        Ok(LoadResult {
            success: true,
            data,
            dims,
            element_type,
            local_focus,
            global_focus: request.global_focus,
            source: request.source.clone(),
            error: None,
        })
    }

    /// Produce the raw samples for `request` from whichever source it names.
    pub async fn resolve(&self, request: &LoadRequest) -> Result<RawVolume> {
        match VolumeSource::classify(&request.source)? {
            VolumeSource::Builtin(builtin) => {
                debug!(volume = ?builtin, "Generating built-in volume");
                let data = tokio::task::spawn_blocking(move || builtin.generate()).await?;
                Ok(RawVolume {
                    data,
                    element_type: Some(ElementType::UInt8),
                    dims: request.dims,
                    local_focus: FocusPoint::origin(),
                })
            }
            VolumeSource::LocalFile(path) => self.resolve_local(path, request).await,
            VolumeSource::Remote(base) => self.resolve_remote(&base, request).await,
        }
    }

    async fn resolve_local(&self, path: PathBuf, request: &LoadRequest) -> Result<RawVolume> {
        debug!(path = %path.display(), "Reading local volume");
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            VolumeError::Io(format!("failed to read {}: {}", path.display(), e))
        })?;

        let decoder = Arc::clone(&self.decoder);
        let decoded = tokio::task::spawn_blocking(move || decoder.decode(&bytes)).await??;

        let element_type = decoded.element_type.or_else(|| request.element_type_hint());
        Ok(RawVolume {
            data: decoded.data,
            element_type,
            dims: request.dims,
            local_focus: FocusPoint::origin(),
        })
    }
}

impl std::fmt::Debug for VolumePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumePipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let helix = Url::parse("file:///default_helix").unwrap();
        assert_eq!(
            VolumeSource::classify(&helix).unwrap(),
            VolumeSource::Builtin(BuiltinVolume::Helix)
        );

        let local = Url::parse("file:///data/brain.nrrd").unwrap();
        assert_eq!(
            VolumeSource::classify(&local).unwrap(),
            VolumeSource::LocalFile(PathBuf::from("/data/brain.nrrd"))
        );

        let remote = Url::parse("https://example.org/scroll.zarr").unwrap();
        assert_eq!(
            VolumeSource::classify(&remote).unwrap(),
            VolumeSource::Remote(remote.clone())
        );

        let ftp = Url::parse("ftp://example.org/volume").unwrap();
        assert!(matches!(
            VolumeSource::classify(&ftp),
            Err(VolumeError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn test_pipeline_validates_config() {
        let config = LoaderConfig {
            blosc_threads: 0,
            ..Default::default()
        };
        let err = tokio_test::assert_err!(VolumePipeline::new(config));
        assert!(matches!(err, VolumeError::Config(_)));

        let pipeline = tokio_test::assert_ok!(VolumePipeline::new(LoaderConfig::default()));
        assert_eq!(pipeline.config().flat_fill, 128);
    }

    #[test]
    fn test_builtin_resolves_without_io() {
        let pipeline = VolumePipeline::new(LoaderConfig::default()).unwrap();
        let request = LoadRequest::new(BuiltinVolume::Colormap.url(), VolumeDims::cube(8));
        let raw = tokio_test::block_on(pipeline.resolve(&request)).unwrap();
        assert_eq!(raw.element_type, Some(ElementType::UInt8));
        assert_eq!(raw.dims, VolumeDims::cube(8));
        assert_eq!(raw.data.len(), BUILTIN_SIZE.pow(3));
    }
}
