//! Streaming loader for 3D volumes.
//!
//! Volumes come from three kinds of source, selected by locator:
//!
//! - **Built-in**: `file:///default_helix`, `file:///default_box` and
//!   `file:///default_colormap` generate fixed 256³ test volumes
//! - **Local files**: any other `file:` URL is read and decoded as NRRD
//! - **Remote arrays**: `http(s)` URLs name the root of a Zarr-style chunked
//!   array; only the chunk containing the focus point is fetched
//!
//! Every source ends as one byte per sample, rescaled from wider types
//! where needed.
//!
//! # Architecture
//!
//! ```text
//! VolumeLoader::request_load(request)
//!      │
//!      ▼
//! Driver (LoadStateMachine)
//!      │
//!      ├─► Idle: launch one task ─────────────┐
//!      │                                      │
//!      └─► Loading: keep as pending           ▼
//!                                     VolumePipeline::load
//!                                             │
//!                                             ├─► VolumeSource::classify
//!                                             │      ├─► BuiltinVolume::generate
//!                                             │      ├─► LocalVolumeDecoder
//!                                             │      └─► metadata ─► nearest chunk
//!                                             │            ─► fetch ─► decode_chunk
//!                                             │
//!                                             └─► normalize ─► pad_to
//!                                                    │
//!      ┌─────────────── completion ◄─────────────────┘
//!      ▼
//! Pending? discard and rerun newest : publish + LoadEvent
//! ```
//!
//! # Example
//!
//! ```ignore
//! use volume_stream::{LoadRequest, LoaderConfig, VolumeDims, VolumeLoader, VolumePipeline};
//!
//! let pipeline = VolumePipeline::new(LoaderConfig::from_env())?;
//! let loader = VolumeLoader::new(pipeline);
//! let mut events = loader.subscribe();
//!
//! let url = "https://example.org/scroll.zarr".parse()?;
//! loader.request_load(LoadRequest::new(url, VolumeDims::cube(64)).at_level(0))?;
//! let event = events.recv().await?;
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod normalize;
pub mod source;
pub mod types;
pub mod zarr;

// Re-export commonly used types at crate root
pub use config::LoaderConfig;
pub use error::{Result, VolumeError};
pub use loader::{LoadEvent, LoadStateMachine, LoaderStats, LoaderStatus, VolumeLoader};
pub use normalize::{normalize, pad_to};
pub use source::{
    BuiltinVolume, Fetcher, HttpFetcher, LocalVolumeDecoder, NrrdDecoder, VolumePipeline,
    VolumeSource, BUILTIN_SIZE,
};
pub use types::{
    ChunkCoordinate, ChunkRemainder, ElementType, FocusPoint, LoadRequest, LoadResult, VolumeDims,
};
pub use zarr::{ArrayMetadata, ChunkAddressor, DimensionOrder};

pub use reqwest::Url;
