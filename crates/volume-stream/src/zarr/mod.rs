//! Chunked-array support: metadata, addressing and chunk decoding.

mod addressing;
mod codec;
mod metadata;

pub use addressing::{metadata_url, ChunkAddressor};
pub use codec::{decode_chunk, ChunkCodec};
pub(crate) use codec::read_at_most;
pub use metadata::{ArrayMetadata, CompressorConfig, DimensionOrder};
