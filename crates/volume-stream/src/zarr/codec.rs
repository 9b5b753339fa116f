//! Chunk decompression.

use std::borrow::Cow;
use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};
use tracing::{debug, warn};
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::codec::{BytesToBytesCodecTraits, CodecOptionsBuilder};
use zarrs::array::BytesRepresentation;

use crate::error::{Result, VolumeError};

/// Length of the header that starts every blosc buffer.
const BLOSC_HEADER_LEN: usize = 16;

/// Codecs a chunk can be stored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkCodec {
    /// Stored uncompressed.
    Raw,
    Blosc,
    Gzip,
    Zlib,
}

impl ChunkCodec {
    /// Look up a codec by compressor id. An empty id means no compression.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "" => Some(Self::Raw),
            "blosc" => Some(Self::Blosc),
            "gzip" => Some(Self::Gzip),
            "zlib" => Some(Self::Zlib),
            _ => None,
        }
    }
}

/// Decode a fetched chunk according to `compressor_id`.
///
/// `max_decoded_size` bounds the decompressed output; a chunk that would
/// exceed it is rejected rather than truncated.
pub fn decode_chunk(
    data: &[u8],
    compressor_id: &str,
    max_decoded_size: usize,
    blosc_threads: usize,
) -> Result<Vec<u8>> {
    let codec = ChunkCodec::from_id(compressor_id).ok_or_else(|| {
        warn!(compressor = %compressor_id, "Compressor not available");
        VolumeError::unsupported_compressor(compressor_id)
    })?;

    let decoded = match codec {
        ChunkCodec::Raw => Ok(data.to_vec()),
        ChunkCodec::Blosc => blosc_decompress(data, max_decoded_size, blosc_threads),
        ChunkCodec::Gzip => read_bounded(GzDecoder::new(data), max_decoded_size),
        ChunkCodec::Zlib => read_bounded(ZlibDecoder::new(data), max_decoded_size),
    };

    match decoded {
        Ok(bytes) => {
            debug!(
                codec = ?codec,
                encoded = data.len(),
                decoded = bytes.len(),
                "Decoded chunk"
            );
            Ok(bytes)
        }
        Err(e) => {
            warn!(codec = ?codec, error = %e, "Chunk decompression failed");
            Err(e)
        }
    }
}

/// Decompressed size recorded in a blosc header, if the header is plausible
/// for a buffer of this length.
fn blosc_decoded_size(src: &[u8]) -> Option<usize> {
    let header = src.get(..BLOSC_HEADER_LEN)?;
    let nbytes = u32::from_le_bytes(header[4..8].try_into().ok()?);
    let cbytes = u32::from_le_bytes(header[12..16].try_into().ok()?);
    (cbytes as usize >= BLOSC_HEADER_LEN && cbytes as usize <= src.len())
        .then_some(nbytes as usize)
}

fn blosc_decompress(src: &[u8], max_decoded_size: usize, threads: usize) -> Result<Vec<u8>> {
    let destsize = blosc_decoded_size(src)
        .ok_or_else(|| VolumeError::decompression("invalid blosc header"))?;
    if destsize > max_decoded_size {
        return Err(VolumeError::decompression(format!(
            "blosc chunk decodes to {} bytes, expected at most {}",
            destsize, max_decoded_size
        )));
    }

    // Compression parameters are read from the buffer; these only satisfy the constructor.
    let level = BloscCompressionLevel::try_from(5u8)
        .map_err(|_| VolumeError::decompression("invalid blosc level"))?;
    let codec = BloscCodec::new(BloscCompressor::LZ4, level, None, BloscShuffleMode::NoShuffle, None)
        .map_err(|e| VolumeError::decompression(e.to_string()))?;
    let options = CodecOptionsBuilder::new()
        .concurrent_target(threads.max(1))
        .build();

    let decoded = codec
        .decode(
            Cow::Borrowed(src),
            &BytesRepresentation::BoundedSize(max_decoded_size as u64),
            &options,
        )
        .map_err(|e| VolumeError::decompression(format!("blosc: {}", e)))?;
    if decoded.len() > max_decoded_size {
        return Err(VolumeError::decompression(format!(
            "blosc chunk decodes to more than {} bytes",
            max_decoded_size
        )));
    }
    Ok(decoded.into_owned())
}

/// Read at most `limit` bytes from `reader`.
pub(crate) fn read_at_most(reader: impl Read, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    reader.take(limit as u64).read_to_end(&mut out)?;
    Ok(out)
}

fn read_bounded(reader: impl Read, max_decoded_size: usize) -> Result<Vec<u8>> {
    let out = read_at_most(reader, max_decoded_size.saturating_add(1))
        .map_err(|e| VolumeError::decompression(e.to_string()))?;
    if out.len() > max_decoded_size {
        return Err(VolumeError::decompression(format!(
            "chunk decodes to more than {} bytes",
            max_decoded_size
        )));
    }
    Ok(out)
}
