//! Test data generators for creating synthetic volume samples.
//!
//! These generators create predictable, verifiable sample patterns and the
//! little-endian byte layouts the chunk and file decoders expect.

use std::borrow::Cow;
use std::io::Write;

use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::codec::{BytesToBytesCodecTraits, CodecOptions};

/// Creates a single-byte test volume with predictable values.
///
/// Each voxel is `(x + 3 * y + 7 * z) % 256`, stored x-fastest then y then z.
///
/// # Example
///
/// ```
/// use test_utils::create_test_volume;
///
/// let volume = create_test_volume(4, 3, 2);
/// assert_eq!(volume.len(), 24);
/// assert_eq!(volume[1], 1);  // x=1
/// assert_eq!(volume[4], 3);  // y=1
/// assert_eq!(volume[12], 7); // z=1
/// ```
pub fn create_test_volume(width: usize, height: usize, depth: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height * depth);
    for z in 0..depth {
        for y in 0..height {
            for x in 0..width {
                data.push(((x + 3 * y + 7 * z) % 256) as u8);
            }
        }
    }
    data
}

/// Creates `len` unsigned 16-bit samples `start, start + step, ...`, wrapping.
pub fn create_ramp_u16(len: usize, start: u16, step: u16) -> Vec<u16> {
    (0..len)
        .map(|i| start.wrapping_add(step.wrapping_mul(i as u16)))
        .collect()
}

/// Creates `len` float samples all equal to `value`.
pub fn create_constant_f32(len: usize, value: f32) -> Vec<f32> {
    vec![value; len]
}

/// Little-endian bytes of unsigned 16-bit samples.
pub fn u16_bytes(samples: &[u16]) -> Vec<u8> {
    samples.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Little-endian bytes of signed 16-bit samples.
pub fn i16_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Little-endian bytes of 32-bit float samples.
pub fn f32_bytes(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Little-endian bytes of 64-bit float samples.
pub fn f64_bytes(samples: &[f64]) -> Vec<u8> {
    samples.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Gzip-compress `data`.
pub fn gzip_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("write to in-memory encoder");
    encoder.finish().expect("finish in-memory encoder")
}

/// Zlib-compress `data`.
pub fn zlib_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("write to in-memory encoder");
    encoder.finish().expect("finish in-memory encoder")
}

/// Blosc-compress `data` with lz4, byte-shuffling samples of `typesize`
/// bytes when `typesize > 1`.
pub fn blosc_compress(data: &[u8], typesize: usize) -> Vec<u8> {
    let level = BloscCompressionLevel::try_from(5u8).expect("valid blosc level");
    let (shuffle, typesize) = if typesize > 1 {
        (BloscShuffleMode::Shuffle, Some(typesize))
    } else {
        (BloscShuffleMode::NoShuffle, None)
    };
    let codec = BloscCodec::new(BloscCompressor::LZ4, level, None, shuffle, typesize)
        .expect("valid blosc configuration");
    codec
        .encode(Cow::Borrowed(data), &CodecOptions::default())
        .expect("blosc compression")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::{GzDecoder, ZlibDecoder};
    use std::io::Read;

    #[test]
    fn test_create_test_volume() {
        let volume = create_test_volume(10, 10, 10);
        assert_eq!(volume.len(), 1000);
        assert_eq!(volume[0], 0);
        // x=9, y=9, z=9 -> 9 + 27 + 63
        assert_eq!(volume[999], 99);
    }

    #[test]
    fn test_create_ramp_u16() {
        assert_eq!(create_ramp_u16(4, 1000, 500), vec![1000, 1500, 2000, 2500]);
        assert_eq!(create_ramp_u16(2, u16::MAX, 1), vec![u16::MAX, 0]);
    }

    #[test]
    fn test_sample_bytes_are_little_endian() {
        assert_eq!(u16_bytes(&[0x0102]), vec![0x02, 0x01]);
        assert_eq!(i16_bytes(&[-1]), vec![0xFF, 0xFF]);
        assert_eq!(f32_bytes(&[1.0]), vec![0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(f64_bytes(&[0.5, 0.5]).len(), 16);
        assert_eq!(f32_bytes(&create_constant_f32(3, 7.0)).len(), 12);
    }

    #[test]
    fn test_compressors_round_trip() {
        let data = create_test_volume(8, 8, 8);

        let mut out = Vec::new();
        GzDecoder::new(gzip_compress(&data).as_slice())
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, data);

        let mut out = Vec::new();
        ZlibDecoder::new(zlib_compress(&data).as_slice())
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_blosc_header_records_sizes() {
        let data = create_test_volume(16, 16, 16);
        let encoded = blosc_compress(&data, 1);
        let nbytes = u32::from_le_bytes(encoded[4..8].try_into().unwrap());
        let cbytes = u32::from_le_bytes(encoded[12..16].try_into().unwrap());
        assert_eq!(nbytes as usize, data.len());
        assert_eq!(cbytes as usize, encoded.len());
    }
}
