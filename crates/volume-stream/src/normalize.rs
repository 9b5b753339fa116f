//! Rescaling of wide sample types to single-byte intensities.
//!
//! Wide samples are remapped linearly onto `0..=255` using the minimum and
//! maximum found in the buffer:
//!
//! ```text
//! out = round((sample - min) * 255 / (max - min))
//! ```
//!
//! Wide samples are stored little-endian. They are reinterpreted in place on
//! little-endian targets and byte-swapped first elsewhere.

use bytemuck::Pod;
use num_traits::AsPrimitive;
use rayon::prelude::*;
use tracing::warn;

use crate::types::ElementType;

/// Rescale `raw` samples of `element_type` to one byte per sample.
///
/// Single-byte input is returned unchanged. An unrecognized element type
/// (`None`) is treated as single-byte. A flat volume (every finite sample
/// equal, or no finite sample at all) becomes `flat_fill` everywhere.
pub fn normalize(raw: Vec<u8>, element_type: Option<ElementType>, flat_fill: u8) -> Vec<u8> {
    match element_type {
        Some(ElementType::UInt8) => raw,
        Some(ElementType::UInt16) => rescale::<u16>(&raw, flat_fill),
        Some(ElementType::Int16) => rescale::<i16>(&raw, flat_fill),
        Some(ElementType::Float32) => rescale::<f32>(&raw, flat_fill),
        Some(ElementType::Float64) => rescale::<f64>(&raw, flat_fill),
        None => {
            warn!("Unknown element type, assuming uint8");
            raw
        }
    }
}

/// Zero-extend `data` to exactly `len` bytes. Longer buffers are returned
/// unmodified.
pub fn pad_to(mut data: Vec<u8>, len: usize) -> Vec<u8> {
    if data.len() < len {
        data.resize(len, 0);
    }
    data
}

fn rescale<T>(raw: &[u8], flat_fill: u8) -> Vec<u8>
where
    T: Pod + AsPrimitive<f64> + Send + Sync,
{
    let size = std::mem::size_of::<T>();
    // Trailing bytes that do not form a whole sample are dropped.
    let le = &raw[..raw.len() - raw.len() % size];
    let samples: Vec<T> = if cfg!(target_endian = "little") {
        bytemuck::pod_collect_to_vec(le)
    } else {
        let mut swapped = le.to_vec();
        for sample in swapped.chunks_exact_mut(size) {
            sample.reverse();
        }
        bytemuck::pod_collect_to_vec(&swapped)
    };

    let (min, max) = samples
        .par_iter()
        .map(|&s| AsPrimitive::<f64>::as_(s))
        .filter(|v: &f64| v.is_finite())
        .fold(
            || (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), v| (lo.min(v), hi.max(v)),
        )
        .reduce(
            || (f64::INFINITY, f64::NEG_INFINITY),
            |a, b| (a.0.min(b.0), a.1.max(b.1)),
        );

    if max <= min {
        return vec![flat_fill; samples.len()];
    }

    let scale = 255.0 / (max - min);
    samples
        .par_iter()
        .map(|&s| {
            let v = AsPrimitive::<f64>::as_(s);
            if v.is_finite() {
                ((v - min) * scale).round().clamp(0.0, 255.0) as u8
            } else {
                0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{f32_bytes, f64_bytes, i16_bytes, u16_bytes};

    #[test]
    fn test_uint8_is_passthrough() {
        let raw: Vec<u8> = (0..=255).collect();
        assert_eq!(normalize(raw.clone(), Some(ElementType::UInt8), 128), raw);
    }

    #[test]
    fn test_unknown_type_is_passthrough() {
        let raw = vec![9u8, 8, 7];
        assert_eq!(normalize(raw.clone(), None, 128), raw);
    }

    #[test]
    fn test_uint16_rescale() {
        let raw = u16_bytes(&[1000, 2000, 3000, 1500]);
        let out = normalize(raw, Some(ElementType::UInt16), 128);
        // (500 * 255 / 2000) = 63.75
        assert_eq!(out, vec![0, 128, 255, 64]);
    }

    #[test]
    fn test_samples_are_little_endian() {
        // 0x0100 and 0x0000, whatever the host order.
        let raw = vec![0x00, 0x01, 0x00, 0x00, 0x80, 0x00];
        let out = normalize(raw, Some(ElementType::UInt16), 128);
        assert_eq!(out, vec![255, 0, 128]);
    }

    #[test]
    fn test_int16_rescale_with_negatives() {
        let raw = i16_bytes(&[-100, 0, 100]);
        let out = normalize(raw, Some(ElementType::Int16), 128);
        assert_eq!(out, vec![0, 128, 255]);
    }

    #[test]
    fn test_float64_rescale() {
        let raw = f64_bytes(&[0.5, 1.5, 1.0]);
        let out = normalize(raw, Some(ElementType::Float64), 0);
        assert_eq!(out, vec![0, 255, 128]);
    }

    #[test]
    fn test_flat_float32_uses_fill() {
        let raw = f32_bytes(&[7.0; 27]);
        let out = normalize(raw, Some(ElementType::Float32), 128);
        assert_eq!(out, vec![128u8; 27]);
    }

    #[test]
    fn test_non_finite_samples() {
        let raw = f32_bytes(&[f32::NAN, 0.0, 10.0, f32::INFINITY]);
        let out = normalize(raw, Some(ElementType::Float32), 128);
        assert_eq!(out, vec![0, 0, 255, 0]);

        let raw = f32_bytes(&[f32::NAN, f32::NAN]);
        assert_eq!(normalize(raw, Some(ElementType::Float32), 42), vec![42, 42]);
    }

    #[test]
    fn test_trailing_partial_sample_is_dropped() {
        let mut raw = u16_bytes(&[0, 10]);
        raw.push(0xAB);
        let out = normalize(raw, Some(ElementType::UInt16), 128);
        assert_eq!(out, vec![0, 255]);
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize(Vec::new(), Some(ElementType::Float32), 128).is_empty());
    }

    #[test]
    fn test_pad_to() {
        assert_eq!(pad_to(vec![1, 2], 5), vec![1, 2, 0, 0, 0]);
        assert_eq!(pad_to(vec![1, 2, 3], 3), vec![1, 2, 3]);
        assert_eq!(pad_to(vec![1, 2, 3, 4], 3), vec![1, 2, 3, 4]);
        assert_eq!(pad_to(Vec::new(), 2), vec![0, 0]);
    }
}
