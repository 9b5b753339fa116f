//! Local self-describing volume files (NRRD).
//!
//! Only attached data is supported: the header is followed by a blank line
//! and the sample payload, stored `raw` or `gzip`-compressed.

use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::{Result, VolumeError};
use crate::types::ElementType;
use crate::zarr::read_at_most;

/// Samples decoded from a local volume file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedVolume {
    /// Raw samples, little-endian.
    pub data: Vec<u8>,
    /// Size of one sample in bytes.
    pub element_size: usize,
    /// Element type, when the file's type is one of the supported encodings.
    pub element_type: Option<ElementType>,
    /// Axis sizes as declared by the file, fastest-varying first.
    pub sizes: Vec<usize>,
}

/// Decodes the bytes of a local volume file into raw samples.
pub trait LocalVolumeDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedVolume>;
}

/// Decoder for NRRD files with attached data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NrrdDecoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Raw,
    Gzip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

/// Map an NRRD type name to (element size, supported element type).
fn nrrd_type(name: &str) -> Option<(usize, Option<ElementType>)> {
    let t = match name {
        "uchar" | "unsigned char" | "uint8" | "uint8_t" => (1, Some(ElementType::UInt8)),
        "signed char" | "int8" | "int8_t" => (1, None),
        "ushort" | "unsigned short" | "unsigned short int" | "uint16" | "uint16_t" => {
            (2, Some(ElementType::UInt16))
        }
        "short" | "short int" | "signed short" | "signed short int" | "int16" | "int16_t" => {
            (2, Some(ElementType::Int16))
        }
        "int" | "signed int" | "int32" | "int32_t" | "uint" | "unsigned int" | "uint32"
        | "uint32_t" => (4, None),
        "longlong" | "long long" | "int64" | "int64_t" | "ulonglong" | "unsigned long long"
        | "uint64" | "uint64_t" => (8, None),
        "float" => (4, Some(ElementType::Float32)),
        "double" => (8, Some(ElementType::Float64)),
        _ => return None,
    };
    Some(t)
}

impl LocalVolumeDecoder for NrrdDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedVolume> {
        if !bytes.starts_with(b"NRRD") {
            return Err(VolumeError::local_decode("missing NRRD magic"));
        }

        let mut element = None;
        let mut sizes: Vec<usize> = Vec::new();
        let mut encoding = Encoding::Raw;
        let mut endian = Endian::Little;

        let mut pos = 0;
        let mut data_start = None;
        let mut first = true;
        while pos < bytes.len() {
            let end = bytes[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|i| pos + i)
                .unwrap_or(bytes.len());
            let line = std::str::from_utf8(&bytes[pos..end])
                .map_err(|_| VolumeError::local_decode("header is not valid UTF-8"))?
                .trim_end_matches('\r');
            pos = (end + 1).min(bytes.len());

            if first {
                first = false;
                continue;
            }
            if line.is_empty() {
                data_start = Some(pos);
                break;
            }
            if line.starts_with('#') {
                continue;
            }
            // Key/value pairs (`key:=value`) carry no layout information.
            if line.contains(":=") {
                continue;
            }

            let Some((field, value)) = line.split_once(": ") else {
                return Err(VolumeError::local_decode(format!(
                    "malformed header line '{}'",
                    line
                )));
            };
            let value = value.trim();
            match field.trim() {
                "type" => {
                    element = Some(nrrd_type(value).ok_or_else(|| {
                        VolumeError::local_decode(format!("unsupported type '{}'", value))
                    })?);
                }
                "sizes" => {
                    sizes = value
                        .split_whitespace()
                        .map(|s| {
                            s.parse::<usize>().map_err(|_| {
                                VolumeError::local_decode(format!("bad size '{}'", s))
                            })
                        })
                        .collect::<Result<_>>()?;
                }
                "encoding" => {
                    encoding = match value {
                        "raw" => Encoding::Raw,
                        "gzip" | "gz" => Encoding::Gzip,
                        other => {
                            return Err(VolumeError::local_decode(format!(
                                "unsupported encoding '{}'",
                                other
                            )))
                        }
                    };
                }
                "endian" => {
                    endian = if value == "big" { Endian::Big } else { Endian::Little };
                }
                "data file" | "datafile" => {
                    return Err(VolumeError::local_decode("detached data files are not supported"));
                }
                _ => {}
            }
        }

        let data_start =
            data_start.ok_or_else(|| VolumeError::local_decode("header is not terminated"))?;
        let (element_size, element_type) =
            element.ok_or_else(|| VolumeError::local_decode("header has no type field"))?;
        if sizes.is_empty() {
            return Err(VolumeError::local_decode("header has no sizes field"));
        }

        let expected = sizes
            .iter()
            .try_fold(element_size, |acc, &s| acc.checked_mul(s))
            .ok_or_else(|| {
                VolumeError::local_decode(format!("sizes {:?} overflow the addressable size", sizes))
            })?;
        let payload = &bytes[data_start..];
        let mut data = match encoding {
            Encoding::Raw => payload[..payload.len().min(expected)].to_vec(),
            Encoding::Gzip => read_at_most(GzDecoder::new(payload), expected)
                .map_err(|e| VolumeError::local_decode(format!("gzip payload: {}", e)))?,
        };

        if data.len() < expected {
            return Err(VolumeError::local_decode(format!(
                "payload has {} bytes, header declares {}",
                data.len(),
                expected
            )));
        }
        data.truncate(expected);

        if endian == Endian::Big && element_size > 1 {
            for sample in data.chunks_exact_mut(element_size) {
                sample.reverse();
            }
        }

        debug!(
            element_size,
            element_type = ?element_type,
            sizes = ?sizes,
            "Decoded NRRD volume"
        );

        Ok(DecodedVolume {
            data,
            element_size,
            element_type,
            sizes,
        })
    }
}
