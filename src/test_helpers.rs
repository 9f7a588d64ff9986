//! Shared test utilities for the infoto test suite.
//!
//! Provides synthetic image writers and a builder for EXIF (TIFF IFD)
//! blocks, so tests can produce photos with known pixels and known
//! metadata without checking binary fixtures into the repo.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tiff = build_exif_tiff(
//!     ByteOrder::Little,
//!     &[TestEntry::new(0x0110, TestValue::Ascii("X100V"))],
//!     &[TestEntry::new(0x829D, TestValue::Rational(vec![(28, 10)]))],
//! );
//! write_jpeg_with_exif(&tmp.path().join("photo.jpg"), 64, 48, &tiff);
//! ```

use crate::imaging::exif_parser::ByteOrder;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageEncoder, RgbImage, RgbaImage};
use std::path::Path;

// =========================================================================
// Synthetic images
// =========================================================================

/// Pixel (x, y) of every synthetic RGB image: `[x % 256, y % 256, 128]`.
fn test_pattern(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Encode the test pattern as JPEG bytes.
pub fn test_jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = test_pattern(width, height);
    let mut bytes = Vec::new();
    JpegEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// Create a small valid JPEG file with the given dimensions.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::write(path, test_jpeg_bytes(width, height)).unwrap();
}

/// Create a lossless RGB PNG with the test pattern.
pub fn write_test_png(path: &Path, width: u32, height: u32) {
    test_pattern(width, height).save(path).unwrap();
}

/// Create an RGBA PNG, half transparent.
pub fn write_test_rgba_png(path: &Path, width: u32, height: u32) {
    RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 127])
    })
    .save(path)
    .unwrap();
}

/// Create a JPEG whose APP1 segment carries `tiff` as its EXIF block.
pub fn write_jpeg_with_exif(path: &Path, width: u32, height: u32, tiff: &[u8]) {
    let jpeg = test_jpeg_bytes(width, height);
    let payload_len = 2 + 6 + tiff.len();
    let mut out = Vec::with_capacity(jpeg.len() + payload_len + 2);
    // SOI, then APP1 before anything else
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&(payload_len as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&jpeg[2..]);
    std::fs::write(path, out).unwrap();
}

// =========================================================================
// EXIF builder
// =========================================================================

/// A typed value for one IFD entry.
#[derive(Debug, Clone)]
pub enum TestValue {
    /// NUL-terminated on encode.
    Ascii(&'static str),
    Byte(Vec<u8>),
    Undefined(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    Rational(Vec<(u32, u32)>),
    SRational(Vec<(i32, i32)>),
    /// Bytes written as-is under an arbitrary type code.
    Raw {
        field_type: u16,
        count: u32,
        bytes: Vec<u8>,
    },
    /// An out-of-line value whose offset points past the end of the block.
    Dangling { field_type: u16, count: u32 },
}

#[derive(Debug, Clone)]
pub struct TestEntry {
    pub tag: u16,
    pub value: TestValue,
}

impl TestEntry {
    pub fn new(tag: u16, value: TestValue) -> Self {
        Self { tag, value }
    }
}

fn put16(order: ByteOrder, v: u16) -> [u8; 2] {
    match order {
        ByteOrder::Little => v.to_le_bytes(),
        ByteOrder::Big => v.to_be_bytes(),
    }
}

fn put32(order: ByteOrder, v: u32) -> [u8; 4] {
    match order {
        ByteOrder::Little => v.to_le_bytes(),
        ByteOrder::Big => v.to_be_bytes(),
    }
}

enum Field {
    Bytes(Vec<u8>),
    Dangling,
}

impl TestValue {
    fn encode(&self, order: ByteOrder) -> (u16, u32, Field) {
        let words16 = |vs: &mut dyn Iterator<Item = u16>| -> Vec<u8> {
            vs.flat_map(|v| put16(order, v)).collect()
        };
        let words32 = |vs: &mut dyn Iterator<Item = u32>| -> Vec<u8> {
            vs.flat_map(|v| put32(order, v)).collect()
        };
        match self {
            Self::Ascii(s) => {
                let mut bytes = s.as_bytes().to_vec();
                bytes.push(0);
                (2, bytes.len() as u32, Field::Bytes(bytes))
            }
            Self::Byte(b) => (1, b.len() as u32, Field::Bytes(b.clone())),
            Self::Undefined(b) => (7, b.len() as u32, Field::Bytes(b.clone())),
            Self::Short(v) => (3, v.len() as u32, Field::Bytes(words16(&mut v.iter().copied()))),
            Self::Long(v) => (4, v.len() as u32, Field::Bytes(words32(&mut v.iter().copied()))),
            Self::SShort(v) => (
                8,
                v.len() as u32,
                Field::Bytes(words16(&mut v.iter().map(|&x| x as u16))),
            ),
            Self::SLong(v) => (
                9,
                v.len() as u32,
                Field::Bytes(words32(&mut v.iter().map(|&x| x as u32))),
            ),
            Self::Rational(v) => (
                5,
                v.len() as u32,
                Field::Bytes(words32(&mut v.iter().flat_map(|&(n, d)| [n, d]))),
            ),
            Self::SRational(v) => (
                10,
                v.len() as u32,
                Field::Bytes(words32(
                    &mut v.iter().flat_map(|&(n, d)| [n as u32, d as u32]),
                )),
            ),
            Self::Raw {
                field_type,
                count,
                bytes,
            } => (*field_type, *count, Field::Bytes(bytes.clone())),
            Self::Dangling { field_type, count } => (*field_type, *count, Field::Dangling),
        }
    }
}

fn ifd_len(entries: usize) -> usize {
    2 + entries * 12 + 4
}

/// Write one IFD into `out`, spilling values over four bytes into `data`
/// (which will be placed at `data_base`).
fn push_ifd(
    out: &mut Vec<u8>,
    data: &mut Vec<u8>,
    data_base: usize,
    order: ByteOrder,
    entries: &[(u16, u16, u32, Field)],
) {
    out.extend_from_slice(&put16(order, entries.len() as u16));
    for (tag, field_type, count, field) in entries {
        out.extend_from_slice(&put16(order, *tag));
        out.extend_from_slice(&put16(order, *field_type));
        out.extend_from_slice(&put32(order, *count));
        match field {
            Field::Dangling => out.extend_from_slice(&put32(order, 0xFFFF_FF00)),
            Field::Bytes(bytes) if bytes.len() <= 4 => {
                let mut inline = [0u8; 4];
                inline[..bytes.len()].copy_from_slice(bytes);
                out.extend_from_slice(&inline);
            }
            Field::Bytes(bytes) => {
                out.extend_from_slice(&put32(order, (data_base + data.len()) as u32));
                data.extend_from_slice(bytes);
                // Keep offsets word-aligned
                if data.len() % 2 == 1 {
                    data.push(0);
                }
            }
        }
    }
    out.extend_from_slice(&[0; 4]);
}

/// Build a TIFF block with the given IFD0 and Exif sub-IFD entries.
///
/// When `exif` is non-empty, IFD0 gets an Exif IFD pointer (0x8769)
/// appended automatically.
pub fn build_exif_tiff(order: ByteOrder, ifd0: &[TestEntry], exif: &[TestEntry]) -> Vec<u8> {
    let has_exif = !exif.is_empty();
    let ifd0_offset = 8usize;
    let exif_offset = ifd0_offset + ifd_len(ifd0.len() + has_exif as usize);
    let data_base = exif_offset + if has_exif { ifd_len(exif.len()) } else { 0 };

    let mut out = Vec::new();
    match order {
        ByteOrder::Little => out.extend_from_slice(b"II"),
        ByteOrder::Big => out.extend_from_slice(b"MM"),
    }
    out.extend_from_slice(&put16(order, 42));
    out.extend_from_slice(&put32(order, ifd0_offset as u32));

    let encode = |entries: &[TestEntry]| -> Vec<(u16, u16, u32, Field)> {
        entries
            .iter()
            .map(|e| {
                let (field_type, count, field) = e.value.encode(order);
                (e.tag, field_type, count, field)
            })
            .collect()
    };

    let mut data = Vec::new();
    let mut primary = encode(ifd0);
    if has_exif {
        primary.push((
            0x8769,
            4,
            1,
            Field::Bytes(put32(order, exif_offset as u32).to_vec()),
        ));
    }
    push_ifd(&mut out, &mut data, data_base, order, &primary);
    if has_exif {
        push_ifd(&mut out, &mut data, data_base, order, &encode(exif));
    }
    debug_assert_eq!(out.len(), data_base);
    out.extend_from_slice(&data);
    out
}

/// A typical camera EXIF block: Fujifilm X100V, f/2.8, 1/250 s, ISO 400,
/// 23 mm.
pub fn camera_exif(order: ByteOrder) -> Vec<u8> {
    build_exif_tiff(
        order,
        &[
            TestEntry::new(0x010F, TestValue::Ascii("FUJIFILM")),
            TestEntry::new(0x0110, TestValue::Ascii("X100V")),
        ],
        &[
            TestEntry::new(0x829A, TestValue::Rational(vec![(1, 250)])),
            TestEntry::new(0x829D, TestValue::Rational(vec![(28, 10)])),
            TestEntry::new(0x8827, TestValue::Short(vec![400])),
            TestEntry::new(0x920A, TestValue::Rational(vec![(23, 1)])),
        ],
    )
}
