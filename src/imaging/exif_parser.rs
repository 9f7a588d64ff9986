//! Minimal EXIF parser for JPEG, TIFF and PNG files.
//!
//! EXIF is a TIFF structure: a byte-order header followed by IFDs of
//! 12-byte entries. Three IFDs are read:
//! - IFD0 (camera make/model, timestamps)
//! - the Exif sub-IFD, via pointer tag 0x8769 (exposure, aperture, ISO, lens)
//! - the GPS sub-IFD, via pointer tag 0x8825
//!
//! The thumbnail IFD chain is ignored.
//!
//! Where the TIFF block lives:
//! - JPEG: APP1 marker, payload prefixed with `Exif\0\0`.
//! - TIFF: the file itself.
//! - PNG: the `eXIf` chunk.
//!
//! Entry values are resolved lazily, so a single corrupt entry doesn't
//! prevent reading the others. Resolving it reports the fault instead.

use std::path::Path;
use thiserror::Error;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const EXIF_IFD_POINTER: u16 = 0x8769;
const GPS_IFD_POINTER: u16 = 0x8825;
const ENTRY_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub fn u16(self, b: [u8; 2]) -> u16 {
        match self {
            Self::Little => u16::from_le_bytes(b),
            Self::Big => u16::from_be_bytes(b),
        }
    }

    pub fn u32(self, b: [u8; 4]) -> u32 {
        match self {
            Self::Little => u32::from_le_bytes(b),
            Self::Big => u32::from_be_bytes(b),
        }
    }

    fn u16_at(self, data: &[u8], offset: usize) -> Option<u16> {
        let b = data.get(offset..offset.checked_add(2)?)?;
        Some(self.u16([b[0], b[1]]))
    }

    fn u32_at(self, data: &[u8], offset: usize) -> Option<u32> {
        let b = data.get(offset..offset.checked_add(4)?)?;
        Some(self.u32([b[0], b[1], b[2], b[3]]))
    }
}

/// Which IFD an entry was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ifd {
    Primary,
    Exif,
    Gps,
}

/// Byte size of one value of a TIFF field type, `None` for unknown types.
pub fn type_size(field_type: u16) -> Option<usize> {
    match field_type {
        1 | 2 | 6 | 7 => Some(1), // BYTE, ASCII, SBYTE, UNDEFINED
        3 | 8 => Some(2),         // SHORT, SSHORT
        4 | 9 | 11 => Some(4),    // LONG, SLONG, FLOAT
        5 | 10 | 12 => Some(8),   // RATIONAL, SRATIONAL, DOUBLE
        _ => None,
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryFault {
    #[error("unknown field type {0}")]
    UnknownType(u16),
    #[error("value of {len} bytes at offset {offset} runs past the {available}-byte EXIF block")]
    OutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },
}

/// One IFD entry, value not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub ifd: Ifd,
    pub tag: u16,
    pub field_type: u16,
    pub count: u32,
    /// The value itself when it fits in four bytes, otherwise its offset.
    inline: [u8; 4],
}

/// The parsed EXIF block of one file.
#[derive(Debug, Clone)]
pub struct ExifData {
    order: ByteOrder,
    tiff: Vec<u8>,
    entries: Vec<RawEntry>,
}

impl ExifData {
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn entries(&self) -> &[RawEntry] {
        &self.entries
    }

    /// First entry with `tag` in `ifd`.
    pub fn find(&self, ifd: Ifd, tag: u16) -> Option<&RawEntry> {
        self.entries.iter().find(|e| e.ifd == ifd && e.tag == tag)
    }

    /// The value bytes of `entry`, in file byte order.
    ///
    /// Values of four bytes or fewer live in the entry itself, so the result
    /// borrows from both.
    pub fn value_bytes<'a>(&'a self, entry: &'a RawEntry) -> Result<&'a [u8], EntryFault> {
        let size = type_size(entry.field_type).ok_or(EntryFault::UnknownType(entry.field_type))?;
        let len = size.saturating_mul(entry.count as usize);
        if len <= 4 {
            return Ok(&entry.inline[..len]);
        }
        let offset = self.order.u32(entry.inline) as usize;
        offset
            .checked_add(len)
            .and_then(|end| self.tiff.get(offset..end))
            .ok_or(EntryFault::OutOfBounds {
                offset,
                len,
                available: self.tiff.len(),
            })
    }
}

/// Read the EXIF block from a file, dispatching by extension.
///
/// Returns `Ok(None)` when the file has no (parsable) EXIF block or the
/// format doesn't carry one.
pub fn read_exif(path: &Path) -> std::io::Result<Option<ExifData>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let bytes = std::fs::read(path)?;
    let tiff = match ext.as_str() {
        "jpg" | "jpeg" => find_jpeg_app1_exif(&bytes),
        "tif" | "tiff" => Some(bytes.as_slice()),
        "png" => find_png_exif_chunk(&bytes),
        _ => None,
    };
    Ok(tiff.and_then(parse_tiff))
}

// ---------------------------------------------------------------------------
// Container scanning
// ---------------------------------------------------------------------------

/// Find the TIFF block inside a JPEG's `Exif` APP1 segment.
fn find_jpeg_app1_exif(data: &[u8]) -> Option<&[u8]> {
    let mut pos = 0;
    while pos + 4 < data.len() {
        if data[pos] == 0xFF && data[pos + 1] == 0xE1 {
            let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            let seg_start = pos + 4;
            let seg_end = (pos + 2 + seg_len).min(data.len());
            if let Some(tiff) = data
                .get(seg_start..seg_end)
                .and_then(|s| s.strip_prefix(EXIF_HEADER))
            {
                return Some(tiff);
            }
        }

        // Advance: if 0xFF, skip marker + length; otherwise byte-by-byte
        if data[pos] == 0xFF && pos + 3 < data.len() && data[pos + 1] != 0x00 {
            let marker = data[pos + 1];
            // SOS (0xDA) means image data starts
            if marker == 0xDA {
                break;
            }
            // Markers without length field
            if marker == 0xD8 || marker == 0xD9 || (0xD0..=0xD7).contains(&marker) {
                pos += 2;
            } else {
                let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
                pos += 2 + len;
            }
        } else {
            pos += 1;
        }
    }
    None
}

/// Find the payload of a PNG `eXIf` chunk.
fn find_png_exif_chunk(data: &[u8]) -> Option<&[u8]> {
    let mut pos = PNG_SIGNATURE.len();
    if !data.starts_with(PNG_SIGNATURE) {
        return None;
    }
    // Each chunk: length (4, BE) + type (4) + data + CRC (4)
    while pos + 8 <= data.len() {
        let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
            as usize;
        let kind = &data[pos + 4..pos + 8];
        let body = data.get(pos + 8..(pos + 8).checked_add(len)?)?;
        match kind {
            b"eXIf" => return Some(body),
            b"IEND" => break,
            _ => pos += 12 + len,
        }
    }
    None
}

// ---------------------------------------------------------------------------
// TIFF structure
// ---------------------------------------------------------------------------

/// Parse a TIFF block into its IFD0, Exif and GPS entries.
pub fn parse_tiff(data: &[u8]) -> Option<ExifData> {
    let order = match data.get(0..2)? {
        b"II" => ByteOrder::Little,
        b"MM" => ByteOrder::Big,
        _ => return None,
    };
    // TIFF magic (42)
    if order.u16_at(data, 2)? != 42 {
        return None;
    }

    let mut entries = Vec::new();
    let ifd0 = order.u32_at(data, 4)? as usize;
    read_ifd(data, order, ifd0, Ifd::Primary, &mut entries)?;

    let pointers: Vec<(Ifd, usize)> = entries
        .iter()
        .filter(|e| e.ifd == Ifd::Primary)
        .filter_map(|e| match e.tag {
            EXIF_IFD_POINTER => Some((Ifd::Exif, order.u32(e.inline) as usize)),
            GPS_IFD_POINTER => Some((Ifd::Gps, order.u32(e.inline) as usize)),
            _ => None,
        })
        .collect();
    for (ifd, offset) in pointers {
        // A broken sub-IFD leaves IFD0 usable
        if read_ifd(data, order, offset, ifd, &mut entries).is_none() {
            log::debug!("skipping unreadable {ifd:?} IFD at offset {offset}");
        }
    }

    Some(ExifData {
        order,
        tiff: data.to_vec(),
        entries,
    })
}

/// Append the entries of the IFD at `offset`. `None` if it's truncated.
fn read_ifd(
    data: &[u8],
    order: ByteOrder,
    offset: usize,
    ifd: Ifd,
    entries: &mut Vec<RawEntry>,
) -> Option<()> {
    let count = order.u16_at(data, offset)? as usize;
    let start = offset + 2;
    let table = data.get(start..start.checked_add(count * ENTRY_LEN)?)?;
    entries.extend(table.chunks_exact(ENTRY_LEN).map(|e| RawEntry {
        ifd,
        tag: order.u16([e[0], e[1]]),
        field_type: order.u16([e[2], e[3]]),
        count: order.u32([e[4], e[5], e[6], e[7]]),
        inline: [e[8], e[9], e[10], e[11]],
    }));
    Some(())
}
