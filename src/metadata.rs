//! Embedded metadata access.
//!
//! Caption fields name EXIF tags the way libexif and exiftool do
//! (`FNumber`, `ExposureTime`, `ISOSpeedRatings`, ...). A lookup goes in two
//! steps, and the caption assembler treats their failures differently:
//!
//! 1. [`MetadataReader::lookup_tag`]: does this image carry the tag at all?
//!    A miss (unknown name, or tag absent from the file) is not an error;
//!    the field is skipped with a warning.
//! 2. [`MetadataReader::value_of`]: read the entry's raw value. The entry
//!    exists, so failing here (value offset past the end of the block,
//!    unknown field type) means the file is damaged, and annotation aborts.
//!
//! [`ExifReader`] is the production reader, over the EXIF block parsed by
//! [`exif_parser`](crate::imaging::exif_parser). Only a fixed table of
//! common tags is addressable by name; enumerating arbitrary tags is out of
//! scope.

use crate::imaging::exif_parser::{self, ByteOrder, EntryFault, ExifData, Ifd};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("failed to read metadata: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot read value of {tag}: {fault}")]
    Unreadable { tag: String, fault: EntryFault },
    #[error("handle for {0} does not belong to this reader")]
    ForeignHandle(String),
}

/// Storage type of a tag value, as declared in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    SByte,
    Undefined,
    SShort,
    SLong,
    SRational,
    Float,
    Double,
}

impl ValueKind {
    /// Map a TIFF field type code.
    pub fn from_type(field_type: u16) -> Option<Self> {
        Some(match field_type {
            1 => Self::Byte,
            2 => Self::Ascii,
            3 => Self::Short,
            4 => Self::Long,
            5 => Self::Rational,
            6 => Self::SByte,
            7 => Self::Undefined,
            8 => Self::SShort,
            9 => Self::SLong,
            10 => Self::SRational,
            11 => Self::Float,
            12 => Self::Double,
            _ => return None,
        })
    }

    /// Bytes per component.
    pub fn size(self) -> usize {
        match self {
            Self::Byte | Self::Ascii | Self::SByte | Self::Undefined => 1,
            Self::Short | Self::SShort => 2,
            Self::Long | Self::SLong | Self::Float => 4,
            Self::Rational | Self::SRational | Self::Double => 8,
        }
    }
}

/// A tag known to be present in one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHandle {
    pub name: String,
    index: usize,
}

/// A tag's raw value, borrowed from the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagValue<'a> {
    pub kind: ValueKind,
    pub raw: &'a [u8],
    /// Number of components, each `kind.size()` bytes.
    pub count: u32,
    pub order: ByteOrder,
}

/// Read-only, per-image tag access.
pub trait MetadataReader {
    /// Find a tag by name. `None` if the name is unknown or the image lacks it.
    fn lookup_tag(&self, name: &str) -> Option<TagHandle>;

    /// Read the value of a tag found by [`lookup_tag`](Self::lookup_tag).
    fn value_of(&self, handle: &TagHandle) -> Result<TagValue<'_>, MetadataError>;
}

/// Tag names addressable from the config, with the IFD and tag number
/// each one lives at.
pub const EXIF_TAGS: &[(&str, Ifd, u16)] = &[
    ("ImageDescription", Ifd::Primary, 0x010E),
    ("Make", Ifd::Primary, 0x010F),
    ("Model", Ifd::Primary, 0x0110),
    ("Orientation", Ifd::Primary, 0x0112),
    ("XResolution", Ifd::Primary, 0x011A),
    ("YResolution", Ifd::Primary, 0x011B),
    ("Software", Ifd::Primary, 0x0131),
    ("DateTime", Ifd::Primary, 0x0132),
    ("Artist", Ifd::Primary, 0x013B),
    ("Copyright", Ifd::Primary, 0x8298),
    ("ExposureTime", Ifd::Exif, 0x829A),
    ("FNumber", Ifd::Exif, 0x829D),
    ("ExposureProgram", Ifd::Exif, 0x8822),
    ("ISOSpeedRatings", Ifd::Exif, 0x8827),
    ("DateTimeOriginal", Ifd::Exif, 0x9003),
    ("DateTimeDigitized", Ifd::Exif, 0x9004),
    ("ShutterSpeedValue", Ifd::Exif, 0x9201),
    ("ApertureValue", Ifd::Exif, 0x9202),
    ("ExposureBiasValue", Ifd::Exif, 0x9204),
    ("MaxApertureValue", Ifd::Exif, 0x9205),
    ("MeteringMode", Ifd::Exif, 0x9207),
    ("Flash", Ifd::Exif, 0x9209),
    ("FocalLength", Ifd::Exif, 0x920A),
    ("WhiteBalance", Ifd::Exif, 0xA403),
    ("FocalLengthIn35mmFilm", Ifd::Exif, 0xA405),
    ("BodySerialNumber", Ifd::Exif, 0xA431),
    ("LensMake", Ifd::Exif, 0xA433),
    ("LensModel", Ifd::Exif, 0xA434),
    ("GPSLatitudeRef", Ifd::Gps, 0x0001),
    ("GPSLatitude", Ifd::Gps, 0x0002),
    ("GPSLongitudeRef", Ifd::Gps, 0x0003),
    ("GPSLongitude", Ifd::Gps, 0x0004),
    ("GPSAltitude", Ifd::Gps, 0x0006),
];

/// Where a named tag lives, if the name is known.
pub fn tag_by_name(name: &str) -> Option<(Ifd, u16)> {
    EXIF_TAGS
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, ifd, tag)| (*ifd, *tag))
}

pub fn is_known_tag(name: &str) -> bool {
    tag_by_name(name).is_some()
}

/// [`MetadataReader`] over a file's EXIF block.
///
/// An image without EXIF yields an empty reader: every lookup misses.
#[derive(Debug, Clone, Default)]
pub struct ExifReader {
    data: Option<ExifData>,
}

impl ExifReader {
    pub fn open(path: &Path) -> Result<Self, MetadataError> {
        let data = exif_parser::read_exif(path)?;
        if data.is_none() {
            log::warn!("{} has no EXIF metadata", path.display());
        }
        Ok(Self { data })
    }

    /// Reader over an in-memory TIFF block.
    pub fn from_tiff(bytes: &[u8]) -> Self {
        Self {
            data: exif_parser::parse_tiff(bytes),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.as_ref().is_none_or(|d| d.entries().is_empty())
    }
}

impl MetadataReader for ExifReader {
    fn lookup_tag(&self, name: &str) -> Option<TagHandle> {
        let (ifd, tag) = tag_by_name(name)?;
        let data = self.data.as_ref()?;
        let index = data
            .entries()
            .iter()
            .position(|e| e.ifd == ifd && e.tag == tag)?;
        Some(TagHandle {
            name: name.to_string(),
            index,
        })
    }

    fn value_of(&self, handle: &TagHandle) -> Result<TagValue<'_>, MetadataError> {
        let unreadable = |fault| MetadataError::Unreadable {
            tag: handle.name.clone(),
            fault,
        };
        let (data, entry) = self
            .data
            .as_ref()
            .and_then(|d| Some((d, d.entries().get(handle.index)?)))
            .ok_or_else(|| MetadataError::ForeignHandle(handle.name.clone()))?;
        let kind = ValueKind::from_type(entry.field_type)
            .ok_or_else(|| unreadable(EntryFault::UnknownType(entry.field_type)))?;
        let raw = data.value_bytes(entry).map_err(unreadable)?;
        Ok(TagValue {
            kind,
            raw,
            count: entry.count,
            order: data.order(),
        })
    }
}
