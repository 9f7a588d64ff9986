//! Caption assembly: configured metadata fields → one caption line.
//!
//! Each [`MetadataField`] names a tag and wraps its formatted value in a
//! prefix and postfix; the whole entry is uppercased:
//!
//! ```text
//! { name = "FNumber", prefix = "f/" }        28/10   → "F/2.8"
//! { name = "ExposureTime", postfix = "s" }   1/250   → "1/250S"
//! { name = "FocalLength", postfix = "mm" }   50/1    → "50.0MM"
//! ```
//!
//! Entries are joined with the configured separator (`" | "` by default)
//! in declaration order.
//!
//! ## Value formatting
//!
//! | Kind | Rendering |
//! |---|---|
//! | Short, Long, SShort, SLong, SByte | decimal integer |
//! | Ascii, Byte, Undefined | text up to the first NUL, trimmed |
//! | Rational, SRational | `num/den` when `num <= 1` or `den == 0`, else one decimal |
//! | Float, Double | one decimal |
//!
//! Multi-component values are joined with `", "`.
//!
//! ## Missing data
//!
//! A field whose tag the image doesn't carry is skipped with a warning. A
//! tag that is present but can't be read aborts the caption with
//! [`CaptionError::DataMissing`].

use crate::imaging::exif_parser::ByteOrder;
use crate::metadata::{MetadataReader, TagValue, ValueKind};
use serde::{Deserialize, Serialize};
use std::collections::TryReserveError;
use thiserror::Error;

/// Longest prefix or postfix accepted by the config.
pub const MAX_AFFIX_CHARS: usize = 10;
/// Longest tag name accepted by the config.
pub const MAX_TAG_NAME_CHARS: usize = 50;
pub const DEFAULT_SEPARATOR: &str = " | ";

#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("metadata value for {tag} is missing or damaged: {reason}")]
    DataMissing { tag: String, reason: String },
    #[error("cannot grow metadata buffer: {0}")]
    BufferGrowth(#[from] TryReserveError),
}

/// One caption entry, as configured under `[[metadata]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataField {
    /// EXIF tag name, e.g. `FNumber`.
    pub name: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub postfix: String,
    /// Accepted for compatibility with existing configs; entries are always
    /// emitted in declaration order.
    #[serde(default)]
    pub order: u32,
}

impl MetadataField {
    pub fn new(name: &str, prefix: &str, postfix: &str) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            postfix: postfix.to_string(),
            order: 0,
        }
    }
}

/// Builds caption lines, reusing one scratch buffer across fields.
#[derive(Debug, Clone)]
pub struct CaptionAssembler {
    separator: String,
    scratch: Vec<u8>,
}

impl Default for CaptionAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

impl CaptionAssembler {
    pub fn new(separator: &str) -> Self {
        Self {
            separator: separator.to_string(),
            scratch: Vec::new(),
        }
    }

    /// Format every resolvable field, in order. Skipped fields leave no entry.
    pub fn assemble(
        &mut self,
        fields: &[MetadataField],
        reader: &impl MetadataReader,
    ) -> Result<Vec<String>, CaptionError> {
        let mut entries = Vec::with_capacity(fields.len());
        for field in fields {
            let Some(handle) = reader.lookup_tag(&field.name) else {
                log::warn!("tag {} not found, skipping", field.name);
                continue;
            };
            let value = reader
                .value_of(&handle)
                .map_err(|e| CaptionError::DataMissing {
                    tag: field.name.clone(),
                    reason: e.to_string(),
                })?;
            let text = self.format(&field.name, &value)?;
            let entry = format!("{}{}{}", field.prefix, text, field.postfix).to_uppercase();
            log::debug!("{} → {entry:?}", field.name);
            entries.push(entry);
        }
        Ok(entries)
    }

    /// The full caption line: [`assemble`](Self::assemble) joined by the separator.
    pub fn caption(
        &mut self,
        fields: &[MetadataField],
        reader: &impl MetadataReader,
    ) -> Result<String, CaptionError> {
        Ok(self.assemble(fields, reader)?.join(&self.separator))
    }

    /// Copy the value into scratch, then render it.
    fn format(&mut self, tag: &str, value: &TagValue<'_>) -> Result<String, CaptionError> {
        let needed = value.kind.size().saturating_mul(value.count as usize);
        if value.raw.len() < needed {
            return Err(CaptionError::DataMissing {
                tag: tag.to_string(),
                reason: format!(
                    "{} components need {needed} bytes, found {}",
                    value.count,
                    value.raw.len()
                ),
            });
        }
        self.scratch.clear();
        self.scratch.try_reserve(needed)?;
        self.scratch.extend_from_slice(&value.raw[..needed]);
        Ok(format_components(value.kind, value.order, &self.scratch))
    }
}

/// Render raw value bytes (exactly `count * kind.size()` of them).
pub fn format_components(kind: ValueKind, order: ByteOrder, bytes: &[u8]) -> String {
    let u16_at = |c: &[u8]| order.u16([c[0], c[1]]);
    let u32_at = |c: &[u8]| order.u32([c[0], c[1], c[2], c[3]]);
    let parts: Vec<String> = match kind {
        ValueKind::Ascii | ValueKind::Byte | ValueKind::Undefined => {
            return format_text(bytes);
        }
        ValueKind::SByte => bytes.iter().map(|&b| (b as i8).to_string()).collect(),
        ValueKind::Short => bytes.chunks_exact(2).map(|c| u16_at(c).to_string()).collect(),
        ValueKind::SShort => bytes
            .chunks_exact(2)
            .map(|c| (u16_at(c) as i16).to_string())
            .collect(),
        ValueKind::Long => bytes.chunks_exact(4).map(|c| u32_at(c).to_string()).collect(),
        ValueKind::SLong => bytes
            .chunks_exact(4)
            .map(|c| (u32_at(c) as i32).to_string())
            .collect(),
        ValueKind::Rational => bytes
            .chunks_exact(8)
            .map(|c| format_rational(u32_at(&c[..4]) as i64, u32_at(&c[4..]) as i64))
            .collect(),
        ValueKind::SRational => bytes
            .chunks_exact(8)
            .map(|c| {
                format_rational(u32_at(&c[..4]) as i32 as i64, u32_at(&c[4..]) as i32 as i64)
            })
            .collect(),
        ValueKind::Float => bytes
            .chunks_exact(4)
            .map(|c| format!("{:.1}", f32::from_bits(u32_at(c))))
            .collect(),
        ValueKind::Double => bytes
            .chunks_exact(8)
            .map(|c| {
                let (hi, lo) = match order {
                    ByteOrder::Little => (u32_at(&c[4..]), u32_at(&c[..4])),
                    ByteOrder::Big => (u32_at(&c[..4]), u32_at(&c[4..])),
                };
                format!("{:.1}", f64::from_bits(((hi as u64) << 32) | lo as u64))
            })
            .collect(),
    };
    parts.join(", ")
}

/// `num/den` for fractions like exposure times, one decimal otherwise.
pub fn format_rational(num: i64, den: i64) -> String {
    if num <= 1 || den == 0 {
        format!("{num}/{den}")
    } else {
        format!("{:.1}", num as f64 / den as f64)
    }
}

fn format_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}
