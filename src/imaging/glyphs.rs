//! Glyph layout: caption text → ordered glyph bitmaps plus line metrics.
//!
//! The [`FontRasterizer`] trait is the seam to the font library. It renders
//! one character at a time into an owned [`GlyphBitmap`]; the production
//! implementation is [`FreetypeFace`](super::freetype_backend::FreetypeFace).
//!
//! Layout is deliberately simple, single-line and monospace-free:
//!
//! ```text
//! advance(glyph) = (glyph.width == 0 ? whitespace_width : glyph.width) + kern
//! width(string)  = Σ advance(glyph)
//! height(string) = max(glyph.rows)
//! ```
//!
//! Whitespace rasterizes to an empty bitmap, so it is given a fixed advance
//! instead of its (zero) bitmap width. Both constants live in
//! [`LayoutMetrics`] and are read from the `[layout]` config section.

use serde::{Deserialize, Serialize};
use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

/// Advance used for glyphs whose bitmap is empty (spaces).
pub const WHITESPACE_WIDTH: u32 = 20;
/// Gap inserted after every glyph.
pub const KERN: u32 = 4;

#[derive(Error, Debug, Clone)]
pub enum FontError {
    #[error("failed to initialize the font library: {0}")]
    Init(String),
    #[error("font file has an unknown format: {}", .0.display())]
    UnknownFormat(PathBuf),
    #[error("failed to load font face {}: {reason}", path.display())]
    FaceLoad { path: PathBuf, reason: String },
    #[error("failed to set pixel size {size}: {reason}")]
    PixelSize { size: u32, reason: String },
    #[error("failed to load character {ch:?} at index {index}: {reason}")]
    LoadChar {
        index: usize,
        ch: char,
        reason: String,
    },
    #[error("failed to get glyph for character at index {index}: {reason}")]
    GetGlyph { index: usize, reason: String },
    #[error("failed to grow glyph string: {0}")]
    GlyphString(#[from] TryReserveError),
}

/// Spacing constants used when laying out a glyph string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutMetrics {
    /// Advance, in pixels, for glyphs with an empty bitmap.
    pub whitespace_width: u32,
    /// Gap, in pixels, after each glyph.
    pub kern: u32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            whitespace_width: WHITESPACE_WIDTH,
            kern: KERN,
        }
    }
}

impl LayoutMetrics {
    /// Horizontal space taken by a glyph, kerning included.
    pub fn advance(&self, glyph: &GlyphBitmap) -> u32 {
        let w = if glyph.width == 0 {
            self.whitespace_width
        } else {
            glyph.width
        };
        w + self.kern
    }
}

/// A rendered character: row-major 8-bit coverage, `width * rows` bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlyphBitmap {
    pub width: u32,
    pub rows: u32,
    pub coverage: Vec<u8>,
}

impl GlyphBitmap {
    /// Build a bitmap, checking the buffer matches the dimensions.
    pub fn new(width: u32, rows: u32, coverage: Vec<u8>) -> Option<Self> {
        (coverage.len() == width as usize * rows as usize).then_some(Self {
            width,
            rows,
            coverage,
        })
    }

    /// An empty bitmap, as produced for whitespace.
    pub fn blank() -> Self {
        Self::default()
    }

    /// Coverage at column `x`, row `y`.
    pub fn at(&self, x: u32, y: u32) -> u8 {
        self.coverage[(y * self.width + x) as usize]
    }
}

/// Renders single characters to coverage bitmaps.
pub trait FontRasterizer {
    /// Rasterize `ch`. `index` is its position in the text, for error reporting.
    fn rasterize_char(&self, index: usize, ch: char) -> Result<GlyphBitmap, FontError>;
}

/// Ordered glyph bitmaps for one caption, one entry per input character.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlyphString {
    glyphs: Vec<GlyphBitmap>,
}

impl GlyphString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a glyph, failing instead of aborting if memory runs out.
    pub fn push(&mut self, glyph: GlyphBitmap) -> Result<(), FontError> {
        self.glyphs.try_reserve(1)?;
        self.glyphs.push(glyph);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn glyphs(&self) -> &[GlyphBitmap] {
        &self.glyphs
    }

    /// Total advance of the string in pixels.
    pub fn width(&self, metrics: &LayoutMetrics) -> u32 {
        self.glyphs.iter().map(|g| metrics.advance(g)).sum()
    }

    /// Height of the text line: the tallest glyph's row count.
    pub fn height(&self) -> u32 {
        self.glyphs.iter().map(|g| g.rows).max().unwrap_or(0)
    }

    /// Row count of the first glyph only.
    ///
    /// Older builds sized the text line from this, which undersizes any
    /// caption that starts with a short glyph. Kept so tests can pin the
    /// difference; layout uses [`height`](Self::height).
    pub fn first_glyph_height(&self) -> u32 {
        self.glyphs.first().map(|g| g.rows).unwrap_or(0)
    }
}

/// Rasterize every character of `text`, in order.
///
/// The first failing character aborts the whole call; no partial glyph
/// string is returned.
pub fn rasterize(font: &impl FontRasterizer, text: &str) -> Result<GlyphString, FontError> {
    let mut glyphs = GlyphString::new();
    for (index, ch) in text.chars().enumerate() {
        glyphs.push(font.rasterize_char(index, ch)?)?;
    }
    Ok(glyphs)
}
