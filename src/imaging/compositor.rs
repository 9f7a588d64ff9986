//! Border compositing: solid bands above and below, padded body rows between.
//!
//! An annotated image is written as three parts through one sink:
//!
//! ```text
//! ┌──────────────────────────────┐  top band     border_width rows, background only
//! │ ████ ┌──────────────┐ ████   │
//! │ ████ │ source rows  │ ████   │  body         border px + source row + border px
//! │ ████ └──────────────┘ ████   │
//! │        F/2.8 | 1/250         │  bottom band  border_width rows, caption centered
//! └──────────────────────────────┘
//! ```
//!
//! Caption placement works in pixels and converts to byte offsets by
//! multiplying with the component count, so a glyph sample always lands on
//! a pixel boundary.

use super::backend::{BackendError, ImageSink, ImageSource, RowMatrix};
use super::calculations::{centered_start, glyph_drop, row_len};
use super::color::{NamedColor, Pixel, write_pixel};
use super::glyphs::{GlyphString, LayoutMetrics};
use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("cannot allocate row buffer: {0}")]
    Allocation(#[from] TryReserveError),
    #[error("source row is {actual} bytes, expected {expected}")]
    RowLength { expected: usize, actual: usize },
    #[error("source has {source_components} components but the sink has {sink}")]
    ComponentMismatch { source_components: u8, sink: u8 },
    #[error("source ended after {read} of {expected} rows")]
    SourceEnded { expected: u32, read: u32 },
    #[error(transparent)]
    Codec(#[from] BackendError),
}

/// Border color and thickness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundSpec {
    pub color: NamedColor,
    pub border_width: u32,
}

/// Width and channel count of the rows being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandGeometry {
    pub width: u32,
    pub components: u8,
}

impl BandGeometry {
    pub fn of(sink: &impl ImageSink) -> Self {
        Self {
            width: sink.width(),
            components: sink.components(),
        }
    }

    pub fn row_len(&self) -> usize {
        row_len(self.width, self.components)
    }
}

/// Caption text to draw into a band.
#[derive(Debug, Clone, Copy)]
pub struct CaptionLayer<'a> {
    pub glyphs: &'a GlyphString,
    pub metrics: &'a LayoutMetrics,
    pub color: NamedColor,
}

fn fill(buf: &mut [u8], pixel: Pixel) {
    for chunk in buf.chunks_exact_mut(pixel.byte_len()) {
        write_pixel(chunk, 0, pixel);
    }
}

/// Build a `border_width`-row band in the background color, with the
/// caption (if any) centered in it.
///
/// Glyph samples falling outside the band are dropped, so captions wider or
/// taller than the band are clipped rather than rejected.
pub fn build_border_band(
    geometry: BandGeometry,
    background: &BackgroundSpec,
    caption: Option<CaptionLayer<'_>>,
) -> Result<RowMatrix, CompositeError> {
    let mut band = RowMatrix::zeroed(background.border_width as usize, geometry.row_len())?;
    let bg = Pixel::for_components(background.color, geometry.components);
    for y in 0..band.rows() {
        fill(band.row_mut(y), bg);
    }
    if let Some(caption) = caption {
        draw_caption(&mut band, geometry, caption);
    }
    Ok(band)
}

/// Draw the caption centered in `band`.
///
/// Short glyphs drop toward the foot of the text line, measured against the
/// line height rather than the band height, so they stay inside the line.
fn draw_caption(band: &mut RowMatrix, geometry: BandGeometry, caption: CaptionLayer<'_>) {
    let band_rows = band.rows() as i64;
    let band_width = geometry.width as i64;
    let comps = geometry.components as usize;
    let ink = Pixel::for_components(caption.color, geometry.components);

    let text_height = caption.glyphs.height();
    let text_width = caption.glyphs.width(caption.metrics);
    let top = centered_start(band.rows() as u32, text_height);
    let mut left = centered_start(geometry.width, text_width);

    for glyph in caption.glyphs.glyphs() {
        let first_row = top + glyph_drop(text_height, glyph.rows, caption.metrics.kern) as i64;
        for gy in 0..glyph.rows {
            let y = first_row + gy as i64;
            if !(0..band_rows).contains(&y) {
                continue;
            }
            let row = band.row_mut(y as usize);
            for gx in 0..glyph.width {
                let x = left + gx as i64;
                if (0..band_width).contains(&x) && glyph.at(gx, gy) > 0 {
                    write_pixel(row, x as usize * comps, ink);
                }
            }
        }
        left += caption.metrics.advance(glyph) as i64;
    }
}

/// Reusable output row for the body: the border columns are painted once,
/// each source row is copied into the middle.
#[derive(Debug)]
pub struct BodyRow {
    row: RowMatrix,
    offset: usize,
    source_len: usize,
}

impl BodyRow {
    pub fn new(
        source_width: u32,
        components: u8,
        background: &BackgroundSpec,
    ) -> Result<Self, CompositeError> {
        let source_len = row_len(source_width, components);
        let offset = row_len(background.border_width, components);
        let mut row = RowMatrix::zeroed(1, source_len + 2 * offset)?;
        fill(row.row_mut(0), Pixel::for_components(background.color, components));
        Ok(Self {
            row,
            offset,
            source_len,
        })
    }

    /// Place `source_row` between the border columns.
    pub fn compose(&mut self, source_row: &[u8]) -> Result<&RowMatrix, CompositeError> {
        if source_row.len() != self.source_len {
            return Err(CompositeError::RowLength {
                expected: self.source_len,
                actual: source_row.len(),
            });
        }
        self.row.row_mut(0)[self.offset..self.offset + self.source_len].copy_from_slice(source_row);
        Ok(&self.row)
    }

    pub fn len(&self) -> usize {
        self.row.row_len()
    }

    pub fn is_empty(&self) -> bool {
        self.row.row_len() == 0
    }
}

/// Copy every source row into the sink with side borders. Returns the
/// number of rows written.
pub fn composite_body<S: ImageSource, K: ImageSink>(
    source: &mut S,
    sink: &mut K,
    background: &BackgroundSpec,
) -> Result<u32, CompositeError> {
    let settings = source.settings();
    if settings.components() != sink.components() {
        return Err(CompositeError::ComponentMismatch {
            source_components: settings.components(),
            sink: sink.components(),
        });
    }
    let mut body = BodyRow::new(settings.width, settings.components(), background)?;
    let mut read = 0u32;
    while let Some(row) = source.read_row()? {
        sink.write_rows(body.compose(row)?)?;
        read += 1;
    }
    if read != settings.height {
        return Err(CompositeError::SourceEnded {
            expected: settings.height,
            read,
        });
    }
    Ok(read)
}
