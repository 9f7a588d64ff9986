//! FreeType font backend.
//!
//! | Operation | FreeType call |
//! |---|---|
//! | Open face (index 0) | `Library::new_face` |
//! | Pixel size | `Face::set_pixel_sizes(0, size)`, width follows height |
//! | Rasterize | `Face::load_char(.., RENDER)` → `GlyphSlot::get_glyph` → `to_bitmap` |
//!
//! Bitmaps are copied out of FreeType into owned [`GlyphBitmap`]s straight
//! away, so no FreeType glyph outlives the call that produced it. A face is
//! not thread-safe; batch processing loads one per rayon job split.

use super::glyphs::{FontError, FontRasterizer, GlyphBitmap};
use freetype::bitmap::PixelMode;
use freetype::face::LoadFlag;
use freetype::{Bitmap, Face, Library, RenderMode};
use std::path::Path;

/// A loaded font face at a fixed pixel size.
pub struct FreetypeFace {
    // Dropped before the library.
    face: Face,
    _library: Library,
    pixel_size: u32,
}

impl FreetypeFace {
    /// Open the first face in `path` and set its pixel height.
    pub fn load(path: &Path, pixel_size: u32) -> Result<Self, FontError> {
        let library = Library::init().map_err(|e| FontError::Init(e.to_string()))?;
        let face = library.new_face(path, 0).map_err(|e| match e {
            freetype::Error::UnknownFileFormat => FontError::UnknownFormat(path.to_path_buf()),
            other => FontError::FaceLoad {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })?;
        face.set_pixel_sizes(0, pixel_size)
            .map_err(|e| FontError::PixelSize {
                size: pixel_size,
                reason: e.to_string(),
            })?;
        log::debug!("loaded font {} at {}px", path.display(), pixel_size);
        Ok(Self {
            face,
            _library: library,
            pixel_size,
        })
    }

    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }
}

impl FontRasterizer for FreetypeFace {
    fn rasterize_char(&self, index: usize, ch: char) -> Result<GlyphBitmap, FontError> {
        self.face
            .load_char(ch as usize, LoadFlag::RENDER)
            .map_err(|e| FontError::LoadChar {
                index,
                ch,
                reason: e.to_string(),
            })?;
        let get_glyph_err = |e: freetype::Error| FontError::GetGlyph {
            index,
            reason: e.to_string(),
        };
        let glyph = self.face.glyph().get_glyph().map_err(get_glyph_err)?;
        let bitmap_glyph = glyph
            .to_bitmap(RenderMode::Normal, None)
            .map_err(get_glyph_err)?;
        copy_bitmap(&bitmap_glyph.bitmap()).map_err(|reason| FontError::GetGlyph { index, reason })
    }
}

/// Copy a FreeType bitmap into an 8-bit coverage buffer.
///
/// Gray bitmaps are copied row by row (rows may be padded to `pitch`);
/// mono bitmaps are expanded to 0/255. A negative pitch means the rows are
/// stored bottom-up.
fn copy_bitmap(bitmap: &Bitmap) -> Result<GlyphBitmap, String> {
    let width = bitmap.width().max(0) as u32;
    let rows = bitmap.rows().max(0) as u32;
    if width == 0 || rows == 0 {
        return Ok(GlyphBitmap::blank());
    }
    let pitch = bitmap.pitch();
    let stride = pitch.unsigned_abs() as usize;
    let mode = bitmap.pixel_mode().map_err(|e| e.to_string())?;
    let buffer = bitmap.buffer();
    if buffer.len() < stride * rows as usize {
        return Err(format!(
            "bitmap buffer holds {} bytes, expected {}",
            buffer.len(),
            stride * rows as usize
        ));
    }

    let mut coverage = Vec::with_capacity(width as usize * rows as usize);
    for y in 0..rows as usize {
        let src_row = if pitch < 0 { rows as usize - 1 - y } else { y };
        let row = &buffer[src_row * stride..(src_row + 1) * stride];
        match mode {
            PixelMode::Gray => coverage.extend_from_slice(&row[..width as usize]),
            PixelMode::Mono => coverage.extend(
                (0..width as usize).map(|x| {
                    if row[x / 8] & (0x80 >> (x % 8)) != 0 { 255 } else { 0 }
                }),
            ),
            other => return Err(format!("unsupported bitmap pixel mode {other:?}")),
        }
    }

    GlyphBitmap::new(width, rows, coverage).ok_or_else(|| "bitmap size mismatch".to_string())
}
