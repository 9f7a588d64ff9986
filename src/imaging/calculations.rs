//! Pure calculation functions for border geometry and caption placement.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the output dimensions for a source image padded by `border`
/// pixels on every side.
///
/// Returns `None` if either axis would overflow `u32`.
///
/// # Examples
/// ```
/// # use infoto::imaging::calculations::bordered_dimensions;
/// assert_eq!(bordered_dimensions((100, 80), 10), Some((120, 100)));
/// assert_eq!(bordered_dimensions((100, 80), 0), Some((100, 80)));
/// ```
pub fn bordered_dimensions(source: (u32, u32), border: u32) -> Option<(u32, u32)> {
    let (w, h) = source;
    let pad = border.checked_mul(2)?;
    Some((w.checked_add(pad)?, h.checked_add(pad)?))
}

/// Byte length of one row of `width` pixels with `components` channels.
pub fn row_len(width: u32, components: u8) -> usize {
    width as usize * components as usize
}

/// Start coordinate that centers `inner` within `outer`.
///
/// Computed as `outer/2 - inner/2` with integer halves, so the result can be
/// negative when the content is larger than the space it is centered in.
/// Callers clip anything outside `0..outer`.
pub fn centered_start(outer: u32, inner: u32) -> i64 {
    (outer / 2) as i64 - (inner / 2) as i64
}

/// Downward offset for a glyph shorter than the text line it belongs to.
///
/// Short glyphs (punctuation, separators) are pushed toward the bottom of
/// the line by `(line_height - glyph_rows) - kern`, and not moved at all
/// when that would be zero or negative.
pub fn glyph_drop(line_height: u32, glyph_rows: u32, kern: u32) -> u32 {
    line_height.saturating_sub(glyph_rows).saturating_sub(kern)
}
