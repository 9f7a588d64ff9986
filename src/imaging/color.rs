//! Pixel and named-color model shared by the compositor.
//!
//! Colors come from the config as plain names. Anything that is not one of
//! the five known names resolves to white, matching how a missing or
//! misspelled color has always behaved: the border is still drawn, just in
//! the default color.
//!
//! A [`Pixel`] knows whether it carries an alpha byte. That flag must agree
//! with the component count of the image being written (3 for RGB, 4 for
//! RGBA), otherwise rows come out skewed. [`Pixel::for_components`] is the
//! one place that decides it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The palette available for borders and caption text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NamedColor {
    Black,
    Blue,
    Green,
    Red,
    #[default]
    White,
}

impl NamedColor {
    /// Resolve a color name. Unknown names fall back to white.
    pub fn from_name(name: &str) -> Self {
        match name {
            "black" => Self::Black,
            "blue" => Self::Blue,
            "green" => Self::Green,
            "red" => Self::Red,
            _ => Self::White,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Red => "red",
            Self::White => "white",
        }
    }

    /// Fixed RGB triple for this color.
    pub fn rgb(self) -> [u8; 3] {
        match self {
            Self::Black => [0, 0, 0],
            Self::Blue => [0, 0, 255],
            Self::Green => [0, 255, 0],
            Self::Red => [255, 0, 0],
            Self::White => [255, 255, 255],
        }
    }
}

impl From<String> for NamedColor {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<NamedColor> for String {
    fn from(color: NamedColor) -> Self {
        color.name().to_string()
    }
}

impl fmt::Display for NamedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One pixel as it will be written into a row buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: u8,
    /// Emit the alpha byte (4-component images only).
    pub use_alpha: bool,
}

impl Pixel {
    /// Opaque pixel for a named color.
    pub fn from_color(color: NamedColor, use_alpha: bool) -> Self {
        let [r, g, b] = color.rgb();
        Self {
            r,
            g,
            b,
            alpha: 255,
            use_alpha,
        }
    }

    /// Pixel for a named color, shaped for an image with `components` channels.
    pub fn for_components(color: NamedColor, components: u8) -> Self {
        Self::from_color(color, components == 4)
    }

    /// Number of bytes a write of this pixel produces.
    pub fn byte_len(self) -> usize {
        if self.use_alpha { 4 } else { 3 }
    }
}

/// Write `pixel` into `buf` starting at `offset`, returning the bytes written.
///
/// The caller guarantees `buf[offset..offset + pixel.byte_len()]` is in bounds.
pub fn write_pixel(buf: &mut [u8], offset: usize, pixel: Pixel) -> usize {
    buf[offset] = pixel.r;
    buf[offset + 1] = pixel.g;
    buf[offset + 2] = pixel.b;
    if pixel.use_alpha {
        buf[offset + 3] = pixel.alpha;
        return 4;
    }
    3
}
