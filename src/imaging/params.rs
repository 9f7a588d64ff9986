//! Parameter types exchanged between the orchestrator and the codec.
//!
//! These structs describe *what* a stream looks like, not *how* it is decoded
//! or encoded. They are the interface between [`process`](crate::process)
//! (which negotiates the destination from the source) and the
//! [`backend`](super::backend) (which does the actual pixel I/O). Keeping them
//! plain data lets tests swap in the in-memory codec without touching the
//! negotiation logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Re-encodes always use [`Quality::MAX`].
//! - [`ColorSpace`]: Pixel layout of decoded rows (RGB or RGBA).
//! - [`ImageSettings`]: Geometry and color parameters of one stream.
//! - [`OutputFormat`]: Container written by the sink, chosen from the source file.
//! - [`EncodeSettings`]: Everything a sink needs: settings + quality + format.

use std::fmt;
use std::path::Path;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    /// Annotated copies are re-encoded without further quality loss.
    pub const MAX: Quality = Quality(100);

    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::MAX
    }
}

/// Pixel layout of the rows a stream produces or accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Rgb,
    Rgba,
}

impl ColorSpace {
    pub fn components(self) -> u8 {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb => f.write_str("RGB"),
            Self::Rgba => f.write_str("RGBA"),
        }
    }
}

/// Geometry and color parameters of one image stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSettings {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    /// Display gamma reported by the decoder (1.0 when the format has none).
    pub gamma: f64,
}

impl ImageSettings {
    pub fn components(&self) -> u8 {
        self.color_space.components()
    }

    /// Bytes in one row of this stream.
    pub fn row_len(&self) -> usize {
        self.width as usize * self.components() as usize
    }
}

/// Container format written by a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Tiff,
}

impl OutputFormat {
    /// Pick the output container from a file's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Whether the container can store a 4-component (RGBA) image.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, Self::Jpeg)
    }
}

/// Full specification of a destination stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeSettings {
    pub image: ImageSettings,
    pub quality: Quality,
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_max() {
        assert_eq!(Quality::default(), Quality::MAX);
        assert_eq!(Quality::MAX.value(), 100);
    }

    #[test]
    fn row_len_counts_components() {
        let rgb = ImageSettings {
            width: 120,
            height: 100,
            color_space: ColorSpace::Rgb,
            gamma: 1.0,
        };
        assert_eq!(rgb.row_len(), 360);
        let rgba = ImageSettings {
            color_space: ColorSpace::Rgba,
            ..rgb
        };
        assert_eq!(rgba.row_len(), 480);
    }

    #[test]
    fn output_format_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a.JPG")), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_path(Path::new("a.jpeg")), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_path(Path::new("a.png")), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_path(Path::new("a.tif")), Some(OutputFormat::Tiff));
        assert_eq!(OutputFormat::from_path(Path::new("a.webp")), None);
        assert_eq!(OutputFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn jpeg_cannot_hold_alpha() {
        assert!(!OutputFormat::Jpeg.supports_alpha());
        assert!(OutputFormat::Png.supports_alpha());
        assert!(OutputFormat::Tiff.supports_alpha());
    }
}
