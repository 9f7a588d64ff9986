//! Pure Rust codec on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF) | `image::ImageReader` → `to_rgb8` / `to_rgba8` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at quality 100 |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → TIFF | `image::codecs::tiff::TiffEncoder` |
//!
//! The decoder materializes the whole image on open and then serves rows
//! from it. The encoder accumulates rows, checking each write against the
//! declared geometry, and encodes on [`finish`](ImageSink::finish).
//! Sources with an alpha channel decode to RGBA; everything else to RGB.

use super::backend::{
    BackendError, ImageCodec, ImageSink, ImageSource, RowMatrix, RowTally, StreamSide,
};
use super::params::{ColorSpace, EncodeSettings, ImageSettings, OutputFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tiff::TiffEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Extensions the codec reads, paired with the decoder they need.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled() && fmt.writing_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the image file extensions that can be both decoded and re-encoded.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Codec backed by the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

/// A fully decoded image, read back one row at a time.
pub struct DecodedSource {
    settings: ImageSettings,
    pixels: Vec<u8>,
    next_row: u32,
}

impl ImageSource for DecodedSource {
    fn settings(&self) -> ImageSettings {
        self.settings
    }

    fn read_row(&mut self) -> Result<Option<&[u8]>, BackendError> {
        if self.next_row >= self.settings.height {
            return Ok(None);
        }
        let len = self.settings.row_len();
        let start = self.next_row as usize * len;
        self.next_row += 1;
        Ok(Some(&self.pixels[start..start + len]))
    }
}

/// Collects rows for one output file and encodes them on finish.
pub struct EncodingSink {
    path: PathBuf,
    writer: BufWriter<File>,
    settings: EncodeSettings,
    tally: RowTally,
    pixels: Vec<u8>,
}

impl EncodingSink {
    fn encode(&mut self) -> Result<(), image::ImageError> {
        let image = self.settings.image;
        let color = match image.color_space {
            ColorSpace::Rgb => ExtendedColorType::Rgb8,
            ColorSpace::Rgba => ExtendedColorType::Rgba8,
        };
        let (w, h) = (image.width, image.height);
        match self.settings.format {
            OutputFormat::Jpeg => {
                // Quality is clamped to 1..=100 on construction
                let quality = self.settings.quality.value() as u8;
                JpegEncoder::new_with_quality(&mut self.writer, quality)
                    .write_image(&self.pixels, w, h, color)
            }
            OutputFormat::Png => {
                PngEncoder::new(&mut self.writer).write_image(&self.pixels, w, h, color)
            }
            OutputFormat::Tiff => {
                TiffEncoder::new(&mut self.writer).write_image(&self.pixels, w, h, color)
            }
        }
    }
}

impl ImageSink for EncodingSink {
    fn width(&self) -> u32 {
        self.settings.image.width
    }

    fn components(&self) -> u8 {
        self.settings.image.components()
    }

    fn write_rows(&mut self, rows: &RowMatrix) -> Result<(), BackendError> {
        self.tally.accept(rows)?;
        self.pixels.extend_from_slice(rows.as_bytes());
        Ok(())
    }

    fn finish(mut self) -> Result<(), BackendError> {
        self.tally.complete()?;
        self.encode().map_err(|e| BackendError::Stream {
            side: StreamSide::Write,
            reason: format!("failed to encode {}: {e}", self.path.display()),
        })?;
        self.writer.flush()?;
        Ok(())
    }
}

impl ImageCodec for RustCodec {
    type Source = DecodedSource;
    type Sink = EncodingSink;

    fn open_source(&self, path: &Path) -> Result<DecodedSource, BackendError> {
        let open_err = |reason: String| BackendError::Open {
            side: StreamSide::Read,
            path: path.to_path_buf(),
            reason,
        };
        let decoded = ImageReader::open(path)
            .map_err(|e| open_err(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| open_err(e.to_string()))?
            .decode()
            .map_err(|e| open_err(e.to_string()))?;

        let (width, height) = (decoded.width(), decoded.height());
        let (color_space, pixels) = if decoded.color().has_alpha() {
            (ColorSpace::Rgba, decoded.to_rgba8().into_raw())
        } else {
            (ColorSpace::Rgb, decoded.to_rgb8().into_raw())
        };
        log::debug!(
            "decoded {} ({width}x{height} {color_space})",
            path.display()
        );
        Ok(DecodedSource {
            settings: ImageSettings {
                width,
                height,
                color_space,
                // The decoders apply no transfer function; rows are passed through as stored
                gamma: 1.0,
            },
            pixels,
            next_row: 0,
        })
    }

    fn open_sink(
        &self,
        path: &Path,
        settings: &EncodeSettings,
    ) -> Result<EncodingSink, BackendError> {
        let open_err = |reason: String| BackendError::Open {
            side: StreamSide::Write,
            path: path.to_path_buf(),
            reason,
        };
        if settings.image.color_space == ColorSpace::Rgba && !settings.format.supports_alpha() {
            return Err(open_err(format!(
                "{:?} cannot store {} images",
                settings.format, settings.image.color_space
            )));
        }
        let total = settings
            .image
            .row_len()
            .checked_mul(settings.image.height as usize)
            .ok_or_else(|| open_err("image too large".into()))?;
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(total)?;

        let file = File::create(path).map_err(|e| open_err(e.to_string()))?;
        Ok(EncodingSink {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            settings: *settings,
            tally: RowTally::new(&settings.image),
            pixels,
        })
    }
}
