//! # infoto
//!
//! Stamps a photo's shooting details into a solid-color border. Every image
//! gets a border on all four sides; the bottom border carries one caption
//! line built from the image's EXIF tags:
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │                                      │
//! │   ┌──────────────────────────────┐   │
//! │   │                              │   │
//! │   │            photo             │   │
//! │   │                              │   │
//! │   └──────────────────────────────┘   │
//! │  X100V | F/2.8 | 1/250S | ISO 400    │
//! └──────────────────────────────────────┘
//! ```
//!
//! The source is never modified. Output goes next to it as
//! `<stem>-edited.<ext>`, in the same format.
//!
//! # Pipeline
//!
//! ```text
//! 1. Caption    EXIF tags → formatted entries → one line       (metadata, caption)
//! 2. Glyphs     caption → per-character coverage bitmaps      (imaging::glyphs)
//! 3. Composite  top band, bordered body rows, captioned band  (imaging::compositor)
//! 4. Finalize   encoder finished, temp file renamed            (process)
//! ```
//!
//! Each stage sits behind a trait so tests can swap the real backend for an
//! in-memory one: [`metadata::MetadataReader`], [`imaging::FontRasterizer`]
//! and [`imaging::ImageCodec`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | TOML/JSON config loading, defaults, merging, and validation |
//! | [`metadata`] | Named EXIF tag lookup over the parsed EXIF block |
//! | [`caption`] | Formats tag values into the caption line |
//! | [`imaging`] | Codec, font, color, and compositing building blocks |
//! | [`process`] | Per-image pass and the parallel batch runner |
//! | [`scan`] | Resolves a target file or directory into images |
//! | [`naming`] | `-edited` output file names |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Row Streaming
//!
//! The compositor never builds a full output image itself. Bands and body
//! rows are handed to the sink as complete row blocks, one at a time. The
//! sink decides what to keep: `RustCodec` buffers every row until `finish`
//! because the `image` encoders take a whole frame.
//!
//! ## No Partial Outputs
//!
//! Output is written to a hidden `.partial` file and renamed only once the
//! encoder has finished. A failure at any point removes the temporary file,
//! so an `-edited` file on disk is always complete.
//!
//! ## Lossless-as-possible Re-encode
//!
//! JPEG output is written at quality 100; PNG and TIFF are lossless. The
//! source's color space is kept, so RGBA PNGs keep their alpha channel.

pub mod caption;
pub mod config;
pub mod imaging;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod process;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
