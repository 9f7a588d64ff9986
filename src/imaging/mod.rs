//! Image processing: decode, border, caption, encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode / encode rows** | `image` crate via [`RustCodec`] |
//! | **EXIF block** | custom parser (JPEG APP1, TIFF, PNG `eXIf`) |
//! | **Glyphs** | FreeType via [`FreetypeFace`] |
//! | **Compositing** | [`build_border_band`] + [`composite_body`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image streams
//! - **Color**: Named palette and pixel writes
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`]
//! - **Glyphs**: [`FontRasterizer`] trait + [`FreetypeFace`]
//! - **Compositor**: Bands and body rows assembled from the pieces above

pub mod backend;
pub mod calculations;
pub mod color;
pub mod compositor;
pub mod exif_parser;
pub mod freetype_backend;
pub mod glyphs;
pub mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageCodec, ImageSink, ImageSource, RowMatrix};
pub use color::{NamedColor, Pixel};
pub use compositor::{
    BackgroundSpec, BandGeometry, CaptionLayer, CompositeError, build_border_band,
    composite_body,
};
pub use freetype_backend::FreetypeFace;
pub use glyphs::{FontError, FontRasterizer, GlyphBitmap, GlyphString, LayoutMetrics, rasterize};
pub use params::{ColorSpace, EncodeSettings, ImageSettings, OutputFormat, Quality};
pub use rust_backend::{RustCodec, supported_input_extensions};
