//! Annotation pipeline: one source photo in, one bordered, captioned copy out.
//!
//! ## Per-image pass
//!
//! ```text
//! Idle            caption assembled from metadata, glyphs rasterized
//!  → SourceOpen   source decoder open
//!  → DestOpen     encoder open on a hidden temporary file
//!  → SettingsSynced  output = source geometry + 2 × border, same color space & gamma
//!  → Compositing  top band, body rows, bottom band with caption
//!  → Finalized    encoder finished, temp file renamed to `<stem>-edited.<ext>`
//! ```
//!
//! Any error moves the pass to `Failed`. Streams and buffers are released by
//! drop on every path, and the temporary file is removed unless the pass
//! reached `Finalized`, so a partial image never appears under the output
//! name.
//!
//! ## Batch
//!
//! A directory target is annotated in parallel with rayon. FreeType faces
//! are not thread-safe, so faces are never shared: every rayon job split
//! loads its own face and reuses it for the images in that split. Rayon
//! decides the splits, so a batch may load the font several times per
//! thread, but never more than once per image. Progress is reported as
//! [`ProcessEvent`]s over an `mpsc` channel. By default the first failure
//! aborts the run; with `processing.continue_on_error` every image is
//! attempted and failures are collected.

use crate::caption::{CaptionAssembler, CaptionError, MetadataField};
use crate::config::InfotoConfig;
use crate::imaging::backend::{BackendError, ImageCodec, ImageSink, ImageSource};
use crate::imaging::calculations::bordered_dimensions;
use crate::imaging::{
    BackgroundSpec, BandGeometry, CaptionLayer, CompositeError, EncodeSettings, FontError,
    FontRasterizer, FreetypeFace, ImageSettings, LayoutMetrics, NamedColor, OutputFormat, Quality,
    build_border_band, composite_body, rasterize,
};
use crate::metadata::{ExifReader, MetadataError, MetadataReader};
use crate::naming::edited_path;
use crate::scan::ScanError;
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Caption(#[from] CaptionError),
    #[error(transparent)]
    Font(#[from] FontError),
    #[error("codec error: {0}")]
    Codec(#[from] BackendError),
    #[error("compositing failed: {0}")]
    Composite(#[from] CompositeError),
    #[error("no encoder for output file {}", .0.display())]
    UnsupportedOutput(PathBuf),
    #[error("{width}x{height} with a {border}px border is too large")]
    Oversized { width: u32, height: u32, border: u32 },
    #[error("{}: {error}", path.display())]
    InImage {
        path: PathBuf,
        #[source]
        error: Box<ProcessError>,
    },
}

/// Coarse failure category, stable across error variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FileAccess,
    CodecOpenFailure,
    CodecDataMissing,
    BufferGrowthFailure,
    FontInitFailure,
    FontFaceLoadFailure,
    GlyphRasterizationFailure,
    GlyphStringFailure,
    CompositingFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

fn backend_kind(e: &BackendError) -> ErrorKind {
    match e {
        BackendError::Io(_) => ErrorKind::FileAccess,
        BackendError::Open { .. } => ErrorKind::CodecOpenFailure,
        BackendError::Allocation(_) => ErrorKind::BufferGrowthFailure,
        BackendError::Stream { .. }
        | BackendError::RowLength { .. }
        | BackendError::TooManyRows { .. }
        | BackendError::Incomplete { .. } => ErrorKind::CompositingFailure,
    }
}

impl ProcessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::Scan(_) => ErrorKind::FileAccess,
            Self::Metadata(MetadataError::Io(_)) => ErrorKind::FileAccess,
            Self::Metadata(_) => ErrorKind::CodecDataMissing,
            Self::Caption(CaptionError::DataMissing { .. }) => ErrorKind::CodecDataMissing,
            Self::Caption(CaptionError::BufferGrowth(_)) => ErrorKind::BufferGrowthFailure,
            Self::Font(FontError::Init(_)) => ErrorKind::FontInitFailure,
            Self::Font(
                FontError::UnknownFormat(_) | FontError::FaceLoad { .. } | FontError::PixelSize { .. },
            ) => ErrorKind::FontFaceLoadFailure,
            Self::Font(FontError::LoadChar { .. } | FontError::GetGlyph { .. }) => {
                ErrorKind::GlyphRasterizationFailure
            }
            Self::Font(FontError::GlyphString(_)) => ErrorKind::GlyphStringFailure,
            Self::Codec(e) | Self::Composite(CompositeError::Codec(e)) => backend_kind(e),
            Self::Composite(CompositeError::Allocation(_)) => ErrorKind::BufferGrowthFailure,
            Self::Composite(_) | Self::Oversized { .. } => ErrorKind::CompositingFailure,
            Self::UnsupportedOutput(_) => ErrorKind::CodecOpenFailure,
            Self::InImage { error, .. } => error.kind(),
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Everything one annotation pass needs besides the font and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotateSettings {
    pub background: BackgroundSpec,
    pub font_color: NamedColor,
    pub layout: LayoutMetrics,
    pub separator: String,
    pub fields: Vec<MetadataField>,
}

impl AnnotateSettings {
    pub fn from_config(config: &InfotoConfig) -> Self {
        Self {
            background: config.background.spec(),
            font_color: config.font.color,
            layout: config.layout,
            separator: config.caption.separator.clone(),
            fields: config.metadata.clone(),
        }
    }
}

// ============================================================================
// Single image
// ============================================================================

/// Where a pass is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    SourceOpen,
    DestOpen,
    SettingsSynced,
    Compositing,
    Finalized,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::SourceOpen => "source open",
            Self::DestOpen => "destination open",
            Self::SettingsSynced => "settings synced",
            Self::Compositing => "compositing",
            Self::Finalized => "finalized",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct Pass<'a> {
    source: &'a Path,
    state: PipelineState,
}

impl Pass<'_> {
    fn advance(&mut self, next: PipelineState) {
        log::debug!("{}: {} → {next}", self.source.display(), self.state);
        self.state = next;
    }
}

/// Removes the temporary output on drop unless it was persisted.
struct TempOutput {
    path: PathBuf,
    persisted: bool,
}

impl TempOutput {
    /// `dir/.name.partial` next to `final_path`.
    fn beside(final_path: &Path) -> Self {
        let name = final_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        Self {
            path: final_path.with_file_name(format!(".{name}.partial")),
            persisted: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn persist(mut self, final_path: &Path) -> std::io::Result<()> {
        std::fs::rename(&self.path, final_path)?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for TempOutput {
    fn drop(&mut self) {
        if self.persisted || !self.path.exists() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("removed partial output {}", self.path.display()),
            Err(e) => log::warn!("cannot remove {}: {e}", self.path.display()),
        }
    }
}

/// Result of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedImage {
    pub source: PathBuf,
    pub output: PathBuf,
    pub caption: String,
    /// Output width and height, border included.
    pub dimensions: (u32, u32),
}

/// Annotate `source`, reading its caption values from the file's EXIF block.
pub fn annotate_image(
    codec: &impl ImageCodec,
    font: &impl FontRasterizer,
    source: &Path,
    settings: &AnnotateSettings,
) -> Result<AnnotatedImage, ProcessError> {
    let metadata = ExifReader::open(source)?;
    annotate_with_metadata(codec, font, &metadata, source, settings)
}

/// Annotate `source` with caption values from `metadata`.
pub fn annotate_with_metadata(
    codec: &impl ImageCodec,
    font: &impl FontRasterizer,
    metadata: &impl MetadataReader,
    source: &Path,
    settings: &AnnotateSettings,
) -> Result<AnnotatedImage, ProcessError> {
    let mut pass = Pass {
        source,
        state: PipelineState::Idle,
    };
    let result = run_pass(&mut pass, codec, font, metadata, settings);
    if let Err(e) = &result {
        log::debug!("{}: failed while {}: {e}", source.display(), pass.state);
        pass.advance(PipelineState::Failed);
    }
    result
}

fn run_pass<C: ImageCodec>(
    pass: &mut Pass<'_>,
    codec: &C,
    font: &impl FontRasterizer,
    metadata: &impl MetadataReader,
    settings: &AnnotateSettings,
) -> Result<AnnotatedImage, ProcessError> {
    let source = pass.source;
    let caption = CaptionAssembler::new(&settings.separator).caption(&settings.fields, metadata)?;
    let glyphs = rasterize(font, &caption)?;

    let output = edited_path(source);
    let format = OutputFormat::from_path(&output)
        .ok_or_else(|| ProcessError::UnsupportedOutput(output.clone()))?;

    let mut reader = codec.open_source(source)?;
    pass.advance(PipelineState::SourceOpen);

    let src = reader.settings();
    let border = settings.background.border_width;
    let (width, height) =
        bordered_dimensions((src.width, src.height), border).ok_or(ProcessError::Oversized {
            width: src.width,
            height: src.height,
            border,
        })?;
    let encode = EncodeSettings {
        image: ImageSettings {
            width,
            height,
            color_space: src.color_space,
            gamma: src.gamma,
        },
        quality: Quality::MAX,
        format,
    };
    // Declared before the sink so the file is closed before it is removed.
    let temp = TempOutput::beside(&output);
    let mut sink = codec.open_sink(temp.path(), &encode)?;
    pass.advance(PipelineState::DestOpen);
    log::debug!(
        "{}: {}x{} {} gamma {} → {width}x{height}",
        source.display(),
        src.width,
        src.height,
        src.color_space,
        src.gamma
    );
    pass.advance(PipelineState::SettingsSynced);

    pass.advance(PipelineState::Compositing);
    let geometry = BandGeometry::of(&sink);
    sink.write_rows(&build_border_band(geometry, &settings.background, None)?)?;
    composite_body(&mut reader, &mut sink, &settings.background)?;
    let layer = (!glyphs.is_empty()).then_some(CaptionLayer {
        glyphs: &glyphs,
        metrics: &settings.layout,
        color: settings.font_color,
    });
    sink.write_rows(&build_border_band(geometry, &settings.background, layer)?)?;
    sink.finish()?;
    drop(reader);

    temp.persist(&output)?;
    pass.advance(PipelineState::Finalized);
    Ok(AnnotatedImage {
        source: source.to_path_buf(),
        output,
        caption,
        dimensions: (width, height),
    })
}

// ============================================================================
// Batch
// ============================================================================

/// Progress events sent while a batch runs.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    Started {
        total: usize,
    },
    Annotated {
        /// 1-based position in the batch.
        index: usize,
        image: AnnotatedImage,
    },
    Failed {
        index: usize,
        source: PathBuf,
        kind: ErrorKind,
        message: String,
    },
}

/// A batch image that could not be annotated.
#[derive(Debug)]
pub struct BatchFailure {
    pub source: PathBuf,
    pub error: ProcessError,
}

/// Outcome of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub annotated: Vec<AnnotatedImage>,
    pub failed: Vec<BatchFailure>,
}

/// Annotate every image with the FreeType font from `config`.
pub fn annotate_batch(
    codec: &impl ImageCodec,
    images: &[PathBuf],
    config: &InfotoConfig,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<BatchReport, ProcessError> {
    let font = &config.font;
    annotate_batch_with(
        codec,
        images,
        &AnnotateSettings::from_config(config),
        || FreetypeFace::load(&font.ttf_file, font.point),
        config.processing.continue_on_error,
        progress,
    )
}

/// Annotate every image, loading one font per rayon job split with `load_font`.
///
/// Without `continue_on_error` the first failure is returned as
/// [`ProcessError::InImage`]; images already finished keep their output.
pub fn annotate_batch_with<C, F, L>(
    codec: &C,
    images: &[PathBuf],
    settings: &AnnotateSettings,
    load_font: L,
    continue_on_error: bool,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<BatchReport, ProcessError>
where
    C: ImageCodec,
    F: FontRasterizer,
    L: Fn() -> Result<F, FontError> + Sync,
{
    let progress = progress.as_ref();
    if let Some(tx) = progress {
        tx.send(ProcessEvent::Started {
            total: images.len(),
        })
        .ok();
    }

    let results = images.par_iter().enumerate().map_init(
        &load_font,
        |font, (i, path)| {
            let result = match font {
                Ok(font) => annotate_image(codec, &*font, path, settings),
                Err(e) => Err(e.clone().into()),
            };
            if let Some(tx) = progress {
                let event = match &result {
                    Ok(image) => ProcessEvent::Annotated {
                        index: i + 1,
                        image: image.clone(),
                    },
                    Err(e) => ProcessEvent::Failed {
                        index: i + 1,
                        source: path.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    },
                };
                tx.send(event).ok();
            }
            result.map_err(|error| BatchFailure {
                source: path.clone(),
                error,
            })
        },
    );

    if !continue_on_error {
        let annotated = results
            .collect::<Result<Vec<_>, _>>()
            .map_err(|f| ProcessError::InImage {
                path: f.source,
                error: Box::new(f.error),
            })?;
        return Ok(BatchReport {
            annotated,
            failed: Vec::new(),
        });
    }

    let mut report = BatchReport::default();
    for result in results.collect::<Vec<_>>() {
        match result {
            Ok(image) => report.annotated.push(image),
            Err(failure) => report.failed.push(failure),
        }
    }
    Ok(report)
}
