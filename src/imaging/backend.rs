//! Row-oriented image codec traits and shared types.
//!
//! The [`ImageCodec`] trait opens the two streams an annotation pass needs:
//! an [`ImageSource`] that hands out decoded rows in order, and an
//! [`ImageSink`] that accepts whole rows (one [`RowMatrix`] at a time) and
//! encodes them on [`finish`](ImageSink::finish).
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec) on the `image` crate. Tests
//! use the in-memory codec in [`tests`], which records every row written.
//!
//! Both stream types release their resources on drop, so every exit path
//! of a pass (success, error, panic) closes them.

use super::params::{EncodeSettings, ImageSettings};
use std::collections::TryReserveError;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Which half of a transcode a codec error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSide {
    Read,
    Write,
}

impl fmt::Display for StreamSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot open {side} stream for {}: {reason}", path.display())]
    Open {
        side: StreamSide,
        path: PathBuf,
        reason: String,
    },
    #[error("{side} stream failed: {reason}")]
    Stream { side: StreamSide, reason: String },
    #[error("row is {actual} bytes, sink expects {expected}")]
    RowLength { expected: usize, actual: usize },
    #[error("sink holds {height} rows, refusing row {row}")]
    TooManyRows { height: u32, row: u32 },
    #[error("sink finished after {written} of {height} rows")]
    Incomplete { height: u32, written: u32 },
    #[error("cannot allocate image buffer: {0}")]
    Allocation(#[from] TryReserveError),
}

/// A block of complete rows, stored contiguously.
///
/// Every byte is initialized at construction, so a matrix handed to a sink
/// is never partially written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMatrix {
    rows: usize,
    row_len: usize,
    data: Vec<u8>,
}

impl RowMatrix {
    /// A zeroed `rows × row_len` matrix. Fails instead of aborting when the
    /// allocation is refused.
    pub fn zeroed(rows: usize, row_len: usize) -> Result<Self, TryReserveError> {
        let total = rows.checked_mul(row_len).unwrap_or(usize::MAX);
        let mut data = Vec::new();
        data.try_reserve_exact(total)?;
        data.resize(total, 0);
        Ok(Self {
            rows,
            row_len,
            data,
        })
    }

    /// Wrap existing row-major bytes. `None` if the length doesn't divide evenly.
    pub fn from_bytes(row_len: usize, data: Vec<u8>) -> Option<Self> {
        if row_len == 0 {
            return data.is_empty().then_some(Self {
                rows: 0,
                row_len,
                data,
            });
        }
        (data.len() % row_len == 0).then(|| Self {
            rows: data.len() / row_len,
            row_len,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn row_len(&self) -> usize {
        self.row_len
    }

    pub fn row(&self, index: usize) -> &[u8] {
        &self.data[index * self.row_len..(index + 1) * self.row_len]
    }

    pub fn row_mut(&mut self, index: usize) -> &mut [u8] {
        &mut self.data[index * self.row_len..(index + 1) * self.row_len]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[u8]> {
        (0..self.rows).map(|i| self.row(i))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Sequential row decoder for one image.
pub trait ImageSource {
    /// Geometry and color parameters of the decoded rows.
    fn settings(&self) -> ImageSettings;

    /// The next row, or `None` once every row has been read.
    fn read_row(&mut self) -> Result<Option<&[u8]>, BackendError>;
}

/// Row encoder for one output image.
pub trait ImageSink {
    /// Output width in pixels.
    fn width(&self) -> u32;

    /// Channels per pixel (3 or 4).
    fn components(&self) -> u8;

    /// Append complete rows. A matrix is accepted whole or not at all.
    fn write_rows(&mut self, rows: &RowMatrix) -> Result<(), BackendError>;

    /// Encode and flush. Fails if fewer rows than the image height arrived.
    fn finish(self) -> Result<(), BackendError>
    where
        Self: Sized;
}

/// Opens decoding and encoding streams.
pub trait ImageCodec: Sync {
    type Source: ImageSource;
    type Sink: ImageSink;

    fn open_source(&self, path: &Path) -> Result<Self::Source, BackendError>;

    fn open_sink(&self, path: &Path, settings: &EncodeSettings)
    -> Result<Self::Sink, BackendError>;
}

/// Row bookkeeping shared by sinks: checks length and count of every write.
#[derive(Debug, Clone)]
pub struct RowTally {
    row_len: usize,
    height: u32,
    written: u32,
}

impl RowTally {
    pub fn new(settings: &ImageSettings) -> Self {
        Self {
            row_len: settings.row_len(),
            height: settings.height,
            written: 0,
        }
    }

    /// Validate a matrix before any of it is stored.
    pub fn accept(&mut self, rows: &RowMatrix) -> Result<(), BackendError> {
        if rows.row_len() != self.row_len {
            return Err(BackendError::RowLength {
                expected: self.row_len,
                actual: rows.row_len(),
            });
        }
        let after = self.written as usize + rows.rows();
        if after > self.height as usize {
            return Err(BackendError::TooManyRows {
                height: self.height,
                row: self.written.saturating_add(1),
            });
        }
        self.written = after as u32;
        Ok(())
    }

    pub fn written(&self) -> u32 {
        self.written
    }

    /// Fails unless exactly `height` rows were accepted.
    pub fn complete(&self) -> Result<(), BackendError> {
        if self.written != self.height {
            return Err(BackendError::Incomplete {
                height: self.height,
                written: self.written,
            });
        }
        Ok(())
    }
}
