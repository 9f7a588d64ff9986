//! Target discovery.
//!
//! `infoto annotate` takes one path. A file is annotated as-is; a directory
//! is listed (not recursively) and every photo in it is annotated:
//!
//! ```text
//! shoot/
//! ├── .DS_Store               # hidden: skipped
//! ├── DSCF0041.JPG            # annotated
//! ├── DSCF0042.JPG            # annotated
//! ├── DSCF0042-edited.JPG     # earlier output: skipped
//! ├── notes.txt               # not a photo: skipped
//! └── selects/                # subdirectory: skipped
//! ```
//!
//! Extensions are matched case-insensitively against
//! [`supported_input_extensions`]. Results are sorted by path so runs are
//! reproducible.

use crate::imaging::supported_input_extensions;
use crate::naming::{filename_extension, is_edited_name};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("target does not exist: {}", .0.display())]
    NotFound(PathBuf),
    #[error("no images to annotate in {}", .0.display())]
    NoImages(PathBuf),
}

/// Resolve an `annotate` target into the list of images to process.
pub fn resolve_targets(target: &Path) -> Result<Vec<PathBuf>, ScanError> {
    if target.is_dir() {
        let images = collect_images(target)?;
        if images.is_empty() {
            return Err(ScanError::NoImages(target.to_path_buf()));
        }
        return Ok(images);
    }
    if !target.exists() {
        return Err(ScanError::NotFound(target.to_path_buf()));
    }
    Ok(vec![target.to_path_buf()])
}

/// Photos directly inside `dir`, sorted by path.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut images: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_candidate(p))
        .collect();
    images.sort();
    log::debug!("found {} images in {}", images.len(), dir.display());
    Ok(images)
}

fn is_candidate(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    if name.starts_with('.') || is_edited_name(&name) {
        return false;
    }
    filename_extension(&name)
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| supported_input_extensions().contains(&ext.as_str()))
}
