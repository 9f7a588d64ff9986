//! Output file naming.
//!
//! An annotated copy sits next to its source, with `-edited` inserted before
//! the extension:
//! - `DSCF0042.JPG` → `DSCF0042-edited.JPG`
//! - `photo.final.png` → `photo.final-edited.png`
//! - `noext` → `noext-edited`
//! - `.hidden` → `.hidden-edited` (a leading dot is not an extension)
//!
//! Only the file-name component is rewritten; dots in directory names never
//! count as an extension.

use std::path::{Path, PathBuf};

pub const EDITED_SUFFIX: &str = "-edited";

/// A file name split at its extension dot.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFileName<'a> {
    /// Everything before the last `.` (or the whole name).
    pub stem: &'a str,
    /// Text after the last `.`, without the dot.
    pub extension: Option<&'a str>,
}

/// Split a file name at its last dot.
///
/// Handles these patterns:
/// - `"photo.jpg"` → stem="photo", extension=Some("jpg")
/// - `"a.b.c"` → stem="a.b", extension=Some("c")
/// - `"noext"` → stem="noext", extension=None
/// - `".hidden"` → stem=".hidden", extension=None
/// - `"trailing."` → stem="trailing", extension=Some("")
pub fn parse_file_name(name: &str) -> ParsedFileName<'_> {
    match name.rfind('.') {
        Some(pos) if pos > 0 => ParsedFileName {
            stem: &name[..pos],
            extension: Some(&name[pos + 1..]),
        },
        _ => ParsedFileName {
            stem: name,
            extension: None,
        },
    }
}

/// The extension of a file name, if any.
pub fn filename_extension(name: &str) -> Option<&str> {
    parse_file_name(name).extension
}

/// Insert `-edited` before the extension of a file name.
pub fn derive_edited_name(name: &str) -> String {
    let parsed = parse_file_name(name);
    match parsed.extension {
        Some(ext) => format!("{}{EDITED_SUFFIX}.{ext}", parsed.stem),
        None => format!("{}{EDITED_SUFFIX}", parsed.stem),
    }
}

/// Whether a file name already is an annotated output.
pub fn is_edited_name(name: &str) -> bool {
    parse_file_name(name).stem.ends_with(EDITED_SUFFIX)
}

/// Output path for `source`: same directory, edited file name.
pub fn edited_path(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    source.with_file_name(derive_edited_name(&name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_before_extension() {
        assert_eq!(derive_edited_name("photo.jpg"), "photo-edited.jpg");
        assert_eq!(derive_edited_name("DSCF0042.JPG"), "DSCF0042-edited.JPG");
    }

    #[test]
    fn only_last_dot_counts() {
        assert_eq!(derive_edited_name("photo.final.png"), "photo.final-edited.png");
    }

    #[test]
    fn no_extension_appends() {
        assert_eq!(derive_edited_name("noext"), "noext-edited");
    }

    #[test]
    fn leading_dot_is_not_an_extension() {
        assert_eq!(derive_edited_name(".hidden"), ".hidden-edited");
        assert_eq!(filename_extension(".hidden"), None);
    }

    #[test]
    fn trailing_dot_keeps_empty_extension() {
        assert_eq!(derive_edited_name("trailing."), "trailing-edited.");
        assert_eq!(filename_extension("trailing."), Some(""));
    }

    #[test]
    fn empty_name() {
        assert_eq!(derive_edited_name(""), "-edited");
    }

    #[test]
    fn extension_lookup() {
        assert_eq!(filename_extension("a.tiff"), Some("tiff"));
        assert_eq!(filename_extension("a.b.jpeg"), Some("jpeg"));
        assert_eq!(filename_extension("plain"), None);
    }

    #[test]
    fn edited_path_keeps_directory() {
        assert_eq!(
            edited_path(Path::new("/photos/2024/img.jpg")),
            PathBuf::from("/photos/2024/img-edited.jpg")
        );
    }

    #[test]
    fn edited_path_ignores_dots_in_directories() {
        assert_eq!(
            edited_path(Path::new("/photos/v1.2/raw")),
            PathBuf::from("/photos/v1.2/raw-edited")
        );
    }

    #[test]
    fn edited_names_are_recognized() {
        assert!(is_edited_name("photo-edited.jpg"));
        assert!(is_edited_name("noext-edited"));
        assert!(!is_edited_name("photo.jpg"));
        assert!(!is_edited_name("edited-photo.jpg"));
    }
}
