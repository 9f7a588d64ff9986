//! Annotation configuration.
//!
//! Handles loading, validating, and merging config files. A config file
//! only needs the keys it wants to change; everything else comes from the
//! stock defaults.
//!
//! ## Config File Formats
//!
//! - `*.json`: the original infoto format (`image`, `font`, `background`,
//!   `metadata`), still accepted as-is.
//! - anything else: TOML, as printed by `infoto gen-config`.
//!
//! Both are parsed into the same structure and layered on the defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! target = "photos/"          # Image or directory to annotate (alias: image)
//!
//! [font]
//! point = 24                  # Glyph height in pixels
//! color = "black"             # black | blue | green | red | white
//! ttf_file = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"
//!
//! [background]
//! color = "white"             # Border color, same names as font.color
//! pixels = 60                 # Border width on every side
//!
//! [caption]
//! separator = " | "           # Placed between metadata entries
//!
//! [layout]
//! whitespace_width = 20       # Advance of a space, in pixels
//! kern = 4                    # Gap after every glyph, in pixels
//!
//! [[metadata]]                # One table per caption entry, in order
//! name = "FNumber"            # EXIF tag name
//! prefix = "f/"               # Up to 10 characters
//! postfix = ""                # Up to 10 characters
//!
//! [processing]
//! max_processes = 4           # Max parallel workers (omit for auto = CPU cores)
//! continue_on_error = false   # Keep going after a failed image in a directory run
//! ```
//!
//! Unknown keys are rejected to catch typos early. Unknown color names are
//! not: they fall back to white.

use crate::caption::{DEFAULT_SEPARATOR, MAX_AFFIX_CHARS, MAX_TAG_NAME_CHARS, MetadataField};
use crate::imaging::{BackgroundSpec, LayoutMetrics, NamedColor};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot convert config value: {0}")]
    Convert(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Annotation configuration.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InfotoConfig {
    /// Image file or directory to annotate. The command line takes precedence.
    #[serde(alias = "image", skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    /// Caption font.
    pub font: FontConfig,
    /// Border around the image.
    pub background: BackgroundConfig,
    /// Caption line settings.
    pub caption: CaptionConfig,
    /// Glyph spacing.
    pub layout: LayoutMetrics,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Caption entries, in display order.
    pub metadata: Vec<MetadataField>,
}

impl Default for InfotoConfig {
    fn default() -> Self {
        Self {
            target: None,
            font: FontConfig::default(),
            background: BackgroundConfig::default(),
            caption: CaptionConfig::default(),
            layout: LayoutMetrics::default(),
            processing: ProcessingConfig::default(),
            metadata: default_metadata(),
        }
    }
}

fn default_metadata() -> Vec<MetadataField> {
    vec![
        MetadataField::new("Model", "", ""),
        MetadataField::new("FNumber", "f/", ""),
        MetadataField::new("ExposureTime", "", "s"),
        MetadataField::new("ISOSpeedRatings", "ISO ", ""),
        MetadataField::new("FocalLength", "", "mm"),
    ]
}

impl InfotoConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.font.point == 0 {
            return Err(ConfigError::Validation(
                "font.point must be greater than 0".into(),
            ));
        }
        if self.font.ttf_file.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "font.ttf_file must not be empty".into(),
            ));
        }
        for (i, field) in self.metadata.iter().enumerate() {
            let name_len = field.name.chars().count();
            if name_len == 0 || name_len > MAX_TAG_NAME_CHARS {
                return Err(ConfigError::Validation(format!(
                    "metadata[{i}].name must be 1-{MAX_TAG_NAME_CHARS} characters"
                )));
            }
            for (key, value) in [("prefix", &field.prefix), ("postfix", &field.postfix)] {
                if value.chars().count() > MAX_AFFIX_CHARS {
                    return Err(ConfigError::Validation(format!(
                        "metadata[{i}].{key} must be at most {MAX_AFFIX_CHARS} characters"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Caption font settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontConfig {
    /// Glyph height in pixels.
    pub point: u32,
    pub color: NamedColor,
    /// Path to a TrueType/OpenType font, relative to the working directory.
    pub ttf_file: PathBuf,
    /// Read from older JSON configs; the caption is always centered in the band.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_offset_pct: Option<f64>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            point: 24,
            color: NamedColor::Black,
            ttf_file: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
            y_offset_pct: None,
        }
    }
}

/// Border settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundConfig {
    pub color: NamedColor,
    /// Border width, in pixels, on every side.
    pub pixels: u32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            color: NamedColor::White,
            pixels: 60,
        }
    }
}

impl BackgroundConfig {
    pub fn spec(&self) -> BackgroundSpec {
        BackgroundSpec {
            color: self.color,
            border_width: self.pixels,
        }
    }
}

/// Caption line settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptionConfig {
    /// Placed between consecutive metadata entries.
    pub separator: String,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
    /// In a directory run, keep annotating after an image fails and report
    /// every failure at the end. When false the run stops at the first error.
    pub continue_on_error: bool,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(InfotoConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely. Arrays are
///   values, so `[[metadata]]` in a user file replaces the default list.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Load a config file as a raw TOML value, whatever its format.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    if is_json(path) {
        let json: serde_json::Value = serde_json::from_str(&content)?;
        return Ok(toml::Value::try_from(json)?);
    }
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<InfotoConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: InfotoConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file, or the stock defaults when `path` is `None`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: Option<&Path>) -> Result<InfotoConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = path.map(load_raw_config).transpose()?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# infoto Configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Image file or directory to annotate. A path on the command line wins.
# target = "photos/"

# ---------------------------------------------------------------------------
# Caption font
# ---------------------------------------------------------------------------
[font]
# Glyph height in pixels.
point = 24

# Text color: black, blue, green, red or white. Unknown names mean white.
color = "black"

# TrueType/OpenType font file, relative to the working directory.
ttf_file = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"

# ---------------------------------------------------------------------------
# Border
# ---------------------------------------------------------------------------
[background]
# Border color, same names as font.color.
color = "white"

# Border width in pixels, added on every side. The caption is drawn in the
# bottom border, so it should be taller than font.point.
pixels = 60

# ---------------------------------------------------------------------------
# Caption line
# ---------------------------------------------------------------------------
[caption]
# Placed between metadata entries.
separator = " | "

# ---------------------------------------------------------------------------
# Glyph spacing
# ---------------------------------------------------------------------------
[layout]
# Advance of a space character, in pixels.
whitespace_width = 20

# Gap after every glyph, in pixels.
kern = 4

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# When annotating a directory, keep going after a failed image.
continue_on_error = false

# ---------------------------------------------------------------------------
# Caption entries
# ---------------------------------------------------------------------------
# One table per entry, shown in this order. `name` is an EXIF tag name;
# prefix and postfix are at most 10 characters. The entry is uppercased.
# Tags an image doesn't carry are skipped.

[[metadata]]
name = "Model"

[[metadata]]
name = "FNumber"
prefix = "f/"

[[metadata]]
name = "ExposureTime"
postfix = "s"

[[metadata]]
name = "ISOSpeedRatings"
prefix = "ISO "

[[metadata]]
name = "FocalLength"
postfix = "mm"
"##
}
