//! Studio configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user file overrides only the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [text]
//! family = "Arial"          # Default caption font family
//! size = 40                 # Default caption size (px, em size)
//! color = "#FFFFFF"         # Fill color
//! stroke_width = 2          # Outline width (0 = none, at most 64)
//! stroke_color = "#000000"  # Outline color
//! bottom_margin = 50.0      # Caption center distance from the bottom edge
//!
//! [fonts]
//! directory = "fonts"       # Optional: load every .ttf/.otf below this dir
//!
//! [fonts.families]          # Optional: explicit family -> file mapping
//! "Noto Sans JP" = "fonts/NotoSansJP-Regular.ttf"
//!
//! [export]
//! main_icon_name = "main.png"
//! tab_icon_name = "tab.png"
//! resample = "lanczos3"     # nearest | triangle | catmull-rom | gaussian | lanczos3
//!
//! [processing]
//! max_processes = 4         # Max parallel render workers (omit for auto = CPU cores)
//! ```
//!
//! Relative font paths resolve against the directory holding the config file.
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{FontBook, FontError, Resample};
use crate::stamp::{FontStyle, MAX_STROKE_WIDTH};
use crate::types::Color;
use crate::workspace::DEFAULT_TEXT_BOTTOM_MARGIN;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Studio configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudioConfig {
    /// Default caption style for newly loaded stamps.
    pub text: TextConfig,
    /// Where font faces come from.
    pub fonts: FontsConfig,
    /// Export file naming and resampling.
    pub export: ExportConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl StudioConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.text.size == 0 {
            return Err(ConfigError::Validation("text.size must be positive".into()));
        }
        if self.text.stroke_width > MAX_STROKE_WIDTH {
            return Err(ConfigError::Validation(format!(
                "text.stroke_width must be at most {MAX_STROKE_WIDTH}"
            )));
        }
        if !self.text.bottom_margin.is_finite() {
            return Err(ConfigError::Validation(
                "text.bottom_margin must be a finite number".into(),
            ));
        }
        for (key, name) in [
            ("export.main_icon_name", &self.export.main_icon_name),
            ("export.tab_icon_name", &self.export.tab_icon_name),
        ] {
            if name.is_empty() || name.contains('/') || name.contains('\\') {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a plain file name"
                )));
            }
            if is_item_filename(name) {
                return Err(ConfigError::Validation(format!(
                    "{key} {name:?} collides with per-item file names"
                )));
            }
        }
        if self.export.main_icon_name == self.export.tab_icon_name {
            return Err(ConfigError::Validation(
                "export.main_icon_name and export.tab_icon_name must differ".into(),
            ));
        }
        Ok(())
    }
}

/// `NN.png`-style names are reserved for the per-item files.
fn is_item_filename(name: &str) -> bool {
    name.strip_suffix(".png")
        .is_some_and(|stem| !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()))
}

/// Default caption style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    pub family: String,
    pub size: u32,
    pub color: Color,
    pub stroke_width: u32,
    pub stroke_color: Color,
    /// Caption center distance from the bottom edge of the editing surface.
    pub bottom_margin: f64,
}

impl Default for TextConfig {
    fn default() -> Self {
        let font = FontStyle::default();
        Self {
            family: font.family,
            size: font.size,
            color: font.color,
            stroke_width: font.stroke_width,
            stroke_color: font.stroke_color,
            bottom_margin: DEFAULT_TEXT_BOTTOM_MARGIN,
        }
    }
}

impl TextConfig {
    pub fn font_style(&self) -> FontStyle {
        FontStyle {
            family: self.family.clone(),
            size: self.size,
            color: self.color,
            stroke_width: self.stroke_width,
            stroke_color: self.stroke_color,
        }
    }
}

/// Font sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontsConfig {
    /// Directory scanned for `.ttf`/`.otf` files; family = file stem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// Explicit family name → font file.
    pub families: BTreeMap<String, String>,
}

/// Export naming and resampling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub main_icon_name: String,
    pub tab_icon_name: String,
    pub resample: Resample,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            main_icon_name: "main.png".to_string(),
            tab_icon_name: "tab.png".to_string(),
            resample: Resample::default(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel render workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
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

/// Build the font book described by `config`.
///
/// Relative paths resolve against `base_dir`. A missing directory is an
/// error; individual bad files inside it are skipped. Explicit families are
/// loaded after the directory scan and win on name clashes.
pub fn build_font_book(
    config: &StudioConfig,
    base_dir: &Path,
) -> Result<FontBook, FontError> {
    let mut book = FontBook::new();
    book.set_default_family(config.text.family.clone());

    if let Some(dir) = &config.fonts.directory {
        let loaded = book.load_dir(&base_dir.join(dir))?;
        log::info!("loaded {loaded} font(s) from {dir}");
    }
    for (family, file) in &config.fonts.families {
        book.load_file(family, &base_dir.join(file))?;
    }
    if book.is_empty() {
        log::warn!("no fonts configured; captions will not be drawn");
    } else if book.resolve(&config.text.family).is_none() {
        log::warn!(
            "default family {:?} is not loaded; unknown families will not be drawn",
            config.text.family
        );
    }
    Ok(book)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(StudioConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
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

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<StudioConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: StudioConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, merged on top of stock defaults.
///
/// A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<StudioConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Stamp Studio Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Default caption style for newly loaded stamps
# ---------------------------------------------------------------------------
[text]
family = "Arial"
# Em size in pixels, as in a CSS "40px Arial" font.
size = 40
color = "#FFFFFF"
# Outline width in pixels, at most 64; 0 disables the outline.
stroke_width = 2
stroke_color = "#000000"
# Distance of the caption center from the bottom of the 370x320 editing surface.
bottom_margin = 50.0

# ---------------------------------------------------------------------------
# Fonts
# ---------------------------------------------------------------------------
# Relative paths resolve against the directory holding this file.
[fonts]
# Load every .ttf/.otf below a directory, named by file stem:
# directory = "fonts"

# Or map family names to files explicitly:
[fonts.families]
# "Noto Sans JP" = "fonts/NotoSansJP-Regular.ttf"

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# File names of the two icon assets. Per-item files are always 01.png, 02.png, ...
main_icon_name = "main.png"
tab_icon_name = "tab.png"
# Image resampling filter: nearest, triangle, catmull-rom, gaussian, lanczos3.
resample = "lanczos3"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel render workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_stamp_defaults() {
        let config = StudioConfig::default();
        assert_eq!(config.text.font_style(), FontStyle::default());
        assert_eq!(config.text.bottom_margin, 50.0);
        assert_eq!(config.export.main_icon_name, "main.png");
        assert_eq!(config.export.tab_icon_name, "tab.png");
        assert_eq!(config.export.resample, Resample::Lanczos3);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[text]
color = "#FF0000"
"##;
        let config: StudioConfig = toml::from_str(toml).unwrap();
        // Overridden value
        assert_eq!(config.text.color, Color::rgb(255, 0, 0));
        // Default values preserved
        assert_eq!(config.text.size, 40);
        assert_eq!(config.export.main_icon_name, "main.png");
    }

    #[test]
    fn parse_font_families() {
        let toml = r##"
[fonts]
directory = "fonts"

[fonts.families]
"Noto Sans JP" = "NotoSansJP.ttf"
"##;
        let config: StudioConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.fonts.directory.as_deref(), Some("fonts"));
        assert_eq!(
            config.fonts.families.get("Noto Sans JP").map(String::as_str),
            Some("NotoSansJP.ttf")
        );
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config, StudioConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[text]
size = 56
stroke_width = 0

[export]
resample = "nearest"
"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.text.size, 56);
        assert_eq!(config.text.stroke_width, 0);
        assert_eq!(config.export.resample, Resample::Nearest);
        // Unspecified values should be defaults
        assert_eq!(config.text.family, "Arial");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        fs::write(&config_path, "this is not [valid toml").unwrap();
        assert!(matches!(load_config(&config_path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn integer_bottom_margin_is_accepted() {
        let overlay: toml::Value = toml::from_str("[text]\nbottom_margin = 20").unwrap();
        let config = resolve_config(stock_defaults_value(), Some(overlay)).unwrap();
        assert_eq!(config.text.bottom_margin, 20.0);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"size = 40"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"size = 70"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("size").unwrap().as_integer(), Some(70));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[text]
size = 40
family = "Arial"
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[text]
size = 64
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let text = merged.get("text").unwrap();
        assert_eq!(text.get("size").unwrap().as_integer(), Some(64));
        // family preserved from base
        assert_eq!(text.get("family").unwrap().as_str(), Some("Arial"));
    }

    #[test]
    fn merge_toml_deep_nested() {
        let base: toml::Value = toml::from_str(
            r#"
[fonts.families]
A = "a.ttf"
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[fonts.families]
B = "b.ttf"
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let families = merged.get("fonts").unwrap().get("families").unwrap();
        assert_eq!(families.get("A").unwrap().as_str(), Some("a.ttf"));
        assert_eq!(families.get("B").unwrap().as_str(), Some("b.ttf"));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[text]
sise = 40
"#;
        let result: Result<StudioConfig, _> = toml::from_str(toml_str);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<StudioConfig, _> = toml::from_str("[textt]\nsize = 40");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[export]\nmain = \"m.png\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(StudioConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_zero_font_size() {
        let mut config = StudioConfig::default();
        config.text.size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("text.size"));
    }

    #[test]
    fn validate_rejects_oversized_stroke() {
        let mut config = StudioConfig::default();
        config.text.stroke_width = MAX_STROKE_WIDTH;
        assert!(config.validate().is_ok());
        config.text.stroke_width = u32::MAX / 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("text.stroke_width"));
    }

    #[test]
    fn validate_icon_names() {
        let mut config = StudioConfig::default();
        config.export.tab_icon_name = "main.png".into();
        assert!(config.validate().is_err());

        let mut config = StudioConfig::default();
        config.export.main_icon_name = "03.png".into();
        assert!(config.validate().is_err());

        let mut config = StudioConfig::default();
        config.export.main_icon_name = "icons/main.png".into();
        assert!(config.validate().is_err());

        let mut config = StudioConfig::default();
        config.export.main_icon_name = "".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[text]\nsize = 0\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // effective_threads tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        assert_eq!(effective_threads(&config), cores);
    }

    // =========================================================================
    // Font book tests
    // =========================================================================

    #[test]
    fn build_font_book_without_fonts_is_empty() {
        let tmp = TempDir::new().unwrap();
        let book = build_font_book(&StudioConfig::default(), tmp.path()).unwrap();
        assert!(book.is_empty());
    }

    #[test]
    fn build_font_book_missing_directory_is_error() {
        let tmp = TempDir::new().unwrap();
        let mut config = StudioConfig::default();
        config.fonts.directory = Some("no-such-dir".into());
        assert!(matches!(
            build_font_book(&config, tmp.path()),
            Err(FontError::Walk(_))
        ));
    }

    #[test]
    fn build_font_book_missing_family_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let mut config = StudioConfig::default();
        config
            .fonts
            .families
            .insert("Ghost".into(), "ghost.ttf".into());
        assert!(matches!(
            build_font_book(&config, tmp.path()),
            Err(FontError::Io { .. })
        ));
    }

    // =========================================================================
    // stock config tests
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let _: toml::Value =
            toml::from_str(stock_config_toml()).expect("stock config must be valid TOML");
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: StudioConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, StudioConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in ["[text]", "[fonts]", "[fonts.families]", "[export]", "[processing]"] {
            assert!(content.contains(section), "missing {section}");
        }
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        assert!(val.is_table());
        for key in ["text", "fonts", "export", "processing"] {
            assert!(val.get(key).is_some(), "missing {key}");
        }
    }
}
