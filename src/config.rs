//! Configuration file handling for matrix-pixelator.
//!
//! Loads configuration from `~/.config/matrix-pixelator/config.toml` or a custom path.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::settings::RawSettings;

pub const DEFAULT_TABLE_DIR: &str = "frames_as_c_code";
pub const DEFAULT_REGISTRY: &str = "frames_as_c_code.h";
pub const DEFAULT_PREVIEW_DIR: &str = "output_images";

/// Configuration file structure for matrix-pixelator.
/// Loaded from ~/.config/matrix-pixelator/config.toml (or custom path via --config).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: RawSettings,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the generated artifacts go.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_table_dir")]
    pub table_dir: PathBuf,
    #[serde(default = "default_registry")]
    pub registry: PathBuf,
    #[serde(default = "default_preview_dir")]
    pub preview_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            table_dir: default_table_dir(),
            registry: default_registry(),
            preview_dir: default_preview_dir(),
        }
    }
}

fn default_table_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TABLE_DIR)
}

fn default_registry() -> PathBuf {
    PathBuf::from(DEFAULT_REGISTRY)
}

fn default_preview_dir() -> PathBuf {
    PathBuf::from(DEFAULT_PREVIEW_DIR)
}

impl Config {
    /// Load configuration from the default location.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    /// Load configuration from a path given explicitly by the user.
    /// Unlike [`Config::load`], a missing file is an error.
    pub fn load_from_explicit(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Self::load_from(path)
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            source: e,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::TomlText)
    }
}

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file '{}' not found", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to parse config: {0}")]
    TomlText(#[source] toml::de::Error),

    #[error("Failed to parse settings record: {0}")]
    Json(#[source] serde_json::Error),

    #[error("Setting '{field}' is out of range: got {value}, expected {range}")]
    OutOfRange {
        field: &'static str,
        value: String,
        range: &'static str,
    },

    #[error("Setting '{field}' is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("matrix-pixelator").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/matrix-pixelator/config.toml")
        })
}

/// Commented config file written by `config init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# matrix-pixelator configuration

[settings]
# Logical grid size (cells)
# grid_width = 18
# grid_height = 11

# Sigmoid contrast enhancement
# enhance_contrast = true
# sigmoid_k = 0.042
# sigmoid_center = 175.0

# Dark pixel filtering: values <= filter_threshold become 0,
# values up to dimming_threshold are dimmed.
# filter_threshold = 5
# dimming_threshold = 15

# Height/width ratio of one rendered cell
# cell_aspect_ratio = 1.6

# Video sampling rate and preview video rate
# sample_fps = 30.0
# video_fps = 10
# generate_video = true

[output]
# table_dir = "frames_as_c_code"
# registry = "frames_as_c_code.h"
# preview_dir = "output_images"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_is_default() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.settings, RawSettings::default());
        assert_eq!(cfg.output, OutputConfig::default());
    }

    #[test]
    fn test_settings_section_parses() {
        let cfg = Config::from_toml_str(
            r#"
[settings]
grid_width = 24
sigmoid_k = 0.05
enhance_contrast = false
"#,
        )
        .unwrap();
        assert_eq!(cfg.settings.grid_width, Some(24));
        assert_eq!(cfg.settings.sigmoid_k, Some(0.05));
        assert_eq!(cfg.settings.enhance_contrast, Some(false));
        assert_eq!(cfg.settings.grid_height, None);
    }

    #[test]
    fn test_integer_accepted_for_float_field() {
        let cfg = Config::from_toml_str("[settings]\nsigmoid_center = 128\n").unwrap();
        assert_eq!(cfg.settings.sigmoid_center, Some(128.0));
    }

    #[test]
    fn test_non_numeric_value_is_parse_error() {
        let err = Config::from_toml_str("[settings]\ngrid_width = \"wide\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlText(_)));
    }

    #[test]
    fn test_output_section_overrides() {
        let cfg = Config::from_toml_str(
            r#"
[output]
table_dir = "out/tables"
registry = "out/animations.h"
"#,
        )
        .unwrap();
        assert_eq!(cfg.output.table_dir, PathBuf::from("out/tables"));
        assert_eq!(cfg.output.registry, PathBuf::from("out/animations.h"));
        assert_eq!(cfg.output.preview_dir, PathBuf::from(DEFAULT_PREVIEW_DIR));
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let cfg = Config::from_toml_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(cfg.settings, RawSettings::default());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.toml");
        let err = Config::load_from_explicit(&path).unwrap_err();
        assert!(format!("{}", err).contains("not found"));
    }

    #[test]
    fn test_explicit_file_error_names_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "[settings\n").unwrap();
        let err = Config::load_from_explicit(&path).unwrap_err();
        assert!(format!("{}", err).contains("bad.toml"));
        assert!(matches!(err, ConfigError::Toml { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = default_path();
        assert!(path.ends_with("matrix-pixelator/config.toml"));
    }
}
