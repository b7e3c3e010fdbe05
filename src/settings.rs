//! Encoding settings.
//!
//! [`Settings`] is an immutable value threaded through every stage of the
//! pipeline. [`RawSettings`] is the flat, partially-filled record that comes
//! from a config file, a JSON settings record or CLI flags; it is turned into
//! `Settings` by [`Settings::from_raw`], which fills missing fields with the
//! defaults and rejects present-but-invalid values.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

pub const DEFAULT_GRID_WIDTH: u32 = 18;
pub const DEFAULT_GRID_HEIGHT: u32 = 11;
pub const DEFAULT_SIGMOID_K: f64 = 0.042;
pub const DEFAULT_SIGMOID_CENTER: f64 = 175.0;
pub const DEFAULT_FILTER_THRESHOLD: u8 = 5;
pub const DEFAULT_DIMMING_THRESHOLD: u8 = 15;
/// Height/width ratio of one rendered cell.
pub const DEFAULT_CELL_ASPECT_RATIO: f64 = 1.6;
pub const DEFAULT_SAMPLE_FPS: f64 = 30.0;
pub const DEFAULT_VIDEO_FPS: u32 = 10;

const MAX_GRID_DIMENSION: i64 = 256;
const MAX_CELL_ASPECT_RATIO: f64 = 10.0;
const MAX_SAMPLE_FPS: f64 = 240.0;
const MAX_VIDEO_FPS: i64 = 60;

/// Validated, immutable encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub grid_width: u32,
    pub grid_height: u32,
    pub enhance_contrast: bool,
    pub sigmoid_k: f64,
    pub sigmoid_center: f64,
    pub filter_threshold: u8,
    pub dimming_threshold: u8,
    pub cell_aspect_ratio: f64,
    /// Rate at which frames are sampled out of a video source.
    pub sample_fps: f64,
    /// Frame rate of the assembled preview video.
    pub video_fps: u32,
    pub generate_video: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grid_width: DEFAULT_GRID_WIDTH,
            grid_height: DEFAULT_GRID_HEIGHT,
            enhance_contrast: true,
            sigmoid_k: DEFAULT_SIGMOID_K,
            sigmoid_center: DEFAULT_SIGMOID_CENTER,
            filter_threshold: DEFAULT_FILTER_THRESHOLD,
            dimming_threshold: DEFAULT_DIMMING_THRESHOLD,
            cell_aspect_ratio: DEFAULT_CELL_ASPECT_RATIO,
            sample_fps: DEFAULT_SAMPLE_FPS,
            video_fps: DEFAULT_VIDEO_FPS,
            generate_video: true,
        }
    }
}

/// Flat settings record with every field optional.
///
/// Integer fields are read as `i64` so that negative or oversized values
/// reach validation and are reported instead of failing as a type error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawSettings {
    pub grid_width: Option<i64>,
    pub grid_height: Option<i64>,
    pub enhance_contrast: Option<bool>,
    pub sigmoid_k: Option<f64>,
    pub sigmoid_center: Option<f64>,
    pub filter_threshold: Option<i64>,
    pub dimming_threshold: Option<i64>,
    pub cell_aspect_ratio: Option<f64>,
    pub sample_fps: Option<f64>,
    pub video_fps: Option<i64>,
    pub generate_video: Option<bool>,
}

impl RawSettings {
    /// Overlay `other` on top of `self`; fields present in `other` win.
    pub fn merge(self, other: RawSettings) -> RawSettings {
        RawSettings {
            grid_width: other.grid_width.or(self.grid_width),
            grid_height: other.grid_height.or(self.grid_height),
            enhance_contrast: other.enhance_contrast.or(self.enhance_contrast),
            sigmoid_k: other.sigmoid_k.or(self.sigmoid_k),
            sigmoid_center: other.sigmoid_center.or(self.sigmoid_center),
            filter_threshold: other.filter_threshold.or(self.filter_threshold),
            dimming_threshold: other.dimming_threshold.or(self.dimming_threshold),
            cell_aspect_ratio: other.cell_aspect_ratio.or(self.cell_aspect_ratio),
            sample_fps: other.sample_fps.or(self.sample_fps),
            video_fps: other.video_fps.or(self.video_fps),
            generate_video: other.generate_video.or(self.generate_video),
        }
    }

    /// Parse a flat JSON settings record, as sent by a transport layer.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::Json)
    }
}

impl Settings {
    /// Build settings from a raw record, applying defaults for missing fields.
    ///
    /// # Errors
    /// `ConfigError::OutOfRange` or `ConfigError::Invalid` for any present
    /// value outside its declared range. Values are never clamped.
    pub fn from_raw(raw: &RawSettings) -> Result<Self, ConfigError> {
        let defaults = Settings::default();

        let grid_width = int_field("grid_width", raw.grid_width, 1, MAX_GRID_DIMENSION)?
            .map_or(defaults.grid_width, |v| v as u32);
        let grid_height = int_field("grid_height", raw.grid_height, 1, MAX_GRID_DIMENSION)?
            .map_or(defaults.grid_height, |v| v as u32);
        let filter_threshold = int_field("filter_threshold", raw.filter_threshold, 0, 255)?
            .map_or(defaults.filter_threshold, |v| v as u8);
        let dimming_threshold = int_field("dimming_threshold", raw.dimming_threshold, 0, 255)?
            .map_or(defaults.dimming_threshold, |v| v as u8);
        let video_fps = int_field("video_fps", raw.video_fps, 1, MAX_VIDEO_FPS)?
            .map_or(defaults.video_fps, |v| v as u32);

        let sigmoid_k = match raw.sigmoid_k {
            Some(k) if !k.is_finite() || k <= 0.0 => {
                return Err(ConfigError::Invalid {
                    field: "sigmoid_k",
                    reason: format!("must be a finite number greater than 0, got {}", k),
                });
            }
            Some(k) => k,
            None => defaults.sigmoid_k,
        };
        let sigmoid_center = match raw.sigmoid_center {
            Some(c) if !c.is_finite() || !(0.0..=255.0).contains(&c) => {
                return Err(ConfigError::OutOfRange {
                    field: "sigmoid_center",
                    value: c.to_string(),
                    range: "0-255",
                });
            }
            Some(c) => c,
            None => defaults.sigmoid_center,
        };
        let cell_aspect_ratio = match raw.cell_aspect_ratio {
            Some(a) if !a.is_finite() || a <= 0.0 || a > MAX_CELL_ASPECT_RATIO => {
                return Err(ConfigError::OutOfRange {
                    field: "cell_aspect_ratio",
                    value: a.to_string(),
                    range: "greater than 0, at most 10",
                });
            }
            Some(a) => a,
            None => defaults.cell_aspect_ratio,
        };
        let sample_fps = match raw.sample_fps {
            Some(f) if !f.is_finite() || f <= 0.0 || f > MAX_SAMPLE_FPS => {
                return Err(ConfigError::OutOfRange {
                    field: "sample_fps",
                    value: f.to_string(),
                    range: "greater than 0, at most 240",
                });
            }
            Some(f) => f,
            None => defaults.sample_fps,
        };

        let settings = Settings {
            grid_width,
            grid_height,
            enhance_contrast: raw.enhance_contrast.unwrap_or(defaults.enhance_contrast),
            sigmoid_k,
            sigmoid_center,
            filter_threshold,
            dimming_threshold,
            cell_aspect_ratio,
            sample_fps,
            video_fps,
            generate_video: raw.generate_video.unwrap_or(defaults.generate_video),
        };

        if settings.filter_threshold > settings.dimming_threshold {
            log::warn!(
                "filter_threshold ({}) is above dimming_threshold ({}); the dimming band is empty",
                settings.filter_threshold,
                settings.dimming_threshold
            );
        }

        Ok(settings)
    }

    /// Number of cells in one grid.
    pub fn cell_count(&self) -> usize {
        self.grid_width as usize * self.grid_height as usize
    }

    /// One-line summary used in logs and `config show`.
    pub fn summary(&self) -> String {
        format!(
            "Grid={}x{}, Contrast={} (k={}, center={}), Filter={}/{}, Aspect=1:{}, Sample FPS={}, Video FPS={}{}",
            self.grid_width,
            self.grid_height,
            if self.enhance_contrast { "ON" } else { "OFF" },
            self.sigmoid_k,
            self.sigmoid_center,
            self.filter_threshold,
            self.dimming_threshold,
            self.cell_aspect_ratio,
            self.sample_fps,
            self.video_fps,
            if self.generate_video { "" } else { " (no video)" },
        )
    }
}

fn int_field(
    field: &'static str,
    value: Option<i64>,
    min: i64,
    max: i64,
) -> Result<Option<i64>, ConfigError> {
    match value {
        Some(v) if v < min || v > max => Err(ConfigError::OutOfRange {
            field,
            value: v.to_string(),
            range: range_label(min, max),
        }),
        other => Ok(other),
    }
}

fn range_label(min: i64, max: i64) -> &'static str {
    match (min, max) {
        (0, 255) => "0-255",
        (1, MAX_GRID_DIMENSION) => "1-256",
        (1, MAX_VIDEO_FPS) => "1-60",
        _ => "declared range",
    }
}
