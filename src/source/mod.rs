//! Frame sources: single images, image-sequence directories and videos.
//!
//! Every source yields 8-bit grayscale rasters in ascending frame order.
//! Videos are read through the [`VideoDecoder`] trait so the sampler can be
//! driven by the ffmpeg backend or by an in-memory decoder in tests.

pub mod ffmpeg;
mod raster;
pub mod sampler;
mod sequence;
pub mod transcode;

use std::path::{Path, PathBuf};

use image::GrayImage;

use crate::config::ConfigError;
use crate::error::InputError;

pub use ffmpeg::FfmpegVideo;
pub use raster::{open_gray, to_grayscale};
pub use sampler::{PartialExtraction, SampleError, SampleSummary, sample_frames, sample_indices};
pub use sequence::{SequenceKey, is_supported_image, list_sequence, sequence_key};
pub use transcode::{TranscodeOutcome, needs_transcode, transcode_to_mp4};

/// Video container extensions handled by the video decoder.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];
/// Still image extensions, for single images and sequence members.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Errors raised while probing or decoding a video.
#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("`{tool}` was not found on PATH")]
    ToolMissing { tool: &'static str },

    #[error("Failed to run `{tool}`: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    #[error("No video stream found")]
    NoVideoStream,

    #[error("Failed to decode frame {index}: {message}")]
    DecodeFailed { index: u64, message: String },

    #[error("Stream ended before frame {index}")]
    EndOfStream { index: u64 },
}

/// Properties of an opened video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    /// Native frame rate R.
    pub native_fps: f64,
    /// Total frame count N.
    pub frame_count: u64,
    pub width: u32,
    pub height: u32,
}

impl VideoInfo {
    /// Duration in seconds (N / R), zero for a degenerate rate.
    pub fn duration_secs(&self) -> f64 {
        if self.native_fps > 0.0 {
            self.frame_count as f64 / self.native_fps
        } else {
            0.0
        }
    }
}

/// Sequential access to the frames of one video.
pub trait VideoDecoder {
    fn info(&self) -> VideoInfo;

    /// Decode the next source frame as grayscale, or `None` once the
    /// stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<GrayImage>, VideoError>;
}

/// What kind of input a path refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSource {
    /// One still image, encoded as frame 0.
    Image(PathBuf),
    /// A directory of still images ordered by [`sequence_key`].
    Sequence(PathBuf),
    /// A video container, sampled at the configured rate.
    Video(PathBuf),
}

impl FrameSource {
    /// Classify `path` by whether it is a directory and by its extension.
    pub fn detect(path: &Path) -> Result<Self, InputError> {
        if !path.exists() {
            return Err(InputError::NotFound {
                path: path.to_path_buf(),
            });
        }
        if path.is_dir() {
            return Ok(FrameSource::Sequence(path.to_path_buf()));
        }
        if has_extension(path, IMAGE_EXTENSIONS) {
            Ok(FrameSource::Image(path.to_path_buf()))
        } else if has_extension(path, VIDEO_EXTENSIONS) {
            Ok(FrameSource::Video(path.to_path_buf()))
        } else {
            Err(InputError::UnsupportedSource {
                path: path.to_path_buf(),
            })
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            FrameSource::Image(p) | FrameSource::Sequence(p) | FrameSource::Video(p) => p,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FrameSource::Image(_) => "image",
            FrameSource::Sequence(_) => "image sequence",
            FrameSource::Video(_) => "video",
        }
    }
}

pub(crate) fn has_extension(path: &Path, accepted: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| accepted.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Lowercase C keywords plus the table struct type, none usable as a symbol.
const RESERVED_SYMBOLS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "animation_frame",
];

/// Turn an arbitrary name into a valid C identifier.
///
/// Lowercases, replaces every character outside `[a-z0-9_]` with `_` and
/// prefixes `_` when the result would start with a digit or is a reserved
/// word.
pub fn sanitize_symbol_name(name: &str) -> Result<String, ConfigError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid {
            field: "name",
            reason: "animation name is empty".to_string(),
        });
    }
    let mut symbol: String = trimmed
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if symbol.starts_with(|c: char| c.is_ascii_digit())
        || RESERVED_SYMBOLS.contains(&symbol.as_str())
    {
        symbol.insert(0, '_');
    }
    Ok(symbol)
}

/// Default animation name for an input: its file stem, or the directory name.
pub fn default_symbol_name(path: &Path) -> Result<String, ConfigError> {
    let raw = if path.is_dir() {
        path.file_name()
    } else {
        path.file_stem()
    };
    let raw = raw.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    sanitize_symbol_name(&raw)
}
