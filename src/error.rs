//! Error types for the encoding pipeline.
//!
//! Each concern has its own enum. [`PixelatorError`] aggregates them for
//! callers that drive a whole invocation.

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::preview::PreviewError;
use crate::source::VideoError;

/// Problems with the source material. Aborts the animation; no table is written.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Input '{}' does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("Could not decode image '{}': {source}", path.display())]
    UnreadableImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Unsupported source type '{}' (expected an image, a video or a directory of images)", path.display())]
    UnsupportedSource { path: PathBuf },

    #[error("No image frames found in '{}'", path.display())]
    EmptySequence { path: PathBuf },

    #[error("No frames extracted from video '{}'", path.display())]
    NoFramesExtracted { path: PathBuf },

    #[error("Could not read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Video source '{}' failed: {source}", path.display())]
    Video {
        path: PathBuf,
        #[source]
        source: VideoError,
    },
}

/// The table or the declaration registry could not be written.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Failed to write table '{}': {source}", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to update declaration registry '{}': {source}", path.display())]
    Registry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Registry '{}' is for a {}x{} matrix but the animation is {}x{}",
        path.display(),
        registry.0,
        registry.1,
        animation.0,
        animation.1
    )]
    MatrixMismatch {
        path: PathBuf,
        /// Width and height the registry was generated for.
        registry: (u32, u32),
        animation: (u32, u32),
    },

    #[error("Failed to write preview: {0}")]
    Preview(#[from] PreviewError),
}

/// Top-level error for one encoding invocation.
#[derive(Debug, thiserror::Error)]
pub enum PixelatorError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}
