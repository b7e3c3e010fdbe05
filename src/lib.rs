//! matrix-pixelator library crate.
//!
//! Converts still images, numbered image sequences and videos into sparse
//! brightness grids and serializes them as C tables for an LED matrix
//! renderer. The modules are public for the binary and integration tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod grid;
pub mod pipeline;
pub mod preview;
pub mod settings;
pub mod source;
pub mod sparse;
pub mod table;

pub use error::{InputError, PixelatorError, SerializationError};
pub use pipeline::{EncodeReport, OutputLayout, encode_animation};
pub use settings::{RawSettings, Settings};
