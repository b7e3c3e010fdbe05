//! Still image decoding to grayscale using the ITU-R BT.601 luminance formula.

use std::path::Path;

use image::{DynamicImage, GrayImage};

use crate::error::InputError;

/// Convert any decoded image to 8-bit grayscale.
///
/// Y = 0.299*R + 0.587*G + 0.114*B, computed with integer math: the
/// coefficients are scaled by 1000 and the sum truncated. Alpha is dropped.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut gray = Vec::with_capacity(width as usize * height as usize);
    for px in rgb.pixels() {
        let [r, g, b] = px.0;
        let luminance = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
        gray.push(luminance as u8);
    }
    // Buffer length equals width * height by construction
    GrayImage::from_raw(width, height, gray).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Open an image file and convert it to grayscale.
pub fn open_gray(path: &Path) -> Result<GrayImage, InputError> {
    let image = image::open(path).map_err(|source| InputError::UnreadableImage {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(to_grayscale(&image))
}
