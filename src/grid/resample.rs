//! Raster to brightness-grid resampling.

use image::GrayImage;
use image::imageops::{self, FilterType};

use super::BrightnessGrid;
use crate::settings::Settings;

/// Width in pixels of one cell on the full-resolution canvas.
/// Only affects intermediate geometry, not the logical grid values.
pub const CANVAS_CELL_WIDTH: u32 = 50;
/// Longest canvas side; large grids use narrower canvas cells to stay under it.
pub const MAX_CANVAS_SIDE: u32 = 4096;

/// Width in pixels of one canvas cell for the given settings.
///
/// `CANVAS_CELL_WIDTH` unless the canvas would exceed `MAX_CANVAS_SIDE` on
/// either axis, never below one pixel.
pub fn canvas_cell_width(settings: &Settings) -> u32 {
    let by_width = MAX_CANVAS_SIDE / settings.grid_width.max(1);
    let by_height = (MAX_CANVAS_SIDE as f64
        / (settings.grid_height.max(1) as f64 * settings.cell_aspect_ratio))
        .floor();
    let by_height = if by_height.is_finite() {
        by_height.min(CANVAS_CELL_WIDTH as f64) as u32
    } else {
        CANVAS_CELL_WIDTH
    };
    CANVAS_CELL_WIDTH.min(by_width).min(by_height).max(1)
}

/// Full-resolution canvas size for the given settings.
///
/// Each cell is `canvas_cell_width` wide and `floor(width * aspect)` tall,
/// so the canvas has the same shape as the physical display.
pub fn canvas_size(settings: &Settings) -> (u32, u32) {
    let cell_width = canvas_cell_width(settings);
    let cell_height = ((cell_width as f64 * settings.cell_aspect_ratio) as u32).max(1);
    (
        settings.grid_width * cell_width,
        settings.grid_height * cell_height,
    )
}

/// Map an arbitrary-size grayscale raster onto the logical grid.
///
/// The source is scaled by `max(canvas_w / src_w, canvas_h / src_h)` so it
/// covers the canvas, centered, and the overflow is clipped. The filled
/// canvas is then reduced to exactly `grid_width x grid_height` with a
/// Lanczos filter. Identical input and settings always give an identical grid.
///
/// An empty source yields an all-black grid.
pub fn resample_to_grid(source: &GrayImage, settings: &Settings) -> BrightnessGrid {
    let (canvas_w, canvas_h) = canvas_size(settings);
    let (src_w, src_h) = source.dimensions();

    let mut canvas = GrayImage::new(canvas_w, canvas_h);

    if src_w > 0 && src_h > 0 {
        let scale = f64::max(
            canvas_w as f64 / src_w as f64,
            canvas_h as f64 / src_h as f64,
        );
        // Rounding keeps the covering dimension exactly equal to the canvas.
        let scaled_w = ((src_w as f64 * scale).round() as u32).max(1);
        let scaled_h = ((src_h as f64 * scale).round() as u32).max(1);

        let scaled = imageops::resize(source, scaled_w, scaled_h, FilterType::Lanczos3);

        let offset_x = (canvas_w as i64 - scaled_w as i64).div_euclid(2);
        let offset_y = (canvas_h as i64 - scaled_h as i64).div_euclid(2);
        imageops::replace(&mut canvas, &scaled, offset_x, offset_y);
    }

    let reduced = imageops::resize(
        &canvas,
        settings.grid_width,
        settings.grid_height,
        FilterType::Lanczos3,
    );

    let grid = BrightnessGrid::from_cells(
        settings.grid_width,
        settings.grid_height,
        reduced.into_raw(),
    );
    // resize always returns exactly grid_width * grid_height pixels
    grid.unwrap_or_else(|| BrightnessGrid::new(settings.grid_width, settings.grid_height))
}
