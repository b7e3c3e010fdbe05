//! Dark-pixel suppression and dimming.
//!
//! Per cell, with `FT = filter_threshold` and `DT = dimming_threshold`:
//!
//! - `0` passes through unchanged
//! - `v <= FT` becomes `0`
//! - `FT < v <= DT` is scaled down to `floor(v * 7 / 10)`
//! - `v > DT` is left alone
//!
//! When `FT >= DT` the dimming band is empty and the filter degenerates to
//! a plain threshold.

use super::BrightnessGrid;
use crate::settings::Settings;

/// Dimming scale `DIM_FACTOR_NUM / DIM_FACTOR_DEN` applied inside the band.
pub const DIM_FACTOR_NUM: u16 = 7;
pub const DIM_FACTOR_DEN: u16 = 10;

/// Result of filtering a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub grid: BrightnessGrid,
    /// Cells set to zero.
    pub suppressed: usize,
    /// Cells scaled down inside the dimming band.
    pub dimmed: usize,
}

impl FilterOutcome {
    pub fn changed(&self) -> usize {
        self.suppressed + self.dimmed
    }
}

/// Filter a single brightness value. Never returns more than `v`.
#[inline]
pub fn filter_value(v: u8, filter_threshold: u8, dimming_threshold: u8) -> u8 {
    if v == 0 || v <= filter_threshold {
        0
    } else if v <= dimming_threshold {
        (v as u16 * DIM_FACTOR_NUM / DIM_FACTOR_DEN) as u8
    } else {
        v
    }
}

/// Apply the filter to every cell, returning a new grid.
pub fn filter_dark_pixels(grid: &BrightnessGrid, settings: &Settings) -> FilterOutcome {
    let ft = settings.filter_threshold;
    let dt = settings.dimming_threshold;

    let mut suppressed = 0;
    let mut dimmed = 0;
    for &v in grid.cells() {
        if v == 0 {
            continue;
        }
        if v <= ft {
            suppressed += 1;
        } else if v <= dt {
            dimmed += 1;
        }
    }

    let filtered = grid.map(|v| filter_value(v, ft, dt));
    debug_assert!(
        filtered
            .cells()
            .iter()
            .zip(grid.cells())
            .all(|(out, input)| out <= input),
        "filter must never brighten a cell"
    );

    FilterOutcome {
        grid: filtered,
        suppressed,
        dimmed,
    }
}
