//! Sigmoid contrast enhancement.

use super::BrightnessGrid;
use crate::settings::Settings;

/// Result of tone mapping a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneOutcome {
    pub grid: BrightnessGrid,
    /// Cells whose value changed. Diagnostic only.
    pub changed: usize,
}

/// Sigmoid curve for one brightness value:
/// `round(255 / (1 + e^(-k * (v - center))))`, clamped to `[0, 255]`.
#[inline]
pub fn sigmoid_value(v: u8, k: f64, center: f64) -> u8 {
    let s = 1.0 / (1.0 + (-k * (v as f64 - center)).exp());
    (s * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Build the 256-entry lookup table for the curve.
fn sigmoid_lut(k: f64, center: f64) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (v, out) in lut.iter_mut().enumerate() {
        *out = sigmoid_value(v as u8, k, center);
    }
    lut
}

/// Apply the sigmoid curve to every cell, or return an unchanged copy when
/// `enhance_contrast` is off. The input grid is never modified.
pub fn tone_map(grid: &BrightnessGrid, settings: &Settings) -> ToneOutcome {
    if !settings.enhance_contrast {
        return ToneOutcome {
            grid: grid.clone(),
            changed: 0,
        };
    }

    let lut = sigmoid_lut(settings.sigmoid_k, settings.sigmoid_center);
    let mapped = grid.map(|v| lut[v as usize]);
    let changed = grid.count_changed(&mapped);

    ToneOutcome {
        grid: mapped,
        changed,
    }
}
