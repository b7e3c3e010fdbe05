//! Sparse frame encoding.
//!
//! Only nonzero cells are kept; brightness 0 is implicit. Cells are always
//! listed in row-major order (outer loop over `y`, inner over `x`), so the
//! same grid always encodes to the same list.

use crate::grid::BrightnessGrid;

/// One lit cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SparseCell {
    pub x: u32,
    pub y: u32,
    pub brightness: u8,
}

/// Nonzero cells of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseFrame {
    pub frame_number: u32,
    pub cells: Vec<SparseCell>,
}

impl SparseFrame {
    pub fn num_pixels(&self) -> usize {
        self.cells.len()
    }
}

/// Encode a grid into its canonical sparse form.
pub fn encode_grid(grid: &BrightnessGrid, frame_number: u32) -> SparseFrame {
    let mut cells = Vec::new();
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let brightness = grid.cells()[grid.index(x, y)];
            if brightness > 0 {
                cells.push(SparseCell { x, y, brightness });
            }
        }
    }
    SparseFrame {
        frame_number,
        cells,
    }
}

/// Rebuild a `width x height` grid from a sparse frame.
///
/// Cells outside the grid and zero-brightness entries are ignored; the
/// number of ignored entries is returned alongside the grid.
pub fn decode_frame(frame: &SparseFrame, width: u32, height: u32) -> (BrightnessGrid, usize) {
    let mut grid = BrightnessGrid::new(width, height);
    let mut ignored = 0;
    for cell in &frame.cells {
        if cell.brightness == 0 || !grid.set(cell.x, cell.y, cell.brightness) {
            ignored += 1;
        }
    }
    (grid, ignored)
}
