//! Brightness grids and the pure per-frame stages that produce them.
//!
//! A frame moves through these stages in order:
//!
//! 1. **Resampling** - decoded raster to a `W x H` grid ([`resample`])
//! 2. **Tone mapping** - optional sigmoid contrast curve ([`tone`])
//! 3. **Dark-pixel filtering** - suppression and dimming of low values ([`filter`])
//!
//! Every stage takes a grid by reference and returns a freshly owned grid.

pub mod filter;
pub mod resample;
pub mod tone;

pub use filter::{DIM_FACTOR_DEN, DIM_FACTOR_NUM, FilterOutcome, filter_dark_pixels, filter_value};
pub use resample::{CANVAS_CELL_WIDTH, canvas_size, resample_to_grid};
pub use tone::{ToneOutcome, sigmoid_value, tone_map};

/// `W x H` grid of brightness values, row-major.
///
/// Values are `u8`, so the `[0, 255]` range invariant holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BrightnessGrid {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl BrightnessGrid {
    /// All-zero grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0)
    }

    /// Grid with every cell set to `value`.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width as usize * height as usize],
        }
    }

    /// Wrap row-major cell data. Returns `None` if the length does not match.
    pub fn from_cells(width: u32, height: u32, cells: Vec<u8>) -> Option<Self> {
        if cells.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Brightness at `(x, y)`, or `None` outside the grid.
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.cells[self.index(x, y)])
    }

    /// Set the brightness at `(x, y)`. Out-of-range coordinates are ignored
    /// and reported with `false`.
    pub fn set(&mut self, x: u32, y: u32, value: u8) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = self.index(x, y);
        self.cells[idx] = value;
        true
    }

    /// Row-major flattening: `y * W + x`.
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Apply `f` to every cell, producing a new grid.
    pub fn map(&self, f: impl Fn(u8) -> u8) -> Self {
        Self {
            width: self.width,
            height: self.height,
            cells: self.cells.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Number of cells whose value differs from `other`. Grids of different
    /// shape are compared cell by cell over the shorter buffer.
    pub fn count_changed(&self, other: &BrightnessGrid) -> usize {
        self.cells
            .iter()
            .zip(other.cells.iter())
            .filter(|(a, b)| a != b)
            .count()
    }

    pub fn stats(&self) -> GridStats {
        GridStats::of(self)
    }
}

/// Summary statistics of one grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStats {
    pub min: u8,
    pub max: u8,
    pub mean: f64,
    /// Cells with brightness above zero.
    pub active: usize,
    pub count: usize,
}

impl GridStats {
    pub fn of(grid: &BrightnessGrid) -> Self {
        let cells = grid.cells();
        if cells.is_empty() {
            return Self {
                min: 0,
                max: 0,
                mean: 0.0,
                active: 0,
                count: 0,
            };
        }
        let sum: u64 = cells.iter().map(|&v| v as u64).sum();
        Self {
            min: cells.iter().copied().min().unwrap_or(0),
            max: cells.iter().copied().max().unwrap_or(0),
            mean: sum as f64 / cells.len() as f64,
            active: cells.iter().filter(|&&v| v > 0).count(),
            count: cells.len(),
        }
    }
}

/// One grid in an animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub grid: BrightnessGrid,
    pub frame_number: u32,
}

/// Named, ordered, non-empty sequence of frames sharing one grid size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animation {
    name: String,
    frames: Vec<Frame>,
}

impl Animation {
    /// Returns `None` for an empty frame list or mixed grid sizes.
    pub fn new(name: impl Into<String>, frames: Vec<Frame>) -> Option<Self> {
        let first = frames.first()?;
        let (w, h) = (first.grid.width(), first.grid.height());
        if frames
            .iter()
            .any(|f| f.grid.width() != w || f.grid.height() != h)
        {
            return None;
        }
        Some(Self {
            name: name.into(),
            frames,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn grid_size(&self) -> (u32, u32) {
        let grid = &self.frames[0].grid;
        (grid.width(), grid.height())
    }
}
