//! Run-progress indicator for the 8×8 LED matrix.
//!
//! The fraction of completed cycles is mapped onto the 64 cells: whole
//! rows are filled first, then the leading cells of the next row.  Every
//! render starts from a cleared grid, so what is shown depends only on
//! `(completed, total)`.

use log::debug;

use super::ports::LedMatrix;
use crate::error::DisplayFailure;

/// Colour as (R, G, B), each 0–255.
pub type Rgb = (u8, u8, u8);

/// Cells per row and rows per grid.
pub const GRID_SIZE: u8 = 8;

/// Total cells in the grid.
pub const GRID_CELLS: u32 = (GRID_SIZE as u32) * (GRID_SIZE as u32);

/// Half-brightness white.
pub const PROGRESS_COLOUR: Rgb = (128, 128, 128);

/// Which cells a given progress value lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressFill {
    /// Rows `0..full_rows` are entirely lit.
    pub full_rows: u8,
    /// Cells `0..partial_cells` of row `full_rows` are lit.
    pub partial_cells: u8,
}

impl ProgressFill {
    /// Map `completed / total` onto the grid.
    ///
    /// `full_rows = floor(64·f / 8)` and
    /// `partial_cells = round(64·f) mod 8`.  `completed` above `total` is
    /// treated as `total`; a zero `total` lights nothing.
    pub fn compute(completed: u32, total: u32) -> Self {
        if total == 0 {
            return Self {
                full_rows: 0,
                partial_cells: 0,
            };
        }
        let fraction = f64::from(completed.min(total)) / f64::from(total);
        let pixels = fraction * f64::from(GRID_CELLS);

        let full_rows = (pixels / f64::from(GRID_SIZE)).floor() as u8;
        let partial_cells = if full_rows >= GRID_SIZE {
            0
        } else {
            (pixels.round() as u32 % u32::from(GRID_SIZE)) as u8
        };

        Self {
            full_rows,
            partial_cells,
        }
    }

    /// Whether the cell at `(row, col)` is lit.
    pub fn is_lit(&self, row: u8, col: u8) -> bool {
        row < self.full_rows || (row == self.full_rows && col < self.partial_cells)
    }

    /// Number of lit cells.
    pub fn lit_count(&self) -> u32 {
        u32::from(self.full_rows) * u32::from(GRID_SIZE) + u32::from(self.partial_cells)
    }

    /// Lit cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        (0..GRID_SIZE)
            .flat_map(|row| (0..GRID_SIZE).map(move |col| (row, col)))
            .filter(|&(row, col)| self.is_lit(row, col))
    }
}

/// Renders progress onto an [`LedMatrix`].
#[derive(Debug, Clone, Copy)]
pub struct ProgressIndicator {
    colour: Rgb,
}

impl Default for ProgressIndicator {
    fn default() -> Self {
        Self::new(PROGRESS_COLOUR)
    }
}

impl ProgressIndicator {
    pub fn new(colour: Rgb) -> Self {
        Self { colour }
    }

    /// Clear the grid and light the cells for `completed / total`.
    pub fn render(
        &self,
        display: &mut impl LedMatrix,
        completed: u32,
        total: u32,
    ) -> Result<ProgressFill, DisplayFailure> {
        display.clear()?;
        let fill = ProgressFill::compute(completed, total);
        debug!(
            "progress {}/{}: rows={} remains={}",
            completed, total, fill.full_rows, fill.partial_cells
        );
        for (row, col) in fill.cells() {
            display.set_pixel(row, col, self.colour)?;
        }
        Ok(fill)
    }
}
