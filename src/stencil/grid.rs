//! Worker-local row slab with ghost rows, double-buffered.
//!
//! Layout per buffer: `(local_rows + 2) x cols`, row-major. Row 0 is the
//! north ghost, rows `1..=local_rows` are owned, row `local_rows + 1` is the
//! south ghost. Ghost rows are overwritten wholesale by the halo exchange and
//! never written by the kernel.

use super::cell::CellState;

/// Which ghost row a halo payload lands in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ghost {
    North,
    South,
}

#[derive(Clone, Debug)]
pub struct LocalGrid {
    local_rows: usize,
    cols: usize,
    first_row: usize,
    /// `cells[phase]` = current (read), `cells[1 - phase]` = next (write).
    cells: [Vec<CellState>; 2],
    phase: u8,
}

impl LocalGrid {
    pub fn empty(local_rows: usize, cols: usize, first_row: usize) -> Self {
        let len = (local_rows + 2) * cols;
        Self {
            local_rows,
            cols,
            first_row,
            cells: [vec![CellState::Empty; len], vec![CellState::Empty; len]],
            phase: 0,
        }
    }

    /// Build a slab whose owned rows are `interior` (`local_rows * cols` cells).
    pub fn from_interior(first_row: usize, cols: usize, interior: &[CellState]) -> Self {
        debug_assert!(cols > 0 && interior.len() % cols == 0);
        let mut grid = Self::empty(interior.len() / cols, cols, first_row);
        grid.interior_mut().copy_from_slice(interior);
        grid
    }

    #[inline]
    pub fn local_rows(&self) -> usize {
        self.local_rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Global row index of owned row 1.
    #[inline]
    pub fn first_row(&self) -> usize {
        self.first_row
    }

    #[inline]
    pub fn offset(&self, row: usize, col: usize) -> usize {
        debug_assert!(row <= self.local_rows + 1 && col < self.cols);
        row * self.cols + col
    }

    #[inline]
    pub fn current(&self) -> &[CellState] {
        &self.cells[self.phase as usize]
    }

    #[inline]
    fn current_mut(&mut self) -> &mut [CellState] {
        &mut self.cells[self.phase as usize]
    }

    #[inline]
    pub fn current_and_next_mut(&mut self) -> (&[CellState], &mut [CellState]) {
        let (a, b) = self.cells.split_at_mut(1);
        if self.phase == 0 {
            (&a[0], &mut b[0])
        } else {
            (&b[0], &mut a[0])
        }
    }

    /// Promote the write buffer. The old read buffer becomes the next write
    /// target; nothing is reallocated.
    #[inline]
    pub fn swap(&mut self) {
        self.phase ^= 1;
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> CellState {
        self.current()[self.offset(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, state: CellState) {
        let offset = self.offset(row, col);
        self.current_mut()[offset] = state;
    }

    pub fn row(&self, row: usize) -> &[CellState] {
        let start = self.offset(row, 0);
        &self.current()[start..start + self.cols]
    }

    /// Owned rows of the current buffer, ghosts excluded.
    pub fn interior(&self) -> &[CellState] {
        let start = self.cols;
        &self.current()[start..start + self.local_rows * self.cols]
    }

    fn interior_mut(&mut self) -> &mut [CellState] {
        let (start, len) = (self.cols, self.local_rows * self.cols);
        &mut self.current_mut()[start..start + len]
    }

    /// Topmost owned row, sent to the north neighbour.
    pub fn top_row(&self) -> &[CellState] {
        self.row(1)
    }

    /// Bottommost owned row, sent to the south neighbour.
    pub fn bottom_row(&self) -> &[CellState] {
        self.row(self.local_rows)
    }

    /// Replace a ghost row of the current buffer.
    pub fn fill_ghost(&mut self, ghost: Ghost, cells: &[CellState]) {
        let row = match ghost {
            Ghost::North => 0,
            Ghost::South => self.local_rows + 1,
        };
        let start = self.offset(row, 0);
        let cols = self.cols;
        self.current_mut()[start..start + cols].copy_from_slice(cells);
    }
}
