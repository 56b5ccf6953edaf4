//! Cell states and the assembled global grid.
//!
//! Lifecycle: EMPTY -> SEEDED -> GROWING -> GROWN -> PARASITE -> EMPTY.

use rand::Rng;
use rand::seq::index;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CellState {
    #[default]
    Empty = 0,
    Parasite = 1,
    SeededGrass = 2,
    GrowingGrass = 3,
    GrownGrass = 4,
}

impl CellState {
    pub const ALL: [CellState; 5] = [
        CellState::Empty,
        CellState::Parasite,
        CellState::SeededGrass,
        CellState::GrowingGrass,
        CellState::GrownGrass,
    ];

    /// Stable numeric code handed to renderers.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn from_code(code: u8) -> Option<CellState> {
        match code {
            0 => Some(CellState::Empty),
            1 => Some(CellState::Parasite),
            2 => Some(CellState::SeededGrass),
            3 => Some(CellState::GrowingGrass),
            4 => Some(CellState::GrownGrass),
            _ => None,
        }
    }

    /// Single-character glyph used by the text renderer and test fixtures.
    pub const fn glyph(self) -> char {
        match self {
            CellState::Empty => '.',
            CellState::Parasite => 'P',
            CellState::SeededGrass => 's',
            CellState::GrowingGrass => 'g',
            CellState::GrownGrass => 'G',
        }
    }

    pub const fn from_glyph(glyph: char) -> Option<CellState> {
        match glyph {
            '.' => Some(CellState::Empty),
            'P' => Some(CellState::Parasite),
            's' => Some(CellState::SeededGrass),
            'g' => Some(CellState::GrowingGrass),
            'G' => Some(CellState::GrownGrass),
            _ => None,
        }
    }
}

/// Per-state cell counts of a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Census {
    pub empty: usize,
    pub parasite: usize,
    pub seeded: usize,
    pub growing: usize,
    pub grown: usize,
}

impl Census {
    pub fn total(&self) -> usize {
        self.empty + self.parasite + self.seeded + self.growing + self.grown
    }

    fn add(&mut self, state: CellState) {
        match state {
            CellState::Empty => self.empty += 1,
            CellState::Parasite => self.parasite += 1,
            CellState::SeededGrass => self.seeded += 1,
            CellState::GrowingGrass => self.growing += 1,
            CellState::GrownGrass => self.grown += 1,
        }
    }
}

/// Full `rows x cols` grid in row-major order.
///
/// Only ever materialised on the coordinator (or by callers seeding a run);
/// workers hold `LocalGrid` slices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalGrid {
    rows: usize,
    cols: usize,
    cells: Vec<CellState>,
}

impl GlobalGrid {
    pub fn filled(rows: usize, cols: usize, state: CellState) -> Self {
        Self {
            rows,
            cols,
            cells: vec![state; rows * cols],
        }
    }

    /// All grown grass with a single parasite at the centre.
    pub fn seeded(rows: usize, cols: usize) -> Self {
        let mut grid = Self::filled(rows, cols, CellState::GrownGrass);
        if rows > 0 && cols > 0 {
            grid.set(rows / 2, cols / 2, CellState::Parasite);
        }
        grid
    }

    pub fn from_cells(rows: usize, cols: usize, cells: Vec<CellState>) -> Option<Self> {
        (cells.len() == rows * cols).then_some(Self { rows, cols, cells })
    }

    /// Parse rows of glyphs (see `CellState::glyph`). Whitespace-only lines are skipped.
    pub fn parse(text: &str) -> Option<Self> {
        let mut cells = Vec::new();
        let mut rows = 0;
        let mut cols = None;
        for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let before = cells.len();
            for glyph in line.chars() {
                cells.push(CellState::from_glyph(glyph)?);
            }
            let width = cells.len() - before;
            if *cols.get_or_insert(width) != width {
                return None;
            }
            rows += 1;
        }
        Self::from_cells(rows, cols.unwrap_or(0), cells)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> CellState {
        self.cells[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, state: CellState) {
        self.cells[row * self.cols + col] = state;
    }

    #[inline]
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    pub fn row(&self, row: usize) -> &[CellState] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    pub(crate) fn rows_mut(&mut self, start: usize, count: usize) -> &mut [CellState] {
        &mut self.cells[start * self.cols..(start + count) * self.cols]
    }

    /// Flattened state codes, row-major.
    pub fn codes(&self) -> Vec<u8> {
        self.cells.iter().map(|state| state.code()).collect()
    }

    pub fn census(&self) -> Census {
        let mut census = Census::default();
        for &state in &self.cells {
            census.add(state);
        }
        census
    }

    /// Turn `count` distinct random cells into parasites.
    pub fn sprinkle_parasites<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) {
        let count = count.min(self.cells.len());
        for i in index::sample(rng, self.cells.len(), count) {
            self.cells[i] = CellState::Parasite;
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.rows * (self.cols + 1));
        for row in 0..self.rows {
            out.extend(self.row(row).iter().map(|state| state.glyph()));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::{CellState, GlobalGrid};

    #[test]
    fn codes_round_trip_through_from_code() {
        for state in CellState::ALL {
            assert_eq!(CellState::from_code(state.code()), Some(state));
        }
        assert_eq!(CellState::from_code(5), None);
    }

    #[test]
    fn seeded_grid_has_one_central_parasite() {
        let grid = GlobalGrid::seeded(6, 8);
        let census = grid.census();
        assert_eq!(census.parasite, 1);
        assert_eq!(census.grown, 47);
        assert_eq!(grid.get(3, 4), CellState::Parasite);
    }

    #[test]
    fn parse_rejects_ragged_rows() {
        assert!(GlobalGrid::parse("GG\nG").is_none());
        assert!(GlobalGrid::parse("GG\nGx").is_none());
        let grid = GlobalGrid::parse("G.\nsP\n").expect("valid grid");
        assert_eq!((grid.rows(), grid.cols()), (2, 2));
        assert_eq!(grid.render(), "G.\nsP\n");
    }

    #[test]
    fn sprinkle_parasites_hits_distinct_cells() {
        let mut grid = GlobalGrid::filled(10, 10, CellState::GrownGrass);
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED);
        grid.sprinkle_parasites(17, &mut rng);
        assert_eq!(grid.census().parasite, 17);

        grid.sprinkle_parasites(1_000, &mut rng);
        assert_eq!(grid.census().parasite, 100);
    }
}
