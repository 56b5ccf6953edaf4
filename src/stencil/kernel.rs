//! Row kernel: applies the transition rule to owned rows of a `LocalGrid`,
//! reading the current buffer and writing the next one.

use std::ops::RangeInclusive;

use super::cell::CellState;
use super::draws::{DrawSource, Site};
use super::grid::LocalGrid;
use super::rules::{Tally, next_state};

/// Per-generation evaluation context shared by every row of a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    pub generation: u64,
    /// Row 0 holds the north neighbour's boundary this generation.
    pub north_ghost: bool,
    /// Row `local_rows + 1` holds the south neighbour's boundary.
    pub south_ghost: bool,
    /// Columns wrap (periodic boundary).
    pub wrap_cols: bool,
}

/// Split of the owned rows into those computable before the halo arrives
/// and those that must wait for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowPlan {
    pub interior: RangeInclusive<usize>,
    pub north_border: Option<usize>,
    pub south_border: Option<usize>,
}

impl RowPlan {
    /// A row next to a missing neighbour needs no remote data and is
    /// treated as interior.
    pub fn new(local_rows: usize, has_north: bool, has_south: bool) -> Self {
        debug_assert!(local_rows > 0);
        let start = if has_north { 2 } else { 1 };
        let end = if has_south { local_rows - 1 } else { local_rows };
        let north_border = has_north.then_some(1);
        // A one-row slab with both neighbours has a single border row.
        let south_border = (has_south && !(has_north && local_rows == 1)).then_some(local_rows);
        Self {
            interior: start..=end,
            north_border,
            south_border,
        }
    }

    pub fn border_rows(&self) -> impl Iterator<Item = usize> {
        self.north_border.into_iter().chain(self.south_border)
    }
}

/// Moore-neighbourhood counts around local `(row, col)` of `read`.
///
/// Ghost rows only count when flagged live in `frame`; columns outside the
/// grid are skipped unless they wrap.
pub fn tally_at(
    read: &[CellState],
    cols: usize,
    local_rows: usize,
    row: usize,
    col: usize,
    frame: &Frame,
) -> Tally {
    let mut tally = Tally::default();
    for r in row - 1..=row + 1 {
        if (r == 0 && !frame.north_ghost) || (r == local_rows + 1 && !frame.south_ghost) {
            continue;
        }
        let base = r * cols;
        for dc in [-1isize, 0, 1] {
            if r == row && dc == 0 {
                continue;
            }
            let c = col as isize + dc;
            let c = if frame.wrap_cols {
                c.rem_euclid(cols as isize) as usize
            } else if c < 0 || c >= cols as isize {
                continue;
            } else {
                c as usize
            };
            tally.add(read[base + c]);
        }
    }
    tally
}

/// Compute next-generation states for owned row `row`.
pub fn advance_row<D: DrawSource + ?Sized>(
    grid: &mut LocalGrid,
    row: usize,
    frame: &Frame,
    draws: &mut D,
) {
    debug_assert!(row >= 1 && row <= grid.local_rows());
    let cols = grid.cols();
    let local_rows = grid.local_rows();
    let global_row = grid.first_row() + row - 1;
    let (read, write) = grid.current_and_next_mut();
    let base = row * cols;
    for col in 0..cols {
        let site = Site {
            generation: frame.generation,
            row: global_row,
            col,
        };
        write[base + col] = next_state(
            read[base + col],
            frame.generation,
            || tally_at(read, cols, local_rows, row, col, frame),
            || draws.draw(site),
        );
    }
}

pub fn advance_rows<D: DrawSource + ?Sized>(
    grid: &mut LocalGrid,
    rows: impl IntoIterator<Item = usize>,
    frame: &Frame,
    draws: &mut D,
) {
    for row in rows {
        advance_row(grid, row, frame, draws);
    }
}

#[cfg(test)]
mod tests {
    use super::{Frame, RowPlan, advance_rows, tally_at};
    use crate::stencil::cell::{CellState, GlobalGrid};
    use crate::stencil::draws::Site;
    use crate::stencil::grid::{Ghost, LocalGrid};
    use crate::stencil::rules::Tally;

    fn frame(generation: u64, north_ghost: bool, south_ghost: bool) -> Frame {
        Frame {
            generation,
            north_ghost,
            south_ghost,
            wrap_cols: false,
        }
    }

    #[test]
    fn row_plan_splits_interior_and_borders() {
        let middle = RowPlan::new(5, true, true);
        assert_eq!(middle.interior, 2..=4);
        assert_eq!(middle.border_rows().collect::<Vec<_>>(), vec![1, 5]);

        let top = RowPlan::new(5, false, true);
        assert_eq!(top.interior, 1..=4);
        assert_eq!(top.border_rows().collect::<Vec<_>>(), vec![5]);

        let bottom = RowPlan::new(5, true, false);
        assert_eq!(bottom.interior, 2..=5);
        assert_eq!(bottom.border_rows().collect::<Vec<_>>(), vec![1]);

        let alone = RowPlan::new(5, false, false);
        assert_eq!(alone.interior, 1..=5);
        assert_eq!(alone.border_rows().count(), 0);
    }

    #[test]
    fn one_row_slab_is_computed_once() {
        let plan = RowPlan::new(1, true, true);
        assert!(plan.interior.is_empty());
        assert_eq!(plan.border_rows().collect::<Vec<_>>(), vec![1]);

        let plan = RowPlan::new(1, false, true);
        assert!(plan.interior.is_empty());
        assert_eq!(plan.border_rows().collect::<Vec<_>>(), vec![1]);

        let plan = RowPlan::new(1, true, false);
        assert!(plan.interior.is_empty());
        assert_eq!(plan.border_rows().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn dead_ghost_rows_are_not_counted() {
        let mut grid = LocalGrid::from_interior(0, 3, &[CellState::Empty; 3]);
        grid.fill_ghost(Ghost::North, &[CellState::GrownGrass; 3]);
        grid.fill_ghost(Ghost::South, &[CellState::Parasite; 3]);

        let read = grid.current();
        assert_eq!(
            tally_at(read, 3, 1, 1, 1, &frame(0, false, false)),
            Tally::default()
        );
        assert_eq!(
            tally_at(read, 3, 1, 1, 1, &frame(0, true, false)),
            Tally {
                parasites: 0,
                grown: 3
            }
        );
        assert_eq!(
            tally_at(read, 3, 1, 1, 0, &frame(0, true, true)),
            Tally {
                parasites: 2,
                grown: 2
            }
        );
    }

    #[test]
    fn wrapped_columns_see_the_far_edge() {
        let grid = GlobalGrid::parse("P..G\n....\n").expect("grid");
        let local = LocalGrid::from_interior(0, 4, grid.cells());
        let mut wrap = frame(1, false, false);
        assert_eq!(tally_at(local.current(), 4, 2, 1, 0, &wrap).grown, 0);
        wrap.wrap_cols = true;
        assert_eq!(tally_at(local.current(), 4, 2, 1, 0, &wrap).grown, 1);
        assert_eq!(tally_at(local.current(), 4, 2, 2, 3, &wrap).parasites, 1);
    }

    #[test]
    fn advance_writes_next_buffer_and_reports_global_sites() {
        let grid = GlobalGrid::parse("GGG\nGPG\nGGG\n").expect("grid");
        let mut local = LocalGrid::from_interior(10, 3, grid.cells());
        let mut sites = Vec::new();
        let mut draws = |site: Site| -> u8 {
            sites.push(site);
            1
        };
        advance_rows(&mut local, 1..=3, &frame(1, false, false), &mut draws);

        assert_eq!(sites.len(), 8);
        assert_eq!(sites[0].row, 10);
        assert_eq!(sites[7].row, 12);
        assert!(sites.iter().all(|site| site.generation == 1));

        assert_eq!(local.get(2, 1), CellState::Parasite);
        local.swap();
        assert_eq!(local.interior(), &[CellState::Parasite; 9]);
    }
}
