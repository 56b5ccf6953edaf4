//! Row-slab domain decomposition: effective grid height and worker neighbours.

use tracing::warn;

use crate::error::ConfigError;

/// Edge behaviour of the global grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Boundary {
    /// Cells outside the grid don't exist; edge workers have one neighbour.
    #[default]
    Bounded,
    /// Rows wrap through a ring of workers and columns wrap locally (torus).
    Periodic,
}

/// Neighbouring ranks of one worker. `None` means the slab touches the
/// grid edge on that side and exchanges nothing there.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankNeighbors {
    pub up: Option<usize>,
    pub down: Option<usize>,
}

/// Partition of `rows x cols` into `workers` equal horizontal slabs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Topology {
    workers: usize,
    rows: usize,
    cols: usize,
    boundary: Boundary,
}

/// Largest row count `<= requested` divisible by `workers`.
///
/// Every worker evaluates this independently and gets the same answer, so
/// no agreement round is needed.
pub fn effective_rows(requested: usize, workers: usize) -> Result<usize, ConfigError> {
    if workers == 0 {
        return Err(ConfigError::NoWorkers);
    }
    if requested < workers {
        return Err(ConfigError::TooFewRows { requested, workers });
    }
    Ok(requested - requested % workers)
}

impl Topology {
    pub fn new(
        workers: usize,
        requested_rows: usize,
        cols: usize,
        boundary: Boundary,
    ) -> Result<Self, ConfigError> {
        if cols == 0 {
            return Err(ConfigError::NoColumns);
        }
        let rows = effective_rows(requested_rows, workers)?;
        if rows != requested_rows {
            warn!(
                requested = requested_rows,
                effective = rows,
                workers,
                "grid rows shrunk to a multiple of the worker count"
            );
        }
        Ok(Self {
            workers,
            rows,
            cols,
            boundary,
        })
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
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
    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Interior rows owned by each worker.
    #[inline]
    pub fn local_rows(&self) -> usize {
        self.rows / self.workers
    }

    /// Global index of the first interior row of `rank`.
    #[inline]
    pub fn first_row(&self, rank: usize) -> usize {
        rank * self.local_rows()
    }

    pub fn neighbors(&self, rank: usize) -> RankNeighbors {
        debug_assert!(rank < self.workers);
        let last = self.workers - 1;
        match self.boundary {
            Boundary::Bounded => RankNeighbors {
                up: rank.checked_sub(1),
                down: (rank < last).then_some(rank + 1),
            },
            Boundary::Periodic => RankNeighbors {
                up: Some(if rank == 0 { last } else { rank - 1 }),
                down: Some(if rank == last { 0 } else { rank + 1 }),
            },
        }
    }
}
