//! Snapshot gathering and stop-flag broadcast.
//!
//! The coordinator (rank 0) assembles every worker's owned rows into a
//! `GlobalGrid` after each generation and answers with a `Verdict`. Members
//! block on the verdict, which makes the gather/broadcast round a barrier:
//! no worker starts generation g+1 before all of them finished g.
//!
//! Each member has its own report and verdict channel, so an exited member
//! or coordinator surfaces as a disconnect on the other side.

use std::sync::mpsc::{Receiver, Sender, channel};

use super::cell::{CellState, GlobalGrid};
use super::grid::LocalGrid;
use super::topology::Topology;
use crate::error::CommError;

#[derive(Debug)]
pub struct SliceReport {
    pub rank: usize,
    pub generation: u64,
    pub cells: Vec<CellState>,
}

/// Coordinator decision for the next generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Verdict {
    /// Generation every worker computes next.
    pub generation: u64,
    pub stop: bool,
}

/// Split a global grid into per-rank slabs. Ghost rows start empty.
pub fn scatter(grid: &GlobalGrid, topology: &Topology) -> Vec<LocalGrid> {
    debug_assert_eq!(grid.rows(), topology.rows());
    debug_assert_eq!(grid.cols(), topology.cols());
    let cols = grid.cols();
    let len = topology.local_rows() * cols;
    (0..topology.workers())
        .map(|rank| {
            let first = topology.first_row(rank);
            LocalGrid::from_interior(first, cols, &grid.cells()[first * cols..first * cols + len])
        })
        .collect()
}

/// Reassemble slabs (in any order) into a global grid.
pub fn gather(blocks: &[LocalGrid]) -> GlobalGrid {
    let cols = blocks.first().map_or(0, LocalGrid::cols);
    let rows = blocks.iter().map(LocalGrid::local_rows).sum();
    let mut grid = GlobalGrid::filled(rows, cols, CellState::Empty);
    for block in blocks {
        grid.rows_mut(block.first_row(), block.local_rows())
            .copy_from_slice(block.interior());
    }
    grid
}

/// Member side of the gather/broadcast round.
#[derive(Debug)]
pub struct MemberLink {
    rank: usize,
    reports: Sender<SliceReport>,
    verdicts: Receiver<Verdict>,
}

impl MemberLink {
    pub fn submit(&self, grid: &LocalGrid, generation: u64) -> Result<(), CommError> {
        self.reports
            .send(SliceReport {
                rank: self.rank,
                generation,
                cells: grid.interior().to_vec(),
            })
            .map_err(|_| self.coordinator_gone())
    }

    pub fn await_verdict(&self) -> Result<Verdict, CommError> {
        self.verdicts.recv().map_err(|_| self.coordinator_gone())
    }

    fn coordinator_gone(&self) -> CommError {
        CommError::Disconnected {
            rank: self.rank,
            peer: 0,
            channel: "aggregate",
        }
    }
}

/// Coordinator side: owns the assembled snapshot.
#[derive(Debug)]
pub struct Aggregator {
    local_rows: usize,
    reports: Vec<Receiver<SliceReport>>,
    verdicts: Vec<Sender<Verdict>>,
    snapshot: GlobalGrid,
}

/// Build the coordinator and the member links for ranks `1..workers`.
pub fn wire(topology: &Topology) -> (Aggregator, Vec<MemberLink>) {
    let members = topology.workers() - 1;
    let mut reports = Vec::with_capacity(members);
    let mut verdicts = Vec::with_capacity(members);
    let mut links = Vec::with_capacity(members);
    for rank in 1..topology.workers() {
        let (report_tx, report_rx) = channel();
        let (verdict_tx, verdict_rx) = channel();
        reports.push(report_rx);
        verdicts.push(verdict_tx);
        links.push(MemberLink {
            rank,
            reports: report_tx,
            verdicts: verdict_rx,
        });
    }
    let aggregator = Aggregator {
        local_rows: topology.local_rows(),
        reports,
        verdicts,
        snapshot: GlobalGrid::filled(topology.rows(), topology.cols(), CellState::Empty),
    };
    (aggregator, links)
}

impl Aggregator {
    /// Copy the coordinator's own rows and every member's report for
    /// `generation` into the snapshot.
    pub fn collect(&mut self, own: &LocalGrid, generation: u64) -> Result<&GlobalGrid, CommError> {
        self.snapshot
            .rows_mut(own.first_row(), own.local_rows())
            .copy_from_slice(own.interior());
        for (i, rx) in self.reports.iter().enumerate() {
            let rank = i + 1;
            let report = rx.recv().map_err(|_| CommError::Disconnected {
                rank: 0,
                peer: rank,
                channel: "aggregate",
            })?;
            if report.generation != generation {
                return Err(CommError::OutOfStep {
                    rank: 0,
                    channel: "aggregate",
                    expected: generation,
                    found: report.generation,
                });
            }
            debug_assert_eq!(report.rank, rank);
            self.snapshot
                .rows_mut(rank * self.local_rows, self.local_rows)
                .copy_from_slice(&report.cells);
        }
        Ok(&self.snapshot)
    }

    pub fn broadcast(&self, verdict: Verdict) -> Result<(), CommError> {
        for (i, tx) in self.verdicts.iter().enumerate() {
            tx.send(verdict).map_err(|_| CommError::Disconnected {
                rank: 0,
                peer: i + 1,
                channel: "aggregate",
            })?;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> &GlobalGrid {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> GlobalGrid {
        self.snapshot
    }
}
