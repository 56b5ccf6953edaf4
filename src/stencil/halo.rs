//! Boundary-row exchange between vertically adjacent workers.
//!
//! One channel per directed edge. Every send moves an owned copy of the
//! boundary row, so a worker may overwrite its buffers as soon as `send`
//! returns; there is no in-flight reference into grid memory. Receives block
//! with no timeout: a live neighbour that never sends stalls the receiver
//! forever, while a neighbour that has exited shows up as a disconnect.

use std::sync::mpsc::{Receiver, Sender, channel};

use tracing::trace;

use super::cell::CellState;
use super::grid::{Ghost, LocalGrid};
use super::topology::{RankNeighbors, Topology};
use crate::error::CommError;

/// Direction a boundary row travels. Doubles as the message tag: rows
/// heading north fill the receiver's south ghost and vice versa.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Heading {
    North,
    South,
}

#[derive(Debug)]
pub struct HaloRow {
    pub generation: u64,
    pub from: usize,
    pub heading: Heading,
    pub cells: Vec<CellState>,
}

/// A worker's endpoints. Present exactly where the topology has a neighbour.
#[derive(Debug)]
pub struct HaloLinks {
    rank: usize,
    neighbors: RankNeighbors,
    to_north: Option<Sender<HaloRow>>,
    to_south: Option<Sender<HaloRow>>,
    from_north: Option<Receiver<HaloRow>>,
    from_south: Option<Receiver<HaloRow>>,
}

/// Build the halo channels for every rank, indexed by rank.
pub fn wire(topology: &Topology) -> Vec<HaloLinks> {
    let mut links: Vec<HaloLinks> = (0..topology.workers())
        .map(|rank| HaloLinks {
            rank,
            neighbors: topology.neighbors(rank),
            to_north: None,
            to_south: None,
            from_north: None,
            from_south: None,
        })
        .collect();

    for rank in 0..links.len() {
        let RankNeighbors { up, down } = links[rank].neighbors;
        if let Some(up) = up {
            let (tx, rx) = channel();
            links[rank].to_north = Some(tx);
            links[up].from_south = Some(rx);
        }
        if let Some(down) = down {
            let (tx, rx) = channel();
            links[rank].to_south = Some(tx);
            links[down].from_north = Some(rx);
        }
    }
    links
}

impl HaloLinks {
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    #[inline]
    pub fn has_north(&self) -> bool {
        self.neighbors.up.is_some()
    }

    #[inline]
    pub fn has_south(&self) -> bool {
        self.neighbors.down.is_some()
    }

    /// Send the top owned row north and the bottom owned row south.
    pub fn send_boundaries(&self, grid: &LocalGrid, generation: u64) -> Result<(), CommError> {
        if let (Some(tx), Some(peer)) = (&self.to_north, self.neighbors.up) {
            self.post(tx, peer, Heading::North, grid.top_row(), generation)?;
        }
        if let (Some(tx), Some(peer)) = (&self.to_south, self.neighbors.down) {
            self.post(tx, peer, Heading::South, grid.bottom_row(), generation)?;
        }
        Ok(())
    }

    fn post(
        &self,
        tx: &Sender<HaloRow>,
        peer: usize,
        heading: Heading,
        row: &[CellState],
        generation: u64,
    ) -> Result<(), CommError> {
        trace!(rank = self.rank, peer, ?heading, generation, "halo send");
        tx.send(HaloRow {
            generation,
            from: self.rank,
            heading,
            cells: row.to_vec(),
        })
        .map_err(|_| CommError::Disconnected {
            rank: self.rank,
            peer,
            channel: "halo",
        })
    }

    /// Block until both neighbours' rows for `generation` arrive, then copy
    /// them into the ghost rows of the current buffer.
    pub fn receive_boundaries(
        &self,
        grid: &mut LocalGrid,
        generation: u64,
    ) -> Result<(), CommError> {
        if let (Some(rx), Some(peer)) = (&self.from_north, self.neighbors.up) {
            let row = self.take(rx, peer, generation)?;
            debug_assert_eq!(row.heading, Heading::South);
            grid.fill_ghost(Ghost::North, &row.cells);
        }
        if let (Some(rx), Some(peer)) = (&self.from_south, self.neighbors.down) {
            let row = self.take(rx, peer, generation)?;
            debug_assert_eq!(row.heading, Heading::North);
            grid.fill_ghost(Ghost::South, &row.cells);
        }
        Ok(())
    }

    fn take(
        &self,
        rx: &Receiver<HaloRow>,
        peer: usize,
        generation: u64,
    ) -> Result<HaloRow, CommError> {
        let row = rx.recv().map_err(|_| CommError::Disconnected {
            rank: self.rank,
            peer,
            channel: "halo",
        })?;
        if row.generation != generation {
            return Err(CommError::OutOfStep {
                rank: self.rank,
                channel: "halo",
                expected: generation,
                found: row.generation,
            });
        }
        trace!(rank = self.rank, from = row.from, heading = ?row.heading, generation, "halo recv");
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::wire;
    use crate::error::CommError;
    use crate::stencil::cell::{CellState, GlobalGrid};
    use crate::stencil::grid::LocalGrid;
    use crate::stencil::topology::{Boundary, Topology};

    fn slabs(topology: &Topology, grid: &GlobalGrid) -> Vec<LocalGrid> {
        let local_rows = topology.local_rows();
        (0..topology.workers())
            .map(|rank| {
                let first = topology.first_row(rank);
                let start = first * grid.cols();
                let len = local_rows * grid.cols();
                LocalGrid::from_interior(first, grid.cols(), &grid.cells()[start..start + len])
            })
            .collect()
    }

    #[test]
    fn bounded_exchange_fills_inner_ghosts_only() {
        let grid = GlobalGrid::parse("GG\nPP\nss\ngg\n..\nGP\n").expect("grid");
        let topo = Topology::new(3, 6, 2, Boundary::Bounded).expect("topology");
        let links = wire(&topo);
        let mut blocks = slabs(&topo, &grid);

        for (link, block) in links.iter().zip(&blocks) {
            link.send_boundaries(block, 0).expect("send");
        }
        for (link, block) in links.iter().zip(blocks.iter_mut()) {
            link.receive_boundaries(block, 0).expect("recv");
        }

        assert!(!links[0].has_north());
        assert_eq!(blocks[0].row(0), &[CellState::Empty; 2]);
        assert_eq!(blocks[0].row(3), grid.row(2));
        assert_eq!(blocks[1].row(0), grid.row(1));
        assert_eq!(blocks[1].row(3), grid.row(4));
        assert_eq!(blocks[2].row(0), grid.row(3));
        assert_eq!(blocks[2].row(3), &[CellState::Empty; 2]);
    }

    #[test]
    fn periodic_single_worker_wraps_onto_itself() {
        let grid = GlobalGrid::parse("GP\n..\nsg\n").expect("grid");
        let topo = Topology::new(1, 3, 2, Boundary::Periodic).expect("topology");
        let links = wire(&topo);
        let mut blocks = slabs(&topo, &grid);

        links[0].send_boundaries(&blocks[0], 4).expect("send");
        links[0].receive_boundaries(&mut blocks[0], 4).expect("recv");

        assert_eq!(blocks[0].row(0), grid.row(2));
        assert_eq!(blocks[0].row(4), grid.row(0));
    }

    #[test]
    fn stale_generation_is_rejected() {
        let grid = GlobalGrid::filled(4, 3, CellState::GrownGrass);
        let topo = Topology::new(2, 4, 3, Boundary::Bounded).expect("topology");
        let links = wire(&topo);
        let mut blocks = slabs(&topo, &grid);

        links[0].send_boundaries(&blocks[0], 6).expect("send");
        let err = links[1]
            .receive_boundaries(&mut blocks[1], 7)
            .expect_err("out of step");
        assert_eq!(
            err,
            CommError::OutOfStep {
                rank: 1,
                channel: "halo",
                expected: 7,
                found: 6
            }
        );
    }

    #[test]
    fn exited_neighbor_is_reported_not_awaited() {
        let grid = GlobalGrid::filled(4, 3, CellState::GrownGrass);
        let topo = Topology::new(2, 4, 3, Boundary::Bounded).expect("topology");
        let mut links = wire(&topo);
        let mut blocks = slabs(&topo, &grid);

        let survivor = links.remove(0);
        drop(links);

        assert_eq!(
            survivor.send_boundaries(&blocks[0], 0),
            Err(CommError::Disconnected {
                rank: 0,
                peer: 1,
                channel: "halo"
            })
        );
        assert_eq!(
            survivor.receive_boundaries(&mut blocks[0], 0),
            Err(CommError::Disconnected {
                rank: 0,
                peer: 1,
                channel: "halo"
            })
        );
    }
}
