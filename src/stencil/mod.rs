//! Row-slab decomposition of the parasites automaton and its public API.

pub mod aggregate;
pub mod cell;
pub mod draws;
mod engine;
pub mod grid;
pub mod halo;
pub mod kernel;
pub mod rules;
pub mod topology;

pub use aggregate::{gather, scatter};
pub use cell::{CellState, Census, GlobalGrid};
pub use draws::{DRAW_MAX, DrawSource, HashedDraws, RngDraws, Site};
pub use engine::{ParasitesConfig, RunSummary, Simulation, StopReason};
pub use grid::LocalGrid;
pub use rules::{Phase, Tally, next_state};
pub use topology::{Boundary, Topology, effective_rows};
