//! Parasites: a grass/parasite cellular automaton computed by a group of
//! workers, each owning a horizontal slab of the grid and trading boundary
//! rows with its neighbours every generation.

pub mod error;
pub mod observe;
pub mod stencil;

pub use error::Error;
pub use observe::{CensusLog, Headless, Observer, Presentation, TextRenderer};
pub use stencil::{
    Boundary, CellState, GlobalGrid, ParasitesConfig, RunSummary, Simulation, StopReason,
};
