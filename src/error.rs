//! Error types for configuration, observer bootstrap and worker messaging.

use thiserror::Error;

/// Invalid run parameters. Grid rows that merely don't divide evenly by the
/// worker count are shrunk instead of rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("grid must have at least one column")]
    NoColumns,
    #[error("cannot split {requested} rows across {workers} workers")]
    TooFewRows { requested: usize, workers: usize },
    #[error("initial grid is {found_rows}x{found_cols}, expected {rows}x{cols}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        found_rows: usize,
        found_cols: usize,
    },
}

/// The rendering collaborator could not start on the coordinator.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("observer failed to start: {0}")]
    Observer(String),
    #[error("observer output failed")]
    Io(#[from] std::io::Error),
}

/// Failures on the halo, gather or control channels.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommError {
    #[error("worker {rank}: {channel} peer {peer} hung up")]
    Disconnected {
        rank: usize,
        peer: usize,
        channel: &'static str,
    },
    #[error("worker {rank}: expected {channel} message for generation {expected}, got {found}")]
    OutOfStep {
        rank: usize,
        channel: &'static str,
        expected: u64,
        found: u64,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    #[error(transparent)]
    Comm(#[from] CommError),
    #[error("failed to build worker pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
