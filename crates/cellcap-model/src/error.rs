use cellcap_solver::SolverError;
use thiserror::Error;

use crate::instance::LimitFamily;

/// Malformed input, detected before the backend is called
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Cell ({row}, {col}) is outside the {n_row}x{n_col} grid")]
    CellOutOfBounds { row: usize, col: usize, n_row: usize, n_col: usize },
    #[error("Cell ({row}, {col}) lies on diagonal {diagonal} but only {n_diag} diagonal limits were given")]
    DiagonalNotCovered { row: usize, col: usize, diagonal: usize, n_diag: usize },
    #[error("{family} limit {index} is negative: {value}")]
    NegativeLimit { family: LimitFamily, index: usize, value: f64 },
    #[error("{family} limit {index} is not a finite number: {value}")]
    NonFiniteLimit { family: LimitFamily, index: usize, value: f64 },
    #[error("{family} limit {index} is {value}, above the largest exact integer capacity {max}")]
    LimitTooLarge { family: LimitFamily, index: usize, value: f64, max: f64 },
    #[error("Unknown formulation '{0}' (expected 'sparse' or 'dense')")]
    UnknownFormulation(String),
    #[error("Backend '{0}' reported an unbounded model, which finite limits cannot produce")]
    Unbounded(String),
}

#[derive(Error, Debug)]
pub enum CellError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("Backend returned an unusable solution: {0}")]
    MalformedSolution(String),
}
