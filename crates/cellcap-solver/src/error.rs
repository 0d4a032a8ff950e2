use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),
    #[error("Simplex did not converge within {0} iterations")]
    IterationLimit(usize),
    #[error("Search stopped after {nodes} nodes and {elapsed:?} without an integer solution")]
    LimitReached { nodes: usize, elapsed: Duration },
    #[error("Cannot write solver log {}: {source}", .path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
