mod backend;
mod branch;
mod config;
mod error;
mod problem;
mod simplex;
mod solution;

pub use backend::Backend;
pub use branch::BranchAndBound;
pub use config::SolverConfig;
pub use error::SolverError;
pub use problem::{Constraint, ConstraintOp, LpProblem, Objective};
pub use simplex::Simplex;
pub use solution::{Solution, SolutionStatus, SolveStats};
