use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::problem::LpProblem;
use crate::solution::Solution;

/// A solver that accepts an [`LpProblem`] and reports a [`Solution`].
///
/// Callers depend on this trait rather than on a concrete engine, so any
/// mixed-integer solver can sit behind it. A backend either returns a status
/// (`Optimal`, `Feasible`, `Infeasible`, `Unbounded`) or fails with a
/// [`SolverError`] that the caller receives unchanged.
pub trait Backend {
    /// Short identifier used in logs and reports
    fn name(&self) -> &str;

    fn solve(&self, problem: &LpProblem, config: &SolverConfig) -> Result<Solution, SolverError>;
}

