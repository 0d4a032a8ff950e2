use std::time::Duration;

/// The result of solving a problem
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Values for each variable (empty unless a solution was found)
    pub values: Vec<f64>,
    /// Objective value of `values`
    pub objective_value: f64,
    /// Search statistics
    pub stats: SolveStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// A limit stopped the search; `values` hold the best solution found
    Feasible,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
}

impl SolutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SolutionStatus::Optimal => "Optimal",
            SolutionStatus::Feasible => "Feasible",
            SolutionStatus::Infeasible => "Infeasible",
            SolutionStatus::Unbounded => "Unbounded",
        }
    }

    pub fn has_values(self) -> bool {
        matches!(self, SolutionStatus::Optimal | SolutionStatus::Feasible)
    }
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolveStats {
    /// Branch-and-bound nodes whose relaxation was solved
    pub nodes: usize,
    /// Simplex pivots over all relaxations
    pub lp_iterations: usize,
    /// Wall-clock time spent in the backend
    pub wall_time: Duration,
    /// Process CPU time spent in the backend, zero where the platform has no CPU clock
    pub cpu_time: Duration,
}

impl Solution {
    pub fn optimal(values: Vec<f64>, objective_value: f64) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            stats: SolveStats::default(),
        }
    }

    pub fn infeasible() -> Self {
        Self {
            status: SolutionStatus::Infeasible,
            values: Vec::new(),
            objective_value: f64::NAN,
            stats: SolveStats::default(),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            status: SolutionStatus::Unbounded,
            values: Vec::new(),
            objective_value: f64::NAN,
            stats: SolveStats::default(),
        }
    }

    pub fn with_stats(mut self, stats: SolveStats) -> Self {
        self.stats = stats;
        self
    }
}
