use std::path::PathBuf;
use std::time::Duration;

/// Options handed to a [`Backend`](crate::Backend) on every solve.
///
/// There is no global solver state: log destinations, limits and
/// tolerances travel with the call.
///
/// ```
/// use std::time::Duration;
/// use cellcap_solver::SolverConfig;
///
/// let config = SolverConfig::default()
///     .with_time_limit(Duration::from_secs(10))
///     .with_max_nodes(5_000);
/// assert_eq!(config.max_nodes, 5_000);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Wall-clock budget for the whole search
    pub time_limit: Option<Duration>,
    /// Maximum number of branch-and-bound nodes
    pub max_nodes: usize,
    /// Maximum simplex pivots per LP relaxation
    pub max_iterations: usize,
    /// Tolerance for floating point comparisons
    pub tolerance: f64,
    /// Distance from an integer under which a value counts as integral
    pub int_tolerance: f64,
    /// Where to write the node log, if anywhere
    pub log_path: Option<PathBuf>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: None,
            max_nodes: 100_000,
            max_iterations: 10_000,
            tolerance: 1e-9,
            int_tolerance: 1e-6,
            log_path: None,
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_int_tolerance(mut self, tol: f64) -> Self {
        self.int_tolerance = tol;
        self
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }
}
