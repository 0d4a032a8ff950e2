use std::collections::BTreeMap;

use cellcap_solver::{Backend, SolutionStatus, SolveStats, SolverConfig};

use crate::builder::{CellModel, Formulation, ModelBuilder};
use crate::error::{CellError, ConfigError};
use crate::instance::{Cell, Instance, LimitFamily, MAX_LIMIT};

/// Integer quantities for every admissible cell
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    quantities: BTreeMap<Cell, u64>,
    pub objective_value: f64,
    pub stats: SolveStats,
}

/// A capacity exceeded by an assignment
#[derive(Debug, Clone, PartialEq)]
pub struct LimitViolation {
    pub family: LimitFamily,
    pub index: usize,
    pub limit: f64,
    pub total: u64,
}

impl std::fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} totals {} but the limit is {}", self.family, self.index, self.total, self.limit)
    }
}

impl Assignment {
    pub fn quantity(&self, cell: Cell) -> Option<u64> {
        self.quantities.get(&cell).copied()
    }

    pub fn quantities(&self) -> &BTreeMap<Cell, u64> {
        &self.quantities
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cell, u64)> + '_ {
        self.quantities.iter().map(|(&cell, &q)| (cell, q))
    }

    /// Sum of all quantities, `None` on overflow
    pub fn total(&self) -> Option<u64> {
        checked_sum(self.quantities.values().copied())
    }

    /// Sum of quantities per constraint of `family`, for `count` constraints.
    /// Totals saturate at `u64::MAX`, which still exceeds every valid limit.
    pub fn totals(&self, family: LimitFamily, count: usize) -> Vec<u64> {
        let mut totals = vec![0u64; count];
        for (&cell, &q) in &self.quantities {
            if let Some(total) = totals.get_mut(family.index_of(cell)) {
                *total = total.saturating_add(q);
            }
        }
        totals
    }

    pub fn row_totals(&self, instance: &Instance) -> Vec<u64> {
        self.totals(LimitFamily::Row, instance.n_row())
    }

    pub fn col_totals(&self, instance: &Instance) -> Vec<u64> {
        self.totals(LimitFamily::Column, instance.n_col())
    }

    pub fn diag_totals(&self, instance: &Instance) -> Vec<u64> {
        self.totals(LimitFamily::Diagonal, instance.n_diag())
    }

    /// Every limit of `instance` this assignment exceeds
    pub fn violations(&self, instance: &Instance) -> Vec<LimitViolation> {
        let mut violations = Vec::new();
        for family in [LimitFamily::Row, LimitFamily::Column, LimitFamily::Diagonal] {
            let limits = instance.limits(family);
            for (index, (total, &limit)) in self.totals(family, limits.len()).into_iter().zip(limits).enumerate() {
                if total as f64 > limit {
                    violations.push(LimitViolation {
                        family,
                        index,
                        limit,
                        total,
                    });
                }
            }
        }
        violations
    }
}

/// Terminal result of a solve
#[derive(Debug, Clone, PartialEq)]
pub enum CellOutcome {
    /// Proven optimal assignment
    Optimal(Assignment),
    /// Best assignment found before a time or node limit stopped the search
    Feasible(Assignment),
    /// No assignment satisfies the limits
    Infeasible,
}

impl CellOutcome {
    pub fn status(&self) -> SolutionStatus {
        match self {
            CellOutcome::Optimal(_) => SolutionStatus::Optimal,
            CellOutcome::Feasible(_) => SolutionStatus::Feasible,
            CellOutcome::Infeasible => SolutionStatus::Infeasible,
        }
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            CellOutcome::Optimal(a) | CellOutcome::Feasible(a) => Some(a),
            CellOutcome::Infeasible => None,
        }
    }

    pub fn objective_value(&self) -> Option<f64> {
        self.assignment().map(|a| a.objective_value)
    }
}

impl CellModel {
    /// Hand the model to `backend` and map its values back onto cells
    pub fn solve(&self, backend: &dyn Backend, config: &SolverConfig) -> Result<CellOutcome, CellError> {
        let solution = backend.solve(&self.problem, config)?;

        tracing::debug!(
            component = "model",
            operation = "solve",
            backend = backend.name(),
            formulation = self.formulation.as_str(),
            status = solution.status.as_str(),
            nodes = solution.stats.nodes,
            duration_ms = solution.stats.wall_time.as_secs_f64() * 1000.0,
            "Backend returned"
        );

        if !solution.status.has_values() {
            return match solution.status {
                SolutionStatus::Unbounded => Err(ConfigError::Unbounded(backend.name().to_string()).into()),
                _ => Ok(CellOutcome::Infeasible),
            };
        }

        if solution.values.len() != self.num_variables() {
            return Err(CellError::MalformedSolution(format!(
                "{} values for {} variables",
                solution.values.len(),
                self.num_variables()
            )));
        }

        let mut quantities = BTreeMap::new();
        for ((i, j), var) in self.cells() {
            let value = solution.values[var];
            let rounded = value.round();
            if !(0.0..=MAX_LIMIT).contains(&rounded) || (value - rounded).abs() > config.int_tolerance {
                return Err(CellError::MalformedSolution(format!(
                    "cell ({}, {}) has value {} which is not an integer in 0..={}",
                    i, j, value, MAX_LIMIT
                )));
            }
            quantities.insert((i, j), rounded as u64);
        }

        let total = checked_sum(quantities.values().copied())
            .ok_or_else(|| CellError::MalformedSolution("cell quantities overflow u64".to_string()))?;
        let objective_value = total as f64;
        let assignment = Assignment {
            quantities,
            objective_value,
            stats: solution.stats,
        };

        Ok(match solution.status {
            SolutionStatus::Feasible => {
                tracing::warn!(
                    component = "model",
                    operation = "solve",
                    objective_value,
                    "Search limit reached, returning best assignment found"
                );
                CellOutcome::Feasible(assignment)
            }
            _ => CellOutcome::Optimal(assignment),
        })
    }
}

fn checked_sum(values: impl IntoIterator<Item = u64>) -> Option<u64> {
    values.into_iter().try_fold(0u64, |acc, q| acc.checked_add(q))
}

/// Build the sparse model for `instance` and solve it
pub fn solve(instance: &Instance, backend: &dyn Backend, config: &SolverConfig) -> Result<CellOutcome, CellError> {
    solve_with(instance, Formulation::Sparse, backend, config)
}

pub fn solve_with(
    instance: &Instance,
    formulation: Formulation,
    backend: &dyn Backend,
    config: &SolverConfig,
) -> Result<CellOutcome, CellError> {
    ModelBuilder::new(instance).formulation(formulation).build()?.solve(backend, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::classroom_instance;
    use cellcap_solver::{BranchAndBound, LpProblem, Solution, SolverError};

    fn optimal(instance: &Instance, formulation: Formulation) -> Assignment {
        match solve_with(instance, formulation, &BranchAndBound::new(), &SolverConfig::default()).unwrap() {
            CellOutcome::Optimal(a) => a,
            other => panic!("expected an optimal outcome, got {:?}", other),
        }
    }

    /// Backend that replays a canned answer
    struct Canned(fn(&LpProblem) -> Result<Solution, SolverError>);

    impl Backend for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn solve(&self, problem: &LpProblem, _config: &SolverConfig) -> Result<Solution, SolverError> {
            (self.0)(problem)
        }
    }

    #[test]
    fn test_classroom_instance() {
        let instance = classroom_instance();
        let assignment = optimal(&instance, Formulation::Sparse);

        assert!(assignment.objective_value.is_finite());
        // Cells split into {(0,0),(0,1),(1,0)} <= 9, the diagonal 3-5 group <= 14, and (2,4) <= 8
        assert_eq!(assignment.objective_value, 31.0);
        assert!(assignment.objective_value <= 36.0);
        assert!(assignment.objective_value <= 33.0);
        assert!(assignment.violations(&instance).is_empty(), "{:?}", assignment.violations(&instance));
        assert_eq!(assignment.quantities().len(), 9);
        assert_eq!(assignment.total().map(|t| t as f64), Some(assignment.objective_value));

        // Diagonals 2 and 7 are capped at zero
        assert_eq!(assignment.quantity((1, 1)), None);
        assert_eq!(assignment.quantity((0, 2)), None);
        assert_eq!(assignment.quantity((3, 4)), Some(0));
        // Diagonal 0 only holds (0, 0)
        assert!(assignment.quantity((0, 0)).unwrap() <= 7);
    }

    #[test]
    fn test_classroom_formulations_agree() {
        let instance = classroom_instance();
        let sparse = optimal(&instance, Formulation::Sparse);
        let dense = optimal(&instance, Formulation::Dense);

        assert_eq!(sparse.objective_value, dense.objective_value);
        assert!(dense.violations(&instance).is_empty());
    }

    #[test]
    fn test_empty_admissible_set() {
        let instance = Instance::new(vec![], vec![3.0, 4.0], vec![1.0, 2.0, 3.0], vec![1.0; 4]);
        let outcome = solve(&instance, &BranchAndBound::new(), &SolverConfig::default()).unwrap();

        assert_eq!(outcome.status(), SolutionStatus::Optimal);
        assert_eq!(outcome.objective_value(), Some(0.0));
        assert!(outcome.assignment().unwrap().quantities().is_empty());
    }

    #[test]
    fn test_fractional_limits_round_down() {
        // One cell capped at 2.5 by its row
        let instance = Instance::new(vec![(0, 0)], vec![2.5], vec![10.0], vec![10.0]);
        let assignment = optimal(&instance, Formulation::Sparse);

        assert_eq!(assignment.quantity((0, 0)), Some(2));
    }

    #[test]
    fn test_negative_diagonal_is_a_config_error() {
        let mut instance = classroom_instance();
        instance.diag_limits[3] = -1.0;

        let result = solve(&instance, &BranchAndBound::new(), &SolverConfig::default());

        assert!(matches!(
            result,
            Err(CellError::Config(ConfigError::NegativeLimit { family: LimitFamily::Diagonal, index: 3, .. }))
        ));
    }

    #[test]
    fn test_unbounded_backend_is_a_config_error() {
        let backend = Canned(|_| Ok(Solution::unbounded()));
        let result = solve(&classroom_instance(), &backend, &SolverConfig::default());

        assert!(matches!(result, Err(CellError::Config(ConfigError::Unbounded(name))) if name == "canned"));
    }

    #[test]
    fn test_infeasible_backend_has_no_assignment() {
        let backend = Canned(|_| Ok(Solution::infeasible()));
        let outcome = solve(&classroom_instance(), &backend, &SolverConfig::default()).unwrap();

        assert_eq!(outcome, CellOutcome::Infeasible);
        assert_eq!(outcome.assignment(), None);
    }

    #[test]
    fn test_solver_error_is_propagated() {
        let backend = Canned(|_| Err(SolverError::IterationLimit(7)));
        let result = solve(&classroom_instance(), &backend, &SolverConfig::default());

        assert!(matches!(result, Err(CellError::Solver(SolverError::IterationLimit(7)))));
    }

    #[test]
    fn test_fractional_values_are_rejected() {
        let backend = Canned(|problem| Ok(Solution::optimal(vec![0.5; problem.num_variables()], 0.0)));
        let result = solve(&classroom_instance(), &backend, &SolverConfig::default());

        assert!(matches!(result, Err(CellError::MalformedSolution(_))));
    }

    #[test]
    fn test_values_beyond_exact_range_are_rejected() {
        let backend = Canned(|problem| Ok(Solution::optimal(vec![1e20; problem.num_variables()], 1e20)));
        let result = solve(&classroom_instance(), &backend, &SolverConfig::default());

        assert!(matches!(result, Err(CellError::MalformedSolution(_))));
    }

    #[test]
    fn test_huge_limits_are_a_config_error() {
        let instance = Instance::new(vec![(0, 0), (0, 1)], vec![1e19], vec![1e19, 1e19], vec![1e19, 1e19]);
        let result = solve(&instance, &BranchAndBound::new(), &SolverConfig::default());

        assert!(matches!(
            result,
            Err(CellError::Config(ConfigError::LimitTooLarge { family: LimitFamily::Row, index: 0, .. }))
        ));
    }

    #[test]
    fn test_totals_do_not_overflow() {
        let mut quantities = BTreeMap::new();
        quantities.insert((0, 0), u64::MAX - 1);
        quantities.insert((0, 1), 2);
        let assignment = Assignment {
            quantities,
            objective_value: f64::NAN,
            stats: SolveStats::default(),
        };

        assert_eq!(assignment.total(), None);
        assert_eq!(assignment.totals(LimitFamily::Row, 1), vec![u64::MAX]);
        assert_eq!(assignment.totals(LimitFamily::Column, 2), vec![u64::MAX - 1, 2]);
        assert_eq!(checked_sum([1, 2, 3]), Some(6));
    }

    #[test]
    fn test_dense_with_short_diagonal_list() {
        // 3x3 grid, diagonals 2..=4 have no limit; they hold only inadmissible cells
        let instance = Instance::new(vec![(0, 0), (0, 1), (1, 0)], vec![4.0; 3], vec![3.0; 3], vec![2.0, 5.0]);
        let sparse = optimal(&instance, Formulation::Sparse);
        let dense = optimal(&instance, Formulation::Dense);

        // (0, 0) = 1, (0, 1) = 3, (1, 0) = 2 is the only optimum
        assert_eq!(sparse.objective_value, 6.0);
        assert_eq!(dense.objective_value, sparse.objective_value);
        assert_eq!(dense.quantities(), sparse.quantities());
        assert_eq!(dense.quantity((0, 0)), Some(1));
        assert_eq!(dense.quantity((1, 1)), None);
        assert!(dense.violations(&instance).is_empty());
    }

    #[test]
    fn test_feasible_status_is_kept() {
        let backend = Canned(|problem| {
            let mut solution = Solution::optimal(vec![0.0; problem.num_variables()], 0.0);
            solution.status = SolutionStatus::Feasible;
            Ok(solution)
        });
        let outcome = solve(&classroom_instance(), &backend, &SolverConfig::default()).unwrap();

        assert!(matches!(outcome, CellOutcome::Feasible(_)));
        assert_eq!(outcome.objective_value(), Some(0.0));
    }

    #[test]
    fn test_violations_report_exceeded_limits() {
        let instance = Instance::new(vec![(0, 0), (0, 1)], vec![3.0], vec![2.0, 2.0], vec![5.0, 1.0]);
        let mut quantities = BTreeMap::new();
        quantities.insert((0, 0), 2);
        quantities.insert((0, 1), 2);
        let assignment = Assignment {
            quantities,
            objective_value: 4.0,
            stats: SolveStats::default(),
        };

        let violations = assignment.violations(&instance);

        assert_eq!(assignment.row_totals(&instance), vec![4]);
        assert_eq!(assignment.col_totals(&instance), vec![2, 2]);
        assert_eq!(assignment.diag_totals(&instance), vec![2, 2]);
        assert_eq!(
            violations,
            vec![
                LimitViolation { family: LimitFamily::Row, index: 0, limit: 3.0, total: 4 },
                LimitViolation { family: LimitFamily::Diagonal, index: 1, limit: 1.0, total: 2 },
            ]
        );
        assert_eq!(violations[0].to_string(), "Row 0 totals 4 but the limit is 3");
    }
}
