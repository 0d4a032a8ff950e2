use crate::error::SolverError;
use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::{Solution, SolveStats};

/// Consecutive degenerate pivots tolerated before switching to Bland's rule
const DEGENERATE_RUN_LIMIT: usize = 50;

/// Two-phase tableau simplex for the continuous relaxation of a problem.
///
/// Integrality flags are ignored; see [`BranchAndBound`](crate::BranchAndBound)
/// for integer programs.
pub struct Simplex {
    /// Maximum pivots before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
}

impl Default for Simplex {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
        }
    }
}

impl Simplex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Solve the LP relaxation using the two-phase simplex method
    pub fn solve(&self, problem: &LpProblem) -> Result<Solution, SolverError> {
        problem.validate()?;
        let mut tableau = self.build_tableau(problem);

        // Phase 1: find an initial basic feasible solution
        if tableau.n_artificial > 0 && !self.phase1(&mut tableau)? {
            return Ok(Solution::infeasible().with_stats(tableau.stats()));
        }

        // Phase 2: optimize, never letting an artificial re-enter
        let enter_limit = tableau.n_vars + tableau.n_slack;
        match self.optimize(&mut tableau, enter_limit)? {
            SimplexResult::Optimal => {}
            SimplexResult::Unbounded => return Ok(Solution::unbounded().with_stats(tableau.stats())),
        }

        Ok(self.extract_solution(&tableau, problem))
    }

    fn build_tableau(&self, problem: &LpProblem) -> Tableau {
        let n_vars = problem.num_variables();
        let n_constraints = problem.num_constraints();

        // Rows with a negative RHS are negated so every RHS starts nonnegative
        let rows: Vec<(Vec<f64>, ConstraintOp, f64)> = problem
            .constraints
            .iter()
            .map(|c| {
                if c.rhs < 0.0 {
                    (c.coefficients.iter().map(|x| -x).collect(), c.op.flipped(), -c.rhs)
                } else {
                    (c.coefficients.clone(), c.op, c.rhs)
                }
            })
            .collect();

        let mut n_slack = 0;
        let mut n_artificial = 0;
        for (_, op, _) in &rows {
            match op {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let total_rows = n_constraints + 1; // +1 for objective

        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; total_rows],
            basic_vars: vec![0; n_constraints],
            n_vars,
            n_slack,
            n_artificial,
            iterations: 0,
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;
        let rhs_col = total_cols - 1;

        for (i, (coefficients, op, rhs)) in rows.into_iter().enumerate() {
            tableau.data[i][..n_vars].copy_from_slice(&coefficients);
            tableau.data[i][rhs_col] = rhs;

            match op {
                ConstraintOp::Le => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        // The objective row holds reduced costs of a maximization, so a
        // minimization stores -c
        let obj_row = n_constraints;
        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            tableau.data[obj_row][j] = if problem.objective.minimize { -coef } else { coef };
        }

        tableau
    }

    /// Returns `false` when the problem has no feasible point
    fn phase1(&self, tableau: &mut Tableau) -> Result<bool, SolverError> {
        let n_constraints = tableau.data.len() - 1;
        let n_cols = tableau.data[0].len();
        let rhs_col = n_cols - 1;
        let art_start = tableau.n_vars + tableau.n_slack;

        let orig_obj = std::mem::replace(&mut tableau.data[n_constraints], vec![0.0; n_cols]);

        // Maximize -sum(artificials), expressed in terms of the starting basis
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[n_constraints][j] = -1.0;
        }
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] += tableau.data[i][j];
                }
            }
        }

        // Phase 1 is bounded above by zero, so an unbounded ray cannot occur
        self.optimize(tableau, rhs_col)?;

        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start && tableau.data[i][rhs_col].abs() > self.tolerance {
                return Ok(false);
            }
        }

        // Pivot zero-level artificials out of the basis. A row with no
        // structural entry left is redundant and keeps its artificial.
        for i in 0..n_constraints {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            if let Some(col) = (0..art_start).find(|&j| tableau.data[i][j].abs() > self.tolerance) {
                self.pivot(tableau, i, col);
            }
        }

        // Restore the original objective and price out the basic columns
        tableau.data[n_constraints] = orig_obj;
        for i in 0..n_constraints {
            let basic = tableau.basic_vars[i];
            let ratio = tableau.data[n_constraints][basic];
            if ratio.abs() > self.tolerance {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] -= ratio * tableau.data[i][j];
                }
            }
        }

        Ok(true)
    }

    fn optimize(&self, tableau: &mut Tableau, enter_limit: usize) -> Result<SimplexResult, SolverError> {
        let rhs_col = tableau.data[0].len() - 1;
        let mut degenerate_run = 0;

        loop {
            let bland = degenerate_run >= DEGENERATE_RUN_LIMIT;
            let Some(pivot_col) = self.find_pivot_column(tableau, enter_limit, bland) else {
                return Ok(SimplexResult::Optimal);
            };
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col) else {
                return Ok(SimplexResult::Unbounded);
            };
            if tableau.iterations >= self.max_iterations {
                return Err(SolverError::IterationLimit(self.max_iterations));
            }
            if tableau.data[pivot_row][rhs_col].abs() <= self.tolerance {
                degenerate_run += 1;
            } else {
                degenerate_run = 0;
            }
            self.pivot(tableau, pivot_row, pivot_col);
        }
    }

    /// Dantzig's rule (most positive reduced cost), or Bland's rule (first
    /// positive reduced cost) when cycling is suspected
    fn find_pivot_column(&self, tableau: &Tableau, enter_limit: usize, bland: bool) -> Option<usize> {
        let obj_row = tableau.data.len() - 1;
        let reduced = &tableau.data[obj_row][..enter_limit];

        if bland {
            return reduced.iter().position(|&rc| rc > self.tolerance);
        }

        let mut max_val = self.tolerance;
        let mut max_col = None;
        for (j, &rc) in reduced.iter().enumerate() {
            if rc > max_val {
                max_val = rc;
                max_col = Some(j);
            }
        }
        max_col
    }

    /// Minimum ratio test; ties go to the row whose basic variable has the
    /// smallest index
    fn find_pivot_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let n_constraints = tableau.data.len() - 1;
        let rhs_col = tableau.data[0].len() - 1;

        let mut min_ratio = f64::INFINITY;
        let mut min_row: Option<usize> = None;

        for i in 0..n_constraints {
            let val = tableau.data[i][col];
            if val <= self.tolerance {
                continue;
            }
            let ratio = tableau.data[i][rhs_col].max(0.0) / val;
            let better = match min_row {
                None => true,
                Some(r) => {
                    ratio < min_ratio - self.tolerance
                        || (ratio <= min_ratio + self.tolerance && tableau.basic_vars[i] < tableau.basic_vars[r])
                }
            };
            if better {
                min_ratio = ratio;
                min_row = Some(i);
            }
        }

        min_row
    }

    fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        let n_rows = tableau.data.len();
        let n_cols = tableau.data[0].len();

        tableau.basic_vars[row] = col;
        tableau.iterations += 1;

        let pivot_val = tableau.data[row][col];
        for j in 0..n_cols {
            tableau.data[row][j] /= pivot_val;
        }

        let pivot_row = tableau.data[row].clone();
        for i in 0..n_rows {
            if i == row {
                continue;
            }
            let factor = tableau.data[i][col];
            if factor.abs() <= f64::EPSILON {
                continue;
            }
            for (cell, &p) in tableau.data[i].iter_mut().zip(&pivot_row) {
                *cell -= factor * p;
            }
        }
    }

    fn extract_solution(&self, tableau: &Tableau, problem: &LpProblem) -> Solution {
        let n_vars = problem.num_variables();
        let rhs_col = tableau.data[0].len() - 1;

        let mut values = vec![0.0; n_vars];
        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            if basic < n_vars {
                // Clamp round-off below the zero lower bound
                values[basic] = tableau.data[i][rhs_col].max(0.0);
            }
        }

        let objective_value = problem.objective_value(&values);
        Solution::optimal(values, objective_value).with_stats(tableau.stats())
    }
}

struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
    iterations: usize,
}

impl Tableau {
    fn stats(&self) -> SolveStats {
        SolveStats {
            lp_iterations: self.iterations,
            ..SolveStats::default()
        }
    }
}

enum SimplexResult {
    Optimal,
    Unbounded,
}
