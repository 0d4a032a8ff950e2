use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use cpu_time::ProcessTime;

use crate::backend::Backend;
use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::problem::{ConstraintOp, LpProblem};
use crate::simplex::Simplex;
use crate::solution::{Solution, SolutionStatus, SolveStats};

/// Depth-first branch-and-bound over [`Simplex`] relaxations.
///
/// Each node adds bound rows (`x <= floor(v)` or `x >= ceil(v)`) on top of
/// the original problem. The integer variable furthest from integrality is
/// branched on, and the side it leans towards is explored first.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBound;

impl BranchAndBound {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for BranchAndBound {
    fn name(&self) -> &str {
        "branch-and-bound"
    }

    fn solve(&self, problem: &LpProblem, config: &SolverConfig) -> Result<Solution, SolverError> {
        problem.validate()?;
        let started = Instant::now();
        let cpu_started = ProcessTime::try_now().ok();
        let lp = Simplex::new()
            .with_max_iterations(config.max_iterations)
            .with_tolerance(config.tolerance);
        let mut log = NodeLog::open(config.log_path.as_deref())?;
        log.record(format_args!(
            "problem: {} variables, {} constraints, {} integer",
            problem.num_variables(),
            problem.num_constraints(),
            problem.integer.iter().filter(|&&flag| flag).count()
        ))?;

        // Scores are always maximized internally
        let sense = if problem.objective.minimize { -1.0 } else { 1.0 };
        let mut stack = vec![Node::root()];
        let mut incumbent: Option<(Vec<f64>, f64)> = None;
        let mut stats = SolveStats::default();
        let mut limited = false;

        while let Some(node) = stack.pop() {
            if stats.nodes >= config.max_nodes || config.time_limit.is_some_and(|limit| started.elapsed() >= limit) {
                limited = true;
                break;
            }
            stats.nodes += 1;

            let relaxation = lp.solve(&node.apply(problem))?;
            stats.lp_iterations += relaxation.stats.lp_iterations;

            match relaxation.status {
                SolutionStatus::Infeasible => {
                    log.record(format_args!("node {} depth {}: infeasible", stats.nodes, node.depth))?;
                    continue;
                }
                SolutionStatus::Unbounded => {
                    log.record(format_args!("node {} depth {}: unbounded", stats.nodes, node.depth))?;
                    stop_clocks(&mut stats, started, cpu_started.as_ref());
                    log.finish()?;
                    return Ok(Solution::unbounded().with_stats(stats));
                }
                SolutionStatus::Optimal | SolutionStatus::Feasible => {}
            }

            let bound = sense * relaxation.objective_value;
            if let Some((_, best)) = &incumbent {
                if bound <= sense * best + config.tolerance {
                    log.record(format_args!(
                        "node {} depth {}: pruned, bound {:.6}",
                        stats.nodes, node.depth, relaxation.objective_value
                    ))?;
                    continue;
                }
            }

            match most_fractional(problem, &relaxation.values, config.int_tolerance) {
                None => {
                    let values: Vec<f64> = relaxation
                        .values
                        .iter()
                        .enumerate()
                        .map(|(j, &v)| if problem.is_integer(j) { v.round() } else { v })
                        .collect();
                    let objective = problem.objective_value(&values);
                    log.record(format_args!(
                        "node {} depth {}: incumbent {:.6}",
                        stats.nodes, node.depth, objective
                    ))?;
                    incumbent = Some((values, objective));
                }
                Some((var, value)) => {
                    let floor = value.floor();
                    let down = node.child(var, ConstraintOp::Le, floor);
                    let up = node.child(var, ConstraintOp::Ge, floor + 1.0);
                    log.record(format_args!(
                        "node {} depth {}: bound {:.6}, branch on {} = {:.6}",
                        stats.nodes, node.depth, relaxation.objective_value, problem.variables[var], value
                    ))?;
                    // The last pushed child is explored first
                    if value - floor >= 0.5 {
                        stack.push(down);
                        stack.push(up);
                    } else {
                        stack.push(up);
                        stack.push(down);
                    }
                }
            }
        }

        stop_clocks(&mut stats, started, cpu_started.as_ref());
        let status = match (&incumbent, limited) {
            (Some(_), false) => SolutionStatus::Optimal,
            (Some(_), true) => SolutionStatus::Feasible,
            (None, false) => SolutionStatus::Infeasible,
            (None, true) => {
                log.record(format_args!("limit reached after {} nodes, no incumbent", stats.nodes))?;
                log.finish()?;
                return Err(SolverError::LimitReached {
                    nodes: stats.nodes,
                    elapsed: stats.wall_time,
                });
            }
        };
        log.record(format_args!(
            "finished: {} after {} nodes, {} pivots",
            status, stats.nodes, stats.lp_iterations
        ))?;
        log.finish()?;

        tracing::debug!(
            component = "solver",
            operation = "branch_and_bound",
            status = status.as_str(),
            nodes = stats.nodes,
            lp_iterations = stats.lp_iterations,
            duration_ms = stats.wall_time.as_secs_f64() * 1000.0,
            cpu_ms = stats.cpu_time.as_secs_f64() * 1000.0,
            "Finished branch-and-bound search"
        );

        Ok(match incumbent {
            Some((values, objective_value)) => Solution {
                status,
                values,
                objective_value,
                stats,
            },
            None => Solution::infeasible().with_stats(stats),
        })
    }
}

fn stop_clocks(stats: &mut SolveStats, started: Instant, cpu_started: Option<&ProcessTime>) {
    stats.wall_time = started.elapsed();
    stats.cpu_time = cpu_started.and_then(|t| t.try_elapsed().ok()).unwrap_or_default();
}

/// Integer variable furthest from an integer value, with its value
fn most_fractional(problem: &LpProblem, values: &[f64], int_tolerance: f64) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64, f64)> = None;
    for (j, &value) in values.iter().enumerate() {
        if !problem.is_integer(j) {
            continue;
        }
        let frac = value - value.floor();
        let distance = frac.min(1.0 - frac);
        if distance <= int_tolerance {
            continue;
        }
        if best.is_none_or(|(_, _, d)| distance > d) {
            best = Some((j, value, distance));
        }
    }
    best.map(|(j, value, _)| (j, value))
}

#[derive(Debug, Clone, Copy)]
struct Bound {
    var: usize,
    op: ConstraintOp,
    value: f64,
}

#[derive(Debug, Clone)]
struct Node {
    bounds: Vec<Bound>,
    depth: usize,
}

impl Node {
    fn root() -> Self {
        Self {
            bounds: Vec::new(),
            depth: 0,
        }
    }

    fn child(&self, var: usize, op: ConstraintOp, value: f64) -> Self {
        let mut bounds = self.bounds.clone();
        bounds.push(Bound { var, op, value });
        Self {
            bounds,
            depth: self.depth + 1,
        }
    }

    /// The original problem plus this node's bound rows
    fn apply(&self, problem: &LpProblem) -> LpProblem {
        let mut relaxed = problem.clone();
        let n = problem.num_variables();
        for bound in &self.bounds {
            let mut coefficients = vec![0.0; n];
            coefficients[bound.var] = 1.0;
            let tag = match bound.op {
                ConstraintOp::Le => "le",
                ConstraintOp::Ge => "ge",
                ConstraintOp::Eq => "eq",
            };
            relaxed.add_constraint(
                format!("branch_{}_{}_{}", problem.variables[bound.var], tag, bound.value),
                coefficients,
                bound.op,
                bound.value,
            );
        }
        relaxed
    }
}

/// Plain-text search trace, written only when a log path is configured
struct NodeLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl NodeLog {
    fn open(path: Option<&Path>) -> Result<Self, SolverError> {
        let Some(path) = path else {
            return Ok(Self {
                path: PathBuf::new(),
                writer: None,
            });
        };
        let file = File::create(path).map_err(|source| SolverError::Log {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
        })
    }

    fn record(&mut self, line: std::fmt::Arguments<'_>) -> Result<(), SolverError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        writeln!(writer, "{}", line).map_err(|source| SolverError::Log {
            path: self.path.clone(),
            source,
        })
    }

    fn finish(&mut self) -> Result<(), SolverError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        writer.flush().map_err(|source| SolverError::Log {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("x{}", i)).collect()
    }

    /// max x + y, -x + y <= 1, 3x + 2y <= 12, 2x + 3y <= 12
    /// Relaxation: (2.4, 2.4) with 4.8; integer optimum 4
    fn fractional_problem() -> LpProblem {
        let mut problem = LpProblem::new_integer(names(2));
        problem.set_objective(vec![1.0, 1.0], false);
        problem.add_constraint("a", vec![-1.0, 1.0], ConstraintOp::Le, 1.0);
        problem.add_constraint("b", vec![3.0, 2.0], ConstraintOp::Le, 12.0);
        problem.add_constraint("c", vec![2.0, 3.0], ConstraintOp::Le, 12.0);
        problem
    }

    #[test]
    fn test_integer_optimum_below_relaxation() {
        let problem = fractional_problem();
        let relaxation = Simplex::new().solve(&problem).unwrap();
        assert!((relaxation.objective_value - 4.8).abs() < 1e-6);

        let solution = BranchAndBound::new().solve(&problem, &SolverConfig::default()).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value - 4.0).abs() < 1e-9);
        for (j, v) in solution.values.iter().enumerate() {
            assert_eq!(v.fract(), 0.0, "x{} = {} is not integral", j, v);
        }
        for c in &problem.constraints {
            assert!(c.is_satisfied(&solution.values, 1e-9), "{} violated", c.name);
        }
        assert!(solution.stats.nodes > 1);
        assert!(solution.stats.wall_time > Duration::ZERO);
        #[cfg(unix)]
        assert!(solution.stats.cpu_time > Duration::ZERO);
    }

    #[test]
    fn test_simple_rounding_down() {
        // max x + y, 2x + 2y <= 3
        let mut problem = LpProblem::new_integer(names(2));
        problem.set_objective(vec![1.0, 1.0], false);
        problem.add_constraint("cap", vec![2.0, 2.0], ConstraintOp::Le, 3.0);

        let solution = BranchAndBound::new().solve(&problem, &SolverConfig::default()).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.objective_value, 1.0);
    }

    #[test]
    fn test_minimization_rounds_up() {
        // min x, x >= 1.5
        let mut problem = LpProblem::new_integer(names(1));
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("floor", vec![1.0], ConstraintOp::Ge, 1.5);

        let solution = BranchAndBound::new().solve(&problem, &SolverConfig::default()).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.values, vec![2.0]);
    }

    #[test]
    fn test_integer_infeasible_with_feasible_relaxation() {
        // 2x = 1
        let mut problem = LpProblem::new_integer(names(1));
        problem.set_objective(vec![1.0], false);
        problem.add_constraint("half", vec![2.0], ConstraintOp::Eq, 1.0);

        let solution = BranchAndBound::new().solve(&problem, &SolverConfig::default()).unwrap();

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_continuous_variables_are_not_branched() {
        // max x + y, x + y <= 2.5, only x integer, x <= 1.5
        let mut problem = LpProblem::new(names(2));
        problem.set_integer(0, true);
        problem.set_objective(vec![1.0, 1.0], false);
        problem.add_constraint("cap", vec![1.0, 1.0], ConstraintOp::Le, 2.5);
        problem.add_constraint("x_cap", vec![1.0, 0.0], ConstraintOp::Le, 1.5);

        let solution = BranchAndBound::new().solve(&problem, &SolverConfig::default()).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value - 2.5).abs() < 1e-9);
        assert_eq!(solution.values[0].fract(), 0.0);
    }

    #[test]
    fn test_unbounded() {
        let mut problem = LpProblem::new_integer(names(2));
        problem.set_objective(vec![1.0, 0.0], false);
        problem.add_constraint("gap", vec![1.0, -1.0], ConstraintOp::Le, 1.0);

        let solution = BranchAndBound::new().solve(&problem, &SolverConfig::default()).unwrap();

        assert_eq!(solution.status, SolutionStatus::Unbounded);
    }

    #[test]
    fn test_node_limit_without_incumbent() {
        let config = SolverConfig::default().with_max_nodes(1);

        let result = BranchAndBound::new().solve(&fractional_problem(), &config);

        assert!(matches!(result, Err(SolverError::LimitReached { nodes: 1, .. })));
    }

    #[test]
    fn test_zero_time_limit() {
        let config = SolverConfig::default().with_time_limit(Duration::ZERO);

        let result = BranchAndBound::new().solve(&fractional_problem(), &config);

        assert!(matches!(result, Err(SolverError::LimitReached { nodes: 0, .. })));
    }

    #[test]
    fn test_invalid_problem_is_rejected() {
        let mut problem = LpProblem::new_integer(names(2));
        problem.set_objective(vec![1.0], false);

        let result = BranchAndBound::new().solve(&problem, &SolverConfig::default());

        assert!(matches!(result, Err(SolverError::InvalidProblem(_))));
    }

    #[test]
    fn test_writes_node_log() {
        let path = std::env::temp_dir().join(format!("cellcap-bnb-{}.log", std::process::id()));
        let config = SolverConfig::default().with_log_path(&path);

        let solution = BranchAndBound::new().solve(&fractional_problem(), &config).unwrap();
        assert_eq!(solution.status, SolutionStatus::Optimal);

        let log = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(log.starts_with("problem: 2 variables, 3 constraints, 2 integer"));
        assert!(log.contains("incumbent"));
        assert!(log.contains("finished: Optimal"));
    }

    #[test]
    fn test_unwritable_log_path() {
        let path = std::env::temp_dir().join("cellcap-missing-dir").join("nested").join("bnb.log");
        let config = SolverConfig::default().with_log_path(&path);

        let result = BranchAndBound::new().solve(&fractional_problem(), &config);

        assert!(matches!(result, Err(SolverError::Log { .. })));
    }
}
