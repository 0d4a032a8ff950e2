use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Instant;

use cellcap_solver::{ConstraintOp, LpProblem};

use crate::error::ConfigError;
use crate::instance::{Cell, Instance, LimitFamily};

/// How decision variables are laid out over the grid
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Formulation {
    /// One variable per admissible cell
    #[default]
    Sparse,
    /// One variable per grid cell, weighted by the 0/1 admissibility indicator
    Dense,
}

impl Formulation {
    pub fn as_str(self) -> &'static str {
        match self {
            Formulation::Sparse => "sparse",
            Formulation::Dense => "dense",
        }
    }
}

impl std::fmt::Display for Formulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Formulation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sparse" | "set" => Ok(Formulation::Sparse),
            "dense" | "array" => Ok(Formulation::Dense),
            _ => Err(ConfigError::UnknownFormulation(s.to_string())),
        }
    }
}

/// An integer program for one [`Instance`], ready to hand to a backend
#[derive(Debug, Clone)]
pub struct CellModel {
    pub problem: LpProblem,
    pub formulation: Formulation,
    pub n_row: usize,
    pub n_col: usize,
    pub n_diag: usize,
    /// Admissible cell -> variable index
    cells: BTreeMap<Cell, usize>,
}

impl CellModel {
    /// Variable index of an admissible cell
    pub fn variable(&self, cell: Cell) -> Option<usize> {
        self.cells.get(&cell).copied()
    }

    /// Admissible cells with their variable indices, in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (Cell, usize)> + '_ {
        self.cells.iter().map(|(&cell, &var)| (cell, var))
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn num_variables(&self) -> usize {
        self.problem.num_variables()
    }

    pub fn num_constraints(&self) -> usize {
        self.problem.num_constraints()
    }
}

/// Builds a [`CellModel`] from an [`Instance`]
pub struct ModelBuilder<'a> {
    instance: &'a Instance,
    formulation: Formulation,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(instance: &'a Instance) -> Self {
        Self {
            instance,
            formulation: Formulation::default(),
        }
    }

    pub fn formulation(mut self, formulation: Formulation) -> Self {
        self.formulation = formulation;
        self
    }

    /// Validate the instance and emit the objective and every row, column
    /// and diagonal constraint, vacuous ones included
    pub fn build(&self) -> Result<CellModel, ConfigError> {
        let started = Instant::now();
        let instance = self.instance;
        instance.validate()?;

        let admissible = instance.cells();
        // (cell, coefficient) for every variable, in variable order
        let columns: Vec<(Cell, f64)> = match self.formulation {
            Formulation::Sparse => admissible.iter().map(|&cell| (cell, 1.0)).collect(),
            Formulation::Dense => (0..instance.n_row())
                .flat_map(|i| (0..instance.n_col()).map(move |j| (i, j)))
                .map(|cell| (cell, if admissible.contains(&cell) { 1.0 } else { 0.0 }))
                .collect(),
        };

        let names: Vec<String> = columns.iter().map(|((i, j), _)| format!("cell_{}_{}", i, j)).collect();
        let mut lp = LpProblem::new_integer(names);
        lp.set_objective_name("total_value");
        lp.set_objective(columns.iter().map(|&(_, coef)| coef).collect(), false);

        for (family, prefix) in [
            (LimitFamily::Row, "row_limit"),
            (LimitFamily::Column, "col_limit"),
            (LimitFamily::Diagonal, "diag_limit"),
        ] {
            let limits = instance.limits(family);
            let mut rows = vec![vec![0.0; columns.len()]; limits.len()];
            for (var, &(cell, coef)) in columns.iter().enumerate() {
                // Dense grid cells past the last diagonal limit are inadmissible
                if let Some(row) = rows.get_mut(family.index_of(cell)) {
                    row[var] = coef;
                }
            }
            for (index, (coefficients, &limit)) in rows.into_iter().zip(limits).enumerate() {
                lp.add_constraint(format!("{}_{}", prefix, index), coefficients, ConstraintOp::Le, limit);
            }
        }

        let cells: BTreeMap<Cell, usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, (cell, _))| admissible.contains(cell))
            .map(|(var, &(cell, _))| (cell, var))
            .collect();

        tracing::debug!(
            component = "model",
            operation = "build",
            status = "success",
            formulation = self.formulation.as_str(),
            cells = cells.len(),
            variables = lp.num_variables(),
            constraints = lp.num_constraints(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Built admissible-cell model"
        );

        Ok(CellModel {
            problem: lp,
            formulation: self.formulation,
            n_row: instance.n_row(),
            n_col: instance.n_col(),
            n_diag: instance.n_diag(),
            cells,
        })
    }
}

/// Build the sparse model straight from plain data
pub fn build(
    admissible_cells: &[Cell],
    row_limits: &[f64],
    col_limits: &[f64],
    diag_limits: &[f64],
) -> Result<CellModel, ConfigError> {
    let instance = Instance::new(
        admissible_cells.to_vec(),
        row_limits.to_vec(),
        col_limits.to_vec(),
        diag_limits.to_vec(),
    );
    ModelBuilder::new(&instance).build()
}
