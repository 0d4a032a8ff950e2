use crate::error::SolverError;

/// A linear program over nonnegative variables, some of which may be
/// restricted to integer values
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LpProblem {
    /// Variable names
    pub variables: Vec<String>,
    /// Objective function coefficients and sense
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
    /// Integrality flag for each variable
    pub integer: Vec<bool>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Objective {
    /// Name/label for the objective
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl ConstraintOp {
    /// The operator obtained by multiplying both sides by -1
    pub fn flipped(self) -> Self {
        match self {
            ConstraintOp::Le => ConstraintOp::Ge,
            ConstraintOp::Ge => ConstraintOp::Le,
            ConstraintOp::Eq => ConstraintOp::Eq,
        }
    }
}

impl Constraint {
    /// Left-hand side value for the given variable values
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(values)
            .map(|(coef, value)| coef * value)
            .sum()
    }

    /// Whether `values` satisfy this constraint within `tolerance`
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.activity(values);
        match self.op {
            ConstraintOp::Le => lhs <= self.rhs + tolerance,
            ConstraintOp::Ge => lhs >= self.rhs - tolerance,
            ConstraintOp::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

impl LpProblem {
    /// A problem over continuous variables with a zero objective
    pub fn new(variables: Vec<String>) -> Self {
        let n = variables.len();
        Self {
            variables,
            objective: Objective {
                name: "objective".to_string(),
                coefficients: vec![0.0; n],
                minimize: true,
            },
            constraints: Vec::new(),
            integer: vec![false; n],
        }
    }

    /// A problem where every variable is integer
    pub fn new_integer(variables: Vec<String>) -> Self {
        let mut problem = Self::new(variables);
        problem.integer.fill(true);
        problem
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, minimize: bool) {
        self.objective.coefficients = coefficients;
        self.objective.minimize = minimize;
    }

    pub fn set_objective_name(&mut self, name: impl Into<String>) {
        self.objective.name = name.into();
    }

    pub fn set_integer(&mut self, index: usize, integer: bool) {
        if let Some(flag) = self.integer.get_mut(index) {
            *flag = integer;
        }
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_integer(&self, index: usize) -> bool {
        self.integer.get(index).copied().unwrap_or(false)
    }

    /// Objective value for the given variable values
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .coefficients
            .iter()
            .zip(values)
            .map(|(coef, value)| coef * value)
            .sum()
    }

    /// Check that every coefficient vector matches the variable count and
    /// that all numbers are finite
    pub fn validate(&self) -> Result<(), SolverError> {
        let n = self.num_variables();
        if self.objective.coefficients.len() != n {
            return Err(SolverError::InvalidProblem(format!(
                "objective '{}' has {} coefficients for {} variables",
                self.objective.name,
                self.objective.coefficients.len(),
                n
            )));
        }
        if self.integer.len() != n {
            return Err(SolverError::InvalidProblem(format!(
                "{} integrality flags for {} variables",
                self.integer.len(),
                n
            )));
        }
        if self.objective.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(SolverError::InvalidProblem(format!(
                "objective '{}' has a non-finite coefficient",
                self.objective.name
            )));
        }
        for c in &self.constraints {
            if c.coefficients.len() != n {
                return Err(SolverError::InvalidProblem(format!(
                    "constraint '{}' has {} coefficients for {} variables",
                    c.name,
                    c.coefficients.len(),
                    n
                )));
            }
            if !c.rhs.is_finite() || c.coefficients.iter().any(|x| !x.is_finite()) {
                return Err(SolverError::InvalidProblem(format!(
                    "constraint '{}' has a non-finite number",
                    c.name
                )));
            }
        }
        Ok(())
    }
}
