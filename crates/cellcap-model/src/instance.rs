use std::collections::BTreeSet;

use crate::error::ConfigError;

/// Largest accepted capacity: 2^53, the last integer an `f64` holds exactly
pub const MAX_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Grid coordinate `(row, column)`
pub type Cell = (usize, usize);

/// Which family of capacity constraints a limit belongs to
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LimitFamily {
    Row,
    Column,
    Diagonal,
}

impl LimitFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            LimitFamily::Row => "Row",
            LimitFamily::Column => "Column",
            LimitFamily::Diagonal => "Diagonal",
        }
    }

    /// Index of the constraint in this family that covers `cell`
    pub fn index_of(self, (row, col): Cell) -> usize {
        match self {
            LimitFamily::Row => row,
            LimitFamily::Column => col,
            LimitFamily::Diagonal => row + col,
        }
    }
}

impl std::fmt::Display for LimitFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input data for one allocation problem.
///
/// The grid is `row_limits.len()` by `col_limits.len()`. Diagonal `d`
/// holds the cells with `row + col == d`. Repeated admissible cells count
/// once.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub admissible_cells: Vec<Cell>,
    pub row_limits: Vec<f64>,
    pub col_limits: Vec<f64>,
    pub diag_limits: Vec<f64>,
}

impl Instance {
    pub fn new(admissible_cells: Vec<Cell>, row_limits: Vec<f64>, col_limits: Vec<f64>, diag_limits: Vec<f64>) -> Self {
        Self {
            admissible_cells,
            row_limits,
            col_limits,
            diag_limits,
        }
    }

    pub fn n_row(&self) -> usize {
        self.row_limits.len()
    }

    pub fn n_col(&self) -> usize {
        self.col_limits.len()
    }

    pub fn n_diag(&self) -> usize {
        self.diag_limits.len()
    }

    /// Number of diagonals the grid spans (`n_row + n_col - 1`, or 0 for an
    /// empty grid)
    pub fn grid_diagonals(&self) -> usize {
        (self.n_row() + self.n_col()).saturating_sub(1)
    }

    /// Distinct admissible cells in row-major order
    pub fn cells(&self) -> BTreeSet<Cell> {
        self.admissible_cells.iter().copied().collect()
    }

    pub fn limits(&self, family: LimitFamily) -> &[f64] {
        match family {
            LimitFamily::Row => &self.row_limits,
            LimitFamily::Column => &self.col_limits,
            LimitFamily::Diagonal => &self.diag_limits,
        }
    }

    /// Reject negative or non-finite limits and cells the limits do not cover
    pub fn validate(&self) -> Result<(), ConfigError> {
        for family in [LimitFamily::Row, LimitFamily::Column, LimitFamily::Diagonal] {
            for (index, &value) in self.limits(family).iter().enumerate() {
                if !value.is_finite() {
                    return Err(ConfigError::NonFiniteLimit { family, index, value });
                }
                if value < 0.0 {
                    return Err(ConfigError::NegativeLimit { family, index, value });
                }
                if value > MAX_LIMIT {
                    return Err(ConfigError::LimitTooLarge { family, index, value, max: MAX_LIMIT });
                }
            }
        }

        let (n_row, n_col, n_diag) = (self.n_row(), self.n_col(), self.n_diag());
        for &(row, col) in &self.admissible_cells {
            if row >= n_row || col >= n_col {
                return Err(ConfigError::CellOutOfBounds { row, col, n_row, n_col });
            }
            let diagonal = row + col;
            if diagonal >= n_diag {
                return Err(ConfigError::DiagonalNotCovered { row, col, diagonal, n_diag });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Instance {
        Instance::new(vec![(0, 0), (1, 1), (0, 0)], vec![1.0, 2.0], vec![3.0, 4.0], vec![1.0, 1.0, 1.0])
    }

    #[test]
    fn test_dimensions_and_dedup() {
        let instance = small();
        assert_eq!(instance.n_row(), 2);
        assert_eq!(instance.n_col(), 2);
        assert_eq!(instance.grid_diagonals(), 3);
        assert_eq!(instance.cells().into_iter().collect::<Vec<_>>(), vec![(0, 0), (1, 1)]);
        assert!(instance.validate().is_ok());
    }

    #[test]
    fn test_cell_out_of_bounds() {
        let mut instance = small();
        instance.admissible_cells.push((2, 0));
        assert_eq!(
            instance.validate(),
            Err(ConfigError::CellOutOfBounds { row: 2, col: 0, n_row: 2, n_col: 2 })
        );
    }

    #[test]
    fn test_diagonal_not_covered() {
        let mut instance = small();
        instance.diag_limits.truncate(2);
        assert_eq!(
            instance.validate(),
            Err(ConfigError::DiagonalNotCovered { row: 1, col: 1, diagonal: 2, n_diag: 2 })
        );
    }

    #[test]
    fn test_short_diagonals_are_fine_when_cells_are_covered() {
        let instance = Instance::new(vec![(0, 0)], vec![1.0, 1.0], vec![1.0, 1.0], vec![1.0]);
        assert!(instance.validate().is_ok());
    }

    #[test]
    fn test_negative_limit_on_empty_diagonal() {
        let instance = Instance::new(vec![(0, 0)], vec![1.0, 1.0], vec![1.0, 1.0], vec![1.0, 1.0, -1.0]);
        assert_eq!(
            instance.validate(),
            Err(ConfigError::NegativeLimit { family: LimitFamily::Diagonal, index: 2, value: -1.0 })
        );
    }

    #[test]
    fn test_non_finite_limit() {
        let mut instance = small();
        instance.col_limits[1] = f64::INFINITY;
        assert!(matches!(
            instance.validate(),
            Err(ConfigError::NonFiniteLimit { family: LimitFamily::Column, index: 1, .. })
        ));
    }

    #[test]
    fn test_limit_above_exact_integer_range() {
        let mut instance = small();
        instance.row_limits[0] = 1e19;
        assert_eq!(
            instance.validate(),
            Err(ConfigError::LimitTooLarge { family: LimitFamily::Row, index: 0, value: 1e19, max: MAX_LIMIT })
        );

        instance.row_limits[0] = MAX_LIMIT;
        assert!(instance.validate().is_ok());
    }

    #[test]
    fn test_family_index() {
        assert_eq!(LimitFamily::Row.index_of((3, 2)), 3);
        assert_eq!(LimitFamily::Column.index_of((3, 2)), 2);
        assert_eq!(LimitFamily::Diagonal.index_of((3, 2)), 5);
    }
}
