pub mod builder;
pub mod data;
pub mod error;
pub mod instance;
pub mod solve;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use builder::{CellModel, Formulation, ModelBuilder, build};
pub use data::classroom_instance;
pub use error::{CellError, ConfigError};
pub use instance::{Cell, Instance, LimitFamily, MAX_LIMIT};
pub use solve::{Assignment, CellOutcome, LimitViolation, solve, solve_with};
