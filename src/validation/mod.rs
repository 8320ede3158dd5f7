// src/validation/mod.rs

pub mod plan;
pub mod shape;

pub use plan::{PlanValidationError, StepErrorKind, find_violations, validate_plan};
pub use shape::{ShapeError, StepList, StepMapping, resolve_shape};
