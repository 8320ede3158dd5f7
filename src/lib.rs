pub mod config;
pub mod extraction;
pub mod normalize;
pub mod pipeline;
pub mod planner;
pub mod prompt;
pub mod protocol;
pub mod telemetry;
pub mod tools;
pub mod validation;

pub use config::{RecoveryConfig, SharedConfig};
pub use pipeline::{RecoveryError, RecoveryErrorKind, Stage, validate};
pub use protocol::{ActionPlan, ActionStep};
