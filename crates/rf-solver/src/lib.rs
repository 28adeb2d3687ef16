//! rf-solver: adaptive-timestep driver for reactorflow.
//!
//! Owns the authoritative [`rf_physics::SimState`]. Each outer step
//! takes the minimum of all operator stability limits, clones the
//! state, applies the operators in fixed order, audits conservation and
//! finiteness, and either commits the clone atomically or halves the
//! step and retries. Scram/burst/runaway are surfaced as events;
//! modeling failures are never swallowed.

pub mod config;
pub mod driver;
pub mod error;
pub mod metrics;

pub use config::SolverConfig;
pub use driver::{FrameReport, Solver, StepReport};
pub use error::{SolverError, SolverResult};
pub use metrics::{OperatorTiming, SolverMetrics};
