//! Solver error types.

use thiserror::Error;

pub type SolverResult<T> = Result<T, SolverError>;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Solver initialization failed: {0}")]
    Init(#[from] rf_physics::PhysicsError),

    #[error(
        "Step failed after {retries} retries (final dt = {dt_s} s): {last_failure}"
    )]
    RetriesExhausted {
        retries: u32,
        dt_s: f64,
        last_failure: String,
    },

    #[error("Invalid command: {what}")]
    InvalidCommand { what: String },
}
