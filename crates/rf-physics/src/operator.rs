//! The operator contract.

use crate::error::PhysicsResult;
use crate::state::SimState;

/// A physics operator advances conserved quantities on a cloned
/// snapshot and declares its own stability limit.
///
/// Operators must be pure over `(state, dt)`: no globals, no hidden
/// state. Anything worth reporting goes through `state.totals` or
/// `state.events`.
pub trait PhysicsOperator: Send + Sync {
    fn name(&self) -> &'static str;

    /// CFL-like upper bound on the next time step; `f64::INFINITY` when
    /// not limiting.
    fn max_stable_dt(&self, state: &SimState) -> f64;

    /// Advance the snapshot by `dt_s`.
    fn apply(&self, state: &mut SimState, dt_s: f64) -> PhysicsResult<()>;
}
