//! Solver metrics: the explicit observability channel.

use rf_core::timing::AccumulatingTimer;
use rf_physics::EnergyTotals;

/// Per-operator wall-clock attribution.
#[derive(Clone, Debug)]
pub struct OperatorTiming {
    pub name: &'static str,
    pub timer: AccumulatingTimer,
}

/// Metrics snapshot returned with every committed step. The UI reads
/// this; nothing is published through globals.
#[derive(Clone, Debug, Default)]
pub struct SolverMetrics {
    pub steps: u64,
    pub last_dt_s: f64,
    pub retries_last_step: u32,
    pub total_retries: u64,
    /// Signed conservation drift of the last committed step.
    pub mass_drift_kg: f64,
    pub energy_drift_j: f64,
    pub operator_timings: Vec<OperatorTiming>,
    /// Work/heat totals of the committed state.
    pub totals: EnergyTotals,
}

impl SolverMetrics {
    pub fn operator_time_s(&self, name: &str) -> f64 {
        self.operator_timings
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.timer.total_seconds())
            .unwrap_or(0.0)
    }
}
