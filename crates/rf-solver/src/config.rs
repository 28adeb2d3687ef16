//! Solver configuration.

/// Tunables for the adaptive-timestep loop. Defaults are generic; none
/// of these encode plant-specific thresholds.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Upper bound on a single internal step, s.
    pub max_dt_s: f64,
    /// Lower bound guarding against runaway dt collapse, s.
    pub min_dt_s: f64,
    /// Simulation speed multiplier relative to wall clock.
    pub speed: f64,
    /// Wall-clock budget for one `run_frame` call, s.
    pub frame_budget_s: f64,
    /// Relative per-step mass drift tolerance (of total mass, scaled by
    /// node count).
    pub mass_tol_rel: f64,
    /// Relative per-step energy drift tolerance.
    pub energy_tol_rel: f64,
    /// Retries (with halved dt) before a step fails hard.
    pub max_retries: u32,
    /// Safety ceiling on any single connection flow, kg/s.
    pub flow_ceiling_kg_s: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_dt_s: 0.25,
            min_dt_s: 1.0e-3,
            speed: 1.0,
            frame_budget_s: 0.030,
            mass_tol_rel: 1.0e-9,
            energy_tol_rel: 1.0e-6,
            max_retries: 8,
            flow_ceiling_kg_s: 1.0e5,
        }
    }
}
