//! Events surfaced to the caller after a committed step.
//!
//! Bursts, scrams, and flow runaways are reported as events, never as
//! errors: the simulation keeps running through them.

use rf_core::ConnId;

#[derive(Clone, Debug)]
pub enum SimEvent {
    /// A pressure boundary failed.
    ComponentBurst {
        label: String,
        time_s: f64,
        /// Axial break location along the component, [0, 1].
        location: f64,
        elevation_m: f64,
        node_pressure_pa: f64,
        container_pressure_pa: f64,
    },
    /// Reactor trip (manual or automatic).
    Scram { time_s: f64, reason: String },
    /// A connection hit the flow safety ceiling and was clamped.
    FlowRunaway {
        conn: ConnId,
        mass_flow_kg_s: f64,
        dp_driving_pa: f64,
        p_from_pa: f64,
        p_to_pa: f64,
    },
    /// The solver could not keep up with the requested simulation speed.
    FallingBehindRealTime { sim_dt_s: f64, wall_dt_s: f64 },
}
