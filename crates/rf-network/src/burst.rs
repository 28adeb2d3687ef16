//! Burst (pressure-boundary failure) state.

use rf_core::{ConnId, NodeId};

/// Pressure-boundary failure record for a rated component.
///
/// The burst pressure is the design rating times (1 + margin), with the
/// margin drawn from the plant's deterministic seed at compile time.
/// `current_break_fraction` is monotone non-decreasing: breaks only grow.
#[derive(Clone, Debug)]
pub struct BurstState {
    pub label: String,
    pub node: NodeId,
    /// Design rating, Pa gauge.
    pub rating_pa: f64,
    /// Margin zeta in [0, 0.4]; burst at rating * (1 + zeta).
    pub margin: f64,
    pub burst_pressure_pa: f64,
    /// Seed for the size/location/direction draws at initiation.
    pub seed: u64,

    /// Heat-exchanger tube-side records compare against the shell.
    pub is_tube_side: bool,
    pub shell_node: Option<NodeId>,

    pub is_burst: bool,
    pub burst_time_s: f64,
    /// Axial location of the break along the component, [0, 1].
    pub break_location: f64,
    pub break_elevation_m: f64,
    /// Fraction of the maximum break area currently open, [0, 1].
    pub current_break_fraction: f64,
    /// Full-bore break area for this component.
    pub max_break_area_m2: f64,
    /// Synthesized discharge connection, set at initiation.
    pub break_conn: Option<ConnId>,
}

impl BurstState {
    /// Build with an explicit margin (the compiler draws the margin from
    /// the plant seed; tests pin it directly).
    pub fn with_margin(
        label: String,
        node: NodeId,
        rating_pa: f64,
        margin: f64,
        seed: u64,
        max_break_area_m2: f64,
    ) -> Self {
        Self {
            label,
            node,
            rating_pa,
            margin,
            burst_pressure_pa: rating_pa * (1.0 + margin),
            seed,
            is_tube_side: false,
            shell_node: None,
            is_burst: false,
            burst_time_s: 0.0,
            break_location: 0.0,
            break_elevation_m: 0.0,
            current_break_fraction: 0.0,
            max_break_area_m2,
            break_conn: None,
        }
    }

    /// Mark as a heat-exchanger tube-side record.
    pub fn tube_side(mut self, shell_node: NodeId) -> Self {
        self.is_tube_side = true;
        self.shell_node = Some(shell_node);
        self
    }
}
