//! Directed flow connections between flow nodes.

use rf_core::{ConnId, NodeId};

/// A directed link carrying mass and energy between two flow nodes.
///
/// `mass_flow_kg_s` is derived each tick by the fluid-flow operator;
/// positive flow runs from `from` to `to`.
#[derive(Clone, Debug)]
pub struct FlowConnection {
    pub id: ConnId,
    pub from: NodeId,
    pub to: NodeId,
    pub flow_area_m2: f64,
    /// Dimensionless loss coefficient in dP = K * rho * v^2 / 2.
    pub resistance_k: f64,
    pub length_m: f64,
    /// Tap heights above each endpoint node's bottom; select which phase
    /// a stratified two-phase node feeds into the connection.
    pub from_elevation_m: f64,
    pub to_elevation_m: f64,
    /// Signed mass flow, derived each tick.
    pub mass_flow_kg_s: f64,
    /// Synthesized by the burst-check operator.
    pub is_break: bool,

    // Device bindings (indices into the network's device vectors).
    pub pump: Option<u32>,
    pub valve: Option<u32>,
    pub check_valve: Option<u32>,
}

impl FlowConnection {
    pub fn new(
        id: ConnId,
        from: NodeId,
        to: NodeId,
        flow_area_m2: f64,
        resistance_k: f64,
        length_m: f64,
    ) -> Self {
        Self {
            id,
            from,
            to,
            flow_area_m2,
            resistance_k,
            length_m,
            from_elevation_m: 0.0,
            to_elevation_m: 0.0,
            mass_flow_kg_s: 0.0,
            is_break: false,
            pump: None,
            valve: None,
            check_valve: None,
        }
    }

    /// Elevation gain along positive flow, from the absolute endpoint
    /// elevations plus the tap heights.
    pub fn elevation_rise_m(&self, from_node_elev: f64, to_node_elev: f64) -> f64 {
        (to_node_elev + self.to_elevation_m) - (from_node_elev + self.from_elevation_m)
    }
}
