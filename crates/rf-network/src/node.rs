//! Flow and thermal node types.

use rf_core::{NodeId, ThermalId};
use rf_steam::Phase;

/// A lumped control volume of fluid.
///
/// Conserved quantities are `mass_kg` and `energy_j`; the derived
/// quantities (`t_k`, `p_pa`, `phase`, `quality`) are recomputed by the
/// fluid-state-update operator after every operator pass and must never
/// be read without having been set in the same tick.
#[derive(Clone, Debug)]
pub struct FlowNode {
    pub id: NodeId,
    pub label: String,
    /// Geometric volume; constant for the lifetime of the node.
    pub volume_m3: f64,
    /// Elevation of the node bottom above plant datum.
    pub elevation_m: f64,
    /// Vertical extent of the node.
    pub height_m: f64,
    /// Enclosing node for gauge-pressure and break semantics.
    pub container: Option<NodeId>,
    /// Fixed-pressure unbounded sink (the compiler's atmosphere node).
    pub is_atmosphere: bool,

    // Conserved
    pub mass_kg: f64,
    pub energy_j: f64,

    // Derived (written by FluidStateUpdate)
    pub t_k: f64,
    pub p_pa: f64,
    pub phase: Phase,
    pub quality: f64,
}

impl FlowNode {
    /// Specific internal energy, J/kg.
    pub fn u_j_kg(&self) -> f64 {
        self.energy_j / self.mass_kg
    }

    /// Bulk density, kg/m3.
    pub fn rho_kg_m3(&self) -> f64 {
        self.mass_kg / self.volume_m3
    }

    /// Liquid level above the node bottom for a stratified two-phase
    /// node, from quality and the saturated phase densities. A liquid
    /// node is full, a vapor node is empty.
    pub fn liquid_level_m(&self, rho_f: f64, rho_g: f64) -> f64 {
        match self.phase {
            Phase::Liquid => self.height_m,
            Phase::Vapor => 0.0,
            Phase::TwoPhase => {
                let x = self.quality;
                let v_liq = (1.0 - x) * self.mass_kg / rho_f;
                let v_vap = x * self.mass_kg / rho_g;
                let total = v_liq + v_vap;
                if total <= 0.0 {
                    0.0
                } else {
                    self.height_m * (v_liq / total)
                }
            }
        }
    }
}

/// A lumped solid-mass control volume (fuel, cladding, structure).
#[derive(Clone, Debug)]
pub struct ThermalNode {
    pub id: ThermalId,
    pub label: String,
    pub heat_capacity_j_k: f64,
    pub t_k: f64,
    /// External heat source (decay heaters, trace heating).
    pub heat_source_w: f64,
    /// Fraction of core fission power deposited here.
    pub power_fraction: f64,
    /// Flow node this mass convects to, with its h*A coupling.
    pub convects_to: Option<NodeId>,
    pub hta_w_k: f64,
    /// Conduction link toward another thermal node (fuel -> cladding).
    pub conduct_to: Option<ThermalId>,
    pub conductance_w_k: f64,
}
