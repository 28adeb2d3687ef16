//! The cloneable simulation snapshot.

use rf_network::Network;

use crate::events::SimEvent;
use crate::neutronics::{KineticsParams, KineticsState};

/// Integrated bookkeeping terms that participate in the conservation
/// audit, plus the per-tick power readings published for observability.
#[derive(Clone, Debug, Default)]
pub struct EnergyTotals {
    /// Integrated shaft work extracted by turbines, J.
    pub turbine_work_j: f64,
    /// Integrated heat rejected by condensers, J.
    pub condenser_heat_j: f64,
    /// Integrated pump work added to the fluid, J.
    pub pump_work_j: f64,
    /// Integrated fission + source heat deposited, J.
    pub heat_generated_j: f64,
    /// Net mass that left the closed network through atmosphere-facing
    /// connections (break discharge), kg.
    pub break_outflow_mass_kg: f64,
    /// Net energy that left with it, J.
    pub break_outflow_energy_j: f64,

    // Per-tick readings (overwritten each step).
    pub turbine_power_w: f64,
    pub condenser_power_w: f64,
    pub pump_power_w: f64,
    pub core_power_w: f64,
}

impl EnergyTotals {
    /// Net electrical-side power: turbine output minus pump demand.
    pub fn net_power_w(&self) -> f64 {
        self.turbine_power_w - self.pump_power_w
    }
}

/// Authoritative simulation state. The driver clones this before every
/// operator pass; a committed step swaps the clone in atomically, and a
/// rejected step leaves the original untouched.
#[derive(Clone, Debug)]
pub struct SimState {
    pub time_s: f64,
    pub network: Network,
    pub kinetics: Option<KineticsState>,
    pub totals: EnergyTotals,
    /// Events produced during the current (uncommitted) pass; drained by
    /// the driver on commit.
    pub events: Vec<SimEvent>,
}

impl SimState {
    pub fn new(network: Network) -> Self {
        Self {
            time_s: 0.0,
            network,
            kinetics: None,
            totals: EnergyTotals::default(),
            events: Vec::new(),
        }
    }

    pub fn with_kinetics(network: Network, params: KineticsParams, initial_power_frac: f64) -> Self {
        Self {
            time_s: 0.0,
            network,
            kinetics: Some(KineticsState::equilibrium(params, initial_power_frac)),
            totals: EnergyTotals::default(),
            events: Vec::new(),
        }
    }

    /// Conserved fluid mass over the closed (non-atmosphere) network,
    /// corrected for recorded break outflow.
    pub fn audited_mass_kg(&self) -> f64 {
        self.network.total_mass_kg() + self.totals.break_outflow_mass_kg
    }

    /// Conserved energy: fluid internal energy plus solid thermal
    /// storage, corrected for all bookkeeping flows.
    pub fn audited_energy_j(&self) -> f64 {
        self.network.total_fluid_energy_j() + self.network.total_thermal_energy_j()
            + self.totals.turbine_work_j
            + self.totals.condenser_heat_j
            + self.totals.break_outflow_energy_j
            - self.totals.pump_work_j
            - self.totals.heat_generated_j
    }
}
