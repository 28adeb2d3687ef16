//! Conduction along thermal-node links (fuel -> cladding).

use crate::error::PhysicsResult;
use crate::operator::PhysicsOperator;
use crate::state::SimState;

pub struct FuelHeatConduction;

impl PhysicsOperator for FuelHeatConduction {
    fn name(&self) -> &'static str {
        "fuel-heat-conduction"
    }

    fn max_stable_dt(&self, state: &SimState) -> f64 {
        let mut cap = f64::INFINITY;
        for t in state.network.thermals() {
            if let Some(other) = t.conduct_to {
                if t.conductance_w_k > 0.0 {
                    if let Ok(o) = state.network.thermal(other) {
                        let c_min = t.heat_capacity_j_k.min(o.heat_capacity_j_k);
                        cap = cap.min(0.5 * c_min / t.conductance_w_k);
                    }
                }
            }
        }
        cap
    }

    fn apply(&self, state: &mut SimState, dt_s: f64) -> PhysicsResult<()> {
        let n = state.network.thermals().len();
        for i in 0..n {
            let (other, q_j) = {
                let t = &state.network.thermals()[i];
                let Some(other) = t.conduct_to else {
                    continue;
                };
                let o = state.network.thermal(other)?;
                (other, t.conductance_w_k * (t.t_k - o.t_k) * dt_s)
            };
            {
                let t = &mut state.network.thermals_mut()[i];
                t.t_k -= q_j / t.heat_capacity_j_k;
            }
            {
                let o = &mut state.network.thermals_mut()[other.index()];
                o.t_k += q_j / o.heat_capacity_j_k;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_core::Id;
    use rf_network::{Network, ThermalNode};

    fn thermal(label: &str, t_k: f64, c: f64) -> ThermalNode {
        ThermalNode {
            id: Id::from_index(0),
            label: label.into(),
            heat_capacity_j_k: c,
            t_k,
            heat_source_w: 0.0,
            power_fraction: 0.0,
            convects_to: None,
            hta_w_k: 0.0,
            conduct_to: None,
            conductance_w_k: 0.0,
        }
    }

    #[test]
    fn conduction_equilibrates_temperatures() {
        let mut net = Network::new();
        let fuel = net.add_thermal(thermal("fuel", 1200.0, 1.0e6));
        let clad = net.add_thermal(thermal("clad", 600.0, 1.0e5));
        {
            let f = &mut net.thermals_mut()[fuel.index()];
            f.conduct_to = Some(clad);
            f.conductance_w_k = 5.0e4;
        }
        let mut state = SimState::new(net);
        let op = FuelHeatConduction;
        let stored0 = state.network.total_thermal_energy_j();
        for _ in 0..5000 {
            op.apply(&mut state, 0.05).unwrap();
        }
        let f = state.network.thermals()[0].t_k;
        let c = state.network.thermals()[1].t_k;
        assert!((f - c).abs() < 1.0, "fuel {f} clad {c}");
        // Conduction moves energy, never creates it.
        let stored1 = state.network.total_thermal_energy_j();
        assert!((stored1 - stored0).abs() / stored0 < 1.0e-9);
    }

    #[test]
    fn cap_reflects_smallest_capacity() {
        let mut net = Network::new();
        let fuel = net.add_thermal(thermal("fuel", 1200.0, 1.0e6));
        let clad = net.add_thermal(thermal("clad", 600.0, 1.0e4));
        {
            let f = &mut net.thermals_mut()[fuel.index()];
            f.conduct_to = Some(clad);
            f.conductance_w_k = 1.0e3;
        }
        let state = SimState::new(net);
        // 0.5 * min(C) / G = 0.5 * 1e4 / 1e3 = 5 s
        assert!((FuelHeatConduction.max_stable_dt(&state) - 5.0).abs() < 1.0e-9);
    }
}
