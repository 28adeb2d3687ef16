//! Turbine work extraction, condenser heat rejection, and pump-work
//! bookkeeping.
//!
//! Lives in one operator so the whole work/heat energy balance can be
//! audited together. Totals are published through the snapshot's
//! `EnergyTotals`, never through globals.

use std::sync::Arc;

use rf_core::units::constants::G0_MPS2;
use rf_core::units::pa;
use rf_steam::{Phase, WaterProperties};

use crate::error::PhysicsResult;
use crate::operator::PhysicsOperator;
use crate::state::SimState;

/// Outlet-quality band of the empirical isentropic-expansion fit.
const X_OUT_MAX: f64 = 0.95;
const X_OUT_MIN: f64 = 0.80;
/// Pressure ratio at which the fit reaches the bottom of the band.
const X_OUT_FULL_RATIO: f64 = 100.0;

/// Condenser heat is scaled down proportionally below this quality so
/// the rejection cannot drive a drained node's energy negative.
const CONDENSER_QUALITY_MARGIN: f64 = 0.05;

pub struct TurbineCondenser {
    props: Arc<WaterProperties>,
}

impl TurbineCondenser {
    pub fn new(props: Arc<WaterProperties>) -> Self {
        Self { props }
    }

    /// Empirical outlet quality from the pressure ratio: higher ratio,
    /// wetter exhaust. Log-ratio fit, clamped to the published band.
    fn outlet_quality(pressure_ratio: f64) -> f64 {
        let t = pressure_ratio.ln() / X_OUT_FULL_RATIO.ln();
        (X_OUT_MAX - (X_OUT_MAX - X_OUT_MIN) * t).clamp(X_OUT_MIN, X_OUT_MAX)
    }
}

impl PhysicsOperator for TurbineCondenser {
    fn name(&self) -> &'static str {
        "turbine-condenser"
    }

    fn max_stable_dt(&self, _state: &SimState) -> f64 {
        f64::INFINITY
    }

    fn apply(&self, state: &mut SimState, dt_s: f64) -> PhysicsResult<()> {
        let mut turbine_power = 0.0;
        let mut condenser_power = 0.0;
        let mut pump_power = 0.0;

        // ---- turbines ---------------------------------------------------
        let n_turbines = state.network.turbines().len();
        for i in 0..n_turbines {
            let (node_id, efficiency) = {
                let spec = &state.network.turbines()[i];
                (spec.node, spec.efficiency)
            };
            let node = state.network.node(node_id)?;

            // No work unless the machine is passing vapor forward into a
            // lower-pressure outlet.
            if node.phase != Phase::Vapor {
                continue;
            }
            let mut mdot_in = 0.0;
            let mut outlet = None;
            for conn in state.network.connections() {
                if conn.to == node_id && conn.mass_flow_kg_s > 0.0 {
                    mdot_in += conn.mass_flow_kg_s;
                }
                if conn.from == node_id && conn.mass_flow_kg_s < 0.0 {
                    mdot_in += -conn.mass_flow_kg_s;
                }
                if conn.from == node_id && outlet.is_none() && !conn.is_break {
                    outlet = Some(conn.to);
                }
            }
            let Some(outlet_id) = outlet else {
                continue;
            };
            if mdot_in <= 0.0 {
                continue;
            }
            let p_in = node.p_pa;
            let p_out = state.network.node(outlet_id)?.p_pa;
            if p_in <= p_out || p_out <= 0.0 {
                continue;
            }

            let x_out = Self::outlet_quality(p_in / p_out);
            let h_in = node.u_j_kg() + p_in / node.rho_kg_m3();
            let t_out = self.props.t_sat(pa(p_out))?;
            let h_f = self.props.h_f(t_out)?;
            let h_g = self.props.h_g(t_out)?;
            let h_out = h_f + x_out * (h_g - h_f);
            let w = efficiency * mdot_in * (h_in - h_out);
            if w <= 0.0 {
                continue;
            }

            state.network.node_mut(outlet_id)?.energy_j -= w * dt_s;
            state.totals.turbine_work_j += w * dt_s;
            turbine_power += w;
        }

        // ---- condensers -------------------------------------------------
        let n_condensers = state.network.condensers().len();
        for i in 0..n_condensers {
            let (node_id, ua, sink_t, ceiling) = {
                let spec = &state.network.condensers()[i];
                (spec.node, spec.ua_w_k, spec.sink_t_k, spec.max_heat_w)
            };
            let node = state.network.node(node_id)?;
            let t_sat = self.props.t_sat(pa(node.p_pa))?.value;
            let mut q = (ua * (t_sat - sink_t).max(0.0)).min(ceiling);
            // Proportional scale-down as the vapor inventory runs out.
            let factor = (node.quality / CONDENSER_QUALITY_MARGIN).min(1.0);
            q *= factor;
            if q <= 0.0 {
                continue;
            }
            state.network.node_mut(node_id)?.energy_j -= q * dt_s;
            state.totals.condenser_heat_j += q * dt_s;
            condenser_power += q;
        }

        // ---- pump work --------------------------------------------------
        let n_pumps = state.network.pumps().len();
        for i in 0..n_pumps {
            let (conn_id, head_m, efficiency, speed) = {
                let pump = &state.network.pumps()[i];
                (pump.conn, pump.rated_head_m, pump.efficiency, pump.effective_speed)
            };
            let conn = state.network.connection(conn_id)?;
            let mdot = conn.mass_flow_kg_s.max(0.0);
            if mdot <= 0.0 || speed <= 0.0 {
                continue;
            }
            let w = mdot * G0_MPS2 * speed * head_m / efficiency.max(1.0e-3);
            let downstream = conn.to;
            state.network.node_mut(downstream)?.energy_j += w * dt_s;
            state.totals.pump_work_j += w * dt_s;
            pump_power += w;
        }

        state.totals.turbine_power_w = turbine_power;
        state.totals.condenser_power_w = condenser_power;
        state.totals.pump_power_w = pump_power;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_core::Id;
    use rf_network::{CondenserSpec, FlowConnection, FlowNode, Network, TurbineSpec};
    use rf_steam::SteamTableStore;

    fn props() -> Arc<WaterProperties> {
        Arc::new(WaterProperties::new(Arc::new(
            SteamTableStore::builtin().unwrap(),
        )))
    }

    fn vapor_node(label: &str, p_pa: f64, t_k: f64) -> FlowNode {
        FlowNode {
            id: Id::from_index(0),
            label: label.into(),
            volume_m3: 50.0,
            elevation_m: 0.0,
            height_m: 3.0,
            container: None,
            is_atmosphere: false,
            mass_kg: 150.0,
            energy_j: 150.0 * 2.55e6,
            t_k,
            p_pa,
            phase: Phase::Vapor,
            quality: 1.0,
        }
    }

    #[test]
    fn outlet_quality_band() {
        assert_eq!(TurbineCondenser::outlet_quality(1.0), 0.95);
        assert_eq!(TurbineCondenser::outlet_quality(100.0), 0.80);
        assert_eq!(TurbineCondenser::outlet_quality(1.0e6), 0.80);
        let mid = TurbineCondenser::outlet_quality(10.0);
        assert!(mid < 0.95 && mid > 0.80);
    }

    fn turbine_rig(p_in: f64, inlet_flow: f64) -> SimState {
        let mut net = Network::new();
        let steam_in = net.add_node(vapor_node("steam-line", p_in, 550.0));
        let turbine = net.add_node(vapor_node("turbine", p_in, 550.0));
        let exhaust = net.add_node(vapor_node("exhaust", 10.0e3, 320.0));
        let inlet = net.add_connection(FlowConnection::new(
            Id::from_index(0),
            steam_in,
            turbine,
            0.1,
            2.0,
            2.0,
        ));
        net.add_connection(FlowConnection::new(
            Id::from_index(0),
            turbine,
            exhaust,
            0.1,
            2.0,
            2.0,
        ));
        net.add_turbine(TurbineSpec {
            label: "hp-turbine".into(),
            node: turbine,
            efficiency: 0.85,
        });
        net.connections_mut()[inlet.index()].mass_flow_kg_s = inlet_flow;
        SimState::new(net)
    }

    #[test]
    fn turbine_extracts_work_from_vapor() {
        let op = TurbineCondenser::new(props());
        let mut state = turbine_rig(6.0e6, 100.0);
        let e0 = state.network.nodes()[2].energy_j;
        op.apply(&mut state, 0.1).unwrap();
        assert!(state.totals.turbine_power_w > 1.0e7, "{}", state.totals.turbine_power_w);
        assert!(state.network.nodes()[2].energy_j < e0);
        assert!(state.totals.turbine_work_j > 0.0);
    }

    #[test]
    fn no_work_when_pressure_inverted() {
        let op = TurbineCondenser::new(props());
        let mut state = turbine_rig(5.0e3, 100.0);
        op.apply(&mut state, 0.1).unwrap();
        assert_eq!(state.totals.turbine_power_w, 0.0);
    }

    #[test]
    fn no_work_without_inlet_flow() {
        let op = TurbineCondenser::new(props());
        let mut state = turbine_rig(6.0e6, 0.0);
        op.apply(&mut state, 0.1).unwrap();
        assert_eq!(state.totals.turbine_power_w, 0.0);
    }

    #[test]
    fn no_work_when_inlet_is_liquid() {
        let op = TurbineCondenser::new(props());
        let mut state = turbine_rig(6.0e6, 100.0);
        {
            let node = &mut state.network.nodes_mut()[1];
            node.phase = Phase::Liquid;
            node.quality = 0.0;
        }
        op.apply(&mut state, 0.1).unwrap();
        assert_eq!(state.totals.turbine_power_w, 0.0);
    }

    #[test]
    fn condenser_rejects_heat_and_scales_with_quality() {
        let op = TurbineCondenser::new(props());
        let run = |quality: f64, phase: Phase| -> f64 {
            let mut net = Network::new();
            let mut node = vapor_node("condenser", 10.0e3, 320.0);
            node.phase = phase;
            node.quality = quality;
            let id = net.add_node(node);
            net.add_condenser(CondenserSpec {
                label: "main-condenser".into(),
                node: id,
                ua_w_k: 5.0e6,
                sink_t_k: 290.0,
                max_heat_w: 1.0e9,
            });
            let mut state = SimState::new(net);
            op.apply(&mut state, 0.1).unwrap();
            state.totals.condenser_power_w
        };
        let full = run(1.0, Phase::Vapor);
        let scaled = run(0.025, Phase::TwoPhase);
        let drained = run(0.0, Phase::Liquid);
        assert!(full > 0.0);
        assert!((scaled - full * 0.5).abs() / full < 1.0e-9);
        assert_eq!(drained, 0.0);
    }

    #[test]
    fn condenser_ceiling_caps_heat_rate() {
        let op = TurbineCondenser::new(props());
        let mut net = Network::new();
        let id = net.add_node(vapor_node("condenser", 1.0e5, 373.0));
        net.add_condenser(CondenserSpec {
            label: "main-condenser".into(),
            node: id,
            ua_w_k: 1.0e9,
            sink_t_k: 290.0,
            max_heat_w: 2.0e6,
        });
        let mut state = SimState::new(net);
        op.apply(&mut state, 0.01).unwrap();
        assert!((state.totals.condenser_power_w - 2.0e6).abs() < 1.0);
    }
}
