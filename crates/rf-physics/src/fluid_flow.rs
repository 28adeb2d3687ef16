//! Fluid-flow operator: quasi-steady momentum balance plus staged
//! mass-and-energy advection.

use std::sync::Arc;

use rf_core::units::constants::G0_MPS2;
use rf_core::units::k;
use rf_core::NodeId;
use rf_network::{FlowConnection, FlowNode, Network};
use rf_steam::{Phase, WaterProperties};
use tracing::warn;

use crate::error::PhysicsResult;
use crate::events::SimEvent;
use crate::operator::PhysicsOperator;
use crate::state::SimState;

/// Flows below this magnitude are treated as zero.
const FLOW_EPS_KG_S: f64 = 1.0e-9;

/// Per-tick advection cap as a fraction of upstream mass.
const ADVECT_CAP_FRAC: f64 = 0.05;

/// Hard positive floor on node mass.
const MASS_FLOOR_KG: f64 = 1.0;

/// Lower bound on the reported stability limit.
const MIN_DT_CAP_S: f64 = 1.0e-3;

/// Minimum effective resistance coefficient in the momentum closure.
const MIN_RESISTANCE_K: f64 = 1.0e-3;

pub struct FluidFlow {
    props: Arc<WaterProperties>,
    /// Safety ceiling; exceeding it clamps the flow and surfaces an event.
    pub flow_ceiling_kg_s: f64,
}

/// One staged transfer, computed entirely from the pre-step state.
struct Transfer {
    up: NodeId,
    down: NodeId,
    mass_kg: f64,
    u_j_kg: f64,
}

impl FluidFlow {
    pub fn new(props: Arc<WaterProperties>) -> Self {
        Self {
            props,
            flow_ceiling_kg_s: 1.0e5,
        }
    }

    /// Linear slew of pump speeds and valve positions toward command.
    /// Pumps ramp at 1/ramp_up when driven and decay at 1/coast_down
    /// when tripped or commanded down.
    fn update_devices(&self, net: &mut Network, dt_s: f64) {
        for pump in net.pumps_mut() {
            let target = if pump.running {
                pump.commanded_speed
            } else {
                0.0
            };
            let tau = if target > pump.effective_speed {
                pump.ramp_up_s
            } else {
                pump.coast_down_s
            };
            let step = dt_s / tau.max(1.0e-6);
            let delta = (target - pump.effective_speed).clamp(-step, step);
            pump.effective_speed = (pump.effective_speed + delta).clamp(0.0, 1.0);
        }
        for valve in net.valves_mut() {
            let step = dt_s / valve.stroke_time_s.max(1.0e-6);
            let delta = (valve.commanded_position - valve.position).clamp(-step, step);
            valve.position = (valve.position + delta).clamp(0.0, 1.0);
        }
    }

    /// Density of the phase a connection tap draws from a node.
    fn tap_density(&self, node: &FlowNode, tap_elevation_m: f64) -> PhysicsResult<f64> {
        match node.phase {
            Phase::TwoPhase => {
                let rho_f = self.props.rho_f(k(node.t_k))?.value;
                let rho_g = self.props.rho_g(k(node.t_k))?.value;
                let level = node.liquid_level_m(rho_f, rho_g);
                Ok(if tap_elevation_m <= level { rho_f } else { rho_g })
            }
            _ => Ok(node.rho_kg_m3()),
        }
    }

    /// Specific internal energy advected out of a node through a tap.
    fn tap_energy(&self, node: &FlowNode, tap_elevation_m: f64) -> PhysicsResult<f64> {
        match node.phase {
            Phase::TwoPhase => {
                let rho_f = self.props.rho_f(k(node.t_k))?.value;
                let rho_g = self.props.rho_g(k(node.t_k))?.value;
                let level = node.liquid_level_m(rho_f, rho_g);
                if tap_elevation_m <= level {
                    Ok(self.props.u_f(k(node.t_k))?)
                } else {
                    Ok(self.props.u_g(k(node.t_k))?)
                }
            }
            _ => Ok(node.u_j_kg()),
        }
    }

    /// Liquid-phase density for the pump head term (pumps draw from the
    /// liquid space of stratified nodes).
    fn pump_density(&self, node: &FlowNode) -> PhysicsResult<f64> {
        match node.phase {
            Phase::TwoPhase => Ok(self.props.rho_f(k(node.t_k))?.value),
            _ => Ok(node.rho_kg_m3()),
        }
    }

    /// Signed mass flow through one connection from the stored nodal
    /// pressures of the previous tick.
    fn connection_flow(
        &self,
        net: &Network,
        conn: &FlowConnection,
    ) -> PhysicsResult<(f64, f64)> {
        let from = net.node(conn.from)?;
        let to = net.node(conn.to)?;

        // Fully closed valve: no flow at any pressure difference.
        if let Some(vi) = conn.valve {
            if net.valves()[vi as usize].is_closed() {
                return Ok((0.0, 0.0));
            }
        }

        let rise = conn.elevation_rise_m(from.elevation_m, to.elevation_m);

        let pump_dp = match conn.pump {
            Some(pi) => {
                let pump = &net.pumps()[pi as usize];
                let rho_liq = self.pump_density(from)?;
                pump.effective_speed * pump.rated_head_m * rho_liq * G0_MPS2
            }
            None => 0.0,
        };

        // Driving pressure with the upstream density in the gravity
        // column; resolve the sign with a second pass when it flips.
        let rho_fwd = self.tap_density(from, conn.from_elevation_m)?;
        let mut dp = from.p_pa - to.p_pa - rho_fwd * G0_MPS2 * rise + pump_dp;
        let rho_up;
        if dp >= 0.0 {
            rho_up = rho_fwd;
        } else {
            let rho_rev = self.tap_density(to, conn.to_elevation_m)?;
            let dp_rev = from.p_pa - to.p_pa - rho_rev * G0_MPS2 * rise + pump_dp;
            if dp_rev < 0.0 {
                dp = dp_rev;
                rho_up = rho_rev;
            } else {
                // The sign depends on which column density applies:
                // the net head is inside the hydrostatic ambiguity band.
                return Ok((0.0, 0.0));
            }
        }

        if let Some(ci) = conn.check_valve {
            if !net.check_valves()[ci as usize].passes(dp) {
                return Ok((dp, 0.0));
            }
        }

        let mut k_eff = conn.resistance_k;
        if let Some(vi) = conn.valve {
            k_eff *= net.valves()[vi as usize].resistance_factor();
        }
        let k_eff = k_eff.max(MIN_RESISTANCE_K);

        // dP = K * rho * v^2 / 2  ->  v = sqrt(2 |dP| / (K rho))
        let v = (2.0 * dp.abs() / (k_eff * rho_up)).sqrt();
        let mdot = dp.signum() * rho_up * conn.flow_area_m2 * v;
        Ok((dp, mdot))
    }
}

impl PhysicsOperator for FluidFlow {
    fn name(&self) -> &'static str {
        "fluid-flow"
    }

    fn max_stable_dt(&self, state: &SimState) -> f64 {
        let net = &state.network;
        let mut throughflow = vec![0.0_f64; net.nodes().len()];
        for conn in net.connections() {
            let q = conn.mass_flow_kg_s.abs();
            throughflow[conn.from.index()] += q;
            throughflow[conn.to.index()] += q;
        }
        let mut cap = f64::INFINITY;
        for (node, q) in net.nodes().iter().zip(&throughflow) {
            if *q > FLOW_EPS_KG_S && !node.is_atmosphere {
                cap = cap.min(0.5 * node.mass_kg / q);
            }
        }

        // Liquid pressure stiffness: a transfer must not swing the
        // driving pressure of its connection by more than half in one
        // step, or stiff liquid pairs ping-pong around equilibrium.
        for conn in net.connections() {
            let Ok((dp, mdot)) = self.connection_flow(net, conn) else {
                continue;
            };
            if mdot.abs() <= FLOW_EPS_KG_S {
                continue;
            }
            let mut stiffness = 0.0;
            for id in [conn.from, conn.to] {
                let Ok(node) = net.node(id) else { continue };
                if node.is_atmosphere || node.phase != Phase::Liquid {
                    continue;
                }
                let k_bulk = self.props.bulk_modulus(k(node.t_k)).value;
                stiffness += k_bulk / (node.rho_kg_m3() * node.volume_m3);
            }
            if stiffness > 0.0 {
                let dp_rate = mdot.abs() * stiffness;
                cap = cap.min(0.5 * dp.abs() / dp_rate);
            }
        }

        cap.max(MIN_DT_CAP_S)
    }

    fn apply(&self, state: &mut SimState, dt_s: f64) -> PhysicsResult<()> {
        self.update_devices(&mut state.network, dt_s);

        // Pass 1: momentum balance on the stored pressures.
        let mut flows = Vec::with_capacity(state.network.connections().len());
        for conn in state.network.connections() {
            let (dp, mut mdot) = self.connection_flow(&state.network, conn)?;
            if mdot.abs() > self.flow_ceiling_kg_s {
                let from = state.network.node(conn.from)?;
                let to = state.network.node(conn.to)?;
                warn!(
                    conn = %conn.id,
                    mdot_kg_s = mdot,
                    dp_pa = dp,
                    p_from = from.p_pa,
                    p_to = to.p_pa,
                    "flow runaway; clamping to ceiling"
                );
                state.events.push(SimEvent::FlowRunaway {
                    conn: conn.id,
                    mass_flow_kg_s: mdot,
                    dp_driving_pa: dp,
                    p_from_pa: from.p_pa,
                    p_to_pa: to.p_pa,
                });
                mdot = mdot.signum() * self.flow_ceiling_kg_s;
            }
            flows.push(mdot);
        }
        for (conn, mdot) in state.network.connections_mut().iter_mut().zip(&flows) {
            conn.mass_flow_kg_s = *mdot;
        }

        // Pass 2: stage transfers from the pre-step state so iteration
        // order cannot affect the result.
        let n_nodes = state.network.nodes().len();
        let mass_pre: Vec<f64> = state.network.nodes().iter().map(|n| n.mass_kg).collect();
        let mut transfers: Vec<Transfer> = Vec::new();
        for conn in state.network.connections() {
            let mdot = conn.mass_flow_kg_s;
            if mdot.abs() <= FLOW_EPS_KG_S {
                continue;
            }
            let (up, down, tap_elev) = if mdot > 0.0 {
                (conn.from, conn.to, conn.from_elevation_m)
            } else {
                (conn.to, conn.from, conn.to_elevation_m)
            };
            let up_node = state.network.node(up)?;
            let requested = mdot.abs() * dt_s;
            let mass_kg = requested.min(ADVECT_CAP_FRAC * mass_pre[up.index()]);
            if mass_kg <= 0.0 {
                continue;
            }
            let u_j_kg = self.tap_energy(up_node, tap_elev)?;
            transfers.push(Transfer {
                up,
                down,
                mass_kg,
                u_j_kg,
            });
        }

        // Scale down each node's total outflow so the mass floor is an
        // outflow limiter, not a mass source.
        let mut outflow = vec![0.0_f64; n_nodes];
        for t in &transfers {
            outflow[t.up.index()] += t.mass_kg;
        }
        for t in &mut transfers {
            let i = t.up.index();
            let available = (mass_pre[i] - MASS_FLOOR_KG).max(0.0);
            if outflow[i] > available {
                t.mass_kg *= available / outflow[i];
            }
        }

        // Pass 3: apply all transfers atomically (mass and m*u together).
        let atmosphere = state.network.atmosphere();
        for t in &transfers {
            let de = t.mass_kg * t.u_j_kg;
            {
                let up = state.network.node_mut(t.up)?;
                up.mass_kg -= t.mass_kg;
                up.energy_j -= de;
            }
            {
                let down = state.network.node_mut(t.down)?;
                down.mass_kg += t.mass_kg;
                down.energy_j += de;
            }
            // Boundary bookkeeping: crossings of the atmosphere keep the
            // closed-network audit exact.
            if Some(t.down) == atmosphere {
                state.totals.break_outflow_mass_kg += t.mass_kg;
                state.totals.break_outflow_energy_j += de;
            }
            if Some(t.up) == atmosphere {
                state.totals.break_outflow_mass_kg -= t.mass_kg;
                state.totals.break_outflow_energy_j -= de;
            }
        }

        // Pass 4: U >= 0 repair. Tapping the vapor space of a nearly
        // drained node can borrow more energy than it holds; shunt the
        // deficit back to the nodes that received it.
        for i in 0..n_nodes {
            let id = rf_core::Id::from_index(i);
            let deficit = {
                let node = state.network.node(id)?;
                if node.energy_j >= 0.0 {
                    continue;
                }
                -node.energy_j
            };
            let received: Vec<(NodeId, f64)> = transfers
                .iter()
                .filter(|t| t.up == id)
                .map(|t| (t.down, t.mass_kg * t.u_j_kg))
                .collect();
            let total_sent: f64 = received.iter().map(|(_, e)| e).sum();
            if total_sent <= 0.0 {
                // Nothing was sent; the audit will catch this as a real
                // conservation failure.
                continue;
            }
            state.network.node_mut(id)?.energy_j = 0.0;
            for (down, e_sent) in received {
                let share = deficit * (e_sent / total_sent);
                state.network.node_mut(down)?.energy_j -= share;
                if Some(down) == atmosphere {
                    state.totals.break_outflow_energy_j -= share;
                }
            }
        }

        Ok(())
    }
}
