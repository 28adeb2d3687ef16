//! Convective heat transfer between solid masses and fluid nodes, and
//! heat-exchanger shell/tube coupling.

use std::sync::Arc;

use rf_core::units::k;
use rf_steam::{Phase, WaterProperties};

use crate::error::PhysicsResult;
use crate::operator::PhysicsOperator;
use crate::state::SimState;

/// Gas-side floor on the wetted-tube fraction: a fully drained shell
/// still sees single-phase vapor convection at a few percent of the
/// nominal UA.
const DRY_SHELL_UA_FRAC: f64 = 0.05;

/// Nominal liquid specific heat used only for stability estimates.
const CP_EST_J_KG_K: f64 = 4186.8;

pub struct Convection {
    props: Arc<WaterProperties>,
}

impl Convection {
    pub fn new(props: Arc<WaterProperties>) -> Self {
        Self { props }
    }

    /// Wetted fraction of the shell-side tubes. The effective UA rises
    /// with the liquid coverage of the bundle; a mostly drained shell
    /// transfers far less heat. Purely a function of the present state,
    /// no hysteresis.
    fn wetted_fraction(&self, state: &SimState, shell: rf_core::NodeId) -> PhysicsResult<f64> {
        let node = state.network.node(shell)?;
        let frac = match node.phase {
            Phase::Liquid => 1.0,
            Phase::Vapor => 0.0,
            Phase::TwoPhase => {
                let rho_f = self.props.rho_f(k(node.t_k))?.value;
                let rho_g = self.props.rho_g(k(node.t_k))?.value;
                if node.height_m <= 0.0 {
                    0.0
                } else {
                    node.liquid_level_m(rho_f, rho_g) / node.height_m
                }
            }
        };
        Ok(frac.max(DRY_SHELL_UA_FRAC))
    }
}

impl PhysicsOperator for Convection {
    fn name(&self) -> &'static str {
        "convection"
    }

    fn max_stable_dt(&self, state: &SimState) -> f64 {
        let mut cap = f64::INFINITY;
        for t in state.network.thermals() {
            if t.convects_to.is_some() && t.hta_w_k > 0.0 {
                cap = cap.min(0.5 * t.heat_capacity_j_k / t.hta_w_k);
            }
        }
        for hx in state.network.heat_exchangers() {
            if hx.ua_w_k <= 0.0 {
                continue;
            }
            for id in [hx.shell, hx.tube] {
                if let Ok(node) = state.network.node(id) {
                    let c_fluid = node.mass_kg * CP_EST_J_KG_K;
                    cap = cap.min(0.5 * c_fluid / hx.ua_w_k);
                }
            }
        }
        cap
    }

    fn apply(&self, state: &mut SimState, dt_s: f64) -> PhysicsResult<()> {
        // Solid -> fluid Newton cooling.
        let n_thermal = state.network.thermals().len();
        for i in 0..n_thermal {
            let (coolant, q_w) = {
                let t = &state.network.thermals()[i];
                let Some(coolant) = t.convects_to else {
                    continue;
                };
                let fluid = state.network.node(coolant)?;
                (coolant, t.hta_w_k * (t.t_k - fluid.t_k))
            };
            let q_j = q_w * dt_s;
            {
                let t = &mut state.network.thermals_mut()[i];
                t.t_k -= q_j / t.heat_capacity_j_k;
                // External source terms (decay heaters etc.).
                if t.heat_source_w != 0.0 {
                    t.t_k += t.heat_source_w * dt_s / t.heat_capacity_j_k;
                    state.totals.heat_generated_j += t.heat_source_w * dt_s;
                }
            }
            state.network.node_mut(coolant)?.energy_j += q_j;
        }

        // Heat-exchanger primary/secondary coupling.
        let n_hx = state.network.heat_exchangers().len();
        for i in 0..n_hx {
            let (shell, tube, ua) = {
                let hx = &state.network.heat_exchangers()[i];
                (hx.shell, hx.tube, hx.ua_w_k)
            };
            let ua_eff = ua * self.wetted_fraction(state, shell)?;
            let q_j = {
                let shell_node = state.network.node(shell)?;
                let tube_node = state.network.node(tube)?;
                ua_eff * (tube_node.t_k - shell_node.t_k) * dt_s
            };
            state.network.node_mut(tube)?.energy_j -= q_j;
            state.network.node_mut(shell)?.energy_j += q_j;
        }

        Ok(())
    }
}
