//! Fluid-state update: refresh every node's derived state from the
//! conserved (mass, energy, volume) triple.
//!
//! Runs last in each tick so every other operator reads the stored
//! pressures of the previous pass rather than recomputing them
//! mid-chain (intermediate operators have already perturbed U).

use std::sync::Arc;

use rayon::prelude::*;
use rf_core::units::{joule, kg, m3};
use rf_steam::{Phase, SteamError, WaterProperties};

use crate::error::PhysicsResult;
use crate::operator::PhysicsOperator;
use crate::state::SimState;

/// Pinned atmosphere boundary conditions.
const ATMOSPHERE_T_K: f64 = 300.0;
const ATMOSPHERE_P_PA: f64 = rf_core::units::constants::P_ATM_PA;

pub struct FluidStateUpdate {
    props: Arc<WaterProperties>,
}

struct NodeRefresh {
    t_k: f64,
    p_pa: f64,
    phase: Phase,
    quality: f64,
}

impl FluidStateUpdate {
    pub fn new(props: Arc<WaterProperties>) -> Self {
        Self { props }
    }
}

impl PhysicsOperator for FluidStateUpdate {
    fn name(&self) -> &'static str {
        "fluid-state-update"
    }

    fn max_stable_dt(&self, _state: &SimState) -> f64 {
        f64::INFINITY
    }

    fn apply(&self, state: &mut SimState, _dt_s: f64) -> PhysicsResult<()> {
        let props = &self.props;

        // Per-node refresh is independent; the steam-table store is
        // immutable and shared by reference.
        let refreshed: Result<Vec<Option<NodeRefresh>>, SteamError> = state
            .network
            .nodes()
            .par_iter()
            .map(|node| {
                if node.is_atmosphere {
                    return Ok(None);
                }
                let ws = props.state_from_m_u_v(
                    kg(node.mass_kg),
                    joule(node.energy_j),
                    m3(node.volume_m3),
                )?;
                // Hybrid pressure for liquid: saturation base plus the
                // bulk-modulus density feedback, so compressible liquid
                // does not collapse onto a single isochore.
                let p_pa = if ws.phase == Phase::Liquid {
                    let p_base = props.p_sat(ws.t)?;
                    props.hybrid_pressure(p_base, ws.t, ws.rho)?.value
                } else {
                    ws.p.value
                };
                Ok(Some(NodeRefresh {
                    t_k: ws.t.value,
                    p_pa,
                    phase: ws.phase,
                    quality: ws.quality,
                }))
            })
            .collect();
        let refreshed = refreshed?;

        for (node, refresh) in state.network.nodes_mut().iter_mut().zip(refreshed) {
            match refresh {
                Some(r) => {
                    node.t_k = r.t_k;
                    node.p_pa = r.p_pa;
                    node.phase = r.phase;
                    node.quality = r.quality;
                }
                None => {
                    node.t_k = ATMOSPHERE_T_K;
                    node.p_pa = ATMOSPHERE_P_PA;
                    node.phase = Phase::Vapor;
                    node.quality = 1.0;
                }
            }
        }
        Ok(())
    }
}
