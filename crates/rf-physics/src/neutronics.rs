//! Six-group point kinetics with temperature and xenon feedback.
//!
//! The kinetics system is stiff, so the (power, precursor) vector is
//! advanced with a backward-Euler step solved as a dense 7x7 linear
//! system; reactivity feedback is evaluated from the start-of-step
//! temperatures. The slow iodine/xenon pair is advanced explicitly.

use nalgebra::{SMatrix, SVector};

use crate::error::{PhysicsError, PhysicsResult};
use crate::operator::PhysicsOperator;
use crate::state::SimState;

/// Cap on the kinetics step; the implicit solve is stable beyond this
/// but accuracy through fast transients degrades.
const NEUTRONICS_DT_CAP_S: f64 = 0.1;

// Normalized iodine/xenon chain constants (1/s).
const LAMBDA_IODINE: f64 = 2.87e-5;
const LAMBDA_XENON: f64 = 2.09e-5;
const XENON_BURNUP_AT_RATED: f64 = 3.5e-5;

/// Point-kinetics parameters. Values are plant configuration, not
/// hardcoded thresholds; the defaults are a generic PWR-like set.
#[derive(Clone, Debug)]
pub struct KineticsParams {
    pub beta: [f64; 6],
    pub lambda: [f64; 6],
    pub prompt_lifetime_s: f64,
    /// Reactivity removed by driving the rods from the reference
    /// insertion to full insertion (delta-k, positive).
    pub rod_worth: f64,
    /// Insertion fraction at which the core is critical at reference
    /// temperatures.
    pub reference_insertion: f64,
    /// Normal rod drive speed, insertion fraction per second.
    pub rod_speed_per_s: f64,
    pub doppler_coeff_per_k: f64,
    pub fuel_t_ref_k: f64,
    pub moderator_coeff_per_k: f64,
    pub moderator_t_ref_k: f64,
    pub scram_fall_time_s: f64,
    pub rated_power_w: f64,
    /// Reactivity held down by equilibrium xenon (delta-k, positive).
    pub xenon_worth: f64,
    pub xenon_enabled: bool,
}

impl Default for KineticsParams {
    fn default() -> Self {
        Self {
            beta: [0.000215, 0.001424, 0.001274, 0.002568, 0.000748, 0.000273],
            lambda: [0.0124, 0.0305, 0.111, 0.301, 1.14, 3.01],
            prompt_lifetime_s: 2.0e-5,
            rod_worth: 0.08,
            reference_insertion: 0.3,
            rod_speed_per_s: 0.02,
            doppler_coeff_per_k: -2.5e-5,
            fuel_t_ref_k: 900.0,
            moderator_coeff_per_k: -2.0e-4,
            moderator_t_ref_k: 580.0,
            scram_fall_time_s: 2.5,
            rated_power_w: 1.0e9,
            xenon_worth: 0.028,
            xenon_enabled: true,
        }
    }
}

impl KineticsParams {
    pub fn beta_total(&self) -> f64 {
        self.beta.iter().sum()
    }
}

/// Kinetics state carried on the simulation snapshot. Power and
/// precursors are normalized to rated power.
#[derive(Clone, Debug)]
pub struct KineticsState {
    pub params: KineticsParams,
    /// Normalized power (1.0 = rated).
    pub power: f64,
    pub precursors: [f64; 6],
    pub rod_insertion: f64,
    pub commanded_insertion: f64,
    pub scram: bool,
    pub scram_time_s: f64,
    /// Normalized iodine/xenon inventories (1.0 = rated equilibrium).
    pub iodine: f64,
    pub xenon: f64,
    pub last_reactivity: f64,
}

impl KineticsState {
    /// Steady state at the given power fraction with rods at reference.
    pub fn equilibrium(params: KineticsParams, power_frac: f64) -> Self {
        let mut precursors = [0.0; 6];
        for i in 0..6 {
            precursors[i] =
                params.beta[i] / (params.lambda[i] * params.prompt_lifetime_s) * power_frac;
        }
        Self {
            rod_insertion: params.reference_insertion,
            commanded_insertion: params.reference_insertion,
            scram: false,
            scram_time_s: 0.0,
            iodine: power_frac,
            xenon: power_frac,
            last_reactivity: 0.0,
            power: power_frac,
            precursors,
            params,
        }
    }

    pub fn power_w(&self) -> f64 {
        self.power * self.params.rated_power_w
    }
}

pub struct Neutronics;

impl Neutronics {
    /// Power-fraction-weighted fuel temperature and the average coolant
    /// temperature of the nodes those fuel masses convect to.
    fn feedback_temperatures(state: &SimState) -> (Option<f64>, Option<f64>) {
        let mut fuel_sum = 0.0;
        let mut fuel_w = 0.0;
        let mut mod_sum = 0.0;
        let mut mod_n = 0.0;
        for t in state.network.thermals() {
            if t.power_fraction > 0.0 {
                fuel_sum += t.power_fraction * t.t_k;
                fuel_w += t.power_fraction;
                if let Some(coolant) = t.convects_to {
                    if let Ok(node) = state.network.node(coolant) {
                        mod_sum += node.t_k;
                        mod_n += 1.0;
                    }
                }
            }
        }
        (
            (fuel_w > 0.0).then(|| fuel_sum / fuel_w),
            (mod_n > 0.0).then(|| mod_sum / mod_n),
        )
    }
}

impl PhysicsOperator for Neutronics {
    fn name(&self) -> &'static str {
        "neutronics"
    }

    fn max_stable_dt(&self, state: &SimState) -> f64 {
        if state.kinetics.is_some() {
            NEUTRONICS_DT_CAP_S
        } else {
            f64::INFINITY
        }
    }

    fn apply(&self, state: &mut SimState, dt_s: f64) -> PhysicsResult<()> {
        let (t_fuel, t_mod) = Self::feedback_temperatures(state);
        let Some(kin) = state.kinetics.as_mut() else {
            return Ok(());
        };
        let p = kin.params.clone();

        // Rod motion: scram overrides the drive and falls at a fixed rate.
        let (target, rate) = if kin.scram {
            (1.0, 1.0 / p.scram_fall_time_s)
        } else {
            (kin.commanded_insertion, p.rod_speed_per_s)
        };
        let step = rate * dt_s;
        let delta = (target - kin.rod_insertion).clamp(-step, step);
        kin.rod_insertion = (kin.rod_insertion + delta).clamp(0.0, 1.0);

        // Reactivity: rods + Doppler + moderator + xenon, all monotone.
        let mut rho = -p.rod_worth * (kin.rod_insertion - p.reference_insertion)
            / (1.0 - p.reference_insertion).max(1.0e-9);
        if let Some(t) = t_fuel {
            rho += p.doppler_coeff_per_k * (t - p.fuel_t_ref_k);
        }
        if let Some(t) = t_mod {
            rho += p.moderator_coeff_per_k * (t - p.moderator_t_ref_k);
        }
        if p.xenon_enabled {
            rho -= p.xenon_worth * (kin.xenon - 1.0);
        }
        kin.last_reactivity = rho;

        // Backward-Euler step of the 7-dimensional kinetics system.
        let beta = p.beta_total();
        let lam = p.prompt_lifetime_s;
        let mut a = SMatrix::<f64, 7, 7>::zeros();
        a[(0, 0)] = (rho - beta) / lam;
        for i in 0..6 {
            a[(0, i + 1)] = p.lambda[i];
            a[(i + 1, 0)] = p.beta[i] / lam;
            a[(i + 1, i + 1)] = -p.lambda[i];
        }
        let lhs = SMatrix::<f64, 7, 7>::identity() - a * dt_s;
        let mut y0 = SVector::<f64, 7>::zeros();
        y0[0] = kin.power;
        for i in 0..6 {
            y0[i + 1] = kin.precursors[i];
        }
        let y1 = lhs.lu().solve(&y0).ok_or(PhysicsError::Internal {
            what: "point-kinetics implicit solve is singular",
        })?;
        kin.power = y1[0].max(0.0);
        for i in 0..6 {
            kin.precursors[i] = y1[i + 1].max(0.0);
        }

        // Iodine/xenon transient (slow; explicit).
        if p.xenon_enabled {
            let pr = kin.power;
            let di = LAMBDA_IODINE * (pr - kin.iodine);
            let prod = (LAMBDA_XENON + XENON_BURNUP_AT_RATED) * (0.95 * kin.iodine + 0.05 * pr);
            let loss = (LAMBDA_XENON + XENON_BURNUP_AT_RATED * pr) * kin.xenon;
            kin.iodine += di * dt_s;
            kin.xenon += (prod - loss) * dt_s;
        }

        if kin.scram {
            kin.scram_time_s += dt_s;
        }

        // Deposit fission power into the fuel thermal masses.
        let power_w = kin.power_w();
        let mut deposited_j = 0.0;
        for t in state.network.thermals_mut() {
            if t.power_fraction > 0.0 {
                let q = power_w * t.power_fraction * dt_s;
                t.t_k += q / t.heat_capacity_j_k;
                deposited_j += q;
            }
        }
        state.totals.heat_generated_j += deposited_j;
        state.totals.core_power_w = power_w;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_network::Network;

    fn state_at_power(frac: f64) -> SimState {
        SimState::with_kinetics(Network::new(), KineticsParams::default(), frac)
    }

    #[test]
    fn equilibrium_holds_steady() {
        let mut state = state_at_power(1.0);
        let op = Neutronics;
        for _ in 0..200 {
            op.apply(&mut state, 0.05).unwrap();
        }
        let kin = state.kinetics.as_ref().unwrap();
        assert!((kin.power - 1.0).abs() < 1.0e-6, "power {}", kin.power);
        assert!(kin.last_reactivity.abs() < 1.0e-9);
    }

    #[test]
    fn rod_insertion_reduces_power() {
        let mut state = state_at_power(1.0);
        let op = Neutronics;
        state.kinetics.as_mut().unwrap().commanded_insertion = 0.5;
        for _ in 0..600 {
            op.apply(&mut state, 0.05).unwrap();
        }
        let kin = state.kinetics.as_ref().unwrap();
        assert!(kin.power < 0.5, "power {}", kin.power);
    }

    #[test]
    fn scram_collapses_power_to_decay_levels() {
        let mut state = state_at_power(1.0);
        let op = Neutronics;
        state.kinetics.as_mut().unwrap().scram = true;
        // 30 s after trip the chain reaction is gone; delayed neutrons
        // hold power at a few percent.
        for _ in 0..600 {
            op.apply(&mut state, 0.05).unwrap();
        }
        let kin = state.kinetics.as_ref().unwrap();
        assert!((kin.rod_insertion - 1.0).abs() < 1.0e-9);
        assert!(kin.power < 0.1, "power {}", kin.power);
        assert!(kin.power > 0.0);
    }

    #[test]
    fn xenon_rises_after_shutdown() {
        let mut state = state_at_power(1.0);
        let op = Neutronics;
        state.kinetics.as_mut().unwrap().scram = true;
        // A few hours in coarse steps: xenon builds in past equilibrium.
        for _ in 0..20_000 {
            op.apply(&mut state, 1.0).unwrap();
        }
        let kin = state.kinetics.as_ref().unwrap();
        assert!(kin.xenon > 1.0, "xenon {}", kin.xenon);
    }

    #[test]
    fn heat_generation_is_booked() {
        let mut state = state_at_power(1.0);
        // No fuel thermal nodes: nothing deposited, nothing booked.
        Neutronics.apply(&mut state, 0.05).unwrap();
        assert_eq!(state.totals.heat_generated_j, 0.0);
    }
}
