//! Degraded-mode saturation correlations.
//!
//! Used only when no steam table can be loaded. A Wagner-style
//! saturation-pressure correlation plus analytic density and latent-heat
//! approximations synthesize a coarse saturation sequence, so the dome
//! test and two-phase chord solve keep working. There is no single-phase
//! mesh in this mode; single-phase lookups fail with `MeshUnavailable`.

use crate::error::SteamResult;
use crate::saturation::{SaturationPoint, SaturationTable};

const T_CRIT_K: f64 = 647.096;
const P_CRIT_PA: f64 = 22.064e6;
const RHO_CRIT: f64 = 322.0;
const T_TRIPLE_K: f64 = 273.16;

/// Wagner & Pruss saturation-pressure coefficients.
const WAGNER_A: [f64; 6] = [
    -7.859_517_83,
    1.844_082_59,
    -11.786_649_7,
    22.680_741_1,
    -15.961_871_9,
    1.801_225_02,
];

#[derive(Clone, Copy, Debug, Default)]
pub struct FallbackSaturation;

impl FallbackSaturation {
    /// Saturation pressure, Pa.
    pub fn p_sat(&self, t_k: f64) -> f64 {
        let tau = 1.0 - t_k / T_CRIT_K;
        let poly = WAGNER_A[0] * tau
            + WAGNER_A[1] * tau.powf(1.5)
            + WAGNER_A[2] * tau.powi(3)
            + WAGNER_A[3] * tau.powf(3.5)
            + WAGNER_A[4] * tau.powi(4)
            + WAGNER_A[5] * tau.powf(7.5);
        P_CRIT_PA * (T_CRIT_K / t_k * poly).exp()
    }

    /// Saturated liquid density, kg/m3 (IAPWS auxiliary equation).
    pub fn rho_f(&self, t_k: f64) -> f64 {
        let th = 1.0 - t_k / T_CRIT_K;
        let b = [
            1.992_740_64,
            1.099_653_42,
            -0.510_839_303,
            -1.754_934_79,
            -45.517_035_2,
            -6.746_944_50e5,
        ];
        let e = [1.0 / 3.0, 2.0 / 3.0, 5.0 / 3.0, 16.0 / 3.0, 43.0 / 3.0, 110.0 / 3.0];
        let sum: f64 = b.iter().zip(e.iter()).map(|(bi, ei)| bi * th.powf(*ei)).sum();
        RHO_CRIT * (1.0 + sum)
    }

    /// Saturated vapor density, kg/m3 (IAPWS auxiliary equation).
    pub fn rho_g(&self, t_k: f64) -> f64 {
        let th = 1.0 - t_k / T_CRIT_K;
        let c = [
            -2.031_502_40,
            -2.683_029_40,
            -5.386_264_92,
            -17.299_160_5,
            -44.758_658_1,
            -63.920_106_3,
        ];
        let e = [2.0 / 6.0, 4.0 / 6.0, 8.0 / 6.0, 18.0 / 6.0, 37.0 / 6.0, 71.0 / 6.0];
        let sum: f64 = c.iter().zip(e.iter()).map(|(ci, ei)| ci * th.powf(*ei)).sum();
        RHO_CRIT * sum.exp()
    }

    /// Saturated liquid internal energy, J/kg (constant-cp approximation).
    pub fn u_f(&self, t_k: f64) -> f64 {
        4186.8 * (t_k - T_TRIPLE_K)
    }

    /// Latent heat, J/kg (Watson-type scaling from the normal boiling point).
    pub fn latent(&self, t_k: f64) -> f64 {
        let tr = (1.0 - t_k / T_CRIT_K).max(0.0);
        let tr0 = 1.0 - 273.15 / T_CRIT_K;
        2.501e6 * (tr / tr0).powf(0.38)
    }

    /// Synthesize a coarse saturation sequence from the correlations.
    pub fn synthesize_table(&self) -> SteamResult<SaturationTable> {
        let mut points = Vec::new();
        let mut t = T_TRIPLE_K + 0.5;
        while t < T_CRIT_K - 1.5 {
            let p = self.p_sat(t);
            let v_f = 1.0 / self.rho_f(t);
            let v_g = 1.0 / self.rho_g(t);
            let u_f = self.u_f(t);
            let l = self.latent(t);
            // u_g - u_f = L - P * (v_g - v_f)
            let u_g = u_f + l - p * (v_g - v_f);
            let h_f = u_f + p * v_f;
            points.push(SaturationPoint {
                t_k: t,
                p_pa: p,
                v_f,
                v_g,
                u_f,
                u_g,
                h_f,
                h_g: h_f + l,
            });
            t += 2.0;
        }
        SaturationTable::from_points(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wagner_p_sat_at_normal_boiling_point() {
        let fb = FallbackSaturation;
        let p = fb.p_sat(373.124);
        assert!((p - 101_325.0).abs() / 101_325.0 < 0.01, "p = {p}");
    }

    #[test]
    fn densities_near_atmospheric_boiling() {
        let fb = FallbackSaturation;
        assert!((fb.rho_f(373.15) - 958.4).abs() < 3.0);
        assert!((fb.rho_g(373.15) - 0.597).abs() < 0.02);
    }

    #[test]
    fn synthesized_table_is_usable() {
        let table = FallbackSaturation.synthesize_table().unwrap();
        let t = table.t_sat(1.0e5).unwrap();
        assert!((t - 373.1).abs() < 1.5, "t_sat(1 bar) = {t}");
        // Two-phase midpoint must still test inside the dome.
        let p = table.at_t(400.0).unwrap();
        let v = 0.5 * (p.v_f + p.v_g);
        let u = 0.5 * (p.u_f + p.u_g);
        assert!(table.dome_contains(u, v));
    }
}
