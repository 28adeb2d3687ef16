//! Saturation sequence and the (u, v) dome polygon.

use rf_core::numeric::{inv_lerp, lerp};

use crate::error::{SteamError, SteamResult};
use crate::table::{RowLabel, SteamRow};

/// One point on the saturation line: matched liquid and vapor
/// properties at a common temperature.
#[derive(Clone, Copy, Debug)]
pub struct SaturationPoint {
    pub t_k: f64,
    pub p_pa: f64,
    pub v_f: f64,
    pub v_g: f64,
    pub u_f: f64,
    pub u_g: f64,
    pub h_f: f64,
    pub h_g: f64,
}

/// Sorted saturation sequence plus the dome polygon.
///
/// The sequence is strictly monotone in T and P from the triple point
/// to (just under) the critical point. The dome is the closed polygon
/// formed by the liquid locus walked in ascending T followed by the
/// vapor locus walked in descending T; its interior is the two-phase
/// region.
pub struct SaturationTable {
    points: Vec<SaturationPoint>,
    /// Dome polygon vertices as (u, v) pairs.
    dome: Vec<(f64, f64)>,
}

const T_MATCH_TOL_K: f64 = 1.0e-3;

impl SaturationTable {
    /// Merge saturated-liquid and saturated-vapor rows on matching T.
    pub fn from_rows(rows: &[SteamRow]) -> SteamResult<Self> {
        let mut liquid: Vec<&SteamRow> = rows
            .iter()
            .filter(|r| r.label == RowLabel::SaturatedLiquid)
            .collect();
        let mut vapor: Vec<&SteamRow> = rows
            .iter()
            .filter(|r| r.label == RowLabel::SaturatedVapor)
            .collect();
        if liquid.is_empty() || vapor.is_empty() {
            return Err(SteamError::TableInvalid {
                what: "saturation rows missing (need both liquid and vapor sides)",
            });
        }
        liquid.sort_by(|a, b| a.t_k.total_cmp(&b.t_k));
        vapor.sort_by(|a, b| a.t_k.total_cmp(&b.t_k));
        if liquid.len() != vapor.len() {
            return Err(SteamError::TableInvalid {
                what: "saturated liquid and vapor row counts differ",
            });
        }

        let mut points = Vec::with_capacity(liquid.len());
        for (lf, vg) in liquid.iter().zip(vapor.iter()) {
            if (lf.t_k - vg.t_k).abs() > T_MATCH_TOL_K {
                return Err(SteamError::TableInvalid {
                    what: "saturated liquid/vapor rows do not pair up by temperature",
                });
            }
            points.push(SaturationPoint {
                t_k: lf.t_k,
                p_pa: 0.5 * (lf.p_pa + vg.p_pa),
                v_f: lf.v_m3_kg,
                v_g: vg.v_m3_kg,
                u_f: lf.u_j_kg,
                u_g: vg.u_j_kg,
                h_f: lf.h_j_kg,
                h_g: vg.h_j_kg,
            });
        }

        for w in points.windows(2) {
            if w[1].t_k <= w[0].t_k || w[1].p_pa <= w[0].p_pa {
                return Err(SteamError::TableInvalid {
                    what: "saturation sequence not strictly monotone in T and P",
                });
            }
        }
        for p in &points {
            if p.v_g <= p.v_f {
                return Err(SteamError::TableInvalid {
                    what: "saturation row with v_g <= v_f",
                });
            }
        }

        // Liquid side triple -> critical, vapor side critical -> triple.
        let mut dome = Vec::with_capacity(2 * points.len());
        for p in &points {
            dome.push((p.u_f, p.v_f));
        }
        for p in points.iter().rev() {
            dome.push((p.u_g, p.v_g));
        }

        Ok(Self { points, dome })
    }

    /// Build directly from pre-merged points (fallback synthesis).
    pub fn from_points(points: Vec<SaturationPoint>) -> SteamResult<Self> {
        if points.len() < 2 {
            return Err(SteamError::TableInvalid {
                what: "too few saturation points",
            });
        }
        let mut dome = Vec::with_capacity(2 * points.len());
        for p in &points {
            dome.push((p.u_f, p.v_f));
        }
        for p in points.iter().rev() {
            dome.push((p.u_g, p.v_g));
        }
        Ok(Self { points, dome })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SaturationPoint] {
        &self.points
    }

    pub fn t_min(&self) -> f64 {
        self.points.first().map(|p| p.t_k).unwrap_or(f64::NAN)
    }

    pub fn t_max(&self) -> f64 {
        self.points.last().map(|p| p.t_k).unwrap_or(f64::NAN)
    }

    pub fn p_min(&self) -> f64 {
        self.points.first().map(|p| p.p_pa).unwrap_or(f64::NAN)
    }

    pub fn p_max(&self) -> f64 {
        self.points.last().map(|p| p.p_pa).unwrap_or(f64::NAN)
    }

    /// Bracketing index and fraction for a temperature, by binary search.
    fn bracket_by_t(&self, t_k: f64) -> SteamResult<(usize, f64)> {
        if !(t_k >= self.t_min() && t_k <= self.t_max()) {
            return Err(SteamError::OutOfRange {
                what: "saturation temperature",
                value: t_k,
                min: self.t_min(),
                max: self.t_max(),
            });
        }
        let i = match self
            .points
            .binary_search_by(|p| p.t_k.total_cmp(&t_k))
        {
            Ok(i) => i.min(self.points.len() - 2),
            Err(i) => i.saturating_sub(1).min(self.points.len() - 2),
        };
        let frac = inv_lerp(self.points[i].t_k, self.points[i + 1].t_k, t_k);
        Ok((i, frac))
    }

    /// Bracketing index and fraction for a pressure, by binary search.
    fn bracket_by_p(&self, p_pa: f64) -> SteamResult<(usize, f64)> {
        if !(p_pa >= self.p_min() && p_pa <= self.p_max()) {
            return Err(SteamError::OutOfRange {
                what: "saturation pressure",
                value: p_pa,
                min: self.p_min(),
                max: self.p_max(),
            });
        }
        let i = match self
            .points
            .binary_search_by(|p| p.p_pa.total_cmp(&p_pa))
        {
            Ok(i) => i.min(self.points.len() - 2),
            Err(i) => i.saturating_sub(1).min(self.points.len() - 2),
        };
        let frac = inv_lerp(self.points[i].p_pa, self.points[i + 1].p_pa, p_pa);
        Ok((i, frac))
    }

    /// Interpolated saturation point at a temperature.
    pub fn at_t(&self, t_k: f64) -> SteamResult<SaturationPoint> {
        let (i, frac) = self.bracket_by_t(t_k)?;
        Ok(Self::interp(&self.points[i], &self.points[i + 1], frac))
    }

    /// Interpolated saturation point at a pressure.
    pub fn at_p(&self, p_pa: f64) -> SteamResult<SaturationPoint> {
        let (i, frac) = self.bracket_by_p(p_pa)?;
        Ok(Self::interp(&self.points[i], &self.points[i + 1], frac))
    }

    fn interp(a: &SaturationPoint, b: &SaturationPoint, frac: f64) -> SaturationPoint {
        SaturationPoint {
            t_k: lerp(a.t_k, b.t_k, frac),
            p_pa: lerp(a.p_pa, b.p_pa, frac),
            v_f: lerp(a.v_f, b.v_f, frac),
            v_g: lerp(a.v_g, b.v_g, frac),
            u_f: lerp(a.u_f, b.u_f, frac),
            u_g: lerp(a.u_g, b.u_g, frac),
            h_f: lerp(a.h_f, b.h_f, frac),
            h_g: lerp(a.h_g, b.h_g, frac),
        }
    }

    pub fn p_sat(&self, t_k: f64) -> SteamResult<f64> {
        Ok(self.at_t(t_k)?.p_pa)
    }

    pub fn t_sat(&self, p_pa: f64) -> SteamResult<f64> {
        Ok(self.at_p(p_pa)?.t_k)
    }

    pub fn rho_f(&self, t_k: f64) -> SteamResult<f64> {
        Ok(1.0 / self.at_t(t_k)?.v_f)
    }

    pub fn rho_g(&self, t_k: f64) -> SteamResult<f64> {
        Ok(1.0 / self.at_t(t_k)?.v_g)
    }

    pub fn u_f(&self, t_k: f64) -> SteamResult<f64> {
        Ok(self.at_t(t_k)?.u_f)
    }

    pub fn u_g(&self, t_k: f64) -> SteamResult<f64> {
        Ok(self.at_t(t_k)?.u_g)
    }

    pub fn h_f(&self, t_k: f64) -> SteamResult<f64> {
        Ok(self.at_t(t_k)?.h_f)
    }

    pub fn h_g(&self, t_k: f64) -> SteamResult<f64> {
        Ok(self.at_t(t_k)?.h_g)
    }

    /// Latent heat of vaporization.
    pub fn latent(&self, t_k: f64) -> SteamResult<f64> {
        let p = self.at_t(t_k)?;
        Ok(p.h_g - p.h_f)
    }

    /// Point-in-polygon test against the dome, even-odd rule.
    ///
    /// Points exactly on an edge land on either side depending on
    /// rounding; both answers are acceptable there (the two-phase chord
    /// solve and the mesh both cover the boundary).
    pub fn dome_contains(&self, u_j_kg: f64, v_m3_kg: f64) -> bool {
        let mut inside = false;
        let n = self.dome.len();
        let mut j = n - 1;
        for i in 0..n {
            let (ui, vi) = self.dome[i];
            let (uj, vj) = self.dome[j];
            if (vi > v_m3_kg) != (vj > v_m3_kg) {
                let t = (v_m3_kg - vi) / (vj - vi);
                let u_cross = ui + t * (uj - ui);
                if u_j_kg < u_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Chord residual at a temperature: how far `u` sits above the
    /// two-phase chord evaluated at specific volume `v`. Positive means
    /// the point is above the chord.
    pub fn chord_residual(&self, t_k: f64, u_j_kg: f64, v_m3_kg: f64) -> SteamResult<f64> {
        let p = self.at_t(t_k)?;
        let x_v = (v_m3_kg - p.v_f) / (p.v_g - p.v_f);
        Ok(u_j_kg - (p.u_f + x_v * (p.u_g - p.u_f)))
    }
}
