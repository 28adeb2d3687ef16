//! The water-properties service: (mass, energy, volume) -> full state.
//!
//! Public signatures speak typed SI quantities; the table store
//! underneath works in plain f64 and conversion happens here, at the
//! boundary.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rf_core::numeric::ensure_finite;
use rf_core::units::{celsius, k, kg_m3, pa, Density, Energy, Mass, Pressure, Temperature, Volume};
use tracing::{debug, warn};

use crate::error::{SteamError, SteamResult};
use crate::state::{Phase, SpecEnergy, WaterState};
use crate::table::{SinglePhaseKind, SteamTableStore};

/// Tolerated disagreement between the volume- and energy-derived
/// qualities on the saturation chord.
const QUALITY_TOL: f64 = 0.25;

/// Bisection iterations for the chord temperature.
const CHORD_ITERS: usize = 80;

/// Record of one (u, v) lookup, kept in a bounded ring buffer for the
/// debug surface.
#[derive(Clone, Debug)]
pub struct LookupTrace {
    pub u_j_kg: f64,
    pub v_m3_kg: f64,
    pub inside_dome: bool,
    pub outcome: String,
}

/// Pure property computation over an immutable steam-table store.
///
/// Shared by reference across all operators; the only interior state is
/// diagnostic (verbose flag and the lookup trace ring buffer).
pub struct WaterProperties {
    store: Arc<SteamTableStore>,
    verbose: AtomicBool,
    traces: Mutex<VecDeque<LookupTrace>>,
    trace_cap: usize,
}

impl WaterProperties {
    pub fn new(store: Arc<SteamTableStore>) -> Self {
        Self {
            store,
            verbose: AtomicBool::new(false),
            traces: Mutex::new(VecDeque::new()),
            trace_cap: 64,
        }
    }

    pub fn store(&self) -> &SteamTableStore {
        &self.store
    }

    /// Enable/disable verbose per-lookup logging.
    pub fn set_verbose(&self, on: bool) {
        self.verbose.store(on, Ordering::Relaxed);
    }

    pub fn verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    /// Drain the recorded lookup traces (most recent last).
    pub fn take_traces(&self) -> Vec<LookupTrace> {
        let mut guard = self.traces.lock().expect("trace buffer poisoned");
        guard.drain(..).collect()
    }

    fn record_trace(&self, trace: LookupTrace) {
        if self.verbose() {
            debug!(
                u_j_kg = trace.u_j_kg,
                v_m3_kg = trace.v_m3_kg,
                inside_dome = trace.inside_dome,
                outcome = %trace.outcome,
                "water-properties lookup"
            );
        }
        let mut guard = self.traces.lock().expect("trace buffer poisoned");
        if guard.len() == self.trace_cap {
            guard.pop_front();
        }
        guard.push_back(trace);
    }

    // ---- saturation accessors ------------------------------------------

    pub fn p_sat(&self, t: Temperature) -> SteamResult<Pressure> {
        Ok(pa(self.store.saturation().p_sat(t.value)?))
    }

    pub fn t_sat(&self, p: Pressure) -> SteamResult<Temperature> {
        Ok(k(self.store.saturation().t_sat(p.value)?))
    }

    pub fn rho_f(&self, t: Temperature) -> SteamResult<Density> {
        Ok(kg_m3(self.store.saturation().rho_f(t.value)?))
    }

    pub fn rho_g(&self, t: Temperature) -> SteamResult<Density> {
        Ok(kg_m3(self.store.saturation().rho_g(t.value)?))
    }

    pub fn u_f(&self, t: Temperature) -> SteamResult<SpecEnergy> {
        self.store.saturation().u_f(t.value)
    }

    pub fn u_g(&self, t: Temperature) -> SteamResult<SpecEnergy> {
        self.store.saturation().u_g(t.value)
    }

    pub fn h_f(&self, t: Temperature) -> SteamResult<SpecEnergy> {
        self.store.saturation().h_f(t.value)
    }

    pub fn h_g(&self, t: Temperature) -> SteamResult<SpecEnergy> {
        self.store.saturation().h_g(t.value)
    }

    /// Latent heat of vaporization, J/kg.
    pub fn latent(&self, t: Temperature) -> SteamResult<SpecEnergy> {
        self.store.saturation().latent(t.value)
    }

    /// Isothermal bulk modulus of liquid water as a function of
    /// temperature: ~2.2 GPa at 50 C falling to ~60 MPa at 350 C,
    /// log-linear in between and held flat outside.
    pub fn bulk_modulus(&self, t: Temperature) -> Pressure {
        const T_LO: f64 = 50.0;
        const T_HI: f64 = 350.0;
        const K_LO: f64 = 2.2e9;
        const K_HI: f64 = 6.0e7;
        let frac = ((celsius(t) - T_LO) / (T_HI - T_LO)).clamp(0.0, 1.0);
        pa((K_LO.ln() + frac * (K_HI.ln() - K_LO.ln())).exp())
    }

    /// Hybrid pressure for liquid nodes: base pressure plus a
    /// compressibility feedback proportional to the density excess over
    /// the saturated-liquid reference at the node temperature.
    pub fn hybrid_pressure(
        &self,
        p_base: Pressure,
        t: Temperature,
        rho: Density,
    ) -> SteamResult<Pressure> {
        let rho_ref = self.rho_f(t)?;
        Ok(pa(
            p_base.value + self.bulk_modulus(t).value * (rho.value / rho_ref.value - 1.0),
        ))
    }

    // ---- the main entry point ------------------------------------------

    /// Full state from the conserved triple (mass, internal energy,
    /// volume). Phase determination is purely geometric in (u, v).
    pub fn state_from_m_u_v(
        &self,
        mass: Mass,
        energy: Energy,
        volume: Volume,
    ) -> SteamResult<WaterState> {
        let mass_kg = ensure_finite(mass.value, "mass")?;
        let energy_j = ensure_finite(energy.value, "internal energy")?;
        let volume_m3 = ensure_finite(volume.value, "volume")?;
        if mass_kg <= 0.0 {
            return Err(SteamError::NonPhysical {
                what: "mass must be positive",
            });
        }
        if volume_m3 <= 0.0 {
            return Err(SteamError::NonPhysical {
                what: "volume must be positive",
            });
        }
        if energy_j < 0.0 {
            return Err(SteamError::NonPhysical {
                what: "internal energy must be non-negative",
            });
        }

        let u = energy_j / mass_kg;
        let v = volume_m3 / mass_kg;
        let rho = mass_kg / volume_m3;

        let inside = self.store.saturation().dome_contains(u, v);
        let result = if inside {
            self.two_phase_state(u, v, rho)
        } else {
            self.single_phase_state(u, v, rho)
        };

        self.record_trace(LookupTrace {
            u_j_kg: u,
            v_m3_kg: v,
            inside_dome: inside,
            outcome: match &result {
                Ok(state) => format!(
                    "{} T={:.2}K P={:.0}Pa x={:.4}",
                    state.phase, state.t.value, state.p.value, state.quality
                ),
                Err(e) => format!("error: {e}"),
            },
        });

        result
    }

    /// Two-phase: find the saturation temperature whose (v_f..v_g,
    /// u_f..u_g) chord passes through (v, u), then recover P and quality.
    fn two_phase_state(&self, u: f64, v: f64, rho: f64) -> SteamResult<WaterState> {
        let sat = self.store.saturation();
        let points = sat.points();

        // Locate the bracketing pair of saturation rows by chord residual
        // sign change.
        let mut bracket = None;
        let mut prev_residual = None;
        for (i, p) in points.iter().enumerate() {
            let x_v = (v - p.v_f) / (p.v_g - p.v_f);
            let r = u - (p.u_f + x_v * (p.u_g - p.u_f));
            if let Some(r_prev) = prev_residual {
                if r * r_prev <= 0.0 {
                    bracket = Some(i - 1);
                    break;
                }
            }
            prev_residual = Some(r);
        }
        let i = bracket.ok_or(SteamError::ChordBracket {
            u_j_kg: u,
            v_m3_kg: v,
        })?;

        // Refine by bisection on the interpolated chord residual.
        let mut t_lo = points[i].t_k;
        let mut t_hi = points[i + 1].t_k;
        let mut r_lo = sat.chord_residual(t_lo, u, v)?;
        for _ in 0..CHORD_ITERS {
            let t_mid = 0.5 * (t_lo + t_hi);
            let r_mid = sat.chord_residual(t_mid, u, v)?;
            if r_mid * r_lo <= 0.0 {
                t_hi = t_mid;
            } else {
                t_lo = t_mid;
                r_lo = r_mid;
            }
            if (t_hi - t_lo) < 1.0e-7 {
                break;
            }
        }
        let t_sat = 0.5 * (t_lo + t_hi);

        let p = sat.at_t(t_sat)?;
        let x_v = (v - p.v_f) / (p.v_g - p.v_f);
        let x_u = (u - p.u_f) / (p.u_g - p.u_f);

        if !(-0.05..=1.05).contains(&x_v) {
            return Err(SteamError::ChordBracket {
                u_j_kg: u,
                v_m3_kg: v,
            });
        }
        if (x_v - x_u).abs() >= QUALITY_TOL {
            return Err(SteamError::QualityMismatch {
                x_v,
                x_u,
                t_sat_k: t_sat,
                tol: QUALITY_TOL,
            });
        }

        // The physical consistency check above is the real invariant;
        // clamping is representation only.
        let quality = (0.5 * (x_v + x_u)).clamp(0.0, 1.0);

        Ok(WaterState {
            phase: Phase::TwoPhase,
            t: k(t_sat),
            p: pa(p.p_pa),
            quality,
            rho: kg_m3(rho),
            u_j_kg: u,
            v_m3_kg: v,
        })
    }

    /// Single-phase: locate in the Delaunay mesh and interpolate.
    fn single_phase_state(&self, u: f64, v: f64, rho: f64) -> SteamResult<WaterState> {
        let mesh = self.store.mesh().ok_or(SteamError::MeshUnavailable)?;
        let sample = mesh.sample(u, v)?;

        let (phase, quality) = match sample.agreed_kind() {
            Some(SinglePhaseKind::Liquid) => (Phase::Liquid, 0.0),
            Some(SinglePhaseKind::Vapor) => (Phase::Vapor, 1.0),
            _ => {
                warn!(
                    u_j_kg = u,
                    v_m3_kg = v,
                    "single-phase vertex disagreement; treating state as supercritical vapor"
                );
                (Phase::Vapor, 1.0)
            }
        };

        Ok(WaterState {
            phase,
            t: k(sample.t_k),
            p: pa(sample.p_pa),
            quality,
            rho: kg_m3(rho),
            u_j_kg: u,
            v_m3_kg: v,
        })
    }
}
