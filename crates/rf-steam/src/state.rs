//! Water state produced by the property service.

use core::fmt;

use rf_core::units::{Density, Pressure, Temperature};

/// Specific internal energy [J/kg].
///
/// Kept as a bare f64 with a documented unit; the intensive per-mass
/// quantities pair with the specific volume below in the (u, v) plane
/// the dome test runs in.
pub type SpecEnergy = f64;

/// Phase of a node's fluid inventory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Liquid,
    TwoPhase,
    Vapor,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Liquid => write!(f, "liquid"),
            Phase::TwoPhase => write!(f, "two-phase"),
            Phase::Vapor => write!(f, "vapor"),
        }
    }
}

/// Complete thermodynamic state recovered from (mass, energy, volume).
#[derive(Clone, Copy, Debug)]
pub struct WaterState {
    pub phase: Phase,
    pub t: Temperature,
    /// Base pressure (saturation or mesh-interpolated). The hybrid
    /// liquid-compressibility feedback is applied on top of this by the
    /// fluid-state-update operator.
    pub p: Pressure,
    /// Vapor mass fraction in [0, 1]; 0 for liquid, 1 for vapor.
    pub quality: f64,
    pub rho: Density,
    pub u_j_kg: SpecEnergy,
    /// Specific volume [m3/kg].
    pub v_m3_kg: f64,
}

impl WaterState {
    /// Volumetric liquid fraction (for display): alpha = 1 - x*v_g / (x*v_g + (1-x)*v_f).
    pub fn liquid_volume_fraction(&self, v_f: f64, v_g: f64) -> f64 {
        let x = self.quality;
        let vap = x * v_g;
        let liq = (1.0 - x) * v_f;
        if vap + liq <= 0.0 {
            return 0.0;
        }
        liq / (vap + liq)
    }
}
