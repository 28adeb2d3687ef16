//! Canonical SI quantity types for the water-property boundary.
//!
//! The property service speaks typed quantities (pressure, temperature,
//! density, mass, energy, volume); per-tick network state stays in
//! unit-suffixed `f64` fields and converts at the boundary with the
//! constructors here.

use uom::si::f64::{
    Energy as UomEnergy, Mass as UomMass, MassDensity as UomMassDensity,
    Pressure as UomPressure, ThermodynamicTemperature as UomThermodynamicTemperature,
    Volume as UomVolume,
};

pub type Density = UomMassDensity;
pub type Energy = UomEnergy;
pub type Mass = UomMass;
pub type Pressure = UomPressure;
pub type Temperature = UomThermodynamicTemperature;
pub type Volume = UomVolume;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn kg(v: f64) -> Mass {
    use uom::si::mass::kilogram;
    Mass::new::<kilogram>(v)
}

#[inline]
pub fn kg_m3(v: f64) -> Density {
    use uom::si::mass_density::kilogram_per_cubic_meter;
    Density::new::<kilogram_per_cubic_meter>(v)
}

#[inline]
pub fn joule(v: f64) -> Energy {
    use uom::si::energy::joule;
    Energy::new::<joule>(v)
}

#[inline]
pub fn m3(v: f64) -> Volume {
    use uom::si::volume::cubic_meter;
    Volume::new::<cubic_meter>(v)
}

/// Temperature in degrees Celsius (the bulk-modulus curve's axis).
#[inline]
pub fn celsius(t: Temperature) -> f64 {
    use uom::si::thermodynamic_temperature::degree_celsius;
    t.get::<degree_celsius>()
}

pub mod constants {
    pub const G0_MPS2: f64 = 9.806_65;

    /// Standard atmosphere, Pa.
    pub const P_ATM_PA: f64 = 101_325.0;
}
