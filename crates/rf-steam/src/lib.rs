//! rf-steam: water/steam property service for reactorflow.
//!
//! Provides:
//! - Tab-separated steam-table loading (saturation + single-phase rows)
//! - Saturation sequence with binary-search accessors and the (u, v)
//!   saturation dome polygon
//! - Delaunay-triangulated single-phase interpolation mesh
//! - The water-properties service: (mass, energy, volume) -> full state,
//!   with dome-first phase determination
//! - Wagner-correlation fallback for degraded operation without a table
//!
//! Phase determination is purely geometric in (u, v) space: a point
//! inside the dome polygon is two-phase, a point outside is single-phase.
//! No temperature, pressure, or density threshold short-circuits that
//! test.

pub mod error;
pub mod fallback;
pub mod mesh;
pub mod saturation;
pub mod service;
pub mod state;
pub mod table;

pub use error::{SteamError, SteamResult};
pub use mesh::{MeshSample, SinglePhaseMesh};
pub use saturation::{SaturationPoint, SaturationTable};
pub use service::{LookupTrace, WaterProperties};
pub use state::{Phase, SpecEnergy, WaterState};
pub use table::{SinglePhaseKind, SteamRow, SteamTableStore};
