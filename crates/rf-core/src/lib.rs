//! rf-core: stable foundation for reactorflow.
//!
//! Contains:
//! - units (uom SI types + constructors for the property boundary)
//! - numeric (tolerances, finiteness guard, interpolation helpers)
//! - ids (stable compact IDs for network/model objects)
//! - timing (stopwatch for solver metrics)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
