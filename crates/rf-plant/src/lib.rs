//! rf-plant: persisted plant documents and the network compiler.
//!
//! Provides:
//! - The serde schema for plant designs (components, connections,
//!   containment), readable as JSON or YAML
//! - `build_network`: compile a document into the simulation network
//!   (flow nodes, thermal nodes, connections, devices, burst records,
//!   the explicit atmosphere node) with collected error reporting
//!
//! The compiler never coerces impossible geometry; every problem is
//! returned to the caller.

pub mod compile;
pub mod error;
pub mod schema;

pub use compile::{build_network, CompiledPlant};
pub use error::PlantError;
pub use schema::{
    ComponentDef, ComponentKind, ConnectionDef, InitialFluidDef, KineticsDef, PlantDoc, PortRef,
};
