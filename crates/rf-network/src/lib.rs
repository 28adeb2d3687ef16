//! rf-network: typed network model for reactorflow.
//!
//! Defines the entities the physics operators advance: flow nodes,
//! thermal nodes, flow connections, and device states (pumps, valves,
//! check valves, burst records). Invariants and accessors only; no
//! algorithms live here.

pub mod burst;
pub mod connection;
pub mod devices;
pub mod error;
pub mod network;
pub mod node;

pub use burst::BurstState;
pub use connection::FlowConnection;
pub use devices::{CheckValveState, CondenserSpec, HxSpec, PumpState, TurbineSpec, ValveState};
pub use error::{NetworkError, NetworkResult};
pub use network::Network;
pub use node::{FlowNode, ThermalNode};
