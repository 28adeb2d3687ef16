//! Error types for network model invariants.

use thiserror::Error;

pub type NetworkResult<T> = Result<T, NetworkError>;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Unknown flow node id {id}")]
    UnknownNode { id: usize },

    #[error("Unknown connection id {id}")]
    UnknownConnection { id: usize },

    #[error("Unknown thermal node id {id}")]
    UnknownThermal { id: usize },

    #[error("Invariant violated on {entity} {label:?}: {what}")]
    Invariant {
        entity: &'static str,
        label: String,
        what: &'static str,
    },
}
