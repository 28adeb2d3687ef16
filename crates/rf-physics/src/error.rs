//! Error types for physics operators.

use thiserror::Error;

pub type PhysicsResult<T> = Result<T, PhysicsError>;

#[derive(Error, Debug)]
pub enum PhysicsError {
    #[error("Water-property failure: {0}")]
    Steam(#[from] rf_steam::SteamError),

    #[error("Network model failure: {0}")]
    Network(#[from] rf_network::NetworkError),

    #[error("Non-finite {what} on {label}")]
    NonFinite { what: &'static str, label: String },

    #[error("Operator internal error: {what}")]
    Internal { what: &'static str },
}
