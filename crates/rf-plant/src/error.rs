//! Compiler error reporting.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlantError {
    #[error("Cannot parse plant document: {message}")]
    Parse { message: String },

    #[error("Duplicate component id {id:?}")]
    DuplicateId { id: String },

    #[error("Unknown component {id:?} referenced by {context}")]
    UnknownComponent { id: String, context: String },

    #[error("Component {component:?} has no port {port:?}")]
    UnknownPort { component: String, port: String },

    #[error("Port {component}.{port} is already connected")]
    PortConflict { component: String, port: String },

    #[error("Device component {id:?} is missing a connection on its {side} port")]
    DeviceNotWired { id: String, side: &'static str },

    #[error("Connections may not join two device components ({from} -> {to})")]
    DeviceToDevice { from: String, to: String },

    #[error("Impossible geometry on {component:?}: {what}")]
    BadGeometry { component: String, what: String },

    #[error("Initial fluid state for {component:?}: {source}")]
    InitialState {
        component: String,
        source: rf_steam::SteamError,
    },

    #[error("Physics initialization failed: {0}")]
    Physics(#[from] rf_physics::PhysicsError),
}
