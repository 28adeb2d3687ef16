//! Error types for steam-table and water-property operations.

use thiserror::Error;

pub type SteamResult<T> = Result<T, SteamError>;

/// Errors from table loading and property evaluation.
///
/// Property failures are deliberately loud: the engine never substitutes
/// a guessed state for one it could not compute.
#[derive(Error, Debug)]
pub enum SteamError {
    #[error("Steam table parse error at line {line}: {message}")]
    TableParse { line: usize, message: String },

    #[error("Steam table is unusable: {what}")]
    TableInvalid { what: &'static str },

    #[error(transparent)]
    Core(#[from] rf_core::CoreError),

    #[error("Non-physical input: {what}")]
    NonPhysical { what: &'static str },

    #[error("{what} = {value} outside tabulated range [{min}, {max}]")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("No single-phase mesh available (degraded table); cannot interpolate single-phase state")]
    MeshUnavailable,

    #[error("Point (u={u_j_kg} J/kg, v={v_m3_kg} m3/kg) outside the single-phase mesh")]
    MeshMiss { u_j_kg: f64, v_m3_kg: f64 },

    #[error(
        "Two-phase quality disagreement: x_v={x_v}, x_u={x_u} at T_sat={t_sat_k} K (tolerance {tol})"
    )]
    QualityMismatch {
        x_v: f64,
        x_u: f64,
        t_sat_k: f64,
        tol: f64,
    },

    #[error("Failed to bracket saturation chord for (u={u_j_kg} J/kg, v={v_m3_kg} m3/kg)")]
    ChordBracket { u_j_kg: f64, v_m3_kg: f64 },

    #[error("I/O error reading steam table: {0}")]
    Io(#[from] std::io::Error),
}
