use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Failures shared by every layer of the engine.
///
/// Produced by [`crate::numeric::ensure_finite`]; the property service
/// and the solver audit wrap it (`#[from]`) rather than inventing their
/// own finiteness errors.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Non-finite {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
}
