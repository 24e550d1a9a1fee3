use thiserror::Error;

use crate::math::Domain;

/// The result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the library can report.
///
/// None of these are recoverable at the point of detection; they propagate to
/// the caller, which is expected to abort the current training run.
#[derive(Debug, Error)]
pub enum Error {
    /// Shape or length mismatch between operands, layers or chained widths.
    #[error("dimension mismatch: {0}")]
    Dimension(String),

    /// Out-of-range element, row or column access.
    #[error("index out of bounds: {0}")]
    Index(String),

    /// An unset tensor handle was dereferenced.
    #[error("null reference: {0} is not set")]
    NullReference(&'static str),

    /// A domain narrowing asked for the wrong storage domain.
    #[error("cast error: expected a {expected} tensor, got a {actual} tensor")]
    Cast { expected: Domain, actual: Domain },

    /// The accelerator could not satisfy an allocation.
    #[error("device allocation failed (status {code}): {message}")]
    Allocation { code: i32, message: String },

    /// Any other non-success status reported by the accelerator runtime.
    #[error("device error (status {code}): {message}")]
    Device { code: i32, message: String },

    /// Malformed literal initializer or invalid requested shape.
    #[error("invalid construction: {0}")]
    Construction(String),

    /// The network cannot be bound or driven in its current configuration.
    #[error("network error: {0}")]
    Network(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn dims(what: &str, expected: impl std::fmt::Display, got: impl std::fmt::Display) -> Self {
        Error::Dimension(format!("{what}: expected {expected}, got {got}"))
    }
}
