//! Error type for the vehicle model.
//!
//! Only genuinely unrecoverable conditions are reported as errors. Low-speed and
//! short-trajectory conditions are expected during normal operation and resolve to
//! defined fallback values instead (see [`crate::fusion`]).

use thiserror::Error;

/// Vehicle model errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// The 2-state system matrix could not be inverted. This only happens for a
    /// degenerate parameter set and is not retried.
    #[error("Singular state matrix in steady-state solve at speed {speed} m/s")]
    SingularSystem { speed: f64 },
    /// Predicted path sequences must all have the same number of samples.
    #[error("Predicted path length mismatch: x has {x}, y has {y}, t has {t} samples")]
    PathLengthMismatch { x: usize, y: usize, t: usize },
}
