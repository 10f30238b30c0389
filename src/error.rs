//! Error type shared by all smoothing stages.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type SmoothResult<T> = Result<T, SmoothError>;

/// Everything that can go wrong when running a smoothing stage.
///
/// Numerical trouble inside the local solves (near-singular systems, vanishing
/// denominators) is absorbed by regularisation and never shows up here.
/// Non-finite samples are not reported either; they propagate into the output.
#[derive(Error, Debug)]
pub enum SmoothError {
    /// A parameter is outside its valid range. Raised before any computation.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Two arrays that must share a shape do not.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// Shape of the reference field.
        expected: (usize, usize),
        /// Shape that was passed in.
        found: (usize, usize),
    },

    /// The input field has no traces or no samples.
    #[error("input field is empty")]
    EmptyField,

    /// No filter is registered under the requested key.
    #[error("unknown filter `{0}`")]
    UnknownFilter(String),

    /// Filter parameters could not be read from JSON.
    #[error("malformed filter parameters: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// The abort flag was raised while a stage was running.
    #[error("computation cancelled")]
    Cancelled,
}

impl SmoothError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SmoothError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
