//! Error types for route registration and dispatch.

use thiserror::Error;

/// Dispatch-specific errors.
///
/// A request that matches no mapping is not an error: it resolves to a
/// `404` response.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A mapping was registered without a mandatory field.
    #[error("mapping is missing required field `{field}`")]
    Configuration {
        /// The missing field (`url` or `target`).
        field: &'static str,
    },

    /// A route specification did not compile to a valid matcher.
    #[error("invalid path pattern: {0}")]
    InvalidPattern(String),

    /// A mapping or filter referenced a condition that is not registered.
    #[error("unknown condition: {name}")]
    UnknownCondition {
        /// The name that was looked up.
        name: String,
    },
}

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, RouterError>;
