//! Error types for the simulation core.

use thiserror::Error;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid actor reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(u64),

    /// Launch parameters failed data-authoring validation.
    #[error("Invalid config for '{field}': {message}")]
    InvalidConfig {
        /// Name of the offending parameter.
        field: &'static str,
        /// Why it was rejected.
        message: String,
    },

    /// Data file parsing error.
    #[error("Failed to parse data '{name}': {message}")]
    DataParseError {
        /// Identifier of the data that failed to parse.
        name: String,
        /// Error message.
        message: String,
    },

    /// Invalid simulation state.
    #[error("Invalid simulation state: {0}")]
    InvalidState(String),

    /// Desync detected between peers.
    #[error("Desync detected at tick {tick}: local hash {local_hash}, remote hash {remote_hash}")]
    DesyncDetected {
        /// Tick where desync occurred.
        tick: u64,
        /// Local simulation hash.
        local_hash: u64,
        /// Remote simulation hash.
        remote_hash: u64,
    },
}
