//! Error types for the plume simulation.

use thiserror::Error;

/// Errors produced by simulation operations.
///
/// Every variant is a local, recoverable condition. Messages are phrased so a
/// presentation layer can show them to a user as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A step or query was issued before any session was started.
    #[error("no active session: start a simulation first")]
    NoActiveSession,

    /// The vehicle has no energy left and cannot take another step.
    #[error("vehicle is not operational: energy depleted ({energy:.1} remaining)")]
    NotOperational { energy: f64 },

    /// A position was outside the `[0, size)` domain on at least one axis.
    #[error("position ({x}, {y}) is outside the domain [0, {size}) x [0, {size})")]
    InvalidPosition { x: f64, y: f64, size: usize },

    /// An argument was out of its accepted range (e.g. a zero step count).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Grid size was zero or would overflow when squared.
    #[error("invalid dimensions: grid size must be non-zero")]
    InvalidDimensions,

    /// A configuration value failed validation.
    #[error("invalid config value '{name}': {reason}")]
    InvalidConfig { name: String, reason: String },
}

impl SimError {
    /// Shorthand for building an [`SimError::InvalidConfig`].
    pub fn config(name: &str, reason: impl Into<String>) -> Self {
        SimError::InvalidConfig {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
