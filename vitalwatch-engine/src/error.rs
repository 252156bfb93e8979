//! Error types for the alarm engine.

use thiserror::Error;

use crate::vital::VitalId;

/// Errors surfaced by the engine and its model context.
///
/// Identity conflicts and detaches of unknown samples are not errors; they
/// are logged and reported through return values.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Settings could not be loaded or deserialized.
    #[error("Failed to load settings: {0}")]
    Config(#[from] config::ConfigError),

    /// The vital was removed or never existed.
    #[error("Unknown vital: {0}")]
    UnknownVital(VitalId),

    /// The model context thread could not be started.
    #[error("Failed to start model context: {0}")]
    Spawn(#[from] std::io::Error),

    /// The model context has shut down and no longer accepts commands.
    #[error("Model context closed")]
    ContextClosed,

    /// The model context thread panicked.
    #[error("Model context panicked: {0}")]
    ContextPanicked(String),
}
