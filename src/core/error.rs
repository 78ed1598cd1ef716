//! Error types for allocation operations.

use thiserror::Error;

/// Errors produced by allocation components.
#[derive(Debug, Error)]
pub enum SchedulingError {
    /// A node, pod or container carried missing or unreadable resource data.
    #[error("data incomplete: {0}")]
    DataIncomplete(String),
    /// Claimed resources exceed allocatable capacity.
    #[error("overcommit detected: {0}")]
    OvercommitDetected(String),
    /// Configuration cannot produce defined allocation behaviour.
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),
    /// A resource quantity string could not be parsed.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),
    /// A job queue is at its configured depth.
    #[error("queue full: {0}")]
    QueueFull(String),
    /// Provider-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
