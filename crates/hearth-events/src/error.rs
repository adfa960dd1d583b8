//! Error types for the `hearth-events` crate.
//!
//! Appending events never fails; only exporting them can.

/// Errors that can occur while exporting events.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Writing to the output failed.
    #[error("event export I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An event could not be serialized.
    #[error("event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
