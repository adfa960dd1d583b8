//! Error types for the `hearth-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use hearth_types::AnchorId;

/// Errors that can occur while building the world.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// An anchor was not found in the registry.
    #[error("anchor not found: {0}")]
    AnchorNotFound(AnchorId),

    /// An anchor name is already registered.
    #[error("duplicate anchor name: {0}")]
    DuplicateAnchor(String),

    /// A position has a non-finite coordinate.
    #[error("invalid position ({x}, {y})")]
    InvalidPosition {
        /// X coordinate.
        x: f32,
        /// Y coordinate.
        y: f32,
    },

    /// An activity window has hours outside `[0, 24]`.
    #[error("invalid activity window {start}..{end}")]
    InvalidWindow {
        /// Start hour.
        start: f64,
        /// End hour.
        end: f64,
    },

    /// The anchor registry ran out of handles.
    #[error("anchor handle space exhausted")]
    HandlesExhausted,
}
