//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup, the simulation run and shutdown.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: hearth_core::config::ConfigError,
    },

    /// Simulation state assembly failed.
    #[error("state error: {source}")]
    State {
        /// The underlying state error.
        #[from]
        source: hearth_core::StateError,
    },

    /// A schedule window or anchor was rejected.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: hearth_world::WorldError,
    },

    /// Simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: hearth_core::runner::RunnerError,
    },

    /// Writing the event dump failed.
    #[error("event dump error: {source}")]
    Events {
        /// The underlying export error.
        #[from]
        source: hearth_events::EventError,
    },

    /// The event dump file could not be created.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Population spawning failed.
    #[error("spawner error: {message}")]
    Spawner {
        /// Description of the spawner failure.
        message: String,
    },
}
