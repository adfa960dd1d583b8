//! Trade telemetry and signal emission for the Hearth simulation.
//!
//! The negotiation core reports every transition as a structured
//! [`TradeEvent`] through the [`Telemetry`] trait and emits trade outcome
//! [`Signal`]s through the [`SignalSink`] trait. Both are fire-and-forget:
//! the core never waits on them and they never fail the caller.
//!
//! # Modules
//!
//! - [`error`] -- Export errors ([`EventError`])
//! - [`event`] -- [`TradeEvent`], [`Telemetry`], [`NullTelemetry`]
//! - [`log`] -- Bounded ring buffer [`EventLog`] with JSON lines export
//! - [`signal`] -- [`Signal`], [`SignalSink`], [`SignalBuffer`]

pub mod error;
pub mod event;
pub mod log;
pub mod signal;

pub use error::EventError;
pub use event::{NullTelemetry, Telemetry, TradeEvent};
pub use log::EventLog;
pub use signal::{Signal, SignalBuffer, SignalSink};
