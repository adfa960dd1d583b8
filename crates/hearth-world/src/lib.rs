//! Anchors, navigation and schedules for the Hearth simulation.
//!
//! This crate models the parts of the world the trade negotiation core
//! consumes but does not own: where providers stand, how agents move and
//! when they are available to trade. The core talks to movement and
//! routines only through the [`Navigation`] and [`Schedule`] traits; the
//! in-memory implementations here back the engine and the test suites.
//!
//! # Modules
//!
//! - [`anchor`] -- [`Position`], [`Anchor`] and the [`AnchorRegistry`] with
//!   queue-slot layout.
//! - [`error`] -- Error types for world setup.
//! - [`navigation`] -- The [`Navigation`] trait and the straight-line
//!   [`StepNavigator`].
//! - [`schedule`] -- The [`Schedule`] trait, daily [`ActivityWindow`]s and
//!   [`FixedSchedule`] with override support.

pub mod anchor;
pub mod error;
pub mod navigation;
pub mod schedule;

// Re-export primary types at crate root.
pub use anchor::{Anchor, AnchorRegistry, Position};
pub use error::WorldError;
pub use navigation::{Navigation, StepNavigator};
pub use schedule::{ActivityWindow, FixedSchedule, HOURS_PER_DAY, Schedule};
