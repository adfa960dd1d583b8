//! World clock and time tracking for the Hearth simulation.
//!
//! The clock is the single source of truth for the tick counter and the
//! amount of simulated time one tick represents. Societies run their own
//! local time on top of it (see [`crate::society`]), scaled from the
//! clock's hours-per-tick.
//!
//! # Design Principles
//!
//! - The tick counter uses checked arithmetic (no silent overflow).
//! - Elapsed hours are accumulated once per advance, never recomputed
//!   from the tick number, so fractional tick lengths stay exact in `f64`.

use crate::config::TimeConfig;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Invalid time configuration (e.g. zero hours per tick).
    #[error("invalid time configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// World clock tracking the simulation's temporal state.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldClock {
    /// Current tick number (0 before the first tick runs).
    tick: u64,

    /// Simulated hours covered by one tick.
    hours_per_tick: f64,

    /// Hour of day at which the simulation starts.
    start_hour: f64,

    /// Simulated hours elapsed since the start.
    elapsed_hours: f64,
}

impl WorldClock {
    /// Create a new world clock from a time configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: &TimeConfig) -> Result<Self, ClockError> {
        Self::from_parts(0, config.hours_per_tick, config.start_hour)
    }

    /// Create a clock from explicit parameters (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `hours_per_tick` is not a
    /// positive finite number or `start_hour` lies outside `[0, 24)`.
    pub fn from_parts(tick: u64, hours_per_tick: f64, start_hour: f64) -> Result<Self, ClockError> {
        if !hours_per_tick.is_finite() || hours_per_tick <= 0.0 {
            return Err(ClockError::InvalidConfig {
                reason: "hours_per_tick must be a positive number".to_owned(),
            });
        }
        if !(0.0..24.0).contains(&start_hour) {
            return Err(ClockError::InvalidConfig {
                reason: "start_hour must lie in [0, 24)".to_owned(),
            });
        }
        Ok(Self {
            tick,
            hours_per_tick,
            start_hour,
            elapsed_hours: 0.0,
        })
    }

    /// Advance the clock by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        self.elapsed_hours += self.hours_per_tick;
        Ok(self.tick)
    }

    /// Return the current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated hours covered by one tick.
    pub const fn hours_per_tick(&self) -> f64 {
        self.hours_per_tick
    }

    /// Hour of day at which the simulation started.
    pub const fn start_hour(&self) -> f64 {
        self.start_hour
    }

    /// Simulated hours elapsed since the start.
    pub const fn elapsed_hours(&self) -> f64 {
        self.elapsed_hours
    }

    /// Absolute simulated time in hours (start hour plus elapsed hours).
    pub fn now(&self) -> f64 {
        self.start_hour + self.elapsed_hours
    }

    /// Hour of day in `[0, 24)`.
    pub fn hour_of_day(&self) -> f64 {
        self.now().rem_euclid(hearth_world::HOURS_PER_DAY)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn quarter_hour_clock() -> WorldClock {
        WorldClock::from_parts(0, 0.25, 8.0).unwrap()
    }

    #[test]
    fn new_clock_starts_at_tick_zero() {
        let clock = quarter_hour_clock();
        assert_eq!(clock.tick(), 0);
        assert!((clock.now() - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn advance_accumulates_hours() {
        let mut clock = quarter_hour_clock();
        for _ in 0..8 {
            clock.advance().unwrap();
        }
        assert_eq!(clock.tick(), 8);
        assert!((clock.elapsed_hours() - 2.0).abs() < 1e-9);
        assert!((clock.now() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn hour_of_day_wraps() {
        let mut clock = WorldClock::from_parts(0, 6.0, 20.0).unwrap();
        clock.advance().unwrap();
        assert!((clock.hour_of_day() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn overflow_is_an_error() {
        let mut clock = WorldClock::from_parts(u64::MAX, 1.0, 0.0).unwrap();
        assert!(matches!(clock.advance(), Err(ClockError::TickOverflow)));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(WorldClock::from_parts(0, 0.0, 0.0).is_err());
        assert!(WorldClock::from_parts(0, f64::NAN, 0.0).is_err());
        assert!(WorldClock::from_parts(0, 1.0, 24.0).is_err());
    }
}
