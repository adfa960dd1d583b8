//! Schedule collaborator.
//!
//! Agents follow daily activity windows. A window names the anchor the
//! agent is at during those hours and whether it trades there. While a
//! schedule override is active (a requester has paused its routine to go
//! trade) the agent is not trade-capable and has no scheduled anchor.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use tracing::trace;

use hearth_types::{AgentId, AnchorId};

use crate::error::WorldError;

/// Hours in a simulated day.
pub const HOURS_PER_DAY: f64 = 24.0;

/// Schedule interface consumed by the negotiation core.
pub trait Schedule {
    /// Whether `agent` is in a trade-capable activity at `now`.
    fn is_trade_capable_now(&self, agent: AgentId, now: f64) -> bool;

    /// Anchor of `agent`'s current trade-capable activity at `now`.
    fn trade_anchor(&self, agent: AgentId, now: f64) -> Option<AnchorId>;

    /// Pause `agent`'s routine until [`Schedule::clear_override`].
    fn request_override(&mut self, agent: AgentId);

    /// Resume `agent`'s routine.
    fn clear_override(&mut self, agent: AgentId);

    /// Whether an override is active for `agent`.
    fn has_override(&self, agent: AgentId) -> bool;
}

/// One daily activity window.
///
/// `end_hour < start_hour` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ActivityWindow {
    /// Hour of day the window opens, in `[0, 24]`.
    pub start_hour: f64,
    /// Hour of day the window closes, in `[0, 24]`.
    pub end_hour: f64,
    /// Where the agent spends the window.
    #[serde(default)]
    pub anchor: Option<AnchorId>,
    /// Whether the agent trades during the window.
    #[serde(default)]
    pub trade_capable: bool,
}

impl ActivityWindow {
    /// Check the window's hours.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidWindow`] when an hour is outside `[0, 24]`.
    pub fn validate(&self) -> Result<(), WorldError> {
        let day = 0.0..=HOURS_PER_DAY;
        if day.contains(&self.start_hour) && day.contains(&self.end_hour) {
            Ok(())
        } else {
            Err(WorldError::InvalidWindow {
                start: self.start_hour,
                end: self.end_hour,
            })
        }
    }

    /// Whether the window covers `hour_of_day`.
    pub fn contains(&self, hour_of_day: f64) -> bool {
        if self.start_hour <= self.end_hour {
            hour_of_day >= self.start_hour && hour_of_day < self.end_hour
        } else {
            hour_of_day >= self.start_hour || hour_of_day < self.end_hour
        }
    }
}

/// Fixed daily routine per agent.
#[derive(Debug, Clone, Default)]
pub struct FixedSchedule {
    /// Windows per agent, first match wins.
    windows: BTreeMap<AgentId, Vec<ActivityWindow>>,
    /// Agents whose routine is paused.
    overrides: BTreeSet<AgentId>,
}

impl FixedSchedule {
    /// Create an empty schedule.
    pub const fn new() -> Self {
        Self {
            windows: BTreeMap::new(),
            overrides: BTreeSet::new(),
        }
    }

    /// Add a window to `agent`'s routine.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidWindow`] for hours outside the day.
    pub fn add_window(&mut self, agent: AgentId, window: ActivityWindow) -> Result<(), WorldError> {
        window.validate()?;
        self.windows.entry(agent).or_default().push(window);
        Ok(())
    }

    /// Active window of `agent` at `now`, ignoring overrides.
    pub fn active_window(&self, agent: AgentId, now: f64) -> Option<&ActivityWindow> {
        let hour = now.rem_euclid(HOURS_PER_DAY);
        self.windows
            .get(&agent)?
            .iter()
            .find(|w| w.contains(hour))
    }
}

impl Schedule for FixedSchedule {
    fn is_trade_capable_now(&self, agent: AgentId, now: f64) -> bool {
        !self.overrides.contains(&agent)
            && self
                .active_window(agent, now)
                .is_some_and(|w| w.trade_capable)
    }

    fn trade_anchor(&self, agent: AgentId, now: f64) -> Option<AnchorId> {
        if self.overrides.contains(&agent) {
            return None;
        }
        self.active_window(agent, now)
            .filter(|w| w.trade_capable)
            .and_then(|w| w.anchor)
    }

    fn request_override(&mut self, agent: AgentId) {
        if self.overrides.insert(agent) {
            trace!(agent = %agent, "Schedule override requested");
        }
    }

    fn clear_override(&mut self, agent: AgentId) {
        if self.overrides.remove(&agent) {
            trace!(agent = %agent, "Schedule override cleared");
        }
    }

    fn has_override(&self, agent: AgentId) -> bool {
        self.overrides.contains(&agent)
    }
}
