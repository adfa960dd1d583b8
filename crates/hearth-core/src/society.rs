//! Societies: local time, shared resource pools and the trade-tick throttle.
//!
//! Every agent belongs to exactly one society. A society keeps its own
//! simulated time (the world clock's hours scaled by `time_scale`) and a
//! shared [`ResourceLedger`] its members draw from before negotiating.
//!
//! The trade throttle limits how often a society's requesters are advanced:
//! with a rate of `r` passes per simulated hour, simulated time accumulates
//! and the society becomes ready once `1 / r` hours have built up. A rate
//! of zero processes the society every tick.

use hearth_agents::ResourceLedger;
use hearth_types::SocietyId;
use tracing::debug;

/// Errors that can occur when registering societies.
#[derive(Debug, thiserror::Error)]
pub enum SocietyError {
    /// A society with this name already exists.
    #[error("duplicate society name: {0}")]
    DuplicateName(String),

    /// No handle is left for a new society.
    #[error("society handles exhausted")]
    HandlesExhausted,

    /// The handle does not name a registered society.
    #[error("society not found: {0}")]
    NotFound(SocietyId),
}

/// A group of agents sharing a clock, a pool and a trade cadence.
#[derive(Debug, Clone)]
pub struct Society {
    /// Handle of this society.
    pub id: SocietyId,
    /// Display name.
    pub name: String,
    /// Shared pool drawn before partner search.
    pub pool: ResourceLedger,
    /// Trade passes per simulated hour (0 = every tick).
    trade_tick_rate: f32,
    /// Local hours per world hour.
    time_scale: f64,
    /// Local simulated time in hours.
    time: f64,
    /// Local hours covered by the most recent tick.
    last_delta: f64,
    /// Local hours accumulated toward the next trade pass.
    accumulated: f64,
}

impl Society {
    /// Create a society whose local time starts at `start_time`.
    ///
    /// Non-finite or negative rates are treated as zero; non-positive time
    /// scales as one.
    pub fn new(id: SocietyId, name: impl Into<String>, trade_tick_rate: f32, start_time: f64) -> Self {
        let trade_tick_rate = if trade_tick_rate.is_finite() {
            trade_tick_rate.max(0.0)
        } else {
            0.0
        };
        Self {
            id,
            name: name.into(),
            pool: ResourceLedger::new(),
            trade_tick_rate,
            time_scale: 1.0,
            time: start_time,
            last_delta: 0.0,
            accumulated: 0.0,
        }
    }

    /// Set the local time scale. Non-positive or non-finite values are
    /// ignored.
    pub fn set_time_scale(&mut self, time_scale: f64) {
        if time_scale.is_finite() && time_scale > 0.0 {
            self.time_scale = time_scale;
        }
    }

    /// Trade passes per simulated hour.
    pub const fn trade_tick_rate(&self) -> f32 {
        self.trade_tick_rate
    }

    /// Local hours between two trade passes (0 = every tick).
    pub fn trade_interval(&self) -> f64 {
        if self.trade_tick_rate > 0.0 {
            1.0 / f64::from(self.trade_tick_rate)
        } else {
            0.0
        }
    }

    /// Advance local time by `world_hours` scaled to this society.
    pub fn advance(&mut self, world_hours: f64) {
        let delta = if world_hours.is_finite() {
            (world_hours * self.time_scale).max(0.0)
        } else {
            0.0
        };
        self.last_delta = delta;
        self.time += delta;
        self.accumulated += delta;
    }

    /// Local hours covered by the most recent tick.
    pub const fn delta_simulated_hours(&self) -> f64 {
        self.last_delta
    }

    /// Local simulated time in hours.
    pub const fn current_simulated_time(&self) -> f64 {
        self.time
    }

    /// Consume one trade pass if enough local time has accumulated.
    ///
    /// At most one pass is granted per call; surplus time beyond one
    /// interval is discarded so a slow tick cannot queue up a burst.
    pub fn take_trade_turn(&mut self) -> bool {
        let interval = self.trade_interval();
        if interval <= 0.0 {
            self.accumulated = 0.0;
            return true;
        }
        if self.accumulated + 1e-9 < interval {
            return false;
        }
        self.accumulated = (self.accumulated - interval).clamp(0.0, interval);
        true
    }
}

/// Arena of societies indexed by [`SocietyId`].
#[derive(Debug, Clone, Default)]
pub struct SocietyRegistry {
    /// Societies in handle order.
    societies: Vec<Society>,
}

impl SocietyRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            societies: Vec::new(),
        }
    }

    /// Register a new society.
    ///
    /// # Errors
    ///
    /// Returns [`SocietyError::DuplicateName`] if the name is taken or
    /// [`SocietyError::HandlesExhausted`] when no handle is left.
    pub fn add(
        &mut self,
        name: &str,
        trade_tick_rate: f32,
        start_time: f64,
    ) -> Result<SocietyId, SocietyError> {
        if self.societies.iter().any(|s| s.name == name) {
            return Err(SocietyError::DuplicateName(name.to_owned()));
        }
        let raw = u32::try_from(self.societies.len()).map_err(|_err| SocietyError::HandlesExhausted)?;
        let id = SocietyId::new(raw);
        self.societies
            .push(Society::new(id, name, trade_tick_rate, start_time));
        debug!(society = %id, name, trade_tick_rate, "Society registered");
        Ok(id)
    }

    /// Look up a society.
    pub fn get(&self, id: SocietyId) -> Option<&Society> {
        self.societies.get(id.index())
    }

    /// Look up a society mutably.
    pub fn get_mut(&mut self, id: SocietyId) -> Option<&mut Society> {
        self.societies.get_mut(id.index())
    }

    /// Look up a society or fail.
    ///
    /// # Errors
    ///
    /// Returns [`SocietyError::NotFound`] for an unknown handle.
    pub fn require_mut(&mut self, id: SocietyId) -> Result<&mut Society, SocietyError> {
        self.get_mut(id).ok_or(SocietyError::NotFound(id))
    }

    /// Advance every society by `world_hours` and return the ones whose
    /// trade throttle grants a pass this tick, in handle order.
    pub fn advance_all(&mut self, world_hours: f64) -> Vec<SocietyId> {
        let mut ready = Vec::new();
        for society in &mut self.societies {
            society.advance(world_hours);
            if society.take_trade_turn() {
                ready.push(society.id);
            }
        }
        ready
    }

    /// Iterate over societies in handle order.
    pub fn iter(&self) -> impl Iterator<Item = &Society> {
        self.societies.iter()
    }

    /// Number of societies.
    pub fn len(&self) -> usize {
        self.societies.len()
    }

    /// Whether no society is registered.
    pub fn is_empty(&self) -> bool {
        self.societies.is_empty()
    }
}
