//! The Need Ledger: an agent's ordered collection of bounded needs.
//!
//! Needs rise through decay (driven externally) and fall when the agent
//! consumes a resource. Every mutation clamps to the need's `[min, max]`
//! bounds, so a ledger never holds an out-of-range value.

use hearth_types::{Need, NeedId};

use crate::error::AgentError;

/// Per-agent ordered collection of needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeedLedger {
    /// Needs in authoring order.
    needs: Vec<Need>,
}

impl NeedLedger {
    /// Create an empty ledger.
    pub const fn new() -> Self {
        Self { needs: Vec::new() }
    }

    /// Build a ledger from a list of needs.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateNeed`] if the same need id appears twice.
    pub fn from_needs(needs: Vec<Need>) -> Result<Self, AgentError> {
        let mut ledger = Self::new();
        for need in needs {
            ledger.insert(need)?;
        }
        Ok(ledger)
    }

    /// Append a need.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateNeed`] if the id is already present.
    pub fn insert(&mut self, need: Need) -> Result<(), AgentError> {
        if self.get(&need.id).is_some() {
            return Err(AgentError::DuplicateNeed(need.id));
        }
        self.needs.push(need);
        Ok(())
    }

    /// Look up a need.
    pub fn get(&self, id: &NeedId) -> Option<&Need> {
        self.needs.iter().find(|n| &n.id == id)
    }

    /// Look up a need mutably.
    pub fn get_mut(&mut self, id: &NeedId) -> Option<&mut Need> {
        self.needs.iter_mut().find(|n| &n.id == id)
    }

    /// Current urgency of a need, or `None` if the agent has no such need.
    pub fn urgency(&self, id: &NeedId) -> Option<f32> {
        self.get(id).map(Need::urgency)
    }

    /// Lower a need by `amount` (already scaled to need units).
    ///
    /// Returns the new value, or `None` if the need is unknown.
    pub fn satisfy(&mut self, id: &NeedId, amount: f32) -> Option<f32> {
        let need = self.get_mut(id)?;
        if amount.is_finite() && amount > 0.0 {
            need.set_value(need.value - amount);
        }
        Some(need.value)
    }

    /// Raise a need by an externally computed decay `amount`.
    ///
    /// Returns the new value, or `None` if the need is unknown.
    pub fn decay(&mut self, id: &NeedId, amount: f32) -> Option<f32> {
        let need = self.get_mut(id)?;
        if amount.is_finite() && amount > 0.0 {
            need.set_value(need.value + amount);
        }
        Some(need.value)
    }

    /// Raise every need by `rate_per_hour * hours`.
    pub fn decay_all(&mut self, rate_per_hour: f32, hours: f32) {
        let amount = rate_per_hour * hours;
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        for need in &mut self.needs {
            need.set_value(need.value + amount);
        }
    }

    /// Iterate over needs in authoring order.
    pub fn iter(&self) -> impl Iterator<Item = &Need> {
        self.needs.iter()
    }

    /// Number of needs.
    pub fn len(&self) -> usize {
        self.needs.len()
    }

    /// Whether the ledger holds no needs.
    pub fn is_empty(&self) -> bool {
        self.needs.is_empty()
    }
}
