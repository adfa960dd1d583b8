//! The Resource Ledger: ordered (resource, amount) pairs held by an agent
//! or a society pool.
//!
//! Amounts are floats. Removal is clamped to what is held and amounts that
//! drift within [`AMOUNT_EPSILON`] of zero are snapped to zero, so a stored
//! amount is never negative.

use hearth_types::{AMOUNT_EPSILON, ResourceId, ResourceStack};

/// Per-holder ordered collection of resource amounts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceLedger {
    /// Stacks in insertion order.
    stacks: Vec<ResourceStack>,
}

impl ResourceLedger {
    /// Create an empty ledger.
    pub const fn new() -> Self {
        Self { stacks: Vec::new() }
    }

    /// Build a ledger from `(resource, amount)` pairs; repeated resources
    /// are summed.
    pub fn from_pairs<I, R>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (R, f32)>,
        R: Into<ResourceId>,
    {
        let mut ledger = Self::new();
        for (resource, amount) in pairs {
            ledger.add(&resource.into(), amount);
        }
        ledger
    }

    /// Amount held of `resource` (0 when absent).
    pub fn amount(&self, resource: &ResourceId) -> f32 {
        self.stacks
            .iter()
            .find(|s| &s.id == resource)
            .map_or(0.0, |s| s.amount)
    }

    /// Whether a meaningful positive amount of `resource` is held.
    pub fn has_positive(&self, resource: &ResourceId) -> bool {
        self.amount(resource) > AMOUNT_EPSILON
    }

    /// Whether any resource is held in a meaningful positive amount.
    pub fn has_any_positive(&self) -> bool {
        self.stacks.iter().any(|s| s.amount > AMOUNT_EPSILON)
    }

    /// Add `amount` of `resource`. Non-finite or non-positive amounts are
    /// ignored.
    pub fn add(&mut self, resource: &ResourceId, amount: f32) {
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        if let Some(stack) = self.stacks.iter_mut().find(|s| &s.id == resource) {
            stack.amount += amount;
        } else {
            self.stacks.push(ResourceStack {
                id: resource.clone(),
                amount,
            });
        }
    }

    /// Remove up to `amount` of `resource` and return how much was removed.
    ///
    /// The removal is clamped to the amount held; the stack is snapped to
    /// zero when the remainder falls within [`AMOUNT_EPSILON`].
    pub fn take(&mut self, resource: &ResourceId, amount: f32) -> f32 {
        if !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let Some(stack) = self.stacks.iter_mut().find(|s| &s.id == resource) else {
            return 0.0;
        };
        let taken = amount.min(stack.amount.max(0.0));
        stack.amount -= taken;
        if stack.amount <= AMOUNT_EPSILON {
            stack.amount = 0.0;
        }
        taken
    }

    /// Iterate over stacks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceStack> {
        self.stacks.iter()
    }

    /// Sum of all amounts held.
    pub fn total(&self) -> f32 {
        self.stacks.iter().map(|s| s.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> ResourceId {
        ResourceId::from("water")
    }

    #[test]
    fn add_and_amount() {
        let mut ledger = ResourceLedger::new();
        ledger.add(&water(), 2.5);
        ledger.add(&water(), 0.5);
        assert!((ledger.amount(&water()) - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn take_is_clamped_to_holdings() {
        let mut ledger = ResourceLedger::from_pairs([("water", 1.5)]);
        let taken = ledger.take(&water(), 4.0);
        assert!((taken - 1.5).abs() < f32::EPSILON);
        assert!(ledger.amount(&water()).abs() < f32::EPSILON);
        assert!(!ledger.has_any_positive());
    }

    #[test]
    fn take_unknown_resource_removes_nothing() {
        let mut ledger = ResourceLedger::from_pairs([("bread", 1.0)]);
        assert!(ledger.take(&water(), 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn residue_below_epsilon_snaps_to_zero() {
        let mut ledger = ResourceLedger::from_pairs([("water", 1.0)]);
        ledger.take(&water(), 1.0 - AMOUNT_EPSILON / 2.0);
        assert!(ledger.amount(&water()).abs() < f32::EPSILON);
    }

    #[test]
    fn invalid_amounts_are_ignored() {
        let mut ledger = ResourceLedger::new();
        ledger.add(&water(), -3.0);
        ledger.add(&water(), f32::INFINITY);
        assert!(!ledger.has_positive(&water()));
        assert_eq!(ledger.iter().count(), 0);
    }
}
