//! Ledger entries and the builder that validates them.
//!
//! Every entry names a source (debit) and a destination (credit) party.
//! The [`TransactionBuilder`] enforces the party contract of each
//! [`EntryKind`] and a strictly positive quantity before producing a
//! [`LedgerEntry`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use hearth_types::{AgentId, ResourceId, SocietyId};

use crate::LedgerError;

// ---------------------------------------------------------------------------
// Parties and entry kinds
// ---------------------------------------------------------------------------

/// One side of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Party {
    /// An individual agent's inventory.
    Agent(AgentId),
    /// A society's shared pool.
    Pool(SocietyId),
    /// Resources leaving the simulation (consumed).
    Void,
}

impl Party {
    /// Short label used in validation errors.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Agent(_) => "agent",
            Self::Pool(_) => "pool",
            Self::Void => "void",
        }
    }
}

/// Category of a recorded movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Provider hands resources to a requester (agent to agent).
    Trade,
    /// An agent consumes resources to satisfy a need (agent to void).
    Consume,
    /// A society pool is drawn to satisfy a member's need (pool to void).
    PoolDraw,
}

/// Expected `(from, to)` party labels for each [`EntryKind`].
const fn expected_parties(kind: EntryKind) -> (&'static str, &'static str) {
    match kind {
        EntryKind::Trade => ("agent", "agent"),
        EntryKind::Consume => ("agent", "void"),
        EntryKind::PoolDraw => ("pool", "void"),
    }
}

/// Whether `from -> to` satisfies the party contract of `kind`.
pub fn parties_valid(kind: EntryKind, from: Party, to: Party) -> bool {
    let (expected_from, expected_to) = expected_parties(kind);
    from.label() == expected_from && to.label() == expected_to
}

/// An immutable record of one resource movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position in the ledger.
    pub seq: u64,
    /// Tick the movement happened in.
    pub tick: u64,
    /// Movement category.
    pub kind: EntryKind,
    /// Resource moved.
    pub resource: ResourceId,
    /// Exact quantity moved; always positive.
    pub quantity: Decimal,
    /// Debited party.
    pub from: Party,
    /// Credited party.
    pub to: Party,
}

// ---------------------------------------------------------------------------
// Transaction builder
// ---------------------------------------------------------------------------

/// Builder for validated [`LedgerEntry`] values.
#[derive(Debug)]
pub struct TransactionBuilder {
    tick: u64,
    kind: EntryKind,
    resource: ResourceId,
    from: Option<Party>,
    to: Option<Party>,
    quantity: Option<Decimal>,
}

impl TransactionBuilder {
    /// Start building an entry for the given tick, kind and resource.
    pub const fn new(tick: u64, kind: EntryKind, resource: ResourceId) -> Self {
        Self {
            tick,
            kind,
            resource,
            from: None,
            to: None,
            quantity: None,
        }
    }

    /// Set the debited party.
    #[must_use]
    pub const fn from(mut self, party: Party) -> Self {
        self.from = Some(party);
        self
    }

    /// Set the credited party.
    #[must_use]
    pub const fn to(mut self, party: Party) -> Self {
        self.to = Some(party);
        self
    }

    /// Set the exact quantity.
    #[must_use]
    pub const fn quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Set the quantity from a simulation float, rounded to six decimals.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NonFiniteQuantity`] for NaN or infinities.
    pub fn quantity_f32(self, quantity: f32) -> Result<Self, LedgerError> {
        let exact = Decimal::from_f32_retain(quantity)
            .ok_or(LedgerError::NonFiniteQuantity)?
            .round_dp(6);
        Ok(self.quantity(exact))
    }

    /// Validate and produce the entry with sequence number `seq`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingField`] for unset parties or quantity,
    /// [`LedgerError::ZeroQuantity`] / [`LedgerError::NegativeQuantity`]
    /// for non-positive quantities, and [`LedgerError::InvalidParty`] when
    /// the parties do not match the entry kind.
    pub fn build(self, seq: u64) -> Result<LedgerEntry, LedgerError> {
        let quantity = self.quantity.ok_or(LedgerError::MissingField("quantity"))?;
        let from = self.from.ok_or(LedgerError::MissingField("from"))?;
        let to = self.to.ok_or(LedgerError::MissingField("to"))?;

        if quantity.is_zero() {
            return Err(LedgerError::ZeroQuantity);
        }
        if quantity.is_sign_negative() {
            return Err(LedgerError::NegativeQuantity { quantity });
        }

        let (expected_from, expected_to) = expected_parties(self.kind);
        if from.label() != expected_from {
            return Err(LedgerError::InvalidParty {
                kind: self.kind,
                side: "from",
                expected: expected_from,
                actual: from.label(),
            });
        }
        if to.label() != expected_to {
            return Err(LedgerError::InvalidParty {
                kind: self.kind,
                side: "to",
                expected: expected_to,
                actual: to.label(),
            });
        }

        Ok(LedgerEntry {
            seq,
            tick: self.tick,
            kind: self.kind,
            resource: self.resource,
            quantity,
            from,
            to,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> ResourceId {
        ResourceId::from("water")
    }

    #[test]
    fn builder_produces_valid_trade() {
        let result = TransactionBuilder::new(1, EntryKind::Trade, water())
            .from(Party::Agent(AgentId::new(1)))
            .to(Party::Agent(AgentId::new(2)))
            .quantity(Decimal::new(2, 0))
            .build(0);
        assert!(result.is_ok());
        if let Ok(entry) = result {
            assert_eq!(entry.tick, 1);
            assert_eq!(entry.kind, EntryKind::Trade);
            assert_eq!(entry.quantity, Decimal::new(2, 0));
        }
    }

    #[test]
    fn zero_quantity_rejected() {
        let result = TransactionBuilder::new(1, EntryKind::Consume, water())
            .from(Party::Agent(AgentId::new(1)))
            .to(Party::Void)
            .quantity(Decimal::ZERO)
            .build(0);
        assert!(matches!(result, Err(LedgerError::ZeroQuantity)));
    }

    #[test]
    fn negative_quantity_rejected() {
        let result = TransactionBuilder::new(1, EntryKind::Consume, water())
            .from(Party::Agent(AgentId::new(1)))
            .to(Party::Void)
            .quantity(Decimal::new(-3, 0))
            .build(0);
        assert!(matches!(result, Err(LedgerError::NegativeQuantity { .. })));
    }

    #[test]
    fn wrong_party_rejected() {
        let result = TransactionBuilder::new(1, EntryKind::PoolDraw, water())
            .from(Party::Agent(AgentId::new(1)))
            .to(Party::Void)
            .quantity(Decimal::ONE)
            .build(0);
        assert!(matches!(
            result,
            Err(LedgerError::InvalidParty { side: "from", .. })
        ));
    }

    #[test]
    fn missing_parties_rejected() {
        let result = TransactionBuilder::new(1, EntryKind::Trade, water())
            .quantity(Decimal::ONE)
            .build(0);
        assert!(matches!(result, Err(LedgerError::MissingField("from"))));
    }

    #[test]
    fn float_quantity_is_rounded() {
        let builder = TransactionBuilder::new(1, EntryKind::Consume, water())
            .from(Party::Agent(AgentId::new(1)))
            .to(Party::Void)
            .quantity_f32(0.1);
        assert!(builder.is_ok());
        if let Ok(builder) = builder {
            let entry = builder.build(0);
            assert!(matches!(entry, Ok(ref e) if e.quantity == Decimal::new(1, 1)));
        }
        let nan = TransactionBuilder::new(1, EntryKind::Consume, water()).quantity_f32(f32::NAN);
        assert!(matches!(nan, Err(LedgerError::NonFiniteQuantity)));
    }

    #[test]
    fn all_kinds_have_party_contracts() {
        for kind in [EntryKind::Trade, EntryKind::Consume, EntryKind::PoolDraw] {
            let (from, to) = expected_parties(kind);
            assert!(!from.is_empty(), "{kind:?} has no from party");
            assert!(!to.is_empty(), "{kind:?} has no to party");
        }
    }
}
