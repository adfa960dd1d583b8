//! The transfer ledger: an append-only log of realized resource movements.
//!
//! # Design
//!
//! - **Append-only**: entries are never modified. Whole ticks may be pruned
//!   from the front once they have been audited; sequence numbers keep
//!   counting across pruning.
//! - **Double-entry**: every movement names a debited and a credited party.
//! - **Exact**: quantities are [`Decimal`], rounded from the simulation's
//!   float amounts once, at recording time.

use rust_decimal::Decimal;

use hearth_types::{AgentId, ResourceId, SocietyId};

use crate::conservation::{ConservationResult, verify_conservation, verify_conservation_strict};
use crate::transaction::{EntryKind, LedgerEntry, Party, TransactionBuilder};
use crate::LedgerError;

/// The ledger of all realized transfers in a run.
#[derive(Debug, Default)]
pub struct Ledger {
    /// Retained entries, in insertion order.
    entries: Vec<LedgerEntry>,
    /// Sequence number of the next recorded entry.
    next_seq: u64,
}

impl Ledger {
    /// Create a new empty ledger.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    /// Number of retained entries.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger has no entries.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Append a pre-built entry (e.g. replayed from an export).
    pub fn append(&mut self, entry: LedgerEntry) {
        self.next_seq = self.next_seq.max(entry.seq.saturating_add(1));
        self.entries.push(entry);
    }

    /// Drop every entry recorded before `tick`. Returns how many were
    /// removed.
    pub fn prune_before(&mut self, tick: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.tick >= tick);
        before.saturating_sub(self.entries.len())
    }

    fn record(&mut self, builder: TransactionBuilder) -> Result<&LedgerEntry, LedgerError> {
        let entry = builder.build(self.next_seq)?;
        self.next_seq = self.next_seq.saturating_add(1);
        self.entries.push(entry);
        self.entries.last().ok_or(LedgerError::InternalError(
            "failed to retrieve entry after append",
        ))
    }

    /// Record a trade from `provider` to `requester`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the quantity is not positive and finite.
    pub fn record_trade(
        &mut self,
        tick: u64,
        resource: &ResourceId,
        quantity: f32,
        provider: AgentId,
        requester: AgentId,
    ) -> Result<&LedgerEntry, LedgerError> {
        let builder = TransactionBuilder::new(tick, EntryKind::Trade, resource.clone())
            .from(Party::Agent(provider))
            .to(Party::Agent(requester))
            .quantity_f32(quantity)?;
        self.record(builder)
    }

    /// Record `agent` consuming resources.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the quantity is not positive and finite.
    pub fn record_consumption(
        &mut self,
        tick: u64,
        resource: &ResourceId,
        quantity: f32,
        agent: AgentId,
    ) -> Result<&LedgerEntry, LedgerError> {
        let builder = TransactionBuilder::new(tick, EntryKind::Consume, resource.clone())
            .from(Party::Agent(agent))
            .to(Party::Void)
            .quantity_f32(quantity)?;
        self.record(builder)
    }

    /// Record a draw on `society`'s pool.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the quantity is not positive and finite.
    pub fn record_pool_draw(
        &mut self,
        tick: u64,
        resource: &ResourceId,
        quantity: f32,
        society: SocietyId,
    ) -> Result<&LedgerEntry, LedgerError> {
        let builder = TransactionBuilder::new(tick, EntryKind::PoolDraw, resource.clone())
            .from(Party::Pool(society))
            .to(Party::Void)
            .quantity_f32(quantity)?;
        self.record(builder)
    }

    /// Entries recorded in `tick`.
    pub fn entries_for_tick(&self, tick: u64) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(move |e| e.tick == tick)
    }

    /// Net change of `party`'s holding of `resource` across the retained
    /// entries: credits minus debits.
    pub fn net_flow(&self, party: Party, resource: &ResourceId) -> Decimal {
        self.entries
            .iter()
            .filter(|e| &e.resource == resource)
            .fold(Decimal::ZERO, |acc, e| {
                let mut net = acc;
                if e.to == party {
                    net = net.saturating_add(e.quantity);
                }
                if e.from == party {
                    net = net.saturating_sub(e.quantity);
                }
                net
            })
    }

    /// Total quantity of `kind` entries in `tick`.
    pub fn total_for_tick(&self, tick: u64, kind: EntryKind) -> Decimal {
        self.entries_for_tick(tick)
            .filter(|e| e.kind == kind)
            .fold(Decimal::ZERO, |acc, e| acc.saturating_add(e.quantity))
    }

    /// Check the conservation law for `tick`.
    pub fn verify_conservation(&self, tick: u64) -> ConservationResult {
        verify_conservation(tick, &self.entries)
    }

    /// Check the conservation law for `tick`, also validating every entry's
    /// party contract and sign.
    pub fn verify_conservation_strict(&self, tick: u64) -> ConservationResult {
        verify_conservation_strict(tick, &self.entries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn water() -> ResourceId {
        ResourceId::from("water")
    }

    #[test]
    fn trade_and_consumption_net_flows() {
        let mut ledger = Ledger::new();
        let provider = AgentId::new(0);
        let requester = AgentId::new(1);
        ledger.record_trade(3, &water(), 2.0, provider, requester).unwrap();
        ledger.record_consumption(3, &water(), 2.0, requester).unwrap();

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.net_flow(Party::Agent(provider), &water()), Decimal::new(-2, 0));
        assert_eq!(ledger.net_flow(Party::Agent(requester), &water()), Decimal::ZERO);
        assert_eq!(ledger.net_flow(Party::Void, &water()), Decimal::new(2, 0));
        assert_eq!(ledger.verify_conservation(3), ConservationResult::Balanced);
    }

    #[test]
    fn sequence_numbers_follow_insertion() {
        let mut ledger = Ledger::new();
        ledger.record_pool_draw(1, &water(), 1.0, SocietyId::new(0)).unwrap();
        ledger.record_pool_draw(1, &water(), 1.0, SocietyId::new(0)).unwrap();
        let seqs: Vec<u64> = ledger.entries().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
    }

    #[test]
    fn pruning_keeps_recent_ticks_and_sequence() {
        let mut ledger = Ledger::new();
        let provider = AgentId::new(0);
        let requester = AgentId::new(1);
        ledger.record_trade(1, &water(), 1.0, provider, requester).unwrap();
        ledger.record_consumption(1, &water(), 1.0, requester).unwrap();
        ledger.record_trade(2, &water(), 2.0, provider, requester).unwrap();

        assert_eq!(ledger.prune_before(2), 2);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.entries_for_tick(1).count(), 0);
        assert!(ledger.verify_conservation(2).is_balanced());

        let next = ledger.record_pool_draw(2, &water(), 1.0, SocietyId::new(0)).unwrap();
        assert_eq!(next.seq, 3);
        assert_eq!(ledger.prune_before(2), 0);
    }

    #[test]
    fn invalid_quantity_is_not_recorded() {
        let mut ledger = Ledger::new();
        assert!(ledger.record_trade(1, &water(), 0.0, AgentId::new(0), AgentId::new(1)).is_err());
        assert!(ledger.record_consumption(1, &water(), f32::INFINITY, AgentId::new(0)).is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn totals_by_tick_and_kind() {
        let mut ledger = Ledger::new();
        ledger.record_trade(1, &water(), 1.5, AgentId::new(0), AgentId::new(1)).unwrap();
        ledger.record_trade(2, &water(), 1.0, AgentId::new(0), AgentId::new(1)).unwrap();
        assert_eq!(ledger.total_for_tick(1, EntryKind::Trade), Decimal::new(15, 1));
        assert_eq!(ledger.total_for_tick(1, EntryKind::Consume), Decimal::ZERO);
    }
}
