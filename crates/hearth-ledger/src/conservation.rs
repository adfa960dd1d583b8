//! Conservation law verification for the transfer ledger.
//!
//! Trades move resources between agents without creating or destroying
//! them. Consumption and pool draws are sink flows: resources leave the
//! simulation to satisfy needs and do not need to balance.
//!
//! For each resource R in tick T, the check is:
//!
//! ```text
//! sum(trade debits from agents for R in T) == sum(trade credits to agents for R in T)
//! ```
//!
//! Entries built through the ledger balance by construction; the check
//! catches entries appended from outside with a broken party contract.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use hearth_types::ResourceId;

use crate::transaction::{EntryKind, LedgerEntry, Party, parties_valid};
use crate::LedgerAnomaly;

/// The result of a conservation check for a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConservationResult {
    /// The ledger is balanced for this tick.
    Balanced,
    /// One or more resources have imbalanced flows.
    Anomaly(LedgerAnomaly),
}

impl ConservationResult {
    /// Whether the tick balanced.
    pub const fn is_balanced(&self) -> bool {
        matches!(self, Self::Balanced)
    }
}

/// Verify the conservation law for all entries in a single tick.
pub fn verify_conservation(tick: u64, entries: &[LedgerEntry]) -> ConservationResult {
    let mut debits: BTreeMap<ResourceId, Decimal> = BTreeMap::new();
    let mut credits: BTreeMap<ResourceId, Decimal> = BTreeMap::new();

    for entry in entries.iter().filter(|e| e.tick == tick && e.kind == EntryKind::Trade) {
        if let Party::Agent(_) = entry.from {
            let d = debits.entry(entry.resource.clone()).or_insert(Decimal::ZERO);
            *d = match d.checked_add(entry.quantity) {
                Some(val) => val,
                None => return overflow_anomaly(tick, &entry.resource),
            };
        }
        if let Party::Agent(_) = entry.to {
            let c = credits.entry(entry.resource.clone()).or_insert(Decimal::ZERO);
            *c = match c.checked_add(entry.quantity) {
                Some(val) => val,
                None => return overflow_anomaly(tick, &entry.resource),
            };
        }
    }

    let all_resources: BTreeSet<&ResourceId> = debits.keys().chain(credits.keys()).collect();

    let mut imbalances: BTreeMap<ResourceId, (Decimal, Decimal)> = BTreeMap::new();
    for resource in all_resources {
        let total_debit = debits.get(resource).copied().unwrap_or(Decimal::ZERO);
        let total_credit = credits.get(resource).copied().unwrap_or(Decimal::ZERO);
        if total_debit != total_credit {
            imbalances.insert(resource.clone(), (total_debit, total_credit));
        }
    }

    if imbalances.is_empty() {
        ConservationResult::Balanced
    } else {
        let count = imbalances.len();
        ConservationResult::Anomaly(LedgerAnomaly {
            tick,
            imbalances,
            message: format!(
                "LEDGER_ANOMALY at tick {tick}: conservation law violated for {count} resource(s)",
            ),
        })
    }
}

/// Verify conservation and additionally check every entry of the tick for
/// a valid party contract and a positive quantity.
pub fn verify_conservation_strict(tick: u64, entries: &[LedgerEntry]) -> ConservationResult {
    let result = verify_conservation(tick, entries);
    if let ConservationResult::Anomaly(_) = &result {
        return result;
    }

    let mut imbalances: BTreeMap<ResourceId, (Decimal, Decimal)> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.tick == tick) {
        let positive = entry.quantity > Decimal::ZERO;
        if !positive || !parties_valid(entry.kind, entry.from, entry.to) {
            imbalances
                .entry(entry.resource.clone())
                .or_insert((entry.quantity, Decimal::ZERO));
        }
    }

    if imbalances.is_empty() {
        ConservationResult::Balanced
    } else {
        let count = imbalances.len();
        ConservationResult::Anomaly(LedgerAnomaly {
            tick,
            imbalances,
            message: format!(
                "LEDGER_ANOMALY at tick {tick}: malformed entries for {count} resource(s)",
            ),
        })
    }
}

/// Construct an anomaly result for arithmetic overflow during summation.
fn overflow_anomaly(tick: u64, resource: &ResourceId) -> ConservationResult {
    let mut imbalances = BTreeMap::new();
    imbalances.insert(resource.clone(), (Decimal::ZERO, Decimal::ZERO));
    ConservationResult::Anomaly(LedgerAnomaly {
        tick,
        imbalances,
        message: format!("LEDGER_ANOMALY at tick {tick}: arithmetic overflow while summing {resource}"),
    })
}
