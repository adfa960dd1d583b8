//! Transfer ledger and conservation audit for the Hearth simulation.
//!
//! Every realized resource movement (trade, consumption, pool draw) is
//! recorded here with an exact [`Decimal`] quantity. The simulation itself
//! works in floats; the ledger is the audit trail that lets the tick driver
//! prove, tick by tick, that trades neither create nor destroy resources.
//!
//! # Architecture
//!
//! - [`ledger`] -- The [`Ledger`] struct: append-only log with recording methods.
//! - [`transaction`] -- Parties, entry kinds and the [`TransactionBuilder`].
//! - [`conservation`] -- Conservation law verification and anomaly detection.
//!
//! # Conservation Law
//!
//! For every tick T and every resource R:
//!
//! ```text
//! sum(trade debits for R in T) == sum(trade credits for R in T)
//! ```
//!
//! A violation produces a [`LedgerAnomaly`]. The ledger never panics; it
//! returns errors.
//!
//! | Kind | From (debit) | To (credit) |
//! |------|-------------|-------------|
//! | Trade | Agent | Agent |
//! | Consume | Agent | Void |
//! | `PoolDraw` | Pool | Void |

pub mod conservation;
pub mod ledger;
pub mod transaction;

// Re-export primary types at crate root.
pub use conservation::ConservationResult;
pub use ledger::Ledger;
pub use transaction::{EntryKind, LedgerEntry, Party, TransactionBuilder};

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use hearth_types::ResourceId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when recording ledger entries.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Quantity must be strictly positive.
    #[error("ledger entry quantity must be non-zero")]
    ZeroQuantity,

    /// Quantity must not be negative.
    #[error("ledger entry quantity must be positive, got {quantity}")]
    NegativeQuantity {
        /// The invalid quantity.
        quantity: Decimal,
    },

    /// A float quantity was NaN or infinite.
    #[error("ledger entry quantity is not finite")]
    NonFiniteQuantity,

    /// A required field was not set on the builder.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A party does not match the contract of the entry kind.
    #[error("invalid party for {kind:?} {side}: expected {expected}, got {actual}")]
    InvalidParty {
        /// The entry kind being validated.
        kind: EntryKind,
        /// Which side of the entry ("from" or "to").
        side: &'static str,
        /// The expected party label.
        expected: &'static str,
        /// The actual party label.
        actual: &'static str,
    },

    /// An internal error that should not occur in normal operation.
    #[error("internal ledger error: {0}")]
    InternalError(&'static str),
}

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// A conservation law violation detected during tick verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAnomaly {
    /// The tick where the anomaly was detected.
    pub tick: u64,
    /// Per-resource imbalance: (`debit_total`, `credit_total`).
    pub imbalances: BTreeMap<ResourceId, (Decimal, Decimal)>,
    /// Human-readable description of the anomaly.
    pub message: String,
}

impl core::fmt::Display for LedgerAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}
