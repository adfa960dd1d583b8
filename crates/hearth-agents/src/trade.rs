//! Trade execution: acceptance roll, transfer computation, and the ledger
//! and need updates that follow.
//!
//! These functions are stateless; they operate on the two agents involved
//! and never look at queues, locks or navigation. The negotiation core in
//! `hearth-core` decides *when* a trade may run, this module decides *what*
//! happens when it does.
//!
//! Two entry points exist:
//!
//! - [`execute_trade`] is used by the active request path and never touches
//!   affinity.
//! - [`ambient_trade`] is used for rule-triggered trades and applies a
//!   symmetric affinity delta to both parties afterwards.

use hearth_types::{AMOUNT_EPSILON, ResolvedNeed, clamp_finite};
use tracing::debug;

use crate::agent::Agent;
use crate::config::TradePolicy;
use crate::inventory::ResourceLedger;
use crate::needs::NeedLedger;
use crate::social::AffinityDefaults;

/// Result of one trade execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TradeOutcome {
    /// Resources changed hands.
    Success {
        /// Amount moved from the provider.
        amount: f32,
        /// How far the requester's need value dropped.
        need_reduction: f32,
    },
    /// The provider declined.
    Rejected {
        /// Value drawn from the requester's stream.
        roll: f32,
        /// Acceptance probability the roll was compared against.
        acceptance: f32,
    },
    /// The provider had nothing to give.
    NoResource,
}

impl TradeOutcome {
    /// Whether resources changed hands.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Realized transfer amount (0 unless successful).
    pub const fn amount(&self) -> f32 {
        match self {
            Self::Success { amount, .. } => *amount,
            Self::Rejected { .. } | Self::NoResource => 0.0,
        }
    }
}

/// Probability that a provider holding `affinity` toward the requester
/// accepts: `saturate(base + affinity * weight)`.
pub fn acceptance_probability(policy: &TradePolicy, affinity: f32) -> f32 {
    clamp_finite(
        policy.base_acceptance + affinity * policy.affinity_weight,
        0.0,
        1.0,
    )
}

/// Amount to move given what the provider holds, what is still needed and
/// the provider's preference multiplier.
///
/// `min(available, remaining * multiplier)`, further capped at `remaining`
/// when `clamp_to_need` is set. Never negative.
pub fn compute_transfer(available: f32, remaining: f32, multiplier: f32, clamp_to_need: bool) -> f32 {
    let available = available.max(0.0);
    let remaining = remaining.max(0.0);
    let desired = (remaining * multiplier).max(0.0);
    let mut amount = available.min(desired);
    if clamp_to_need {
        amount = amount.min(remaining);
    }
    if amount.is_finite() { amount } else { 0.0 }
}

/// Execute a trade from `provider` to `requester` for up to `remaining`
/// units of the resolved resource.
///
/// One value is drawn from the requester's random stream when the provider
/// has stock; no draw happens otherwise.
pub fn execute_trade(
    requester: &mut Agent,
    provider: &mut Agent,
    resolved: &ResolvedNeed,
    remaining: f32,
    policy: &TradePolicy,
    defaults: &AffinityDefaults,
) -> TradeOutcome {
    let available = provider.resources.amount(&resolved.resource_id);
    if available <= AMOUNT_EPSILON {
        return TradeOutcome::NoResource;
    }

    let affinity = provider.affinity_toward(requester, defaults);
    let acceptance = acceptance_probability(policy, affinity);
    let roll = requester.rng.unit();
    if roll > acceptance {
        debug!(
            requester = %requester.id,
            provider = %provider.id,
            roll,
            acceptance,
            "Trade rejected"
        );
        return TradeOutcome::Rejected { roll, acceptance };
    }

    let multiplier = provider.preference.multiplier(affinity);
    let amount = compute_transfer(available, remaining, multiplier, policy.clamp_to_need);
    if amount <= AMOUNT_EPSILON {
        return TradeOutcome::NoResource;
    }

    let moved = provider.resources.take(&resolved.resource_id, amount);
    if !policy.consume_on_resolve {
        requester.resources.add(&resolved.resource_id, moved);
    }
    let need_reduction = apply_satisfaction(&mut requester.needs, resolved, moved);

    debug!(
        requester = %requester.id,
        provider = %provider.id,
        resource = %resolved.resource_id,
        amount = moved,
        need_reduction,
        "Trade executed"
    );

    TradeOutcome::Success {
        amount: moved,
        need_reduction,
    }
}

/// Execute a rule-triggered trade and shift both parties' affinity toward
/// each other by the policy's success or failure delta.
pub fn ambient_trade(
    requester: &mut Agent,
    provider: &mut Agent,
    resolved: &ResolvedNeed,
    remaining: f32,
    policy: &TradePolicy,
    defaults: &AffinityDefaults,
    now: f64,
) -> TradeOutcome {
    let outcome = execute_trade(requester, provider, resolved, remaining, policy, defaults);
    let delta = if outcome.is_success() {
        policy.ambient_success_delta
    } else {
        policy.ambient_failure_delta
    };

    let requester_base = requester.affinity_toward(provider, defaults);
    let provider_base = provider.affinity_toward(requester, defaults);
    requester
        .affinity
        .apply_delta(provider.id, requester_base, delta, now);
    provider
        .affinity
        .apply_delta(requester.id, provider_base, delta, now);

    outcome
}

/// Consume up to `remaining` units of the resolved resource from `stock`
/// and apply the satisfaction to `needs`. Returns the amount consumed.
///
/// Used for both the agent's own inventory and its society's pool.
pub fn satisfy_from_stock(
    stock: &mut ResourceLedger,
    needs: &mut NeedLedger,
    resolved: &ResolvedNeed,
    remaining: f32,
) -> f32 {
    if remaining <= AMOUNT_EPSILON || !stock.has_positive(&resolved.resource_id) {
        return 0.0;
    }
    let taken = stock.take(&resolved.resource_id, remaining);
    apply_satisfaction(needs, resolved, taken);
    taken
}

/// Lower the resolved need by `amount * satisfaction_per_unit`. Returns how
/// far the need value actually dropped.
fn apply_satisfaction(needs: &mut NeedLedger, resolved: &ResolvedNeed, amount: f32) -> f32 {
    let Some(before) = needs.get(&resolved.need_id).map(|n| n.value) else {
        return 0.0;
    };
    let after = needs
        .satisfy(&resolved.need_id, amount * resolved.satisfaction_per_unit)
        .unwrap_or(before);
    (before - after).max(0.0)
}
