//! Retry bookkeeping for failed intents.
//!
//! A failure either drops the intent (retry budget exhausted) or pushes its
//! next attempt into the future by a linearly growing, capped delay plus a
//! jitter drawn from the agent's own random stream.

use hearth_types::Intent;

use crate::config::TradePolicy;
use crate::rng::AgentRng;

/// What happens to an intent after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryDecision {
    /// The intent stays queued and becomes ready again at `next_attempt_time`.
    Retry {
        /// Simulated time of the next allowed attempt.
        next_attempt_time: f64,
        /// Delay that was applied, jitter included.
        backoff: f64,
    },
    /// The retry budget is exhausted; the caller removes the intent.
    Drop {
        /// Failed attempts including this one.
        attempts: u32,
    },
}

/// Record a failed attempt on `intent` at `now`.
///
/// On [`RetryDecision::Retry`] the intent's attempt counter and timers are
/// updated in place. On [`RetryDecision::Drop`] the intent is left untouched.
pub fn register_failure(
    intent: &mut Intent,
    policy: &TradePolicy,
    rng: &mut AgentRng,
    now: f64,
) -> RetryDecision {
    let attempts = intent.attempt_count.saturating_add(1);
    if policy.attempts_exhausted(attempts) {
        return RetryDecision::Drop { attempts };
    }

    let jitter = policy.backoff_jitter_hours * rng.unit_f64();
    let backoff = policy.backoff_for_attempt(intent.attempt_count) + jitter;

    intent.attempt_count = attempts;
    intent.last_attempt_time = Some(now);
    intent.next_attempt_time = now + backoff;

    RetryDecision::Retry {
        next_attempt_time: intent.next_attempt_time,
        backoff,
    }
}

#[cfg(test)]
mod tests {
    use hearth_types::{IntentId, NeedId, ResourceId};

    use super::*;

    fn intent() -> Intent {
        Intent {
            id: IntentId::new(0),
            need_id: NeedId::from("thirst"),
            resource_id: ResourceId::from("water"),
            desired_amount: 1.0,
            urgency: 0.9,
            attempt_count: 0,
            last_attempt_time: None,
            next_attempt_time: 0.0,
        }
    }

    #[test]
    fn delays_are_bounded_and_deterministic_part_grows() {
        let policy = TradePolicy {
            max_attempts: 0,
            ..TradePolicy::default()
        };
        let mut rng = AgentRng::from_seed(9);
        let mut intent = intent();
        let mut previous_floor = 0.0;
        for round in 0..20_u32 {
            let floor = policy.backoff_for_attempt(round);
            assert!(floor >= previous_floor);
            previous_floor = floor;

            let decision = register_failure(&mut intent, &policy, &mut rng, 10.0);
            assert!(matches!(decision, RetryDecision::Retry { .. }));
            if let RetryDecision::Retry {
                backoff,
                next_attempt_time,
            } = decision
            {
                assert!(backoff >= floor);
                assert!(backoff <= policy.backoff_max_hours + policy.backoff_jitter_hours);
                assert!((next_attempt_time - (10.0 + backoff)).abs() < 1e-9);
            }
        }
        assert_eq!(intent.attempt_count, 20);
    }

    #[test]
    fn drops_once_budget_is_exceeded() {
        let policy = TradePolicy {
            max_attempts: 2,
            ..TradePolicy::default()
        };
        let mut rng = AgentRng::from_seed(1);
        let mut intent = intent();
        assert!(matches!(
            register_failure(&mut intent, &policy, &mut rng, 0.0),
            RetryDecision::Retry { .. }
        ));
        assert!(matches!(
            register_failure(&mut intent, &policy, &mut rng, 1.0),
            RetryDecision::Retry { .. }
        ));
        assert_eq!(
            register_failure(&mut intent, &policy, &mut rng, 2.0),
            RetryDecision::Drop { attempts: 3 }
        );
        assert_eq!(intent.attempt_count, 2);
    }

    #[test]
    fn intent_is_not_ready_before_next_attempt() {
        let policy = TradePolicy {
            backoff_jitter_hours: 0.0,
            ..TradePolicy::default()
        };
        let mut rng = AgentRng::from_seed(3);
        let mut intent = intent();
        register_failure(&mut intent, &policy, &mut rng, 4.0);
        assert!(!intent.is_ready(4.2));
        assert!(intent.is_ready(4.25));
    }
}
