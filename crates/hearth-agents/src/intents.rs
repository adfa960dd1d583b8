//! The Intent Queue: pending goals to acquire resources for needs.
//!
//! Intents are raised when a need crosses its authored urgency threshold,
//! pruned when their need calms down or their data no longer resolves, and
//! selected one at a time for active pursuit. Selection is read-only and
//! deterministic: the ready intent with the highest current urgency wins,
//! ties go to the earliest inserted intent.

use hearth_types::{Intent, IntentId, NeedId, ResourceId};

use crate::needs::NeedLedger;
use crate::resolve::NeedSettings;

/// Per-agent ordered collection of pending intents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntentQueue {
    /// Intents in insertion order.
    intents: Vec<Intent>,
    /// Next intent identifier to hand out.
    next_id: u32,
    /// Needs whose intent was dropped; not raised again until they calm
    /// below their threshold.
    suppressed: Vec<NeedId>,
}

impl IntentQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            intents: Vec::new(),
            next_id: 0,
            suppressed: Vec::new(),
        }
    }

    /// Append a new intent that is ready immediately at `now`.
    pub fn push(
        &mut self,
        need_id: NeedId,
        resource_id: ResourceId,
        desired_amount: f32,
        urgency: f32,
        now: f64,
    ) -> IntentId {
        let id = IntentId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.intents.push(Intent {
            id,
            need_id,
            resource_id,
            desired_amount: desired_amount.max(0.0),
            urgency: urgency.clamp(0.0, 1.0),
            attempt_count: 0,
            last_attempt_time: None,
            next_attempt_time: now,
        });
        id
    }

    /// Look up an intent.
    pub fn get(&self, id: IntentId) -> Option<&Intent> {
        self.intents.iter().find(|i| i.id == id)
    }

    /// Look up an intent mutably.
    pub fn get_mut(&mut self, id: IntentId) -> Option<&mut Intent> {
        self.intents.iter_mut().find(|i| i.id == id)
    }

    /// Remove an intent, returning it if it existed.
    pub fn remove(&mut self, id: IntentId) -> Option<Intent> {
        let pos = self.intents.iter().position(|i| i.id == id)?;
        Some(self.intents.remove(pos))
    }

    /// Whether an intent for `need_id` is pending.
    pub fn contains_need(&self, need_id: &NeedId) -> bool {
        self.intents.iter().any(|i| &i.need_id == need_id)
    }

    /// Keep `need_id` from raising a new intent until its urgency falls
    /// below the setting's threshold again.
    pub fn suppress(&mut self, need_id: NeedId) {
        if !self.is_suppressed(&need_id) {
            self.suppressed.push(need_id);
        }
    }

    /// Whether `need_id` is held back after a dropped intent.
    pub fn is_suppressed(&self, need_id: &NeedId) -> bool {
        self.suppressed.contains(need_id)
    }

    /// Iterate over intents in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Intent> {
        self.intents.iter()
    }

    /// Number of pending intents.
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    /// Whether no intents are pending.
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Raise an intent for every need at or above its setting's threshold
    /// that has no pending intent yet. Returns the new intent ids.
    ///
    /// Needs whose setting cannot be resolved to a resource are skipped, as
    /// are suppressed needs. A suppressed need below its threshold is
    /// released so its next crossing raises again.
    pub fn raise_from_needs(
        &mut self,
        needs: &NeedLedger,
        settings: &NeedSettings,
        now: f64,
    ) -> Vec<IntentId> {
        let mut raised = Vec::new();
        for setting in settings.iter() {
            let Some(need) = needs.get(&setting.need_id) else {
                continue;
            };
            let urgency = need.urgency();
            if urgency < setting.intent_threshold {
                self.suppressed.retain(|n| n != &setting.need_id);
                continue;
            }
            if self.contains_need(&setting.need_id) || self.is_suppressed(&setting.need_id) {
                continue;
            }
            let Some(resolved) = settings.resolve(&setting.need_id, &setting.resource_id) else {
                continue;
            };
            raised.push(self.push(
                setting.need_id.clone(),
                resolved.resource_id,
                resolved.request_amount,
                urgency,
                now,
            ));
        }
        raised
    }

    /// Remove intents whose need urgency is at or below `min_urgency_to_keep`
    /// or whose need/resource pair no longer resolves. Returns the removed
    /// intents in queue order.
    pub fn prune(
        &mut self,
        needs: &NeedLedger,
        settings: &NeedSettings,
        min_urgency_to_keep: f32,
    ) -> Vec<Intent> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.intents.len());
        for intent in self.intents.drain(..) {
            let resolvable = settings
                .resolve(&intent.need_id, &intent.resource_id)
                .is_some();
            if resolvable && current_urgency(&intent, needs) > min_urgency_to_keep {
                kept.push(intent);
            } else {
                removed.push(intent);
            }
        }
        self.intents = kept;
        removed
    }

    /// Select the ready intent with the highest current urgency.
    ///
    /// Ties keep the earliest inserted intent.
    pub fn select(&self, needs: &NeedLedger, now: f64) -> Option<IntentId> {
        let mut best: Option<(IntentId, f32)> = None;
        for intent in self.intents.iter().filter(|i| i.is_ready(now)) {
            let urgency = current_urgency(intent, needs);
            match best {
                Some((_, best_urgency)) if urgency <= best_urgency => {}
                _ => best = Some((intent.id, urgency)),
            }
        }
        best.map(|(id, _)| id)
    }
}

/// Urgency of an intent right now: the live urgency of its need when the
/// agent has that need, otherwise the urgency recorded at raise time.
pub fn current_urgency(intent: &Intent, needs: &NeedLedger) -> f32 {
    needs.urgency(&intent.need_id).unwrap_or(intent.urgency)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hearth_types::{Need, NeedSetting};

    use super::*;

    fn ledger(values: &[(&str, f32)]) -> NeedLedger {
        NeedLedger::from_needs(
            values
                .iter()
                .map(|(id, v)| Need::new(NeedId::from(*id), *v, 0.0, 1.0))
                .collect(),
        )
        .unwrap()
    }

    fn settings(pairs: &[(&str, &str)]) -> NeedSettings {
        NeedSettings::from_settings(
            pairs
                .iter()
                .map(|(need, resource)| NeedSetting {
                    need_id: NeedId::from(*need),
                    resource_id: ResourceId::from(*resource),
                    min: 0.0,
                    max: 1.0,
                    satisfaction_per_unit: 1.0,
                    request_amount: 2.0,
                    intent_threshold: 0.6,
                })
                .collect(),
        )
    }

    #[test]
    fn select_prefers_highest_urgency() {
        let needs = ledger(&[("hunger", 0.7), ("thirst", 0.9)]);
        let mut queue = IntentQueue::new();
        queue.push(NeedId::from("hunger"), ResourceId::from("bread"), 1.0, 0.7, 0.0);
        let thirst = queue.push(NeedId::from("thirst"), ResourceId::from("water"), 1.0, 0.9, 0.0);
        assert_eq!(queue.select(&needs, 0.0), Some(thirst));
    }

    #[test]
    fn select_ties_keep_first_inserted() {
        let needs = ledger(&[("hunger", 0.8), ("thirst", 0.8)]);
        let mut queue = IntentQueue::new();
        let first = queue.push(NeedId::from("hunger"), ResourceId::from("bread"), 1.0, 0.8, 0.0);
        queue.push(NeedId::from("thirst"), ResourceId::from("water"), 1.0, 0.8, 0.0);
        assert_eq!(queue.select(&needs, 0.0), Some(first));
    }

    #[test]
    fn select_uses_live_need_urgency() {
        let needs = ledger(&[("hunger", 0.95), ("thirst", 0.2)]);
        let mut queue = IntentQueue::new();
        queue.push(NeedId::from("thirst"), ResourceId::from("water"), 1.0, 0.99, 0.0);
        let hunger = queue.push(NeedId::from("hunger"), ResourceId::from("bread"), 1.0, 0.1, 0.0);
        assert_eq!(queue.select(&needs, 0.0), Some(hunger));
    }

    #[test]
    fn select_skips_intents_in_backoff() {
        let needs = ledger(&[("hunger", 0.9)]);
        let mut queue = IntentQueue::new();
        let id = queue.push(NeedId::from("hunger"), ResourceId::from("bread"), 1.0, 0.9, 0.0);
        queue.get_mut(id).unwrap().next_attempt_time = 5.0;
        assert_eq!(queue.select(&needs, 4.9), None);
        assert_eq!(queue.select(&needs, 5.0), Some(id));
    }

    #[test]
    fn prune_drops_calm_and_dangling_intents() {
        let needs = ledger(&[("hunger", 0.02), ("thirst", 0.9)]);
        let table = settings(&[("hunger", "bread"), ("thirst", "water")]);
        let mut queue = IntentQueue::new();
        queue.push(NeedId::from("hunger"), ResourceId::from("bread"), 1.0, 0.9, 0.0);
        let thirst = queue.push(NeedId::from("thirst"), ResourceId::empty(), 1.0, 0.9, 0.0);
        queue.push(NeedId::empty(), ResourceId::empty(), 1.0, 0.9, 0.0);
        let removed = queue.prune(&needs, &table, 0.05);
        assert_eq!(removed.len(), 2);
        assert_eq!(queue.len(), 1);
        assert!(queue.get(thirst).is_some());
    }

    #[test]
    fn raise_from_needs_respects_threshold_and_duplicates() {
        let needs = ledger(&[("hunger", 0.5), ("thirst", 0.8)]);
        let table = settings(&[("hunger", "bread"), ("thirst", "water")]);
        let mut queue = IntentQueue::new();
        let raised = queue.raise_from_needs(&needs, &table, 1.0);
        assert_eq!(raised.len(), 1);
        let intent = queue.get(*raised.first().unwrap()).unwrap();
        assert_eq!(intent.resource_id.as_str(), "water");
        assert!((intent.desired_amount - 2.0).abs() < f32::EPSILON);
        assert!(queue.raise_from_needs(&needs, &table, 2.0).is_empty());
    }

    #[test]
    fn suppressed_need_waits_for_a_fresh_crossing() {
        let table = settings(&[("thirst", "water")]);
        let mut queue = IntentQueue::new();
        queue.suppress(NeedId::from("thirst"));

        let urgent = ledger(&[("thirst", 0.9)]);
        assert!(queue.raise_from_needs(&urgent, &table, 1.0).is_empty());
        assert!(queue.is_suppressed(&NeedId::from("thirst")));

        let calm = ledger(&[("thirst", 0.3)]);
        assert!(queue.raise_from_needs(&calm, &table, 2.0).is_empty());
        assert!(!queue.is_suppressed(&NeedId::from("thirst")));

        assert_eq!(queue.raise_from_needs(&urgent, &table, 3.0).len(), 1);
    }
}
