//! Need resolution: turning an intent's abstract need/resource pair into
//! concrete bounds and rates.
//!
//! Lookup order:
//!
//! 1. A setting whose `need_id` matches the intent's need.
//! 2. Otherwise a setting whose `resource_id` matches the intent's resource.
//! 3. Otherwise, if the intent names a resource, a neutral default
//!    (min 0, max 1, one unit of need per unit of resource).
//!
//! Resolution fails when both ids are empty, or when no resource can be
//! derived from the intent or the matching setting. Malformed settings are
//! dropped at load time with a warning and never reach resolution.

use hearth_types::{NeedId, NeedSetting, ResolvedNeed, ResourceId};
use tracing::warn;

/// Need reduction per unit when no setting applies.
const NEUTRAL_SATISFACTION_PER_UNIT: f32 = 1.0;

/// Request amount when no setting applies.
const NEUTRAL_REQUEST_AMOUNT: f32 = 1.0;

/// Validated authored need settings of one agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeedSettings {
    /// Settings in authoring order.
    settings: Vec<NeedSetting>,
}

impl NeedSettings {
    /// Build the table, discarding settings that cannot be used.
    ///
    /// A setting is discarded if its need id is empty, any numeric field is
    /// not finite, or its satisfaction rate or request amount is negative.
    /// Swapped bounds are reordered.
    pub fn from_settings(settings: Vec<NeedSetting>) -> Self {
        let mut kept = Vec::with_capacity(settings.len());
        for mut setting in settings {
            if setting.need_id.is_empty() {
                warn!(resource = %setting.resource_id, "Dropping need setting without need id");
                continue;
            }
            let numbers = [
                setting.min,
                setting.max,
                setting.satisfaction_per_unit,
                setting.request_amount,
                setting.intent_threshold,
            ];
            if numbers.iter().any(|n| !n.is_finite())
                || setting.satisfaction_per_unit < 0.0
                || setting.request_amount < 0.0
            {
                warn!(need = %setting.need_id, "Dropping need setting with invalid numbers");
                continue;
            }
            if setting.min > setting.max {
                core::mem::swap(&mut setting.min, &mut setting.max);
            }
            kept.push(setting);
        }
        Self { settings: kept }
    }

    /// Resolve a need/resource pair. Returns `None` when unresolvable.
    pub fn resolve(&self, need_id: &NeedId, resource_id: &ResourceId) -> Option<ResolvedNeed> {
        if need_id.is_empty() && resource_id.is_empty() {
            return None;
        }

        let by_need = if need_id.is_empty() {
            None
        } else {
            self.settings.iter().find(|s| &s.need_id == need_id)
        };
        let setting = by_need.or_else(|| {
            if resource_id.is_empty() {
                None
            } else {
                self.settings.iter().find(|s| &s.resource_id == resource_id)
            }
        });

        match setting {
            Some(setting) => {
                let resource = if resource_id.is_empty() {
                    setting.resource_id.clone()
                } else {
                    resource_id.clone()
                };
                if resource.is_empty() {
                    return None;
                }
                Some(ResolvedNeed {
                    need_id: setting.need_id.clone(),
                    resource_id: resource,
                    min: setting.min,
                    max: setting.max,
                    satisfaction_per_unit: setting.satisfaction_per_unit,
                    request_amount: setting.request_amount,
                })
            }
            None if !resource_id.is_empty() => Some(ResolvedNeed {
                need_id: need_id.clone(),
                resource_id: resource_id.clone(),
                min: 0.0,
                max: 1.0,
                satisfaction_per_unit: NEUTRAL_SATISFACTION_PER_UNIT,
                request_amount: NEUTRAL_REQUEST_AMOUNT,
            }),
            None => None,
        }
    }

    /// Setting for a need, if authored.
    pub fn for_need(&self, need_id: &NeedId) -> Option<&NeedSetting> {
        self.settings.iter().find(|s| &s.need_id == need_id)
    }

    /// Iterate over settings in authoring order.
    pub fn iter(&self) -> impl Iterator<Item = &NeedSetting> {
        self.settings.iter()
    }
}
