//! Condition capability shared by every oradb resource
//!
//! Anything that reports Kubernetes-style conditions implements
//! [`HasConditions`]. Generic helpers such as
//! [`crate::kube_utils::wait_for_condition`] are written against the trait,
//! so new kinds only need an impl rather than a new match arm.

use crate::crd::{Condition, ConditionStatus};

/// A resource whose status carries a list of conditions
pub trait HasConditions {
    /// Current conditions, empty when the resource has no status yet
    fn conditions(&self) -> &[Condition];

    /// Look up a condition by type
    fn condition(&self, type_: &str) -> Option<&Condition> {
        find_condition(self.conditions(), type_)
    }

    /// True if the condition exists with status `True`
    fn is_condition_true(&self, type_: &str) -> bool {
        self.condition(type_)
            .is_some_and(|c| c.status == ConditionStatus::True)
    }
}

/// Find a condition by type
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Insert or replace a condition of the same type
///
/// `lastTransitionTime` is carried over from the existing entry when the
/// status does not change, so reason/message churn does not look like a
/// transition.
pub fn upsert_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time;
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}

/// True if the condition has the wanted status and, when given, reason
pub fn condition_matches(
    condition: Option<&Condition>,
    status: ConditionStatus,
    reason: Option<&str>,
) -> bool {
    match condition {
        Some(c) => c.status == status && reason.is_none_or(|r| c.reason == r),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::reasons;
    use chrono::{Duration, Utc};

    #[test]
    fn upsert_appends_new_types() {
        let mut conditions = Vec::new();
        upsert_condition(
            &mut conditions,
            Condition::ready(ConditionStatus::False, reasons::CREATE_PENDING, "waiting"),
        );
        upsert_condition(
            &mut conditions,
            Condition::new("Degraded", ConditionStatus::False, "Healthy", ""),
        );
        assert_eq!(conditions.len(), 2);
    }

    /// Story: a restore that moves from in-progress to failed keeps the
    /// original transition time because Ready stayed False throughout
    #[test]
    fn story_same_status_keeps_transition_time() {
        let mut first =
            Condition::ready(ConditionStatus::False, reasons::RESTORE_IN_PROGRESS, "");
        let then = Utc::now() - Duration::hours(1);
        first.last_transition_time = then;
        let mut conditions = vec![first];

        upsert_condition(
            &mut conditions,
            Condition::ready(ConditionStatus::False, reasons::RESTORE_FAILED, "boom"),
        );

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].reason, reasons::RESTORE_FAILED);
        assert_eq!(conditions[0].last_transition_time, then);
    }

    #[test]
    fn status_change_moves_transition_time() {
        let mut first = Condition::ready(ConditionStatus::False, reasons::CREATE_IN_PROGRESS, "");
        let then = Utc::now() - Duration::hours(1);
        first.last_transition_time = then;
        let mut conditions = vec![first];

        upsert_condition(
            &mut conditions,
            Condition::ready(ConditionStatus::True, reasons::CREATE_COMPLETE, ""),
        );

        assert!(conditions[0].last_transition_time > then);
    }

    #[test]
    fn matches_checks_status_and_optional_reason() {
        let c = Condition::ready(ConditionStatus::True, reasons::RESTORE_COMPLETE, "");
        assert!(condition_matches(Some(&c), ConditionStatus::True, None));
        assert!(condition_matches(
            Some(&c),
            ConditionStatus::True,
            Some(reasons::RESTORE_COMPLETE)
        ));
        assert!(!condition_matches(
            Some(&c),
            ConditionStatus::True,
            Some(reasons::CREATE_COMPLETE)
        ));
        assert!(!condition_matches(None, ConditionStatus::True, None));
    }
}
