//! Fact builder: left outer hash equi-join of assignments to outcomes

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use super::{Assignment, ExperimentFact, Outcome};

/// Left outer equi-join of `assignments` to `outcomes` on
/// `(user_id, experiment_id)`.
///
/// The outcome side is buffered into a keyed hash table (it is the
/// looked-up side), then assignments stream through in order:
///
/// - zero matches: one fact row with all outcome fields `None`
/// - one match: one merged fact row
/// - N matches: N fact rows, one per match (fan-out)
///
/// Assignment rows are never dropped, and outcome keys absent from the
/// assignment set never produce rows. Key collisions on the outcome side
/// are a data-quality concern upstream; they are logged and preserved
/// exactly, never deduplicated.
///
/// Equality on already-typed keys is total, so the join itself cannot
/// fail; type errors surface in the normalizers, before this runs.
#[must_use]
pub fn build_facts(assignments: &[Assignment], outcomes: &[Outcome]) -> Vec<ExperimentFact> {
    let mut by_key: FxHashMap<(i64, &str), Vec<&Outcome>> = FxHashMap::default();
    for outcome in outcomes {
        by_key.entry(outcome.key()).or_default().push(outcome);
    }

    let collisions = by_key.values().filter(|v| v.len() > 1).count();
    if collisions > 0 {
        warn!(
            collisions,
            "outcome key collisions detected; join will fan out"
        );
    }

    let mut facts = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        match by_key.get(&assignment.key()) {
            None => facts.push(ExperimentFact::unmatched(assignment)),
            Some(matches) => {
                for outcome in matches {
                    facts.push(ExperimentFact::matched(assignment, outcome));
                }
            }
        }
    }

    debug!(
        assignments = assignments.len(),
        outcomes = outcomes.len(),
        facts = facts.len(),
        "built experiment facts"
    );
    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn assignment(user_id: i64, experiment_id: &str, variant: &str) -> Assignment {
        Assignment {
            user_id,
            experiment_id: experiment_id.to_string(),
            variant: Some(variant.to_string()),
            assigned_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            platform: None,
            acquisition_channel: None,
        }
    }

    fn outcome(user_id: i64, experiment_id: &str, conversion: bool) -> Outcome {
        Outcome {
            user_id,
            experiment_id: experiment_id.to_string(),
            conversion,
            revenue: if conversion { 18.0 } else { 0.0 },
            pre_metric: 10.0,
            event_ts: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
            event_date: None,
            trial_start: None,
            trial_start_at: None,
            paid_subscriber: None,
            paid_at: None,
            refund_in_first_cycle: None,
            early_churn_30d: None,
            time_to_subscribe_days: None,
            pre_engagement_30d: None,
        }
    }

    #[test]
    fn test_no_match_emits_single_null_row() {
        let facts = build_facts(&[assignment(2, "e1", "b")], &[]);
        assert_eq!(facts.len(), 1);
        let f = &facts[0];
        assert_eq!(f.user_id, 2);
        assert_eq!(f.variant.as_deref(), Some("b"));
        assert_eq!(f.conversion, None);
        assert_eq!(f.revenue, None);
        assert_eq!(f.pre_metric, None);
        assert_eq!(f.event_ts, None);
    }

    #[test]
    fn test_single_match_merges_both_sides() {
        let facts = build_facts(&[assignment(1, "e1", "a")], &[outcome(1, "e1", true)]);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].conversion, Some(true));
        assert_eq!(facts[0].revenue, Some(18.0));
        assert_eq!(facts[0].variant.as_deref(), Some("a"));
    }

    #[test]
    fn test_fan_out_one_row_per_matching_outcome() {
        let facts = build_facts(
            &[assignment(1, "e1", "a")],
            &[outcome(1, "e1", true), outcome(1, "e1", false)],
        );
        assert_eq!(facts.len(), 2);
        assert!(facts.iter().all(|f| f.variant.as_deref() == Some("a")));
        let conversions: Vec<_> = facts.iter().map(|f| f.conversion).collect();
        assert!(conversions.contains(&Some(true)));
        assert!(conversions.contains(&Some(false)));
    }

    #[test]
    fn test_right_side_never_drives_rows() {
        let facts = build_facts(&[assignment(1, "e1", "a")], &[outcome(99, "e1", true)]);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].user_id, 1);
        assert_eq!(facts[0].conversion, None);
    }

    #[test]
    fn test_key_matches_on_both_columns() {
        // Same user, different experiment: no match.
        let facts = build_facts(&[assignment(1, "e2", "a")], &[outcome(1, "e1", true)]);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].conversion, None);
    }

    #[test]
    fn test_assignment_order_preserved() {
        let assignments = vec![
            assignment(3, "e1", "a"),
            assignment(1, "e1", "b"),
            assignment(2, "e1", "a"),
        ];
        let facts = build_facts(&assignments, &[]);
        let ids: Vec<i64> = facts.iter().map(|f| f.user_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
