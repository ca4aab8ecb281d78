//! Experiment fact records (join output)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Assignment, Outcome};

/// One row of the `experiment_facts` relation.
///
/// The assignment side is always present; the outcome side is `None` when
/// the assignment had no matching outcome. Multiple matches on the same key
/// produce multiple fact rows (fan-out is preserved, not deduplicated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentFact {
    /// Subject identifier (from the assignment)
    pub user_id: i64,
    /// Experiment identifier (from the assignment)
    pub experiment_id: String,
    /// Treatment arm label (from the assignment)
    pub variant: Option<String>,
    /// Whether the subject converted, if an outcome matched
    pub conversion: Option<bool>,
    /// Attributed revenue, if an outcome matched
    pub revenue: Option<f64>,
    /// Pre-experiment covariate, if an outcome matched
    pub pre_metric: Option<f64>,
    /// Outcome event timestamp, if an outcome matched
    pub event_ts: Option<DateTime<Utc>>,
}

impl ExperimentFact {
    /// Fact row for an assignment with no matching outcome.
    #[must_use]
    pub fn unmatched(assignment: &Assignment) -> Self {
        Self {
            user_id: assignment.user_id,
            experiment_id: assignment.experiment_id.clone(),
            variant: assignment.variant.clone(),
            conversion: None,
            revenue: None,
            pre_metric: None,
            event_ts: None,
        }
    }

    /// Fact row merging an assignment with one matching outcome.
    #[must_use]
    pub fn matched(assignment: &Assignment, outcome: &Outcome) -> Self {
        Self {
            user_id: assignment.user_id,
            experiment_id: assignment.experiment_id.clone(),
            variant: assignment.variant.clone(),
            conversion: Some(outcome.conversion),
            revenue: Some(outcome.revenue),
            pre_metric: Some(outcome.pre_metric),
            event_ts: Some(outcome.event_ts),
        }
    }

    /// Compound key `(user_id, experiment_id)`.
    #[must_use]
    pub fn key(&self) -> (i64, &str) {
        (self.user_id, self.experiment_id.as_str())
    }
}

/// Sort facts by `(user_id, experiment_id)` for order-insensitive
/// comparison. The join itself imposes no output ordering.
pub fn sort_by_key(facts: &mut [ExperimentFact]) {
    facts.sort_by(|a, b| {
        a.user_id
            .cmp(&b.user_id)
            .then_with(|| a.experiment_id.cmp(&b.experiment_id))
    });
}
