//! Outcome records and their normalizer

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cast::{self, RawRow};
use crate::Result;

/// A canonically typed outcome row.
///
/// The fact-feeding group (`conversion`, `revenue`, `pre_metric`,
/// `event_ts`) is required on every row. The subscription-lifecycle group
/// is a later schema addition; sources that predate it simply omit the
/// columns, which normalizes to `None` (a PRESENT but malformed value is
/// still a hard error).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Subject identifier
    pub user_id: i64,
    /// Experiment the outcome belongs to
    pub experiment_id: String,
    /// Whether the subject converted
    pub conversion: bool,
    /// Revenue attributed to the outcome (0.0 for non-converters)
    pub revenue: f64,
    /// Pre-experiment covariate (CUPED)
    pub pre_metric: f64,
    /// Outcome event timestamp
    pub event_ts: DateTime<Utc>,
    /// Calendar date of the outcome event
    pub event_date: Option<NaiveDate>,
    /// Subject started a trial
    pub trial_start: Option<bool>,
    /// Trial start timestamp; empty-string source values normalize to `None`
    pub trial_start_at: Option<DateTime<Utc>>,
    /// Subject became a paid subscriber
    pub paid_subscriber: Option<bool>,
    /// Payment timestamp; empty-string source values normalize to `None`
    pub paid_at: Option<DateTime<Utc>>,
    /// Refund within the first billing cycle
    pub refund_in_first_cycle: Option<bool>,
    /// Churned within 30 days
    pub early_churn_30d: Option<bool>,
    /// Days from assignment to subscription
    pub time_to_subscribe_days: Option<f64>,
    /// Engagement events in the 30 days before assignment
    pub pre_engagement_30d: Option<i64>,
}

fn opt_bool(row: &RawRow, column: &str) -> Result<Option<bool>> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => cast::cast_bool(column, v).map(Some),
    }
}

fn opt_f64(row: &RawRow, column: &str) -> Result<Option<f64>> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => cast::cast_f64(column, v).map(Some),
    }
}

fn opt_i64(row: &RawRow, column: &str) -> Result<Option<i64>> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => cast::cast_i64(column, v).map(Some),
    }
}

fn opt_date(row: &RawRow, column: &str) -> Result<Option<NaiveDate>> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => cast::cast_date(column, v).map(Some),
    }
}

impl Outcome {
    /// Cast a single raw seed row into a canonical outcome.
    ///
    /// `trial_start_at` and `paid_at` go through the empty-string
    /// coalescing step: `""` is absent, `"not-a-date"` is an error.
    ///
    /// # Errors
    /// `TypeMismatch` on any unrecognized boolean encoding, non-numeric
    /// metric, or malformed (non-empty) timestamp.
    pub fn from_raw(row: &RawRow) -> Result<Self> {
        Ok(Self {
            user_id: cast::cast_i64("user_id", cast::required(row, "user_id", "i64")?)?,
            experiment_id: cast::cast_string(
                "experiment_id",
                cast::required(row, "experiment_id", "string")?,
            )?,
            conversion: cast::cast_bool(
                "conversion",
                cast::required(row, "conversion", "bool")?,
            )?,
            revenue: cast::cast_f64("revenue", cast::required(row, "revenue", "f64")?)?,
            pre_metric: cast::cast_f64("pre_metric", cast::required(row, "pre_metric", "f64")?)?,
            event_ts: cast::cast_timestamp(
                "event_ts",
                cast::required(row, "event_ts", "timestamp")?,
            )?,
            event_date: opt_date(row, "event_date")?,
            trial_start: opt_bool(row, "trial_start")?,
            trial_start_at: cast::empty_as_null("trial_start_at", row.get("trial_start_at"))?,
            paid_subscriber: opt_bool(row, "paid_subscriber")?,
            paid_at: cast::empty_as_null("paid_at", row.get("paid_at"))?,
            refund_in_first_cycle: opt_bool(row, "refund_in_first_cycle")?,
            early_churn_30d: opt_bool(row, "early_churn_30d")?,
            time_to_subscribe_days: opt_f64(row, "time_to_subscribe_days")?,
            pre_engagement_30d: opt_i64(row, "pre_engagement_30d")?,
        })
    }

    /// Compound join key `(user_id, experiment_id)`.
    #[must_use]
    pub fn key(&self) -> (i64, &str) {
        (self.user_id, self.experiment_id.as_str())
    }
}

/// Normalize a sequence of raw outcome rows.
///
/// Pure mapping: one canonical record per input row, input order preserved.
/// The first cast failure aborts the whole relation.
///
/// # Errors
/// Propagates the first `TypeMismatch` encountered.
pub fn normalize_outcomes<'a, I>(rows: I) -> Result<Vec<Outcome>>
where
    I: IntoIterator<Item = &'a RawRow>,
{
    rows.into_iter().map(Outcome::from_raw).collect()
}
