//! Assignment records and their normalizer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cast::{self, RawRow};
use crate::Result;

/// A canonically typed assignment row.
///
/// One row per `(user_id, experiment_id)` enrollment. `variant`,
/// `platform`, and `acquisition_channel` are lowercased at normalization
/// time; absent source values stay absent (no default arm is invented).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Subject identifier
    pub user_id: i64,
    /// Experiment the subject was enrolled in
    pub experiment_id: String,
    /// Treatment arm label, lowercased
    pub variant: Option<String>,
    /// Enrollment timestamp
    pub assigned_at: DateTime<Utc>,
    /// Client platform, lowercased
    pub platform: Option<String>,
    /// Acquisition channel, lowercased
    pub acquisition_channel: Option<String>,
}

impl Assignment {
    /// Cast a single raw seed row into a canonical assignment.
    ///
    /// # Errors
    /// `TypeMismatch` if `user_id` is non-numeric, `experiment_id` is
    /// missing, or `assigned_at` is unparseable.
    pub fn from_raw(row: &RawRow) -> Result<Self> {
        Ok(Self {
            user_id: cast::cast_i64("user_id", cast::required(row, "user_id", "i64")?)?,
            experiment_id: cast::cast_string(
                "experiment_id",
                cast::required(row, "experiment_id", "string")?,
            )?,
            variant: cast::cast_lower_string("variant", row.get("variant"))?,
            assigned_at: cast::cast_timestamp(
                "assigned_at",
                cast::required(row, "assigned_at", "timestamp")?,
            )?,
            platform: cast::cast_lower_string("platform", row.get("platform"))?,
            acquisition_channel: cast::cast_lower_string(
                "acquisition_channel",
                row.get("acquisition_channel"),
            )?,
        })
    }

    /// Compound join key `(user_id, experiment_id)`.
    #[must_use]
    pub fn key(&self) -> (i64, &str) {
        (self.user_id, self.experiment_id.as_str())
    }
}

/// Normalize a sequence of raw assignment rows.
///
/// Pure mapping: one canonical record per input row, input order preserved.
/// The first cast failure aborts the whole relation.
///
/// # Errors
/// Propagates the first `TypeMismatch` encountered.
pub fn normalize_assignments<'a, I>(rows: I) -> Result<Vec<Assignment>>
where
    I: IntoIterator<Item = &'a RawRow>,
{
    rows.into_iter().map(Assignment::from_raw).collect()
}
