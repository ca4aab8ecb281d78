//! Relation store (Arrow columnar boundary)
//!
//! Downstream consumers (notebooks, reporting) query relations by name:
//! `assignments` and `outcomes` (normalizer outputs) and
//! `experiment_facts` (fact builder output). Each materialization run
//! recomputes all three from the raw seeds and replaces the previous
//! contents wholesale; there are no incremental or upsert semantics.
//!
//! Publication is all-or-nothing: a normalization failure publishes
//! NOTHING, so a consumer can never observe facts built from a partially
//! typed input relation.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray,
    TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, Utc};
use parquet::arrow::ArrowWriter;
use tracing::{info, info_span};

use crate::cast::RawRow;
use crate::facts::{
    build_facts, normalize_assignments, normalize_outcomes, Assignment, ExperimentFact, Outcome,
};
use crate::{Error, Result};

/// Name of the canonical assignments relation.
pub const ASSIGNMENTS: &str = "assignments";
/// Name of the canonical outcomes relation.
pub const OUTCOMES: &str = "outcomes";
/// Name of the fact builder's output relation.
pub const EXPERIMENT_FACTS: &str = "experiment_facts";

/// Row counts from one materialization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializeSummary {
    /// Rows in the canonical assignments relation
    pub assignments: usize,
    /// Rows in the canonical outcomes relation
    pub outcomes: usize,
    /// Rows in the experiment facts relation
    pub facts: usize,
}

/// Named Arrow relations, replaced wholesale on each run.
#[derive(Debug, Default)]
pub struct RelationStore {
    relations: HashMap<String, RecordBatch>,
}

impl RelationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no relation has been materialized yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Look up a relation by name.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RecordBatch> {
        self.relations.get(name)
    }

    /// Names of the currently published relations.
    #[must_use]
    pub fn relation_names(&self) -> Vec<&str> {
        self.relations.keys().map(String::as_str).collect()
    }

    /// Run the full pipeline: normalize both seeds, build facts, publish
    /// all three relations atomically.
    ///
    /// On error nothing is published and any previously materialized
    /// relations are left untouched.
    ///
    /// # Errors
    /// Propagates the first normalization `TypeMismatch`, or an Arrow
    /// error from batch construction.
    pub fn materialize(
        &mut self,
        raw_assignments: &[RawRow],
        raw_outcomes: &[RawRow],
    ) -> Result<MaterializeSummary> {
        let span = info_span!("materialize");
        let _guard = span.enter();

        let assignments = normalize_assignments(raw_assignments)?;
        let outcomes = normalize_outcomes(raw_outcomes)?;
        let facts = build_facts(&assignments, &outcomes);

        let assignments_batch = assignments_to_batch(&assignments)?;
        let outcomes_batch = outcomes_to_batch(&outcomes)?;
        let facts_batch = facts_to_batch(&facts)?;

        // Everything succeeded; publish in one step.
        self.relations
            .insert(ASSIGNMENTS.to_string(), assignments_batch);
        self.relations.insert(OUTCOMES.to_string(), outcomes_batch);
        self.relations
            .insert(EXPERIMENT_FACTS.to_string(), facts_batch);

        let summary = MaterializeSummary {
            assignments: assignments.len(),
            outcomes: outcomes.len(),
            facts: facts.len(),
        };
        info!(
            assignments = summary.assignments,
            outcomes = summary.outcomes,
            facts = summary.facts,
            "materialized relations"
        );
        Ok(summary)
    }

    /// Export a relation to a Parquet file.
    ///
    /// # Errors
    /// `Storage` if the relation does not exist or the write fails.
    pub fn write_parquet<P: AsRef<Path>>(&self, name: &str, path: P) -> Result<()> {
        let batch = self
            .relation(name)
            .ok_or_else(|| Error::Storage(format!("no relation named '{name}'")))?;

        let file = File::create(path.as_ref())?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
            .map_err(|e| Error::Storage(format!("failed to create Parquet writer: {e}")))?;
        writer
            .write(batch)
            .map_err(|e| Error::Storage(format!("failed to write Parquet: {e}")))?;
        writer
            .close()
            .map_err(|e| Error::Storage(format!("failed to finish Parquet file: {e}")))?;
        Ok(())
    }
}

fn utc_timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
}

fn ts_micros(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

#[allow(clippy::cast_possible_truncation)]
fn date_days(d: NaiveDate) -> i32 {
    // NaiveDate::default() is the Unix epoch (1970-01-01), which is
    // exactly what Date32 counts days from.
    d.signed_duration_since(NaiveDate::default()).num_days() as i32
}

fn assignments_schema() -> Schema {
    Schema::new(vec![
        Field::new("user_id", DataType::Int64, false),
        Field::new("experiment_id", DataType::Utf8, false),
        Field::new("variant", DataType::Utf8, true),
        Field::new("assigned_at", utc_timestamp_type(), false),
        Field::new("platform", DataType::Utf8, true),
        Field::new("acquisition_channel", DataType::Utf8, true),
    ])
}

/// Convert canonical assignments into an Arrow record batch.
///
/// # Errors
/// Arrow error if a column length disagrees with the schema (cannot
/// happen for columns built here).
pub fn assignments_to_batch(rows: &[Assignment]) -> Result<RecordBatch> {
    let user_id = Int64Array::from(rows.iter().map(|r| r.user_id).collect::<Vec<_>>());
    let experiment_id = StringArray::from(
        rows.iter()
            .map(|r| r.experiment_id.clone())
            .collect::<Vec<_>>(),
    );
    let variant = StringArray::from(rows.iter().map(|r| r.variant.clone()).collect::<Vec<_>>());
    let assigned_at = TimestampMicrosecondArray::from(
        rows.iter().map(|r| ts_micros(&r.assigned_at)).collect::<Vec<_>>(),
    )
    .with_timezone("UTC");
    let platform = StringArray::from(rows.iter().map(|r| r.platform.clone()).collect::<Vec<_>>());
    let channel = StringArray::from(
        rows.iter()
            .map(|r| r.acquisition_channel.clone())
            .collect::<Vec<_>>(),
    );

    let columns: Vec<ArrayRef> = vec![
        Arc::new(user_id),
        Arc::new(experiment_id),
        Arc::new(variant),
        Arc::new(assigned_at),
        Arc::new(platform),
        Arc::new(channel),
    ];
    Ok(RecordBatch::try_new(Arc::new(assignments_schema()), columns)?)
}

fn outcomes_schema() -> Schema {
    Schema::new(vec![
        Field::new("user_id", DataType::Int64, false),
        Field::new("experiment_id", DataType::Utf8, false),
        Field::new("conversion", DataType::Boolean, false),
        Field::new("revenue", DataType::Float64, false),
        Field::new("pre_metric", DataType::Float64, false),
        Field::new("event_ts", utc_timestamp_type(), false),
        Field::new("event_date", DataType::Date32, true),
        Field::new("trial_start", DataType::Boolean, true),
        Field::new("trial_start_at", utc_timestamp_type(), true),
        Field::new("paid_subscriber", DataType::Boolean, true),
        Field::new("paid_at", utc_timestamp_type(), true),
        Field::new("refund_in_first_cycle", DataType::Boolean, true),
        Field::new("early_churn_30d", DataType::Boolean, true),
        Field::new("time_to_subscribe_days", DataType::Float64, true),
        Field::new("pre_engagement_30d", DataType::Int64, true),
    ])
}

/// Convert canonical outcomes into an Arrow record batch.
///
/// # Errors
/// Arrow error on schema/column disagreement (cannot happen for columns
/// built here).
pub fn outcomes_to_batch(rows: &[Outcome]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(
            rows.iter().map(|r| r.user_id).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            rows.iter()
                .map(|r| r.experiment_id.clone())
                .collect::<Vec<_>>(),
        )),
        Arc::new(BooleanArray::from(
            rows.iter().map(|r| r.conversion).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.revenue).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.pre_metric).collect::<Vec<_>>(),
        )),
        Arc::new(
            TimestampMicrosecondArray::from(
                rows.iter().map(|r| ts_micros(&r.event_ts)).collect::<Vec<_>>(),
            )
            .with_timezone("UTC"),
        ),
        Arc::new(Date32Array::from(
            rows.iter()
                .map(|r| r.event_date.map(date_days))
                .collect::<Vec<_>>(),
        )),
        Arc::new(BooleanArray::from(
            rows.iter().map(|r| r.trial_start).collect::<Vec<_>>(),
        )),
        Arc::new(
            TimestampMicrosecondArray::from(
                rows.iter()
                    .map(|r| r.trial_start_at.as_ref().map(ts_micros))
                    .collect::<Vec<_>>(),
            )
            .with_timezone("UTC"),
        ),
        Arc::new(BooleanArray::from(
            rows.iter().map(|r| r.paid_subscriber).collect::<Vec<_>>(),
        )),
        Arc::new(
            TimestampMicrosecondArray::from(
                rows.iter()
                    .map(|r| r.paid_at.as_ref().map(ts_micros))
                    .collect::<Vec<_>>(),
            )
            .with_timezone("UTC"),
        ),
        Arc::new(BooleanArray::from(
            rows.iter()
                .map(|r| r.refund_in_first_cycle)
                .collect::<Vec<_>>(),
        )),
        Arc::new(BooleanArray::from(
            rows.iter().map(|r| r.early_churn_30d).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            rows.iter()
                .map(|r| r.time_to_subscribe_days)
                .collect::<Vec<_>>(),
        )),
        Arc::new(Int64Array::from(
            rows.iter()
                .map(|r| r.pre_engagement_30d)
                .collect::<Vec<_>>(),
        )),
    ];
    Ok(RecordBatch::try_new(Arc::new(outcomes_schema()), columns)?)
}

fn facts_schema() -> Schema {
    Schema::new(vec![
        Field::new("user_id", DataType::Int64, false),
        Field::new("experiment_id", DataType::Utf8, false),
        Field::new("variant", DataType::Utf8, true),
        Field::new("conversion", DataType::Boolean, true),
        Field::new("revenue", DataType::Float64, true),
        Field::new("pre_metric", DataType::Float64, true),
        Field::new("event_ts", utc_timestamp_type(), true),
    ])
}

/// Convert experiment facts into an Arrow record batch.
///
/// # Errors
/// Arrow error on schema/column disagreement (cannot happen for columns
/// built here).
pub fn facts_to_batch(rows: &[ExperimentFact]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(
            rows.iter().map(|r| r.user_id).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            rows.iter()
                .map(|r| r.experiment_id.clone())
                .collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            rows.iter().map(|r| r.variant.clone()).collect::<Vec<_>>(),
        )),
        Arc::new(BooleanArray::from(
            rows.iter().map(|r| r.conversion).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.revenue).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.pre_metric).collect::<Vec<_>>(),
        )),
        Arc::new(
            TimestampMicrosecondArray::from(
                rows.iter()
                    .map(|r| r.event_ts.as_ref().map(ts_micros))
                    .collect::<Vec<_>>(),
            )
            .with_timezone("UTC"),
        ),
    ];
    Ok(RecordBatch::try_new(Arc::new(facts_schema()), columns)?)
}
