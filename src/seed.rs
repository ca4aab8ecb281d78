//! Seed ingestion
//!
//! The raw sources (`assignments_seed.csv`, `outcomes_seed.csv`) are read
//! through Arrow's CSV reader with every column forced to Utf8, so the raw
//! relation stays loosely typed: "42" is still a string until the
//! normalizers cast it. Empty cells survive as empty strings, which is what
//! the `empty_as_null` coalescing rule keys on; missing columns simply do
//! not appear in the row.

use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, StringArray};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use tracing::debug;

use crate::cast::RawRow;
use crate::{Error, Result};

/// Load a seed CSV into raw, loosely-typed rows.
///
/// The header row supplies column names; every value is kept as a string.
///
/// # Errors
/// `Io` if the file cannot be opened, `Arrow`/`Storage` on malformed CSV.
pub fn load_seed_csv<P: AsRef<Path>>(path: P) -> Result<Vec<RawRow>> {
    let mut file = File::open(path.as_ref())?;

    // First pass only discovers column names; the type inference result
    // is discarded in favor of all-Utf8.
    let format = Format::default().with_header(true);
    let (inferred, _) = format
        .infer_schema(&mut file, Some(128))
        .map_err(|e| Error::Storage(format!("failed to read seed header: {e}")))?;
    file.rewind()?;

    let utf8_fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|f| Field::new(f.name(), DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(utf8_fields));

    let reader = ReaderBuilder::new(schema)
        .with_format(format)
        .build(file)
        .map_err(|e| Error::Storage(format!("failed to open seed CSV: {e}")))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| Error::Storage(format!("failed to read seed CSV: {e}")))?;
        rows.extend(raw_rows_from_batch(&batch)?);
    }
    debug!(path = %path.as_ref().display(), rows = rows.len(), "loaded seed");
    Ok(rows)
}

/// Convert an all-Utf8 record batch into raw rows.
///
/// Null cells are dropped from the row (absent), empty strings are kept
/// (they carry meaning for the nullable-timestamp coalescing rule).
///
/// # Errors
/// `Storage` if any column is not Utf8.
pub fn raw_rows_from_batch(batch: &RecordBatch) -> Result<Vec<RawRow>> {
    let schema = batch.schema();
    let mut columns = Vec::with_capacity(batch.num_columns());
    for (i, field) in schema.fields().iter().enumerate() {
        let array = batch
            .column(i)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                Error::Storage(format!(
                    "seed column '{}' is not Utf8; raw seeds must stay untyped",
                    field.name()
                ))
            })?;
        columns.push((field.name().clone(), array));
    }

    let mut rows = Vec::with_capacity(batch.num_rows());
    for row_idx in 0..batch.num_rows() {
        let mut row = RawRow::new();
        for (name, array) in &columns {
            if array.is_valid(row_idx) {
                row.insert(
                    name.clone(),
                    Value::String(array.value(row_idx).to_string()),
                );
            }
        }
        rows.push(row);
    }
    Ok(rows)
}
