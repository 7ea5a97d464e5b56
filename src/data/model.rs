use std::collections::BTreeSet;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::error::{PbpError, Result};
use crate::seasons::Season;

/// Column holding the season label of each play.
pub const SEASON_COLUMN: &str = "season";

// ---------------------------------------------------------------------------
// PlayByPlay – the complete fetched dataset
// ---------------------------------------------------------------------------

/// Ordered play-by-play rows, stored as Arrow record batches sharing one schema.
///
/// Rows are never edited in place: narrowing produces a new `PlayByPlay`
/// whose batches reference a subset of the original rows, in the same order.
#[derive(Debug, Clone)]
pub struct PlayByPlay {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl PlayByPlay {
    /// Wrap batches that all carry `schema`.
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<Self> {
        for batch in &batches {
            if batch.schema().fields() != schema.fields() {
                return Err(PbpError::InvalidInput(
                    "record batch schema does not match dataset schema".to_string(),
                ));
            }
        }
        Ok(Self { schema, batches })
    }

    /// A dataset with no columns and no rows.
    pub fn empty() -> Self {
        Self {
            schema: Arc::new(Schema::empty()),
            batches: Vec::new(),
        }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Number of rows (plays).
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<&str> {
        self.schema.fields().iter().map(|f| f.name().as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.index_of(name).is_ok()
    }

    /// Names from `required` that the schema lacks, sorted.
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        let mut missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| !self.has_column(name))
            .collect();
        missing.sort_unstable();
        missing
    }

    /// Distinct values of the `season` column, ignoring nulls.
    pub fn distinct_seasons(&self) -> Result<BTreeSet<Season>> {
        if !self.has_column(SEASON_COLUMN) {
            return Err(PbpError::missing_fields([SEASON_COLUMN]));
        }
        let mut seasons = BTreeSet::new();
        for batch in &self.batches {
            let Some(col) = batch.column_by_name(SEASON_COLUMN) else {
                continue;
            };
            let col = cast(col, &DataType::Int64)?;
            for value in col.as_primitive::<Int64Type>().iter().flatten() {
                let season = Season::try_from(value).map_err(|_| {
                    PbpError::InvalidInput(format!("season value {value} is not a valid year"))
                })?;
                seasons.insert(season);
            }
        }
        Ok(seasons)
    }
}

/// Read a numeric column as `Float64`, whatever its stored numeric type.
pub fn float_column(batch: &RecordBatch, name: &str) -> Result<ArrayRef> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| PbpError::missing_fields([name]))?;
    match col.data_type() {
        DataType::Float64 => Ok(Arc::clone(col)),
        _ => Ok(cast(col, &DataType::Float64)?),
    }
}

/// Convenience accessor over [`float_column`] for a single row; `None` for null.
pub fn float_value(col: &dyn Array, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    Some(col.as_primitive::<Float64Type>().value(row))
}
