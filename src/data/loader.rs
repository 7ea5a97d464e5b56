use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{new_null_array, ArrayRef};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::errors::ParquetError;
use parquet::file::reader::ChunkReader;

use super::model::PlayByPlay;
use crate::error::Result;
use crate::seasons::Season;

// ---------------------------------------------------------------------------
// Parquet reading
// ---------------------------------------------------------------------------

/// Decode every record batch from a parquet source (file or in-memory bytes).
pub fn read_parquet<R: ChunkReader + 'static>(
    reader: R,
) -> std::result::Result<Vec<RecordBatch>, ParquetError> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(reader)?.build()?;
    reader
        .collect::<std::result::Result<Vec<_>, ArrowError>>()
        .map_err(|e| ParquetError::ArrowError(e.to_string()))
}

/// Decode a parquet file from disk.
pub fn read_parquet_file(path: &Path) -> std::result::Result<Vec<RecordBatch>, ParquetError> {
    let file = File::open(path).map_err(|e| ParquetError::External(Box::new(e)))?;
    read_parquet(file)
}

// ---------------------------------------------------------------------------
// Combining seasons
// ---------------------------------------------------------------------------

/// Stack per-season batches into one dataset.
///
/// Upstream season files do not all carry the same columns (newer seasons add
/// tracking fields), so the result schema is the union of all columns in order
/// of first appearance:
/// * a column absent from a season is filled with nulls for its rows
/// * two different numeric types for the same column widen to `Float64`
/// * any other type disagreement falls back to `Utf8`
///
/// All fields of the combined schema are nullable.
pub fn concat_seasons(parts: Vec<(Season, Vec<RecordBatch>)>) -> Result<PlayByPlay> {
    let schema = union_schema(parts.iter().flat_map(|(_, batches)| batches.iter()));

    let mut batches = Vec::new();
    for (season, season_batches) in parts {
        let rows: usize = season_batches.iter().map(RecordBatch::num_rows).sum();
        log::debug!("season {season}: {rows} rows in {} batches", season_batches.len());
        for batch in &season_batches {
            batches.push(conform(batch, &schema)?);
        }
    }
    PlayByPlay::try_new(schema, batches)
}

fn union_schema<'a>(batches: impl Iterator<Item = &'a RecordBatch>) -> SchemaRef {
    let mut fields: Vec<Field> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for batch in batches {
        for field in batch.schema().fields() {
            match positions.get(field.name()) {
                None => {
                    positions.insert(field.name().clone(), fields.len());
                    fields.push(Field::new(field.name(), field.data_type().clone(), true));
                }
                Some(&i) => {
                    let merged = widen(fields[i].data_type(), field.data_type());
                    if &merged != fields[i].data_type() {
                        log::debug!(
                            "column '{}': {:?} and {:?} combined as {merged:?}",
                            field.name(),
                            fields[i].data_type(),
                            field.data_type()
                        );
                        fields[i] = Field::new(field.name(), merged, true);
                    }
                }
            }
        }
    }
    Arc::new(Schema::new(fields))
}

fn widen(a: &DataType, b: &DataType) -> DataType {
    match (a, b) {
        _ if a == b => a.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        _ if a.is_numeric() && b.is_numeric() => DataType::Float64,
        _ => DataType::Utf8,
    }
}

/// Project `batch` onto `schema`, casting or null-filling columns as needed.
fn conform(batch: &RecordBatch, schema: &SchemaRef) -> Result<RecordBatch> {
    let rows = batch.num_rows();
    let columns = schema
        .fields()
        .iter()
        .map(|field| match batch.column_by_name(field.name()) {
            Some(col) if col.data_type() == field.data_type() => Ok(Arc::clone(col)),
            Some(col) => cast(col, field.data_type()),
            None => Ok(new_null_array(field.data_type(), rows)),
        })
        .collect::<std::result::Result<Vec<ArrayRef>, ArrowError>>()?;

    let options = RecordBatchOptions::new().with_row_count(Some(rows));
    Ok(RecordBatch::try_new_with_options(Arc::clone(schema), columns, &options)?)
}

// ---------------------------------------------------------------------------
// Precision
// ---------------------------------------------------------------------------

/// Cast every `Float64` column to `Float32`.  Only used when a caller asks the
/// provider to trade precision for memory.
pub fn downcast_floats(dataset: PlayByPlay) -> Result<PlayByPlay> {
    let fields: Vec<Field> = dataset
        .schema()
        .fields()
        .iter()
        .map(|f| match f.data_type() {
            DataType::Float64 => Field::new(f.name(), DataType::Float32, f.is_nullable()),
            _ => f.as_ref().clone(),
        })
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let batches = dataset
        .batches()
        .iter()
        .map(|batch| conform(batch, &schema))
        .collect::<Result<Vec<_>>>()?;
    PlayByPlay::try_new(schema, batches)
}
