use arrow::array::BooleanArray;
use arrow::compute::filter_record_batch;
use arrow::record_batch::RecordBatch;

use super::model::{float_column, float_value, PlayByPlay};
use crate::error::{PbpError, Result};

// ---------------------------------------------------------------------------
// Clutch criteria
// ---------------------------------------------------------------------------

/// One possession: a touchdown plus two-point try, with half a point of slack.
pub const CLUTCH_SCORE_MARGIN: f64 = 7.5;
pub const FOURTH_QUARTER: f64 = 4.0;
/// Second half of a 15 minute quarter.
pub const HALF_QUARTER_SECONDS: f64 = 450.0;

pub const SCORE_DIFFERENTIAL: &str = "score_differential";
pub const QUARTER: &str = "qtr";
pub const QUARTER_SECONDS_REMAINING: &str = "quarter_seconds_remaining";

/// Columns the clutch predicate reads.
pub const REQUIRED_COLUMNS: [&str; 3] = [SCORE_DIFFERENTIAL, QUARTER, QUARTER_SECONDS_REMAINING];

/// Whether a single play is a clutch play.
///
/// Close score (within [`CLUTCH_SCORE_MARGIN`]) and either the last
/// [`HALF_QUARTER_SECONDS`] of the fourth quarter or any overtime period.
pub fn is_clutch(score_differential: f64, qtr: f64, quarter_seconds_remaining: f64) -> bool {
    let score_close = score_differential.abs() <= CLUTCH_SCORE_MARGIN;
    let late_fourth = qtr == FOURTH_QUARTER && quarter_seconds_remaining <= HALF_QUARTER_SECONDS;
    let overtime = qtr >= FOURTH_QUARTER + 1.0;
    score_close && (late_fourth || overtime)
}

// ---------------------------------------------------------------------------
// Dataset filter
// ---------------------------------------------------------------------------

/// Keep only the clutch plays of `dataset`, in their original order.
///
/// Fails with [`PbpError::MissingField`] naming every absent required column.
/// A null in any of the three inputs never qualifies.
pub fn filter_clutch_plays(dataset: &PlayByPlay) -> Result<PlayByPlay> {
    let missing = dataset.missing_columns(&REQUIRED_COLUMNS);
    if !missing.is_empty() {
        return Err(PbpError::missing_fields(missing));
    }

    let batches = dataset
        .batches()
        .iter()
        .map(|batch| {
            let mask = clutch_mask(batch)?;
            Ok(filter_record_batch(batch, &mask)?)
        })
        .collect::<Result<Vec<_>>>()?;

    PlayByPlay::try_new(dataset.schema().clone(), batches)
}

/// Row-wise clutch flags for one batch.
fn clutch_mask(batch: &RecordBatch) -> Result<BooleanArray> {
    let score = float_column(batch, SCORE_DIFFERENTIAL)?;
    let qtr = float_column(batch, QUARTER)?;
    let seconds = float_column(batch, QUARTER_SECONDS_REMAINING)?;

    let mask: Vec<bool> = (0..batch.num_rows())
        .map(|row| {
            matches!(
                (
                    float_value(score.as_ref(), row),
                    float_value(qtr.as_ref(), row),
                    float_value(seconds.as_ref(), row),
                ),
                (Some(s), Some(q), Some(secs)) if is_clutch(s, q, secs)
            )
        })
        .collect();
    Ok(BooleanArray::from(mask))
}
