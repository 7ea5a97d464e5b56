use chrono::{Datelike, Local, NaiveDate};

use crate::error::{PbpError, Result};

/// A season is identified by the calendar year it kicked off in.
pub type Season = i32;

/// First month in which the previous calendar year's season counts as complete.
const SEASON_AVAILABLE_MONTH: u32 = 3;

/// Most recent season whose data can be expected upstream.
///
/// Until March the season labelled with the previous year may still be in its
/// playoffs, so it is the latest one considered complete.
pub fn latest_completed_season(today: NaiveDate) -> Season {
    if today.month() >= SEASON_AVAILABLE_MONTH {
        today.year()
    } else {
        today.year() - 1
    }
}

/// `span` consecutive seasons, ascending, ending at [`latest_completed_season`].
pub fn season_range(today: NaiveDate, span: u32) -> Result<Vec<Season>> {
    if span == 0 {
        return Err(PbpError::InvalidInput(
            "Season span must be at least 1".to_string(),
        ));
    }
    let span = Season::try_from(span)
        .map_err(|_| PbpError::InvalidInput(format!("Season span {span} is too large")))?;

    let end_year = latest_completed_season(today);
    let start_year = end_year - span + 1;
    Ok((start_year..=end_year).collect())
}

/// [`season_range`] relative to the local current date.
pub fn current_seasons(span: u32) -> Result<Vec<Season>> {
    season_range(Local::now().date_naive(), span)
}
