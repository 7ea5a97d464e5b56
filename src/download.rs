use std::collections::BTreeSet;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use arrow::util::pretty::pretty_format_batches;

use crate::data::filter::filter_clutch_plays;
use crate::data::model::PlayByPlay;
use crate::data::writer::write_dataset;
use crate::error::{PbpError, Result};
use crate::provider::{FetchOptions, PlayByPlaySource};
use crate::seasons::Season;

/// Rows shown in the trace-level preview of the clutch set.
const PREVIEW_ROWS: usize = 5;

/// What a completed run fetched and wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    pub requested: RangeInclusive<Season>,
    pub fetched_rows: usize,
    pub fetched_seasons: BTreeSet<Season>,
    pub clutch_rows: usize,
    /// Absolute location of the written file.
    pub output: PathBuf,
}

/// Fetch `seasons`, keep the clutch plays and write them to `output`.
///
/// The output format follows the extension of `output` (`.parquet` or
/// `.csv`).  Progress is reported on stdout.
pub fn download_play_by_play<S>(
    source: &S,
    output: &Path,
    seasons: &[Season],
    use_cache: bool,
) -> Result<DownloadSummary>
where
    S: PlayByPlaySource + ?Sized,
{
    let (Some(&first), Some(&last)) = (seasons.first(), seasons.last()) else {
        return Err(PbpError::InvalidInput(
            "At least one season must be requested".to_string(),
        ));
    };

    println!("Requesting play-by-play data for seasons: {first}-{last}");
    let options = FetchOptions {
        use_cache,
        downcast: false,
    };
    let pbp = source.fetch(seasons, &options)?;

    let fetched_seasons = pbp.distinct_seasons()?;
    println!(
        "Fetched {} rows across {} seasons",
        group_thousands(pbp.num_rows()),
        fetched_seasons.len()
    );
    if let Some(skipped) = describe_skipped(seasons, &fetched_seasons) {
        log::info!("no rows returned for seasons {skipped}");
    }

    let clutch = filter_clutch_plays(&pbp)?;
    println!("Filtered to {} clutch plays", group_thousands(clutch.num_rows()));
    log_preview(&clutch);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PbpError::io(parent, e))?;
    }
    write_dataset(&clutch, output)?;

    let absolute = output.canonicalize().map_err(|e| PbpError::io(output, e))?;
    println!("Saved play-by-play data to {}", absolute.display());

    Ok(DownloadSummary {
        requested: first..=last,
        fetched_rows: pbp.num_rows(),
        fetched_seasons,
        clutch_rows: clutch.num_rows(),
        output: absolute,
    })
}

/// `1234567` → `"1,234,567"`.
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn describe_skipped(requested: &[Season], fetched: &BTreeSet<Season>) -> Option<String> {
    let skipped: Vec<String> = requested
        .iter()
        .filter(|s| !fetched.contains(*s))
        .map(Season::to_string)
        .collect();
    (!skipped.is_empty()).then(|| skipped.join(", "))
}

fn log_preview(clutch: &PlayByPlay) {
    if !log::log_enabled!(log::Level::Trace) || clutch.is_empty() {
        return;
    }
    let head: Vec<_> = clutch
        .batches()
        .iter()
        .filter(|b| b.num_rows() > 0)
        .take(1)
        .map(|b| b.slice(0, b.num_rows().min(PREVIEW_ROWS)))
        .collect();
    match pretty_format_batches(&head) {
        Ok(table) => log::trace!("first clutch plays:\n{table}"),
        Err(e) => log::trace!("preview unavailable: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(48_213), "48,213");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn skipped_seasons_listed_in_request_order() {
        let fetched: BTreeSet<Season> = [2001, 2003].into_iter().collect();
        assert_eq!(describe_skipped(&[2001, 2002, 2003, 2004], &fetched).as_deref(), Some("2002, 2004"));
        assert_eq!(describe_skipped(&[2001, 2003], &fetched), None);
    }
}
