use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arrow::record_batch::RecordBatch;
use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::data::loader::{concat_seasons, downcast_floats, read_parquet, read_parquet_file};
use crate::data::model::PlayByPlay;
use crate::error::{PbpError, ProviderError};
use crate::seasons::Season;

/// nflverse publishes one parquet file per season under this release tag.
pub const DEFAULT_BASE_URL: &str = "https://github.com/nflverse/nflverse-data/releases/download/pbp";
pub const DEFAULT_CACHE_DIR: &str = ".cache/nflverse";
/// Earliest season nflverse has play-by-play for.
pub const FIRST_AVAILABLE_SEASON: Season = 1999;

const USER_AGENT: &str = concat!("clutch-pbp/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

// ---------------------------------------------------------------------------
// Source abstraction
// ---------------------------------------------------------------------------

/// How a source should fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Read and populate the local season cache.
    pub use_cache: bool,
    /// Narrow `Float64` columns to `Float32`.
    pub downcast: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            downcast: false,
        }
    }
}

/// Anything that can hand back play-by-play rows for a list of seasons.
///
/// Seasons with no upstream data may be left out of the result; that is not
/// an error.
pub trait PlayByPlaySource {
    fn fetch(&self, seasons: &[Season], options: &FetchOptions) -> Result<PlayByPlay, ProviderError>;
}

// ---------------------------------------------------------------------------
// nflverse HTTP client
// ---------------------------------------------------------------------------

/// Downloads season files from the nflverse data releases, with an optional
/// on-disk read-through cache.
pub struct NflverseClient {
    http: Client,
    base_url: String,
    cache_dir: PathBuf,
}

impl NflverseClient {
    pub fn new(base_url: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ProviderError::Client)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache_dir: cache_dir.into(),
        })
    }

    pub fn season_url(&self, season: Season) -> String {
        format!("{}/play_by_play_{season}.parquet", self.base_url)
    }

    pub fn cache_path(&self, season: Season) -> PathBuf {
        self.cache_dir.join(format!("play_by_play_{season}.parquet"))
    }

    /// `Ok(None)` when upstream has no file for `season`.
    ///
    /// The cache only saves bandwidth: an unreadable entry is downloaded
    /// again and a failed store is logged, neither aborts the fetch.
    fn fetch_season(&self, season: Season, use_cache: bool) -> Result<Option<Vec<RecordBatch>>, ProviderError> {
        let cached = self.cache_path(season);
        if use_cache && cached.is_file() {
            match read_parquet_file(&cached) {
                Ok(batches) => {
                    log::debug!("season {season}: cache hit {}", cached.display());
                    return Ok(Some(batches));
                }
                Err(e) => log::warn!(
                    "season {season}: ignoring unreadable cache file {}: {e}",
                    cached.display()
                ),
            }
        }

        let url = self.season_url(season);
        log::info!("season {season}: downloading {url}");
        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|source| ProviderError::Http { season, source })?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => return Err(ProviderError::Status { season, status }),
            _ => {}
        }

        let body = response
            .bytes()
            .map_err(|source| ProviderError::Http { season, source })?;
        log::debug!("season {season}: {} bytes", body.len());

        let batches = read_parquet(body.clone()).map_err(|source| ProviderError::Decode { season, source })?;

        if use_cache {
            match store(&cached, &body) {
                Ok(()) => log::debug!("season {season}: cached at {}", cached.display()),
                Err(e) => log::warn!("season {season}: not cached: {e}"),
            }
        }
        Ok(Some(batches))
    }
}

impl PlayByPlaySource for NflverseClient {
    fn fetch(&self, seasons: &[Season], options: &FetchOptions) -> Result<PlayByPlay, ProviderError> {
        if let Some(&early) = seasons.iter().find(|&&s| s < FIRST_AVAILABLE_SEASON) {
            return Err(ProviderError::SeasonUnavailable(early));
        }

        let mut parts = Vec::with_capacity(seasons.len());
        for &season in seasons {
            match self.fetch_season(season, options.use_cache)? {
                Some(batches) => parts.push((season, batches)),
                None => log::warn!("Data not available for {season}"),
            }
        }

        combine(parts, seasons, options)
    }
}

/// Stack fetched seasons; fails only when nothing at all came back.
fn combine(
    parts: Vec<(Season, Vec<RecordBatch>)>,
    requested: &[Season],
    options: &FetchOptions,
) -> Result<PlayByPlay, ProviderError> {
    if parts.is_empty() {
        return Err(ProviderError::NoData(requested.to_vec()));
    }
    let dataset = concat_seasons(parts).map_err(into_provider_error)?;
    if options.downcast {
        downcast_floats(dataset).map_err(into_provider_error)
    } else {
        Ok(dataset)
    }
}

fn into_provider_error(err: PbpError) -> ProviderError {
    match err {
        PbpError::Arrow(e) => ProviderError::Arrow(e),
        PbpError::Upstream(e) => e,
        other => ProviderError::Arrow(arrow::error::ArrowError::ExternalError(Box::new(other))),
    }
}

/// Write via a sibling temp file so an interrupted download never leaves a
/// truncated cache entry behind.
fn store(path: &Path, body: &[u8]) -> Result<(), ProviderError> {
    let cache_err = |source: std::io::Error| ProviderError::Cache {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(cache_err)?;
    }
    let partial = path.with_extension("parquet.part");
    fs::write(&partial, body).map_err(cache_err)?;
    fs::rename(&partial, path).map_err(cache_err)
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::sync::Arc;

    use super::*;
    use arrow::array::{ArrayRef, Float64Array, Int32Array};
    use arrow::datatypes::DataType;
    use parquet::arrow::ArrowWriter;

    /// Nothing listens on the discard port, so any request fails fast.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn season_batch(season: i32, rows: usize) -> RecordBatch {
        RecordBatch::try_from_iter(vec![
            ("season", Arc::new(Int32Array::from(vec![season; rows])) as ArrayRef),
            ("wp", Arc::new(Float64Array::from(vec![0.5; rows])) as ArrayRef),
        ])
        .unwrap()
    }

    fn write_cache_file(client: &NflverseClient, season: i32, rows: usize) {
        let path = client.cache_path(season);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let batch = season_batch(season, rows);
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn urls_and_cache_paths() {
        let client = NflverseClient::new("https://example.org/pbp/", "/tmp/c").unwrap();
        assert_eq!(client.season_url(2011), "https://example.org/pbp/play_by_play_2011.parquet");
        assert_eq!(client.cache_path(2011), PathBuf::from("/tmp/c/play_by_play_2011.parquet"));
    }

    #[test]
    fn cached_seasons_skip_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let client = NflverseClient::new(UNREACHABLE, dir.path()).unwrap();
        write_cache_file(&client, 2020, 3);
        write_cache_file(&client, 2021, 2);

        let ds = client.fetch(&[2020, 2021], &FetchOptions::default()).unwrap();
        assert_eq!(ds.num_rows(), 5);
        let seasons: Vec<_> = ds.distinct_seasons().unwrap().into_iter().collect();
        assert_eq!(seasons, vec![2020, 2021]);
        assert_eq!(ds.schema().field(1).data_type(), &DataType::Float64);
    }

    #[test]
    fn downcast_narrows_doubles() {
        let dir = tempfile::tempdir().unwrap();
        let client = NflverseClient::new(UNREACHABLE, dir.path()).unwrap();
        write_cache_file(&client, 2005, 1);

        let options = FetchOptions {
            use_cache: true,
            downcast: true,
        };
        let ds = client.fetch(&[2005], &options).unwrap();
        assert_eq!(ds.schema().field(1).data_type(), &DataType::Float32);
    }

    #[test]
    fn disabled_cache_goes_upstream() {
        let dir = tempfile::tempdir().unwrap();
        let client = NflverseClient::new(UNREACHABLE, dir.path()).unwrap();
        write_cache_file(&client, 2020, 3);

        let options = FetchOptions {
            use_cache: false,
            downcast: false,
        };
        let err = client.fetch(&[2020], &options).unwrap_err();
        assert!(matches!(err, ProviderError::Http { season: 2020, .. }), "{err}");
    }

    #[test]
    fn seasons_before_1999_are_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let client = NflverseClient::new(UNREACHABLE, dir.path()).unwrap();
        let err = client.fetch(&[1998, 1999], &FetchOptions::default()).unwrap_err();
        assert!(matches!(err, ProviderError::SeasonUnavailable(1998)));
    }

    #[test]
    fn nothing_fetched_is_no_data() {
        let err = combine(Vec::new(), &[2030, 2031], &FetchOptions::default()).unwrap_err();
        assert!(matches!(err, ProviderError::NoData(ref s) if s == &[2030, 2031]));
    }

    #[test]
    fn store_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("play_by_play_2000.parquet");
        store(&path, b"first").unwrap();
        store(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!path.with_extension("parquet.part").exists());
    }
}
