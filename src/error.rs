use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

use crate::seasons::Season;

// ---------------------------------------------------------------------------
// Pipeline errors
// ---------------------------------------------------------------------------

/// Everything that can abort a download run.  All variants are fatal.
#[derive(Debug, Error)]
pub enum PbpError {
    /// Required columns absent from the fetched data.  Names are sorted.
    #[error("Play-by-play data is missing required columns: {}", .0.join(", "))]
    MissingField(Vec<String>),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Unsupported output format for {}. Use a .parquet or .csv extension.", .path.display())]
    UnsupportedFormat { path: PathBuf },

    /// Provider failures are passed through with their own message.
    #[error(transparent)]
    Upstream(#[from] ProviderError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PbpError {
    /// Build a [`PbpError::MissingField`] with the names in sorted order.
    pub fn missing_fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        PbpError::MissingField(names)
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PbpError::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Provider errors
// ---------------------------------------------------------------------------

/// Failures raised by a [`crate::provider::PlayByPlaySource`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Data not available before 1999 (requested {0})")]
    SeasonUnavailable(Season),

    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request for season {season} failed: {source}")]
    Http {
        season: Season,
        #[source]
        source: reqwest::Error,
    },

    #[error("season {season}: server answered {status}")]
    Status {
        season: Season,
        status: reqwest::StatusCode,
    },

    #[error("season {season}: could not decode parquet: {source}")]
    Decode {
        season: Season,
        #[source]
        source: ParquetError,
    },

    #[error("cache file {}: {source}", .path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("combining seasons: {0}")]
    Arrow(#[from] ArrowError),

    #[error("No play-by-play data available for seasons {0:?}")]
    NoData(Vec<Season>),
}

pub type Result<T, E = PbpError> = std::result::Result<T, E>;
