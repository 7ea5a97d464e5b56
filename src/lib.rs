//! Download NFL play-by-play data for a rolling window of seasons and keep
//! only the clutch plays.
//!
//! ```text
//!  seasons ──► provider ──► data::filter ──► data::writer
//! ```

pub mod cli;
pub mod data;
pub mod download;
pub mod error;
pub mod provider;
pub mod seasons;

pub use download::{download_play_by_play, DownloadSummary};
pub use error::{PbpError, ProviderError};
