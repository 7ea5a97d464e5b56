use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::download::{download_play_by_play, DownloadSummary};
use crate::provider::{NflverseClient, DEFAULT_BASE_URL, DEFAULT_CACHE_DIR};
use crate::seasons::current_seasons;

/// Download the last 25 seasons of NFL play-by-play data from nflverse.
///
/// Only clutch plays are kept: those within a one-score margin during the
/// final half of the fourth quarter or any overtime period.
#[derive(Parser, Debug)]
#[command(name = "clutch-pbp", version)]
pub struct Cli {
    /// Path to write the downloaded data. The format is inferred from the file
    /// extension; supported extensions are .parquet and .csv.
    #[arg(long, default_value = "data/pbp_last_25_seasons_clutch.parquet")]
    pub output: PathBuf,

    /// Disable caching of downloaded season files.
    #[arg(long)]
    pub no_cache: bool,

    /// Number of seasons to include counting backwards from the most recent.
    #[arg(long, default_value_t = 25)]
    pub span: u32,

    /// Directory holding cached season files.
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Base URL of the per-season parquet files.
    #[arg(long, default_value = DEFAULT_BASE_URL, hide = true)]
    pub base_url: String,
}

pub fn run(cli: Cli) -> Result<DownloadSummary> {
    log::debug!("{cli:?}");
    let seasons = current_seasons(cli.span)?;
    let client = NflverseClient::new(cli.base_url, cli.cache_dir).context("setting up nflverse client")?;
    Ok(download_play_by_play(&client, &cli.output, &seasons, !cli.no_cache)?)
}
