use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use super::model::PlayByPlay;
use crate::error::{PbpError, Result};

// ---------------------------------------------------------------------------
// Output format selection
// ---------------------------------------------------------------------------

/// Tabular output formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Parquet,
    Csv,
}

impl OutputFormat {
    /// Dispatch by extension (case-insensitive).
    ///
    /// Supported formats:
    /// * `.parquet` – columnar binary
    /// * `.csv`     – comma-separated text with a header row
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "parquet" => Ok(OutputFormat::Parquet),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(PbpError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Serialize `dataset` to `path` in the format its extension names.
///
/// Column names and row order are preserved; no index column is added.
/// The format is resolved before anything is created, so an unsupported
/// extension leaves nothing on disk.  Data goes to a sibling `.part` file
/// that replaces `path` only once fully written; on failure `path` is left
/// as it was.
pub fn write_dataset(dataset: &PlayByPlay, path: &Path) -> Result<()> {
    let format = OutputFormat::from_path(path)?;
    let partial = partial_path(path);
    log::debug!("writing {} rows as {format:?} to {}", dataset.num_rows(), partial.display());

    let written = match format {
        OutputFormat::Parquet => write_parquet(dataset, &partial),
        OutputFormat::Csv => write_csv(dataset, &partial),
    };
    if let Err(e) = written {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    fs::rename(&partial, path).map_err(|e| PbpError::io(path, e))
}

/// `out/clutch.parquet` → `out/clutch.parquet.part`
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

// ---------------------------------------------------------------------------
// Parquet writer
// ---------------------------------------------------------------------------

fn write_parquet(dataset: &PlayByPlay, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| PbpError::io(path, e))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, dataset.schema().clone(), Some(props))?;
    for batch in dataset.batches() {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV writer
// ---------------------------------------------------------------------------

fn write_csv(dataset: &PlayByPlay, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| PbpError::io(path, e))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));

    writer.write_record(dataset.column_names())?;

    // Nulls render as empty fields.
    let options = FormatOptions::default().with_null("");
    let mut record: Vec<String> = Vec::with_capacity(dataset.schema().fields().len());

    for batch in dataset.batches() {
        let formatters = batch
            .columns()
            .iter()
            .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for row in 0..batch.num_rows() {
            record.clear();
            record.extend(formatters.iter().map(|f| f.value(row).to_string()));
            writer.write_record(&record)?;
        }
    }

    let mut inner = writer
        .into_inner()
        .map_err(|e| PbpError::io(path, e.into_error()))?;
    inner.flush().map_err(|e| PbpError::io(path, e))?;
    Ok(())
}
