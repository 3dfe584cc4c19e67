// =============================================================================
// export.rs — HANDING THE DATASET TO WHOEVER LOADS THE DATABASE
// =============================================================================
//
// The combined dataset leaves the building in one of two shapes:
//
//   records — every Enriched Record exactly as combined: the scraper's fields
//             plus label and chainId (omitted when unknown). Nothing dropped.
//   rows    — typed accounts-table rows { chainId, address, label, nameTag? }.
//             Records without a chain ID or a string address can't be rows;
//             they are skipped, counted, and complained about.
//
// Destination is a file when one is configured, stdout otherwise. Logs go
// to stderr, so stdout stays pure JSON and can be piped straight into jq or
// a loader script.
// =============================================================================

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::combiner::CombineReport;
use crate::models::{AccountDbRow, EnrichedRecord};

/// Shape of the written dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Records,
    Rows,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Records => write!(f, "records"),
            OutputFormat::Rows => write!(f, "rows"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "records" => Ok(OutputFormat::Records),
            "rows" => Ok(OutputFormat::Rows),
            other => Err(format!("unknown output format '{other}' (expected records or rows)")),
        }
    }
}

/// What a write produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Convert enriched records into accounts-table rows, skipping the ones that
/// can't be loaded. Returns the rows and the number skipped.
pub fn to_rows(records: &[EnrichedRecord]) -> (Vec<AccountDbRow>, usize) {
    let mut rows = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for record in records {
        match AccountDbRow::try_from(record) {
            Ok(row) => rows.push(row),
            Err(e) => {
                debug!(error = %e, "Record not loadable as an accounts row");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(
            skipped = skipped,
            kept = rows.len(),
            "Some records have no chainId or address and were left out of the rows"
        );
    }

    (rows, skipped)
}

/// Serialize the dataset into `writer` in the requested format.
pub fn write_dataset<W: Write>(
    writer: W,
    records: &[EnrichedRecord],
    format: OutputFormat,
    pretty: bool,
) -> Result<ExportSummary> {
    match format {
        OutputFormat::Records => {
            write_json(writer, records, pretty)?;
            Ok(ExportSummary {
                written: records.len(),
                skipped: 0,
            })
        }
        OutputFormat::Rows => {
            let (rows, skipped) = to_rows(records);
            write_json(writer, &rows, pretty)?;
            Ok(ExportSummary {
                written: rows.len(),
                skipped,
            })
        }
    }
}

/// Write the dataset to `destination`, or stdout when there is none.
pub fn write_dataset_to(
    destination: Option<&Path>,
    records: &[EnrichedRecord],
    format: OutputFormat,
    pretty: bool,
) -> Result<ExportSummary> {
    let summary = match destination {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create output file {}", path.display()))?;
            write_dataset(BufWriter::new(file), records, format, pretty)
                .with_context(|| format!("failed to write dataset to {}", path.display()))?
        }
        None => {
            let stdout = io::stdout();
            write_dataset(stdout.lock(), records, format, pretty)
                .context("failed to write dataset to stdout")?
        }
    };

    info!(
        destination = %destination.map(|p| p.display().to_string()).unwrap_or_else(|| "stdout".to_string()),
        format = %format,
        written = summary.written,
        skipped = summary.skipped,
        "Dataset written"
    );

    Ok(summary)
}

/// Write the run report as pretty JSON.
pub fn write_report(path: &Path, report: &CombineReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create report file {}", path.display()))?;
    write_json(BufWriter::new(file), report, true)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    info!(path = %path.display(), run_id = %report.run_id, "Run report written");
    Ok(())
}

fn write_json<W: Write, T: Serialize + ?Sized>(mut writer: W, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
