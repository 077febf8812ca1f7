//! CSV export of normalized car records.
//!
//! Columns are the union of fields populated across the records, in
//! known-field order. Missing cells are empty.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::{NormalizedCarRecord, populated_columns};

/// Placeholder used in file names for an empty brand or region.
const ALL: &str = "all";

/// Write `records` as CSV with a header row. Returns the columns written.
///
/// No records means no columns, and nothing but an empty file is written.
pub fn write_records<W: Write>(w: W, records: &[NormalizedCarRecord]) -> csv::Result<Vec<&'static str>> {
    let columns = populated_columns(records);
    let mut writer = csv::Writer::from_writer(w);
    if !columns.is_empty() {
        writer.write_record(&columns)?;
        for record in records {
            writer.write_record(columns.iter().map(|column| record.get(column).unwrap_or("")))?;
        }
    }
    writer.flush()?;
    Ok(columns)
}

/// `cars_{brand|all}_{region|all}_{start}_to_{end}_{YYYYmmddHHMMSS}.csv`
pub fn export_file_name(
    brand: &str,
    region: &str,
    start_page: u32,
    end_page: u32,
    timestamp: DateTime<Local>,
) -> String {
    format!(
        "cars_{}_{}_{}_to_{}_{}.csv",
        name_part(brand),
        name_part(region),
        start_page,
        end_page,
        timestamp.format("%Y%m%d%H%M%S")
    )
}

fn name_part(raw: &str) -> String {
    let slug = raw
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() { ALL.to_string() } else { slug }
}

/// Create `dir` if needed and write the CSV file into it.
pub fn export_to_dir(dir: &Path, file_name: &str, records: &[NormalizedCarRecord]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let path = dir.join(file_name);
    let file = File::create(&path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    let columns = write_records(BufWriter::new(file), records)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;

    info!(path = %path.display(), rows = records.len(), columns = columns.len(), "Exported records");
    Ok(path)
}
