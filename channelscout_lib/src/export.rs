//! Fixed-schema CSV export of aggregated channel records.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::aggregate::ChannelRecord;

pub const COLUMNS: &[&str] = &[
    "channel_link",
    "contact_info",
    "country",
    "subscribers",
    "videos",
    "views",
];

pub const SCRAPED_AT_COLUMN: &str = "scraped_at";

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub include_scraped_at: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_scraped_at: true,
        }
    }
}

/// One row of an exported file, as read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedRow {
    pub channel_link: String,
    pub contact_info: String,
    pub country: String,
    pub subscribers: u64,
    pub videos: u64,
    pub views: u64,
    #[serde(default)]
    pub scraped_at: Option<String>,
}

impl ExportedRow {
    pub fn contact_members(&self) -> Vec<&str> {
        self.contact_info
            .split(';')
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Write `records` as CSV. An empty map still produces the header row.
pub fn export_csv<W: Write>(
    records: &BTreeMap<String, ChannelRecord>,
    writer: W,
    options: ExportOptions,
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = COLUMNS.to_vec();
    if options.include_scraped_at {
        header.push(SCRAPED_AT_COLUMN);
    }
    wtr.write_record(&header)?;

    for record in records.values() {
        let mut row = vec![
            record.channel_link.clone(),
            record.contact_info.joined(),
            record.country.clone(),
            record.subscribers.to_string(),
            record.videos.to_string(),
            record.views.to_string(),
        ];
        if options.include_scraped_at {
            row.push(record.scraped_at.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn export_to_path(
    records: &BTreeMap<String, ChannelRecord>,
    path: &Path,
    options: ExportOptions,
) -> Result<(), ExportError> {
    let file = File::create(path)?;
    export_csv(records, file, options)?;
    tracing::info!("wrote {} channels to {}", records.len(), path.display());
    Ok(())
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<ExportedRow>, ExportError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
