use anyhow::Result;
use channelscout_lib::{ChannelRecord, CrawlReport, DbChannelRow, OutreachResult};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(anyhow::anyhow!(
                "unknown output format '{}'. Valid values: table, json, csv, markdown",
                other
            )),
        }
    }
}

#[derive(Tabled, Serialize, Debug)]
pub struct ChannelRow {
    #[tabled(rename = "Channel")]
    #[serde(rename = "Channel")]
    channel: String,
    #[tabled(rename = "Contact")]
    #[serde(rename = "Contact")]
    contact: String,
    #[tabled(rename = "Country")]
    #[serde(rename = "Country")]
    country: String,
    #[tabled(rename = "Subscribers")]
    #[serde(rename = "Subscribers")]
    subscribers: String,
    #[tabled(rename = "Videos")]
    #[serde(rename = "Videos")]
    videos: String,
    #[tabled(rename = "Views")]
    #[serde(rename = "Views")]
    views: String,
    #[tabled(rename = "Scraped")]
    #[serde(rename = "Scraped")]
    scraped_at: String,
}

#[derive(Tabled, Serialize, Debug)]
pub struct SkipRow {
    #[tabled(rename = "Candidate")]
    #[serde(rename = "Candidate")]
    candidate: String,
    #[tabled(rename = "Stage")]
    #[serde(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Reason")]
    #[serde(rename = "Reason")]
    reason: String,
}

#[derive(Tabled, Serialize, Debug)]
pub struct OutreachRow {
    #[tabled(rename = "Status")]
    #[serde(rename = "Status")]
    status: String,
    #[tabled(rename = "Contact")]
    #[serde(rename = "Contact")]
    contact: String,
    #[tabled(rename = "Channel")]
    #[serde(rename = "Channel")]
    channel: String,
    #[tabled(rename = "Subject")]
    #[serde(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Error")]
    #[serde(rename = "Error")]
    error: String,
}

// -- Row builders --

pub fn build_record_rows<'a>(records: impl IntoIterator<Item = &'a ChannelRecord>) -> Vec<ChannelRow> {
    records
        .into_iter()
        .map(|r| ChannelRow {
            channel: r.channel_link.clone(),
            contact: r.contact_info.joined(),
            country: r.country.clone(),
            subscribers: format_count(r.subscribers),
            videos: format_count(r.videos),
            views: format_count(r.views),
            scraped_at: r.scraped_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect()
}

pub fn build_db_rows(rows: &[DbChannelRow]) -> Vec<ChannelRow> {
    rows.iter()
        .map(|r| ChannelRow {
            channel: r.channel_link.clone(),
            contact: r.contact_info.clone(),
            country: r.country.clone(),
            subscribers: format_count(r.subscribers.max(0) as u64),
            videos: format_count(r.videos.max(0) as u64),
            views: format_count(r.views.max(0) as u64),
            scraped_at: r.scraped_at.clone(),
        })
        .collect()
}

pub fn build_skip_rows(report: &CrawlReport) -> Vec<SkipRow> {
    report
        .skipped()
        .map(|r| SkipRow {
            candidate: r.candidate.clone(),
            stage: r.last_stage().to_string(),
            reason: r
                .skip_reason()
                .map(|reason| format!("{}: {}", reason.kind(), reason))
                .unwrap_or_default(),
        })
        .collect()
}

pub fn build_outreach_rows(results: &[OutreachResult]) -> Vec<OutreachRow> {
    results
        .iter()
        .map(|r| OutreachRow {
            status: r.status.as_str().to_string(),
            contact: r.contact.clone(),
            channel: r.channel_link.clone(),
            subject: r.subject.clone(),
            error: r.error.clone(),
        })
        .collect()
}

// -- Printing --

pub fn print_rows<T: Tabled + Serialize>(rows: &[T], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_table(rows),
        OutputFormat::Markdown => print_markdown(rows),
        OutputFormat::Csv => print_csv(rows)?,
        OutputFormat::Json => print_json(&rows),
    }
    Ok(())
}

pub fn print_table<T: Tabled>(rows: &[T]) {
    println!("{}", Table::new(rows));
}

pub fn print_markdown<T: Tabled>(rows: &[T]) {
    let mut table = Table::new(rows);
    table.with(Style::markdown());
    println!("{}", table);
}

pub fn print_csv<T: Serialize>(rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

/// Compact human-readable count: 950, 42.6K, 1.2M, 2.5B.
fn format_count(value: u64) -> String {
    if value >= 1_000_000_000 {
        format!("{:.1}B", value as f64 / 1_000_000_000.0)
    } else if value >= 1_000_000 {
        format!("{:.1}M", value as f64 / 1_000_000.0)
    } else if value >= 1_000 {
        format!("{:.1}K", value as f64 / 1_000.0)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
