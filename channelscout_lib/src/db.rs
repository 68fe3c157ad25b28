//! SQLite storage for scraped channels.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::export::COLUMNS;

const SCHEMA_VERSION: i32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Failures of the CSV-to-SQLite load. All are fatal for the load.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("CSV not found at {0}")]
    NotFound(PathBuf),
    #[error("CSV is missing required column '{0}'")]
    MissingColumn(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<rusqlite::Error> for LoadError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(e))
    }
}

/// A channel row as written to the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRow {
    pub channel_link: String,
    pub contact_info: String,
    pub country: String,
    pub subscribers: i64,
    pub videos: i64,
    pub views: i64,
}

/// A channel row as read back, with the server-assigned timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbChannelRow {
    pub channel_link: String,
    pub contact_info: String,
    pub country: String,
    pub subscribers: i64,
    pub videos: i64,
    pub views: i64,
    pub scraped_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct ChannelFilter {
    pub country: Option<String>,
    pub min_subscribers: Option<i64>,
    pub with_contact: bool,
    pub limit: Option<i64>,
}

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<(), DbError> {
        let schema = include_str!("../../schema/sqlite.sql");
        self.conn.execute_batch(schema)?;

        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version < SCHEMA_VERSION {
            self.conn
                .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }
        Ok(())
    }

    /// Insert or overwrite rows by `channel_link` in one transaction.
    ///
    /// An overwritten row gets a fresh `scraped_at`.
    pub fn upsert_channels(&mut self, rows: &[ChannelRow]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO youtube_channels (channel_link, contact_info, country, subscribers, videos, views)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(channel_link) DO UPDATE SET
                   contact_info = excluded.contact_info,
                   country = excluded.country,
                   subscribers = excluded.subscribers,
                   videos = excluded.videos,
                   views = excluded.views,
                   scraped_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.channel_link,
                    row.contact_info,
                    row.country,
                    row.subscribers,
                    row.videos,
                    row.views,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Load an exported CSV file. Returns the number of rows written.
    pub fn load_csv(&mut self, path: &Path) -> Result<usize, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let mut rdr = csv::Reader::from_path(path)?;
        let headers = rdr.headers()?.clone();

        let mut index = [0usize; 6];
        for (slot, column) in index.iter_mut().zip(COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.trim() == *column)
                .ok_or_else(|| LoadError::MissingColumn(column.to_string()))?;
        }
        let [link_i, contact_i, country_i, subs_i, videos_i, views_i] = index;

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or("").trim().to_string();
            let channel_link = field(link_i);
            if channel_link.is_empty() {
                tracing::warn!("skipping CSV row {} without channel_link", rows.len() + 1);
                continue;
            }
            rows.push(ChannelRow {
                channel_link,
                contact_info: field(contact_i),
                country: field(country_i),
                subscribers: coerce_count(&field(subs_i)),
                videos: coerce_count(&field(videos_i)),
                views: coerce_count(&field(views_i)),
            });
        }

        let written = self.upsert_channels(&rows)?;
        tracing::info!("Loaded {} rows from {}", written, path.display());
        Ok(written)
    }

    pub fn channel_count(&self) -> Result<i64, DbError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM youtube_channels", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn query_channels(&self, filter: &ChannelFilter) -> Result<Vec<DbChannelRow>, DbError> {
        let mut sql = String::from(
            "SELECT channel_link, contact_info, country, subscribers, videos, views, scraped_at
             FROM youtube_channels
             WHERE 1=1",
        );

        let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref country) = filter.country {
            params_vec.push(Box::new(country.clone()));
            sql.push_str(&format!(" AND country = ?{} COLLATE NOCASE", params_vec.len()));
        }
        if let Some(min) = filter.min_subscribers {
            params_vec.push(Box::new(min));
            sql.push_str(&format!(" AND subscribers >= ?{}", params_vec.len()));
        }
        if filter.with_contact {
            sql.push_str(" AND contact_info != ''");
        }

        sql.push_str(" ORDER BY subscribers DESC, channel_link ASC");

        if let Some(n) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), |row| {
            Ok(DbChannelRow {
                channel_link: row.get(0)?,
                contact_info: row.get(1)?,
                country: row.get(2)?,
                subscribers: row.get(3)?,
                videos: row.get(4)?,
                views: row.get(5)?,
                scraped_at: row.get(6)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

/// Integer counts from a CSV cell. Non-numeric or negative values become 0.
fn coerce_count(raw: &str) -> i64 {
    if let Ok(n) = raw.parse::<i64>() {
        return n.max(0);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f > 0.0 => f.min(i64::MAX as f64) as i64,
        _ => {
            if !raw.is_empty() {
                tracing::debug!("non-numeric count {:?}, storing 0", raw);
            }
            0
        }
    }
}
