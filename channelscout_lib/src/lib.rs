//! Library layer for channelscout: YouTube search crawling, channel field
//! extraction, aggregation, CSV export, SQLite loading and outreach drafts.
//!
//! Page automation goes through the [`PageDriver`] trait; the production
//! implementation drives a Chrome tab through `chromiumoxide`.

pub mod aggregate;
pub mod config;
pub mod contact;
pub mod crawl;
pub mod db;
pub mod driver;
pub mod error;
pub mod export;
pub mod fields;
pub mod layout;
pub mod navigate;
pub mod numeric;
pub mod outreach;
pub mod pacing;
pub mod pipeline;
pub mod user_agent;
pub mod validation;

pub use channelscout_llm;

pub use aggregate::{aggregate, aggregate_at, ChannelRecord};
pub use config::ScoutConfig;
pub use contact::{ContactCascade, ContactInfo};
pub use crawl::{CrawlError, CrawlReport, Crawler, ProgressFn};
pub use db::{ChannelFilter, ChannelRow, Db, DbChannelRow, DbError, LoadError};
pub use driver::{ChromePage, DriverError, LaunchOptions, PageDriver};
pub use error::ScoutError;
pub use export::{export_csv, export_to_path, read_csv, ExportError, ExportOptions, ExportedRow};
pub use fields::{ChannelFieldReader, ChannelFields, FieldError, FieldStrategy};
pub use layout::{load_default_layout, load_layout_file, parse_layout, LayoutError, PageLayout};
pub use navigate::{ExtractionResult, ExtractionStatus, NavState, NavigationStateMachine, SkipReason};
pub use numeric::parse_count;
pub use outreach::{
    export_outreach_csv, export_outreach_to_path, outreach_summary, pick_email, OutreachConfig,
    OutreachError, OutreachGenerator, OutreachProgressFn, OutreachResult, OutreachStatus,
    OutreachTarget,
};
pub use pacing::{Jitter, Pacing, RetryConfig};
pub use pipeline::Pipeline;
