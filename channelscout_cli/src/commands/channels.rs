//! The `channels` subcommand: query stored channels.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use channelscout_lib::{ChannelFilter, Db};

use crate::output::{build_db_rows, print_rows, OutputFormat};

#[derive(Args)]
pub struct ChannelsArgs {
    /// SQLite database path
    #[arg(long, default_value = "channelscout.db")]
    pub db: PathBuf,

    /// Only channels from this country (case-insensitive)
    #[arg(long)]
    pub country: Option<String>,

    /// Only channels with at least this many subscribers
    #[arg(long)]
    pub min_subscribers: Option<i64>,

    /// Only channels with contact information
    #[arg(long)]
    pub with_contact: bool,

    /// Maximum rows to show
    #[arg(long, default_value = "50")]
    pub limit: i64,
}

pub fn run(args: &ChannelsArgs, format: &OutputFormat) -> Result<()> {
    if !args.db.exists() {
        anyhow::bail!(
            "database {} not found. Run `channelscout load` first",
            args.db.display()
        );
    }
    let db = Db::open(&args.db)
        .with_context(|| format!("failed to open database {}", args.db.display()))?;
    db.init()?;

    let filter = ChannelFilter {
        country: args.country.clone(),
        min_subscribers: args.min_subscribers,
        with_contact: args.with_contact,
        limit: Some(args.limit),
    };
    let rows = db.query_channels(&filter)?;

    eprintln!("{} channels", rows.len());
    print_rows(&build_db_rows(&rows), format)?;
    Ok(())
}
