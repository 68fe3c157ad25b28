//! The `outreach` subcommand: draft emails for stored channels with contacts.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use channelscout_lib::{
    export_outreach_to_path, outreach_summary, ChannelFilter, Db, OutreachConfig,
    OutreachGenerator, OutreachProgressFn, OutreachResult, OutreachStatus, OutreachTarget,
};

use crate::output::{build_outreach_rows, print_rows, OutputFormat};

#[derive(Args)]
pub struct OutreachArgs {
    /// SQLite database path
    #[arg(long, default_value = "channelscout.db")]
    pub db: PathBuf,

    /// Only channels from this country (case-insensitive)
    #[arg(long)]
    pub country: Option<String>,

    /// Only channels with at least this many subscribers
    #[arg(long)]
    pub min_subscribers: Option<i64>,

    /// Draft for at most this many channels (overrides OUTREACH_LIMIT)
    #[arg(long)]
    pub limit: Option<usize>,

    /// CSV file to write (overrides OUTREACH_OUTPUT)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Chat model (overrides OPENAI_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    /// What the email should achieve (overrides OUTREACH_GOAL)
    #[arg(long)]
    pub goal: Option<String>,

    /// OpenAI-compatible API base URL (overrides OPENAI_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,
}

/// Command-line flags applied on top of the environment settings.
pub fn apply_flags(mut config: OutreachConfig, args: &OutreachArgs) -> OutreachConfig {
    if let Some(limit) = args.limit {
        config.limit = Some(limit);
    }
    if let Some(ref out) = args.out {
        config.output = out.clone();
    }
    if let Some(ref model) = args.model {
        config.model = model.clone();
    }
    if let Some(ref goal) = args.goal {
        config.goal = goal.clone();
    }
    if let Some(ref base_url) = args.base_url {
        config.base_url = base_url.clone();
    }
    config
}

pub async fn run(args: &OutreachArgs, format: &OutputFormat) -> Result<()> {
    if !args.db.exists() {
        anyhow::bail!(
            "database {} not found. Run `channelscout load` first",
            args.db.display()
        );
    }
    let config = OutreachConfig::from_env().context("outreach needs an API key")?;
    let config = apply_flags(config, args);

    let db = Db::open(&args.db)
        .with_context(|| format!("failed to open database {}", args.db.display()))?;
    db.init()?;
    let filter = ChannelFilter {
        country: args.country.clone(),
        min_subscribers: args.min_subscribers,
        with_contact: true,
        limit: None,
    };
    let rows = db.query_channels(&filter)?;
    if rows.is_empty() {
        eprintln!("No stored channels with contact information match the filter.");
        return Ok(());
    }
    let targets: Vec<OutreachTarget> = rows.iter().map(OutreachTarget::from).collect();

    eprintln!(
        "Drafting outreach for {} channels with {}",
        config.limit.map_or(targets.len(), |l| l.min(targets.len())),
        config.model
    );
    let output_path = config.output.clone();
    let generator = OutreachGenerator::new(config);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} ({eta}) {msg}",
        )
        .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(250));

    let progress_bar = pb.clone();
    let progress: OutreachProgressFn<'_> =
        Box::new(move |done: usize, total: usize, result: &OutreachResult| {
            progress_bar.set_length(total as u64);
            progress_bar.set_position(done as u64);
            if result.status == OutreachStatus::Error {
                progress_bar.println(format!("  error {}: {}", result.channel_link, result.error));
            }
            progress_bar.set_message(result.contact.clone());
        });

    let results = generator.run(&targets, Some(progress)).await;
    pb.finish_with_message("done");

    export_outreach_to_path(&results, &output_path)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    let (ok, skipped, errors) = outreach_summary(&results);
    eprintln!(
        "Outreach complete: {} total, {} ok, {} skipped, {} errors. File: {}",
        results.len(),
        ok,
        skipped,
        errors,
        output_path.display()
    );

    print_rows(&build_outreach_rows(&results), format)?;
    Ok(())
}
