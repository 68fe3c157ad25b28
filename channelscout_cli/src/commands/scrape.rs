//! The `scrape` subcommand: crawl one query and export the channels found.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use channelscout_lib::validation::{validate_delay_bounds, validate_step_timeout};
use channelscout_lib::{
    load_default_layout, load_layout_file, ExtractionResult, FieldStrategy, Pacing, PageLayout,
    Pipeline, ProgressFn, ScoutConfig,
};

use crate::output::{build_record_rows, build_skip_rows, print_rows, OutputFormat};

#[derive(Args)]
pub struct ScrapeArgs {
    /// Search query typed into YouTube search
    #[arg(long, short = 'q')]
    pub query: String,

    /// How many times to scroll the results page before collecting links (1-100)
    #[arg(long, default_value = "10")]
    pub scroll_rounds: u32,

    /// Lower bound of every randomized wait, in seconds
    #[arg(long)]
    pub min_delay: Option<f64>,

    /// Upper bound of every randomized wait, in seconds
    #[arg(long)]
    pub max_delay: Option<f64>,

    /// Per-step timeout in seconds (1-600)
    #[arg(long)]
    pub step_timeout: Option<u64>,

    /// Retries for a failed page open
    #[arg(long)]
    pub retries: Option<usize>,

    /// Stop after this many candidates
    #[arg(long)]
    pub max_candidates: Option<usize>,

    /// About-page field reading: labeled or positional
    #[arg(long)]
    pub field_strategy: Option<String>,

    /// Page layout profile (YAML). Defaults to the built-in YouTube profile.
    #[arg(long)]
    pub layout: Option<PathBuf>,

    /// DevTools websocket of a running Chrome to attach to (overrides CHANNELSCOUT_BROWSER_URL)
    #[arg(long)]
    pub browser_url: Option<String>,

    /// Chrome binary to launch (overrides CHANNELSCOUT_CHROME_PATH)
    #[arg(long)]
    pub chrome_path: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// CSV file to write
    #[arg(long, default_value = "output.csv")]
    pub out: PathBuf,

    /// Leave the scraped_at column out of the CSV
    #[arg(long)]
    pub no_scraped_at: bool,

    /// Also list skipped candidates with their reasons
    #[arg(long)]
    pub show_skipped: bool,
}

/// Environment defaults with the command-line flags applied on top.
pub fn build_config(args: &ScrapeArgs) -> Result<ScoutConfig> {
    let mut config = ScoutConfig::from_env(&args.query);
    config.scroll_rounds = args.scroll_rounds;

    if args.min_delay.is_some() || args.max_delay.is_some() {
        let min = args.min_delay.unwrap_or(0.0);
        let max = args.max_delay.unwrap_or_else(|| min.max(1.0));
        let jitter = validate_delay_bounds(min, max)?;
        config.pacing = Pacing::uniform(jitter);
    }
    if let Some(secs) = args.step_timeout {
        config.step_timeout = validate_step_timeout(secs)?;
    }
    if let Some(retries) = args.retries {
        config.retry.max_retries = retries;
    }
    config.max_candidates = args.max_candidates;
    if let Some(ref raw) = args.field_strategy {
        let strategy: FieldStrategy = raw.parse().map_err(anyhow::Error::msg)?;
        config.field_strategy = Some(strategy);
    }
    if let Some(ref url) = args.browser_url {
        config.browser_url = Some(url.clone());
    }
    if let Some(ref path) = args.chrome_path {
        config.chrome_path = Some(path.clone());
    }
    config.headless = config.headless || args.headless;
    config.output = args.out.clone();
    config.export.include_scraped_at = !args.no_scraped_at;

    config.validate()?;
    Ok(config)
}

pub fn load_layout(path: Option<&PathBuf>) -> Result<PageLayout> {
    match path {
        Some(path) => load_layout_file(path)
            .with_context(|| format!("failed to load layout profile {}", path.display())),
        None => load_default_layout().context("built-in layout profile is invalid"),
    }
}

pub async fn run(args: &ScrapeArgs, format: &OutputFormat) -> Result<()> {
    let config = build_config(args)?;
    let layout = load_layout(args.layout.as_ref())?;

    match config.browser_url {
        Some(ref url) => eprintln!("Attaching to browser at {}", url),
        None => eprintln!(
            "Launching Chrome{}",
            if config.headless { " (headless)" } else { "" }
        ),
    }
    let mut pipeline = Pipeline::launch(config, layout)
        .await
        .context("failed to start a browser session")?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} ({eta}) {msg}",
        )
        .unwrap(),
    );
    pb.set_message("collecting candidates...");
    pb.enable_steady_tick(Duration::from_millis(250));

    let progress_bar = pb.clone();
    let progress: ProgressFn<'_> =
        Box::new(move |done: usize, total: usize, result: &ExtractionResult| {
            progress_bar.set_length(total as u64);
            progress_bar.set_position(done as u64);
            match result.skip_reason() {
                Some(reason) => {
                    progress_bar.println(format!("  skip {}: {}", result.candidate, reason));
                    progress_bar.set_message(format!("skipped at {}", result.last_stage()));
                }
                None => progress_bar.set_message(result.channel_link.clone()),
            }
        });

    let report = match pipeline.run(Some(progress)).await {
        Ok(report) => report,
        Err(e) => {
            pb.abandon_with_message("crawl failed");
            if let Err(close_err) = pipeline.close().await {
                tracing::warn!("failed to close browser session: {}", close_err);
            }
            return Err(e).context("crawl failed");
        }
    };
    pb.finish_with_message(format!(
        "{} extracted, {} skipped",
        report.extracted().count(),
        report.skipped().count()
    ));

    let output_path = pipeline.config().output.clone();
    let export = pipeline.export(&report);
    if let Err(e) = pipeline.close().await {
        tracing::warn!("failed to close browser session: {}", e);
    }
    let records = export.with_context(|| format!("failed to write {}", output_path.display()))?;

    eprintln!(
        "Scrape complete: {} candidates, {} channels written to {}",
        report.results.len(),
        records.len(),
        output_path.display()
    );
    let tally = report.skip_tally();
    if !tally.is_empty() {
        let parts: Vec<String> = tally
            .iter()
            .map(|(kind, count)| format!("{} {}", count, kind))
            .collect();
        eprintln!("  Skipped: {}", parts.join(", "));
    }

    print_rows(&build_record_rows(records.values()), format)?;
    if args.show_skipped {
        let skipped = build_skip_rows(&report);
        if !skipped.is_empty() {
            print_rows(&skipped, format)?;
        }
    }

    Ok(())
}
