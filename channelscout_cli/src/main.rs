mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "channelscout")]
#[command(about = "Collect YouTube channel contact and statistics data from search results")]
struct Cli {
    /// Output format: table, json, csv, or markdown
    #[arg(long, default_value = "table", global = true)]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl search results for a query and export the channels found
    Scrape(Box<commands::scrape::ScrapeArgs>),
    /// Load an exported CSV file into the SQLite database
    Load(commands::load::LoadArgs),
    /// List channels stored in the SQLite database
    Channels(commands::channels::ChannelsArgs),
    /// Draft outreach emails for stored channels with an email contact
    Outreach(commands::outreach::OutreachArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("channelscout=info".parse().unwrap()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::parse(&cli.output)?;

    match &cli.command {
        Commands::Scrape(args) => commands::scrape::run(args.as_ref(), &format).await?,
        Commands::Load(args) => commands::load::run(args)?,
        Commands::Channels(args) => commands::channels::run(args, &format)?,
        Commands::Outreach(args) => commands::outreach::run(args, &format).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scrape_with_defaults() {
        let cli = Cli::try_parse_from(["channelscout", "scrape", "--query", "faceless channels"]).unwrap();
        assert_eq!(cli.output, "table");
        match cli.command {
            Commands::Scrape(args) => {
                assert_eq!(args.query, "faceless channels");
                assert_eq!(args.scroll_rounds, 10);
                assert_eq!(args.out.to_str(), Some("output.csv"));
                assert!(!args.headless);
                assert!(!args.no_scraped_at);
            }
            _ => panic!("expected scrape"),
        }
    }

    #[test]
    fn global_output_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["channelscout", "channels", "--output", "json"]).unwrap();
        assert_eq!(cli.output, "json");
        match cli.command {
            Commands::Channels(args) => {
                assert_eq!(args.limit, 50);
                assert_eq!(args.db.to_str(), Some("channelscout.db"));
            }
            _ => panic!("expected channels"),
        }
    }

    #[test]
    fn parses_load_paths() {
        let cli = Cli::try_parse_from([
            "channelscout",
            "load",
            "--csv",
            "run.csv",
            "--db",
            "scout.db",
        ])
        .unwrap();
        match cli.command {
            Commands::Load(args) => {
                assert_eq!(args.csv.to_str(), Some("run.csv"));
                assert_eq!(args.db.to_str(), Some("scout.db"));
            }
            _ => panic!("expected load"),
        }
    }

    #[test]
    fn parses_outreach_filters() {
        let cli = Cli::try_parse_from([
            "channelscout",
            "outreach",
            "--country",
            "Россия",
            "--min-subscribers",
            "1000",
            "--limit",
            "10",
        ])
        .unwrap();
        match cli.command {
            Commands::Outreach(args) => {
                assert_eq!(args.country.as_deref(), Some("Россия"));
                assert_eq!(args.min_subscribers, Some(1000));
                assert_eq!(args.limit, Some(10));
                assert_eq!(args.db.to_str(), Some("channelscout.db"));
                assert!(args.out.is_none());
            }
            _ => panic!("expected outreach"),
        }
    }

    #[test]
    fn scrape_requires_query() {
        assert!(Cli::try_parse_from(["channelscout", "scrape"]).is_err());
    }
}
