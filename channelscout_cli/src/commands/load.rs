//! The `load` subcommand: push an exported CSV into SQLite.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use channelscout_lib::Db;

#[derive(Args)]
pub struct LoadArgs {
    /// Exported CSV file to read
    #[arg(long, default_value = "output.csv")]
    pub csv: PathBuf,

    /// SQLite database path (created if missing)
    #[arg(long, default_value = "channelscout.db")]
    pub db: PathBuf,
}

pub fn run(args: &LoadArgs) -> Result<()> {
    let mut db = Db::open(&args.db)
        .with_context(|| format!("failed to open database {}", args.db.display()))?;
    db.init().context("failed to initialize database schema")?;

    let written = db
        .load_csv(&args.csv)
        .with_context(|| format!("failed to load {}", args.csv.display()))?;
    let total = db.channel_count()?;

    eprintln!(
        "Loaded {} rows from {} into {} ({} channels stored)",
        written,
        args.csv.display(),
        args.db.display(),
        total
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("channelscout-load-{}-{}", std::process::id(), name))
    }

    #[test]
    fn loads_csv_into_new_database() {
        let csv_path = temp_path("in.csv");
        let db_path = temp_path("out.db");
        let _ = std::fs::remove_file(&db_path);
        let mut file = std::fs::File::create(&csv_path).unwrap();
        writeln!(file, "channel_link,contact_info,country,subscribers,videos,views").unwrap();
        writeln!(file, "youtube.com/@a,a@a.com,Россия,42600,76,3734972").unwrap();
        writeln!(file, "youtube.com/@b,,,n/a,,").unwrap();
        drop(file);

        run(&LoadArgs {
            csv: csv_path.clone(),
            db: db_path.clone(),
        })
        .unwrap();

        let db = Db::open(&db_path).unwrap();
        assert_eq!(db.channel_count().unwrap(), 2);

        let _ = std::fs::remove_file(&csv_path);
        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn missing_csv_is_error() {
        let db_path = temp_path("missing.db");
        let err = run(&LoadArgs {
            csv: temp_path("does-not-exist.csv"),
            db: db_path.clone(),
        })
        .unwrap_err();
        assert!(format!("{:#}", err).contains("CSV not found"));
        let _ = std::fs::remove_file(&db_path);
    }
}
