use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tax_core::RuleTableRepository;
use tax_data::{RuleTableLoader, TaxBracketLoader};
use tax_db_sqlite::SqliteRepository;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Load rule-table data into the database.
///
/// `--rules` takes a complete rule table as TOML and replaces the stored
/// table for its year. `--brackets` takes a CSV with the columns
/// `tax_year,legal_status,lower_bound,upper_bound,rate` and replaces the
/// progressive schedule for each (year, status) it names; the year must
/// already exist. When both are given the TOML file is applied first.
#[derive(Parser, Debug)]
#[command(name = "tax-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// SQLite database URL (e.g., sqlite://rules.db; created if missing)
    #[arg(short, long, default_value = "sqlite://rules.db")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,

    /// TOML file containing a complete rule table
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// CSV file containing bracket schedules
    #[arg(short, long)]
    brackets: Option<PathBuf>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    if !args.migrate && args.seeds.is_none() && args.rules.is_none() && args.brackets.is_none() {
        bail!("Nothing to do: pass --migrate, --seeds, --rules or --brackets");
    }

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        info!("Running migrations");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
    }

    if let Some(seeds_dir) = &args.seeds {
        info!(seeds_dir = %seeds_dir.display(), "Running seeds");
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
    }

    if let Some(path) = &args.rules {
        let table = RuleTableLoader::from_path(path)
            .with_context(|| format!("Failed to read rule table: {}", path.display()))?;
        RuleTableLoader::load(&repo, &table)
            .await
            .context("Failed to store rule table")?;
        println!("Stored rule table for {}.", table.tax_year);
    }

    if let Some(path) = &args.brackets {
        let file =
            File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        let records = TaxBracketLoader::parse(file)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
        info!(count = records.len(), "Parsed bracket records");

        let inserted = TaxBracketLoader::load(&repo, &records)
            .await
            .context("Failed to load tax brackets into database")?;
        println!("Loaded {} tax brackets into the database.", inserted);
    }

    let years = repo
        .list_tax_years()
        .await
        .context("Failed to list stored tax years")?;
    println!("Stored tax years: {:?}", years);

    Ok(())
}
