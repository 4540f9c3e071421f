use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use tax_cli::config::{AppConfig, ConfigOverrides, RulesSource};
use tax_cli::{app, logging};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Colombian income tax and payroll contribution calculator.
///
/// Reads a request JSON, resolves the rule table from the configured source
/// and prints the response JSON on stdout. Logs go to stderr.
#[derive(Debug, Parser)]
#[command(name = "tax-calc", version, about)]
struct Cli {
    /// Config file (default: ./tax-calc.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where the rule table comes from.
    #[arg(long, global = true, value_enum)]
    rules_source: Option<RulesSource>,

    /// TOML rule-table file; implies `--rules-source file`.
    #[arg(long, global = true)]
    rules_file: Option<PathBuf>,

    /// Database connection string; implies `--rules-source database`.
    /// For SQLite this is e.g. `sqlite://tax-rules.db` or `sqlite::memory:`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Tax year of the rule table.
    #[arg(long, global = true)]
    year: Option<i32>,

    /// Also append log output to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute taxes for a request.
    Calculate {
        /// Request JSON file; stdin when omitted.
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Pretty-print the response.
        #[arg(long)]
        pretty: bool,
    },
    /// Print the resolved rule table.
    Rules {
        /// Pretty-print the table.
        #[arg(long)]
        pretty: bool,
    },
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            rules_source: self.rules_source,
            rules_file: self.rules_file.clone(),
            database: self.db.clone(),
            tax_year: self.year,
            log_file: self.log_file.clone(),
        }
    }
}

fn read_request(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read request: {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read request from stdin")?;
            Ok(buffer)
        }
    }
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::discover(cli.config.as_deref())?;
    config.apply(&cli.overrides());
    logging::init_logging(&config.logging)?;
    debug!(?config, "Loaded configuration");

    let rules = app::resolve_rule_table(&config).await?;

    match &cli.command {
        Command::Calculate { input, pretty } => {
            let request = read_request(input.as_ref())?;
            let response = app::run_calculation(&rules, &request, *pretty)?;
            info!(tax_year = rules.tax_year, "Calculation complete");
            println!("{response}");
        }
        Command::Rules { pretty } => {
            println!("{}", app::render_rules(&rules, *pretty)?);
        }
    }

    Ok(())
}
