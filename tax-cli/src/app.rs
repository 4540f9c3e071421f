use anyhow::{Context, Result, anyhow, bail};
use tax_core::api::{TaxRequest, calculate_request};
use tax_core::{CalculationError, RepositoryError, RuleTable, TaxEngine, select_rule_table};
use tax_data::RuleTableLoader;
use tracing::{debug, info};

use crate::config::{AppConfig, DatabaseConfig, RulesSource};

/// Backends this binary can read rule tables from.
pub const SUPPORTED_BACKENDS: &[&str] = &["sqlite"];

/// Produces the rule table selected by `config.rules`.
pub async fn resolve_rule_table(config: &AppConfig) -> Result<RuleTable> {
    let requested = config.rules.tax_year;

    let table = match config.rules.source {
        RulesSource::Builtin => {
            let table = RuleTable::colombia_2025();
            match requested {
                Some(year) if year != table.tax_year => bail!(
                    "built-in rules cover {} only; use a rules file or database for {}",
                    table.tax_year,
                    year
                ),
                _ => table,
            }
        }
        RulesSource::File => {
            let path = config
                .rules
                .path
                .as_deref()
                .ok_or_else(|| anyhow!("rules source is 'file' but no rules path is set"))?;
            let table = RuleTableLoader::from_path(path)
                .with_context(|| format!("Failed to load rules from {}", path.display()))?;
            match requested {
                Some(year) if year != table.tax_year => bail!(
                    "{} holds rules for {}, not {}",
                    path.display(),
                    table.tax_year,
                    year
                ),
                _ => table,
            }
        }
        RulesSource::Database => read_stored_table(&config.database, requested).await?,
    };

    info!(
        tax_year = table.tax_year,
        source = ?config.rules.source,
        "Resolved rule table"
    );
    Ok(table)
}

async fn read_stored_table(
    database: &DatabaseConfig,
    requested: Option<i32>,
) -> Result<RuleTable> {
    if !SUPPORTED_BACKENDS.contains(&database.backend.as_str()) {
        bail!(
            "unknown backend '{}' (available: {})",
            database.backend,
            SUPPORTED_BACKENDS.join(", ")
        );
    }

    debug!(backend = %database.backend, "Opening rule store");
    let repo = tax_db_sqlite::open_seeded(&database.connection_string)
        .await
        .with_context(|| format!("Failed to open {}", database.connection_string))?;

    select_rule_table(&repo, requested).await.map_err(|e| match (e, requested) {
        (RepositoryError::NotFound, Some(year)) => anyhow!("no rule table stored for {}", year),
        (RepositoryError::NotFound, None) => anyhow!("the database holds no rule tables"),
        (other, _) => anyhow!(other).context("Failed to read stored rules"),
    })
}

/// Runs one JSON request through the engine and returns the response JSON.
pub fn run_calculation(
    rules: &RuleTable,
    request_json: &str,
    pretty: bool,
) -> Result<String, CalculationError> {
    let engine = TaxEngine::new(rules)?;
    let request = TaxRequest::from_json(request_json)?;
    let response = calculate_request(&engine, request)?;

    let encoded = if pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    };
    encoded.map_err(|e| CalculationError::Encoding(e.to_string()))
}

/// The rule table as JSON.
pub fn render_rules(
    rules: &RuleTable,
    pretty: bool,
) -> Result<String> {
    let encoded = if pretty {
        serde_json::to_string_pretty(rules)
    } else {
        serde_json::to_string(rules)
    };
    encoded.context("Failed to encode rule table")
}
