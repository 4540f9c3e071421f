use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tax_core::{
    LegalStatus, RepositoryError, RuleTable, RuleTableError, RuleTableRepository, TaxBracket,
};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when loading rule-table data.
#[derive(Debug, Error)]
pub enum RuleTableLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("TOML parse error: {0}")]
    Toml(String),

    #[error("Invalid legal status '{0}' (expected 'natural' or 'sas')")]
    InvalidLegalStatus(String),

    #[error("Invalid rule table: {0}")]
    InvalidTable(#[from] RuleTableError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Tax year {0} not found in database (load a rule table or run the seeds first)")]
    TaxYearNotFound(i32),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for RuleTableLoaderError {
    fn from(err: csv::Error) -> Self {
        RuleTableLoaderError::CsvParse(err.to_string())
    }
}

impl From<toml::de::Error> for RuleTableLoaderError {
    fn from(err: toml::de::Error) -> Self {
        RuleTableLoaderError::Toml(err.to_string())
    }
}

/// A single record from a bracket schedule CSV file.
///
/// - `tax_year`: the tax year (e.g., 2025)
/// - `legal_status`: `natural` or `sas`
/// - `lower_bound`: inclusive lower edge of the bracket
/// - `upper_bound`: exclusive upper edge (empty for unbounded)
/// - `rate`: marginal rate as a fraction (e.g., 0.19 for 19%)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxBracketRecord {
    pub tax_year: i32,
    pub legal_status: String,
    pub lower_bound: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Loader for bracket schedules from CSV files.
///
/// Each (tax_year, legal_status) group in the file replaces the progressive
/// schedule for that status in an existing rule table. Loading the same file
/// twice leaves the repository unchanged.
pub struct TaxBracketLoader;

impl TaxBracketLoader {
    /// Parse bracket records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<TaxBracketRecord>, RuleTableLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: TaxBracketRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Group records into schedules keyed by (tax_year, legal_status),
    /// keeping file order within each schedule.
    pub fn group(
        records: &[TaxBracketRecord]
    ) -> Result<BTreeMap<(i32, LegalStatus), Vec<TaxBracket>>, RuleTableLoaderError> {
        let mut groups: BTreeMap<(i32, LegalStatus), Vec<TaxBracket>> = BTreeMap::new();

        for record in records {
            let status = LegalStatus::parse(record.legal_status.trim()).ok_or_else(|| {
                RuleTableLoaderError::InvalidLegalStatus(record.legal_status.clone())
            })?;
            groups
                .entry((record.tax_year, status))
                .or_default()
                .push(TaxBracket::new(
                    record.lower_bound,
                    record.upper_bound,
                    record.rate,
                ));
        }

        Ok(groups)
    }

    /// Replace the schedules named in `records`. Returns the number of
    /// brackets written.
    pub async fn load<R: RuleTableRepository + ?Sized>(
        repo: &R,
        records: &[TaxBracketRecord],
    ) -> Result<usize, RuleTableLoaderError> {
        let mut inserted = 0;

        for ((tax_year, status), brackets) in Self::group(records)? {
            repo.replace_brackets(tax_year, status, &brackets)
                .await
                .map_err(|e| match e {
                    RepositoryError::NotFound => RuleTableLoaderError::TaxYearNotFound(tax_year),
                    other => RuleTableLoaderError::Repository(other),
                })?;
            debug!(
                tax_year,
                legal_status = status.as_str(),
                count = brackets.len(),
                "Loaded bracket schedule"
            );
            inserted += brackets.len();
        }

        Ok(inserted)
    }
}

/// Loader for complete rule tables stored as TOML documents.
pub struct RuleTableLoader;

impl RuleTableLoader {
    /// Parse and validate a rule table from TOML text.
    pub fn parse(toml_text: &str) -> Result<RuleTable, RuleTableLoaderError> {
        let table: RuleTable = toml::from_str(toml_text)?;
        table.validate()?;
        Ok(table)
    }

    /// Read, parse and validate the rule table at `path`.
    pub fn from_path(path: &Path) -> Result<RuleTable, RuleTableLoaderError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RuleTableLoaderError::Io(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        let table = Self::parse(&text)?;
        info!(
            path = %path.display(),
            tax_year = table.tax_year,
            "Loaded rule table file"
        );
        Ok(table)
    }

    /// Store `table`, replacing any table already saved for its year.
    pub async fn load<R: RuleTableRepository + ?Sized>(
        repo: &R,
        table: &RuleTable,
    ) -> Result<(), RuleTableLoaderError> {
        table.validate()?;
        repo.save_rule_table(table).await?;
        Ok(())
    }
}
