use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use tax_core::{
    AggregateDeductionCap, ContributionKind, ContributionRate, ContributionRates,
    DeductionCaps, DeductionCategory, LegalStatus, Regimes, RepositoryError, RuleTable,
    RuleTableRepository, TaxBracket, TaxRegime,
};
use tracing::{debug, info};

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open `database_url`, creating the file if it does not exist.
    ///
    /// Accepts `sqlite://path`, a bare path, or `sqlite::memory:`.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        debug!(database_url, "Opened SQLite database");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "Applied seed file");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn begin(&self) -> Result<Transaction<'_, Sqlite>, RepositoryError> {
        self.pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn get_text(
    row: &SqliteRow,
    column: &str,
) -> Result<String, RepositoryError> {
    row.try_get(column).map_err(db_err)
}

fn parse_status(code: &str) -> Result<LegalStatus, RepositoryError> {
    LegalStatus::parse(code)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid legal status: {}", code)))
}

struct StoredRegime {
    legal_status: LegalStatus,
    kind: String,
    flat_rate: Option<Decimal>,
}

fn assemble_regime(
    tax_year: i32,
    status: LegalStatus,
    stored: &[StoredRegime],
    brackets: &[(LegalStatus, TaxBracket)],
) -> Result<TaxRegime, RepositoryError> {
    let regime = stored
        .iter()
        .find(|r| r.legal_status == status)
        .ok_or_else(|| {
            RepositoryError::Database(format!(
                "Rule table {} has no regime for '{}'",
                tax_year,
                status.as_str()
            ))
        })?;

    match regime.kind.as_str() {
        "progressive" => Ok(TaxRegime::Progressive {
            brackets: brackets
                .iter()
                .filter(|(s, _)| *s == status)
                .map(|(_, b)| b.clone())
                .collect(),
        }),
        "flat" => {
            let rate = regime.flat_rate.ok_or_else(|| {
                RepositoryError::Database(format!(
                    "Flat regime for '{}' in {} has no rate",
                    status.as_str(),
                    tax_year
                ))
            })?;
            Ok(TaxRegime::Flat { rate })
        }
        other => Err(RepositoryError::Database(format!(
            "Unknown regime kind: {}",
            other
        ))),
    }
}

async fn insert_brackets(
    tx: &mut Transaction<'_, Sqlite>,
    tax_year: i32,
    status: LegalStatus,
    brackets: &[TaxBracket],
) -> Result<(), RepositoryError> {
    for (position, bracket) in brackets.iter().enumerate() {
        sqlx::query(
            "INSERT INTO tax_bracket (tax_year, legal_status, position, lower_bound, upper_bound, rate)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(tax_year)
        .bind(status.as_str())
        .bind(position as i64)
        .bind(decimal_to_text(bracket.lower_bound))
        .bind(bracket.upper_bound.map(decimal_to_text))
        .bind(decimal_to_text(bracket.rate))
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
    }
    Ok(())
}

async fn delete_year(
    tx: &mut Transaction<'_, Sqlite>,
    tax_year: i32,
) -> Result<u64, RepositoryError> {
    for table in ["tax_bracket", "tax_regime", "deduction_cap", "contribution_rate"] {
        sqlx::query(&format!("DELETE FROM {} WHERE tax_year = ?", table))
            .bind(tax_year)
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
    }

    let result = sqlx::query("DELETE FROM rule_table WHERE tax_year = ?")
        .bind(tax_year)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
    Ok(result.rows_affected())
}

#[async_trait]
impl RuleTableRepository for SqliteRepository {
    async fn get_rule_table(
        &self,
        tax_year: i32,
    ) -> Result<RuleTable, RepositoryError> {
        let header = sqlx::query(
            "SELECT tax_year, currency_decimals, uvt, aggregate_income_fraction, aggregate_max_amount
             FROM rule_table WHERE tax_year = ?",
        )
        .bind(tax_year)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        let currency_decimals: i64 = header.try_get("currency_decimals").map_err(db_err)?;
        let currency_decimals = u32::try_from(currency_decimals).map_err(|_| {
            RepositoryError::Database(format!(
                "Invalid currency_decimals: {}",
                currency_decimals
            ))
        })?;

        let regimes = sqlx::query(
            "SELECT legal_status, kind, flat_rate FROM tax_regime WHERE tax_year = ?",
        )
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .iter()
        .map(|row| -> Result<StoredRegime, RepositoryError> {
            Ok(StoredRegime {
                legal_status: parse_status(&get_text(row, "legal_status")?)?,
                kind: get_text(row, "kind")?,
                flat_rate: get_optional_decimal(row, "flat_rate")?,
            })
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;

        let brackets = sqlx::query(
            "SELECT legal_status, lower_bound, upper_bound, rate
             FROM tax_bracket
             WHERE tax_year = ?
             ORDER BY legal_status, position",
        )
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .iter()
        .map(|row| -> Result<(LegalStatus, TaxBracket), RepositoryError> {
            Ok((
                parse_status(&get_text(row, "legal_status")?)?,
                TaxBracket {
                    lower_bound: get_decimal(row, "lower_bound")?,
                    upper_bound: get_optional_decimal(row, "upper_bound")?,
                    rate: get_decimal(row, "rate")?,
                },
            ))
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;

        let cap_rows = sqlx::query("SELECT category, amount FROM deduction_cap WHERE tax_year = ?")
            .bind(tax_year)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        let mut deduction_caps = DeductionCaps {
            afc: Decimal::ZERO,
            mortgage_interest: Decimal::ZERO,
        };
        for category in DeductionCategory::ALL {
            let row = cap_rows
                .iter()
                .find(|row| get_text(row, "category").is_ok_and(|c| c == category.as_str()))
                .ok_or_else(|| {
                    RepositoryError::Database(format!(
                        "Rule table {} has no '{}' deduction cap",
                        tax_year,
                        category.as_str()
                    ))
                })?;
            deduction_caps.set(category, get_decimal(row, "amount")?);
        }

        let rate_rows = sqlx::query(
            "SELECT kind, rate, min_base, max_base FROM contribution_rate WHERE tax_year = ?",
        )
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        let mut contributions = ContributionRates {
            health: ContributionRate::new(Decimal::ZERO),
            pension: ContributionRate::new(Decimal::ZERO),
            occupational_risk: ContributionRate::new(Decimal::ZERO),
        };
        for kind in ContributionKind::ALL {
            let row = rate_rows
                .iter()
                .find(|row| get_text(row, "kind").is_ok_and(|k| k == kind.as_str()))
                .ok_or_else(|| {
                    RepositoryError::Database(format!(
                        "Rule table {} has no '{}' contribution rate",
                        tax_year,
                        kind.as_str()
                    ))
                })?;
            *contributions.get_mut(kind) = ContributionRate {
                rate: get_decimal(row, "rate")?,
                min_base: get_optional_decimal(row, "min_base")?,
                max_base: get_optional_decimal(row, "max_base")?,
            };
        }

        let table = RuleTable {
            tax_year,
            currency_decimals,
            uvt: get_decimal(&header, "uvt")?,
            regimes: Regimes {
                natural_person: assemble_regime(
                    tax_year,
                    LegalStatus::NaturalPerson,
                    &regimes,
                    &brackets,
                )?,
                simplified_corporation: assemble_regime(
                    tax_year,
                    LegalStatus::SimplifiedCorporation,
                    &regimes,
                    &brackets,
                )?,
            },
            deduction_caps,
            aggregate_deduction_cap: AggregateDeductionCap {
                income_fraction: get_decimal(&header, "aggregate_income_fraction")?,
                max_amount: get_optional_decimal(&header, "aggregate_max_amount")?,
            },
            contributions,
        };

        table.validate().map_err(|e| {
            RepositoryError::Database(format!("Stored rule table {} is invalid: {}", tax_year, e))
        })?;

        Ok(table)
    }

    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError> {
        let rows = sqlx::query("SELECT tax_year FROM rule_table ORDER BY tax_year")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter()
            .map(|row| row.try_get("tax_year").map_err(db_err))
            .collect()
    }

    async fn save_rule_table(
        &self,
        table: &RuleTable,
    ) -> Result<(), RepositoryError> {
        table.validate().map_err(|e| {
            RepositoryError::Database(format!(
                "Refusing to store invalid rule table {}: {}",
                table.tax_year, e
            ))
        })?;

        let mut tx = self.begin().await?;
        delete_year(&mut tx, table.tax_year).await?;

        sqlx::query(
            "INSERT INTO rule_table (tax_year, currency_decimals, uvt, aggregate_income_fraction, aggregate_max_amount)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(table.tax_year)
        .bind(i64::from(table.currency_decimals))
        .bind(decimal_to_text(table.uvt))
        .bind(decimal_to_text(table.aggregate_deduction_cap.income_fraction))
        .bind(table.aggregate_deduction_cap.max_amount.map(decimal_to_text))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for status in LegalStatus::ALL {
            let (kind, flat_rate) = match table.regime_for(status) {
                TaxRegime::Progressive { brackets } => {
                    insert_brackets(&mut tx, table.tax_year, status, brackets).await?;
                    ("progressive", None)
                }
                TaxRegime::Flat { rate } => ("flat", Some(decimal_to_text(*rate))),
            };
            sqlx::query(
                "INSERT INTO tax_regime (tax_year, legal_status, kind, flat_rate) VALUES (?, ?, ?, ?)",
            )
            .bind(table.tax_year)
            .bind(status.as_str())
            .bind(kind)
            .bind(flat_rate)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        for category in DeductionCategory::ALL {
            sqlx::query("INSERT INTO deduction_cap (tax_year, category, amount) VALUES (?, ?, ?)")
                .bind(table.tax_year)
                .bind(category.as_str())
                .bind(decimal_to_text(table.deduction_cap(category)))
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        for kind in ContributionKind::ALL {
            let rate = table.contribution_rate(kind);
            sqlx::query(
                "INSERT INTO contribution_rate (tax_year, kind, rate, min_base, max_base)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(table.tax_year)
            .bind(kind.as_str())
            .bind(decimal_to_text(rate.rate))
            .bind(rate.min_base.map(decimal_to_text))
            .bind(rate.max_base.map(decimal_to_text))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        info!(tax_year = table.tax_year, "Saved rule table");
        Ok(())
    }

    async fn replace_brackets(
        &self,
        tax_year: i32,
        legal_status: LegalStatus,
        brackets: &[TaxBracket],
    ) -> Result<(), RepositoryError> {
        let mut table = self.get_rule_table(tax_year).await?;
        *table.regimes.get_mut(legal_status) = TaxRegime::Progressive {
            brackets: brackets.to_vec(),
        };
        table.validate().map_err(|e| {
            RepositoryError::Database(format!(
                "Refusing to store invalid brackets for {} '{}': {}",
                tax_year,
                legal_status.as_str(),
                e
            ))
        })?;

        let mut tx = self.begin().await?;
        sqlx::query("DELETE FROM tax_bracket WHERE tax_year = ? AND legal_status = ?")
            .bind(tax_year)
            .bind(legal_status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        insert_brackets(&mut tx, tax_year, legal_status, brackets).await?;
        sqlx::query(
            "UPDATE tax_regime SET kind = 'progressive', flat_rate = NULL
             WHERE tax_year = ? AND legal_status = ?",
        )
        .bind(tax_year)
        .bind(legal_status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;

        info!(
            tax_year,
            legal_status = legal_status.as_str(),
            count = brackets.len(),
            "Replaced tax brackets"
        );
        Ok(())
    }

    async fn delete_rule_table(
        &self,
        tax_year: i32,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.begin().await?;
        let deleted = delete_year(&mut tx, tax_year).await?;
        if deleted == 0 {
            return Err(RepositoryError::NotFound);
        }
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
