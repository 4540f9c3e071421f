use async_trait::async_trait;
use thiserror::Error;

use crate::models::{LegalStatus, RuleTable, TaxBracket};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Storage for yearly rule tables.
///
/// Implementations must return tables that pass [`RuleTable::validate`];
/// a stored table that fails validation is reported as
/// [`RepositoryError::Database`].
#[async_trait]
pub trait RuleTableRepository: Send + Sync {
    /// Full rule table for `tax_year`, or [`RepositoryError::NotFound`].
    async fn get_rule_table(
        &self,
        tax_year: i32,
    ) -> Result<RuleTable, RepositoryError>;

    /// Every stored tax year, ascending.
    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError>;

    /// Inserts or fully replaces the table for `table.tax_year`.
    async fn save_rule_table(
        &self,
        table: &RuleTable,
    ) -> Result<(), RepositoryError>;

    /// Replaces the bracket schedule of one status in an existing table.
    ///
    /// The status becomes progressive if it was previously flat.
    async fn replace_brackets(
        &self,
        tax_year: i32,
        legal_status: LegalStatus,
        brackets: &[TaxBracket],
    ) -> Result<(), RepositoryError>;

    /// Removes the table for `tax_year`, or [`RepositoryError::NotFound`].
    async fn delete_rule_table(
        &self,
        tax_year: i32,
    ) -> Result<(), RepositoryError>;
}
