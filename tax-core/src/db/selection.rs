//! Picking the rule table a calculation runs against.

use tracing::debug;

use crate::db::repository::{RepositoryError, RuleTableRepository};
use crate::models::RuleTable;

/// Reads the table for `tax_year` from `repo`, or the most recent stored
/// year when `tax_year` is `None`.
///
/// The table is validated again before it is returned, so a caller can hand
/// it straight to [`crate::TaxEngine::new`].
///
/// # Errors
///
/// * [`RepositoryError::NotFound`] if the year is not stored, or the store
///   is empty and no year was requested.
/// * [`RepositoryError::Database`] if the stored table is invalid.
/// * Any error the repository itself returns.
pub async fn select_rule_table<R>(
    repo: &R,
    tax_year: Option<i32>,
) -> Result<RuleTable, RepositoryError>
where
    R: RuleTableRepository + ?Sized,
{
    let year = match tax_year {
        Some(year) => year,
        None => repo
            .list_tax_years()
            .await?
            .into_iter()
            .max()
            .ok_or(RepositoryError::NotFound)?,
    };
    debug!(tax_year = year, requested = ?tax_year, "Selecting rule table");

    let table = repo.get_rule_table(year).await?;
    table.validate().map_err(|e| {
        RepositoryError::Database(format!("stored rule table for {year} is invalid: {e}"))
    })?;
    Ok(table)
}
