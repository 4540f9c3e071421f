pub mod api;
pub mod calculations;
pub mod db;
pub mod error;
pub mod models;

pub use api::{TaxRequest, TaxResponse, calculate_json};
pub use calculations::TaxEngine;
pub use db::{RepositoryError, RuleTableRepository, select_rule_table};
pub use error::{CalculationError, RuleTableError};
pub use models::*;
