pub mod repository;
pub mod selection;

pub use repository::{RepositoryError, RuleTableRepository};
pub use selection::select_rule_table;
