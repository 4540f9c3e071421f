pub mod loader;

pub use loader::{RuleTableLoader, RuleTableLoaderError, TaxBracketLoader, TaxBracketRecord};
