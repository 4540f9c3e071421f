mod calculation_input;
mod calculation_result;
mod legal_status;
mod rule_table;
mod tax_bracket;

pub use calculation_input::CalculationInput;
pub use calculation_result::{CalculationResult, Parafiscales};
pub use legal_status::{ContributionKind, DeductionCategory, LegalStatus};
pub use rule_table::{
    AggregateDeductionCap, ContributionRate, ContributionRates, DeductionCaps, Regimes,
    RuleTable, TaxRegime,
};
pub use tax_bracket::TaxBracket;
