use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ContributionKind, LegalStatus};

/// Annual mandatory contributions, computed on gross income.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parafiscales {
    pub health: Decimal,
    pub pension: Decimal,
    pub occupational_risk: Decimal,
    pub total: Decimal,
}

impl Parafiscales {
    pub fn get(
        &self,
        kind: ContributionKind,
    ) -> Decimal {
        match kind {
            ContributionKind::Health => self.health,
            ContributionKind::Pension => self.pension,
            ContributionKind::OccupationalRisk => self.occupational_risk,
        }
    }
}

/// Unrounded outcome of one calculation.
///
/// Values keep full precision; rounding happens only when the result is
/// converted for presentation (see [`crate::api::TaxResponse`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub legal_status: LegalStatus,
    pub annual_income: Decimal,
    /// Operating costs (`monthly_expenses × 12`), subtracted before deductions.
    pub annual_expenses: Decimal,
    pub deductions_applied: Decimal,
    pub taxable_income: Decimal,
    pub income_tax: Decimal,
    pub parafiscales: Parafiscales,
    pub total_tax_burden: Decimal,
    /// May be negative when the burden exceeds income.
    pub net_annual_income: Decimal,
    /// Burden as a percentage of annual income; zero when there is no income.
    pub effective_tax_rate: Decimal,
    /// Echoed from the input; no rule depends on it.
    pub patrimony: Decimal,
}
