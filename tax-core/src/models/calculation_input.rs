use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::LegalStatus;

/// A person's declared financial status for one calculation.
///
/// Monthly amounts are annualized by the engine; `afc_contributions` and
/// `mortgage_interest` are already annual. `patrimony` is accepted and
/// carried through but no rule consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationInput {
    pub legal_status: LegalStatus,
    pub monthly_income: Decimal,
    pub monthly_expenses: Decimal,
    pub afc_contributions: Decimal,
    pub mortgage_interest: Decimal,
    pub patrimony: Decimal,
}

impl CalculationInput {
    /// Input with the given status and income and every other amount at zero.
    pub fn new(
        legal_status: LegalStatus,
        monthly_income: Decimal,
    ) -> Self {
        Self {
            legal_status,
            monthly_income,
            monthly_expenses: Decimal::ZERO,
            afc_contributions: Decimal::ZERO,
            mortgage_interest: Decimal::ZERO,
            patrimony: Decimal::ZERO,
        }
    }

    pub fn with_monthly_expenses(
        mut self,
        amount: Decimal,
    ) -> Self {
        self.monthly_expenses = amount;
        self
    }

    pub fn with_afc_contributions(
        mut self,
        amount: Decimal,
    ) -> Self {
        self.afc_contributions = amount;
        self
    }

    pub fn with_mortgage_interest(
        mut self,
        amount: Decimal,
    ) -> Self {
        self.mortgage_interest = amount;
        self
    }

    pub fn with_patrimony(
        mut self,
        amount: Decimal,
    ) -> Self {
        self.patrimony = amount;
        self
    }
}
