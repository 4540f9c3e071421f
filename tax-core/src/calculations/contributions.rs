//! Contribution Computation ("parafiscales").
//!
//! Health, pension and occupational-risk contributions are each a rate over
//! gross annual income. They do not depend on legal status or deductions.

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::{ContributionKind, Parafiscales, RuleTable};

#[derive(Debug, Clone, Copy)]
pub struct ContributionCalculator<'a> {
    rules: &'a RuleTable,
}

impl<'a> ContributionCalculator<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self { rules }
    }

    /// Annual contributions on `annual_income`.
    pub fn compute(
        &self,
        annual_income: Decimal,
    ) -> Parafiscales {
        let health = self.component(ContributionKind::Health, annual_income);
        let pension = self.component(ContributionKind::Pension, annual_income);
        let occupational_risk = self.component(ContributionKind::OccupationalRisk, annual_income);
        let total = health + pension + occupational_risk;

        debug!(
            annual_income = %annual_income,
            health = %health,
            pension = %pension,
            occupational_risk = %occupational_risk,
            total = %total,
            "Computed parafiscales"
        );

        Parafiscales {
            health,
            pension,
            occupational_risk,
            total,
        }
    }

    fn component(
        &self,
        kind: ContributionKind,
        annual_income: Decimal,
    ) -> Decimal {
        let contribution = self.rules.contribution_rate(kind);
        contribution.base_for(annual_income) * contribution.rate
    }
}
