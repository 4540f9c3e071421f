//! Deduction Resolver.
//!
//! Computes the deductible amount a filer may subtract from the taxable
//! base. Each category is first limited by its own cap, then the sum is
//! limited by the aggregate cap for the filer's gross annual income.
//!
//! Operating expenses (`monthly_expenses × 12`) are not a deduction here;
//! the engine subtracts them from gross income before this stage.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::calculations::common::{annualize, non_negative};
use crate::models::{CalculationInput, DeductionCategory, RuleTable};

/// Resolves capped deductions against a [`RuleTable`].
#[derive(Debug, Clone, Copy)]
pub struct DeductionResolver<'a> {
    rules: &'a RuleTable,
}

impl<'a> DeductionResolver<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self { rules }
    }

    /// Total deduction for `input`.
    ///
    /// Only categories allowed for the input's legal status are considered;
    /// amounts supplied for other categories are ignored. The result is
    /// never negative and never above the gross annual income.
    pub fn resolve(
        &self,
        input: &CalculationInput,
    ) -> Decimal {
        let annual_income = annualize(input.monthly_income);

        let claimed: Decimal = input
            .legal_status
            .deduction_categories()
            .iter()
            .map(|&category| self.capped_amount(category, claimed_amount(input, category)))
            .sum();

        let aggregate_cap = self.rules.aggregate_deduction_cap(annual_income);
        if claimed > aggregate_cap {
            warn!(
                claimed = %claimed,
                aggregate_cap = %aggregate_cap,
                annual_income = %annual_income,
                "Deductions exceed aggregate cap; clamping"
            );
        }

        let applied = claimed.min(aggregate_cap).min(annual_income);
        debug!(
            legal_status = %input.legal_status,
            deductions_applied = %applied,
            "Resolved deductions"
        );
        non_negative(applied)
    }

    /// Amount of one category after applying its cap.
    fn capped_amount(
        &self,
        category: DeductionCategory,
        amount: Decimal,
    ) -> Decimal {
        let amount = non_negative(amount);
        let cap = self.rules.deduction_cap(category);
        if amount > cap {
            warn!(
                category = category.as_str(),
                amount = %amount,
                cap = %cap,
                "Deduction above category cap; clamping"
            );
        }
        amount.min(cap)
    }
}

fn claimed_amount(
    input: &CalculationInput,
    category: DeductionCategory,
) -> Decimal {
    match category {
        DeductionCategory::Afc => input.afc_contributions,
        DeductionCategory::MortgageInterest => input.mortgage_interest,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::LegalStatus;

    fn natural(monthly_income: Decimal) -> CalculationInput {
        CalculationInput::new(LegalStatus::NaturalPerson, monthly_income)
    }

    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    // =========================================================================
    // capped_amount tests
    // =========================================================================

    #[test]
    fn capped_amount_passes_values_under_cap() {
        let rules = RuleTable::colombia_2025();
        let resolver = DeductionResolver::new(&rules);

        assert_eq!(
            resolver.capped_amount(DeductionCategory::Afc, dec!(10000000)),
            dec!(10000000)
        );
    }

    #[test]
    fn capped_amount_clamps_to_category_cap() {
        let _guard = init_test_tracing();
        let rules = RuleTable::colombia_2025();
        let resolver = DeductionResolver::new(&rules);

        assert_eq!(
            resolver.capped_amount(DeductionCategory::MortgageInterest, dec!(90000000)),
            dec!(56478000)
        );
    }

    #[test]
    fn capped_amount_treats_negative_as_zero() {
        let rules = RuleTable::colombia_2025();
        let resolver = DeductionResolver::new(&rules);

        assert_eq!(
            resolver.capped_amount(DeductionCategory::Afc, dec!(-500)),
            dec!(0)
        );
    }

    // =========================================================================
    // resolve tests
    // =========================================================================

    #[test]
    fn resolve_sums_categories_under_all_caps() {
        let rules = RuleTable::colombia_2025();
        let input = natural(dec!(5000000))
            .with_afc_contributions(dec!(10000000))
            .with_mortgage_interest(dec!(5000000));

        let result = DeductionResolver::new(&rules).resolve(&input);

        assert_eq!(result, dec!(15000000));
    }

    #[test]
    fn resolve_clamps_sum_to_aggregate_cap() {
        let _guard = init_test_tracing();
        let rules = RuleTable::colombia_2025();
        // Annual income 24M, aggregate cap 40% = 9.6M.
        let input = natural(dec!(2000000))
            .with_afc_contributions(dec!(8000000))
            .with_mortgage_interest(dec!(4000000));

        let result = DeductionResolver::new(&rules).resolve(&input);

        assert_eq!(result, dec!(9600000));
    }

    #[test]
    fn resolve_ignores_deductions_for_simplified_corporation() {
        let rules = RuleTable::colombia_2025();
        let input = CalculationInput::new(LegalStatus::SimplifiedCorporation, dec!(5000000))
            .with_afc_contributions(dec!(10000000))
            .with_mortgage_interest(dec!(5000000));

        let result = DeductionResolver::new(&rules).resolve(&input);

        assert_eq!(result, dec!(0));
    }

    #[test]
    fn resolve_is_zero_without_income() {
        let rules = RuleTable::colombia_2025();
        let input = natural(dec!(0)).with_afc_contributions(dec!(10000000));

        let result = DeductionResolver::new(&rules).resolve(&input);

        assert_eq!(result, dec!(0));
    }

    #[test]
    fn resolve_never_exceeds_income_even_with_generous_table() {
        let mut rules = RuleTable::colombia_2025();
        rules.aggregate_deduction_cap.income_fraction = dec!(1);
        rules.aggregate_deduction_cap.max_amount = None;
        let input = natural(dec!(1000))
            .with_afc_contributions(dec!(50000))
            .with_mortgage_interest(dec!(50000));

        let result = DeductionResolver::new(&rules).resolve(&input);

        assert_eq!(result, dec!(12000));
    }

    #[test]
    fn resolve_above_caps_equals_resolve_at_caps() {
        let rules = RuleTable::colombia_2025();
        let resolver = DeductionResolver::new(&rules);
        let at_caps = natural(dec!(80000000))
            .with_afc_contributions(rules.deduction_cap(DeductionCategory::Afc))
            .with_mortgage_interest(rules.deduction_cap(DeductionCategory::MortgageInterest));
        let above_caps = natural(dec!(80000000))
            .with_afc_contributions(dec!(999999999999))
            .with_mortgage_interest(dec!(999999999999));

        assert_eq!(resolver.resolve(&above_caps), resolver.resolve(&at_caps));
    }
}
