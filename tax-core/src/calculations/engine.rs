//! Aggregator: composes deductions, income tax and contributions into a
//! [`CalculationResult`].
//!
//! # Flow
//!
//! | Step | Value |
//! |------|-------|
//! | 1 | `annual_income = monthly_income × 12` |
//! | 2 | `annual_expenses = monthly_expenses × 12` |
//! | 3 | `deductions_applied` from [`DeductionResolver`] |
//! | 4 | `taxable_income = max(0, annual_income − annual_expenses − deductions_applied)` |
//! | 5 | `income_tax` from [`IncomeTaxCalculator`] |
//! | 6 | `parafiscales` from [`ContributionCalculator`] on `annual_income` |
//! | 7 | `total_tax_burden = income_tax + parafiscales.total` |
//! | 8 | `net_annual_income = annual_income − total_tax_burden` (not clamped) |
//! | 9 | `effective_tax_rate = total_tax_burden / annual_income × 100`, or 0 |
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::calculations::TaxEngine;
//! use tax_core::{CalculationInput, LegalStatus, RuleTable};
//!
//! let rules = RuleTable::colombia_2025();
//! let engine = TaxEngine::new(&rules).unwrap();
//!
//! let input = CalculationInput::new(LegalStatus::SimplifiedCorporation, dec!(5000000))
//!     .with_monthly_expenses(dec!(2000000));
//! let result = engine.calculate(&input);
//!
//! assert_eq!(result.taxable_income, dec!(36000000));
//! assert_eq!(result.income_tax, dec!(12600000));
//! ```

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::calculations::common::{annualize, non_negative, percentage_of};
use crate::calculations::{ContributionCalculator, DeductionResolver, IncomeTaxCalculator};
use crate::error::RuleTableError;
use crate::models::{CalculationInput, CalculationResult, RuleTable};

/// Stateless calculator bound to a validated [`RuleTable`].
///
/// Holds only a shared reference, so one engine can serve any number of
/// concurrent callers.
#[derive(Debug, Clone, Copy)]
pub struct TaxEngine<'a> {
    rules: &'a RuleTable,
}

impl<'a> TaxEngine<'a> {
    /// Validates `rules` and returns an engine over them.
    ///
    /// # Errors
    ///
    /// Returns [`RuleTableError`] if the table is structurally invalid.
    pub fn new(rules: &'a RuleTable) -> Result<Self, RuleTableError> {
        rules.validate()?;
        debug!(tax_year = rules.tax_year, "Rule table validated");
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &'a RuleTable {
        self.rules
    }

    /// Runs the full calculation for `input`.
    pub fn calculate(
        &self,
        input: &CalculationInput,
    ) -> CalculationResult {
        let annual_income = annualize(input.monthly_income);
        let annual_expenses = annualize(input.monthly_expenses);

        let deductions_applied = DeductionResolver::new(self.rules).resolve(input);
        let taxable_income = non_negative(annual_income - annual_expenses - deductions_applied);

        let income_tax =
            IncomeTaxCalculator::new(self.rules).compute_tax(input.legal_status, taxable_income);
        let parafiscales = ContributionCalculator::new(self.rules).compute(annual_income);

        let total_tax_burden = income_tax + parafiscales.total;
        let net_annual_income = annual_income - total_tax_burden;
        let effective_tax_rate = percentage_of(total_tax_burden, annual_income);

        if net_annual_income < Decimal::ZERO {
            warn!(
                annual_income = %annual_income,
                total_tax_burden = %total_tax_burden,
                net_annual_income = %net_annual_income,
                "Tax burden exceeds annual income"
            );
        }

        debug!(
            legal_status = %input.legal_status,
            annual_income = %annual_income,
            annual_expenses = %annual_expenses,
            deductions_applied = %deductions_applied,
            taxable_income = %taxable_income,
            income_tax = %income_tax,
            total_tax_burden = %total_tax_burden,
            patrimony = %input.patrimony,
            "Calculation complete"
        );

        CalculationResult {
            legal_status: input.legal_status,
            annual_income,
            annual_expenses,
            deductions_applied,
            taxable_income,
            income_tax,
            parafiscales,
            total_tax_burden,
            net_annual_income,
            effective_tax_rate,
            patrimony: input.patrimony,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{
        ContributionKind, DeductionCategory, LegalStatus, Parafiscales, TaxBracket, TaxRegime,
    };

    fn scenario_input(legal_status: LegalStatus) -> CalculationInput {
        CalculationInput::new(legal_status, dec!(5000000))
            .with_monthly_expenses(dec!(2000000))
            .with_afc_contributions(dec!(10000000))
            .with_mortgage_interest(dec!(5000000))
            .with_patrimony(dec!(100000000))
    }

    // =========================================================================
    // construction
    // =========================================================================

    #[test]
    fn new_rejects_invalid_table() {
        let mut rules = RuleTable::colombia_2025();
        rules.regimes.natural_person = TaxRegime::Progressive { brackets: vec![] };

        assert_eq!(
            TaxEngine::new(&rules).err(),
            Some(RuleTableError::EmptySchedule(LegalStatus::NaturalPerson))
        );
    }

    // =========================================================================
    // scenarios
    // =========================================================================

    #[test]
    fn natural_person_scenario() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();

        let result = engine.calculate(&scenario_input(LegalStatus::NaturalPerson));

        assert_eq!(
            result,
            CalculationResult {
                legal_status: LegalStatus::NaturalPerson,
                annual_income: dec!(60000000),
                annual_expenses: dec!(24000000),
                deductions_applied: dec!(15000000),
                taxable_income: dec!(21000000),
                income_tax: dec!(0),
                parafiscales: Parafiscales {
                    health: dec!(7500000),
                    pension: dec!(9600000),
                    occupational_risk: dec!(313200),
                    total: dec!(17413200),
                },
                total_tax_burden: dec!(17413200),
                net_annual_income: dec!(42586800),
                effective_tax_rate: dec!(29.022),
                patrimony: dec!(100000000),
            }
        );
    }

    #[test]
    fn simplified_corporation_scenario() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();

        let result = engine.calculate(&scenario_input(LegalStatus::SimplifiedCorporation));

        assert_eq!(result.deductions_applied, dec!(0));
        assert_eq!(result.taxable_income, dec!(36000000));
        assert_eq!(result.income_tax, result.taxable_income * dec!(0.35));
        assert_eq!(result.income_tax, dec!(12600000));
        assert_eq!(result.total_tax_burden, dec!(30013200));
        assert_eq!(result.net_annual_income, dec!(29986800));
        assert_eq!(result.effective_tax_rate, dec!(50.022));
    }

    #[test]
    fn zero_income_yields_all_zero_outputs() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();

        for status in LegalStatus::ALL {
            let result = engine.calculate(&CalculationInput::new(status, dec!(0)));

            assert_eq!(result.annual_income, dec!(0));
            assert_eq!(result.taxable_income, dec!(0));
            assert_eq!(result.income_tax, dec!(0));
            assert_eq!(result.deductions_applied, dec!(0));
            assert_eq!(result.parafiscales, Parafiscales::default());
            assert_eq!(result.total_tax_burden, dec!(0));
            assert_eq!(result.net_annual_income, dec!(0));
            assert_eq!(result.effective_tax_rate, dec!(0));
        }
    }

    #[test]
    fn negative_income_is_treated_as_zero() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();

        let result = engine.calculate(&CalculationInput::new(
            LegalStatus::NaturalPerson,
            dec!(-1000),
        ));

        assert_eq!(result.annual_income, dec!(0));
        assert_eq!(result.effective_tax_rate, dec!(0));
    }

    #[test]
    fn extreme_amounts_are_bounded_instead_of_overflowing() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();

        for legal_status in [LegalStatus::NaturalPerson, LegalStatus::SimplifiedCorporation] {
            let input = CalculationInput::new(legal_status, Decimal::MAX)
                .with_afc_contributions(Decimal::MAX)
                .with_mortgage_interest(Decimal::MAX);

            let result = engine.calculate(&input);

            assert_eq!(result.annual_income, dec!(1200000000000000000000));
            assert!(result.income_tax > dec!(0));
            assert!(result.net_annual_income > dec!(0));
        }
    }

    #[test]
    fn expenses_above_income_floor_taxable_base_at_zero() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();
        let input = CalculationInput::new(LegalStatus::SimplifiedCorporation, dec!(1000000))
            .with_monthly_expenses(dec!(3000000));

        let result = engine.calculate(&input);

        assert_eq!(result.taxable_income, dec!(0));
        assert_eq!(result.income_tax, dec!(0));
    }

    #[test]
    fn negative_net_income_is_surfaced() {
        let mut rules = RuleTable::colombia_2025();
        rules.contributions.health.rate = dec!(0.6);
        rules.contributions.pension.rate = dec!(0.5);
        let engine = TaxEngine::new(&rules).unwrap();

        let result = engine.calculate(&CalculationInput::new(
            LegalStatus::NaturalPerson,
            dec!(1000),
        ));

        assert!(result.net_annual_income < Decimal::ZERO);
        assert_eq!(
            result.net_annual_income,
            result.annual_income - result.total_tax_burden
        );
    }

    // =========================================================================
    // properties
    // =========================================================================

    #[test]
    fn calculate_is_idempotent() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();
        let input = scenario_input(LegalStatus::NaturalPerson);

        assert_eq!(engine.calculate(&input), engine.calculate(&input));
    }

    #[test]
    fn income_tax_never_decreases_as_income_rises() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();
        let mut previous = Decimal::ZERO;
        let mut monthly_income = dec!(0);

        while monthly_income <= dec!(120000000) {
            let input = scenario_input(LegalStatus::NaturalPerson);
            let input = CalculationInput {
                monthly_income,
                ..input
            };
            let tax = engine.calculate(&input).income_tax;
            assert!(
                tax >= previous,
                "income tax fell from {previous} to {tax} at monthly income {monthly_income}"
            );
            previous = tax;
            monthly_income += dec!(750000);
        }
    }

    #[test]
    fn deductions_above_caps_match_deductions_at_caps() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();
        let at_caps = CalculationInput::new(LegalStatus::NaturalPerson, dec!(40000000))
            .with_afc_contributions(rules.deduction_cap(DeductionCategory::Afc))
            .with_mortgage_interest(rules.deduction_cap(DeductionCategory::MortgageInterest));
        let above_caps = at_caps
            .clone()
            .with_afc_contributions(dec!(10000000000))
            .with_mortgage_interest(dec!(10000000000));

        assert_eq!(
            engine.calculate(&above_caps).deductions_applied,
            engine.calculate(&at_caps).deductions_applied
        );
    }

    #[test]
    fn flat_rate_is_exact_for_simplified_corporation() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();
        let rate = rules.flat_rate_for(LegalStatus::SimplifiedCorporation).unwrap();

        for monthly_income in [dec!(1), dec!(833333.33), dec!(5000000), dec!(987654321.09)] {
            let result = engine.calculate(&CalculationInput::new(
                LegalStatus::SimplifiedCorporation,
                monthly_income,
            ));
            assert_eq!(result.income_tax, result.taxable_income * rate);
        }
    }

    #[test]
    fn contributions_ignore_status_and_deductions() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();
        let bare = CalculationInput::new(LegalStatus::NaturalPerson, dec!(5000000));

        let baseline = engine.calculate(&bare).parafiscales;

        assert_eq!(
            engine.calculate(&scenario_input(LegalStatus::NaturalPerson)).parafiscales,
            baseline
        );
        assert_eq!(
            engine
                .calculate(&scenario_input(LegalStatus::SimplifiedCorporation))
                .parafiscales,
            baseline
        );
    }

    #[test]
    fn patrimony_does_not_change_any_computed_amount() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();
        let poor = scenario_input(LegalStatus::NaturalPerson).with_patrimony(dec!(0));
        let rich = scenario_input(LegalStatus::NaturalPerson).with_patrimony(dec!(9000000000));

        let poor_result = engine.calculate(&poor);
        let rich_result = engine.calculate(&rich);

        assert_eq!(
            CalculationResult {
                patrimony: rich_result.patrimony,
                ..poor_result
            },
            rich_result
        );
    }

    #[test]
    fn progressive_tax_is_charged_above_zero_rate_band() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();
        // 25M/month → 300M annual; expenses and deductions zero.
        let result = engine.calculate(&CalculationInput::new(
            LegalStatus::NaturalPerson,
            dec!(25000000),
        ));

        assert_eq!(result.taxable_income, dec!(300000000));
        assert_eq!(result.income_tax, dec!(31730000));
    }

    #[test]
    fn engine_can_be_shared_across_threads() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();
        let expected = engine.calculate(&scenario_input(LegalStatus::NaturalPerson));

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| engine.calculate(&scenario_input(LegalStatus::NaturalPerson)))
                })
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn single_bracket_table_behaves_as_flat_rate() {
        let mut rules = RuleTable::colombia_2025();
        rules.regimes.natural_person = TaxRegime::Progressive {
            brackets: vec![TaxBracket::new(dec!(0), None, dec!(0.10))],
        };
        rules.contributions.get_mut(ContributionKind::Health).rate = dec!(0);
        let engine = TaxEngine::new(&rules).unwrap();

        let result = engine.calculate(&CalculationInput::new(
            LegalStatus::NaturalPerson,
            dec!(1000),
        ));

        assert_eq!(result.income_tax, dec!(1200));
    }
}
