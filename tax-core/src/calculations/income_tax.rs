//! Income tax over the taxable base.
//!
//! | Regime      | Tax |
//! |-------------|-----|
//! | Progressive | Σ over brackets of `(min(taxable, upper) − lower) × rate` |
//! | Flat        | `taxable × rate` |
//!
//! Brackets are walked in ascending order. A 0% bracket still consumes its
//! slice of income. No rounding happens here.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::calculations::IncomeTaxCalculator;
//! use tax_core::{LegalStatus, RuleTable};
//!
//! let rules = RuleTable::colombia_2025();
//! let calculator = IncomeTaxCalculator::new(&rules);
//!
//! // 200M: (200M − 133M) × 19%
//! let tax = calculator.compute_tax(LegalStatus::NaturalPerson, dec!(200000000));
//! assert_eq!(tax, dec!(12730000));
//!
//! let tax = calculator.compute_tax(LegalStatus::SimplifiedCorporation, dec!(36000000));
//! assert_eq!(tax, dec!(12600000));
//! ```

use rust_decimal::Decimal;
use tracing::debug;

use crate::calculations::common::non_negative;
use crate::models::{LegalStatus, RuleTable, TaxBracket, TaxRegime};

/// Applies the regime configured for a legal status.
#[derive(Debug, Clone, Copy)]
pub struct IncomeTaxCalculator<'a> {
    rules: &'a RuleTable,
}

impl<'a> IncomeTaxCalculator<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self { rules }
    }

    /// Income tax owed on `taxable_income` for `legal_status`.
    ///
    /// A negative taxable income is treated as zero.
    pub fn compute_tax(
        &self,
        legal_status: LegalStatus,
        taxable_income: Decimal,
    ) -> Decimal {
        let taxable_income = non_negative(taxable_income);
        let tax = match self.rules.regime_for(legal_status) {
            TaxRegime::Progressive { brackets } => progressive_tax(brackets, taxable_income),
            TaxRegime::Flat { rate } => flat_tax(*rate, taxable_income),
        };
        debug!(
            legal_status = %legal_status,
            taxable_income = %taxable_income,
            income_tax = %tax,
            "Computed income tax"
        );
        tax
    }
}

/// Sums the tax owed in each bracket that overlaps `[0, taxable_income)`.
pub fn progressive_tax(
    brackets: &[TaxBracket],
    taxable_income: Decimal,
) -> Decimal {
    brackets
        .iter()
        .take_while(|bracket| taxable_income > bracket.lower_bound)
        .map(|bracket| bracket.slice_of(taxable_income) * bracket.rate)
        .sum()
}

pub fn flat_tax(
    rate: Decimal,
    taxable_income: Decimal,
) -> Decimal {
    taxable_income * rate
}
