//! Read-only policy data consumed by the calculation engine.
//!
//! A [`RuleTable`] holds everything that changes when the regulator publishes
//! a new year: bracket thresholds, flat rates, deduction caps and
//! contribution percentages. Computation code never embeds these numbers; it
//! asks the table through the accessors below.
//!
//! Lookups keyed by [`LegalStatus`], [`DeductionCategory`] and
//! [`ContributionKind`] go through structs with one field per variant, so
//! each accessor is an exhaustive `match` and a table can never be missing
//! an entry.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{ContributionKind, DeductionCategory, LegalStatus, TaxBracket};
use crate::error::RuleTableError;

/// How income tax is computed for one legal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaxRegime {
    /// Marginal rates over an ascending, contiguous bracket schedule.
    Progressive { brackets: Vec<TaxBracket> },
    /// A single rate over the whole taxable base.
    Flat { rate: Decimal },
}

/// Tax regime per legal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regimes {
    pub natural_person: TaxRegime,
    pub simplified_corporation: TaxRegime,
}

impl Regimes {
    pub fn get(
        &self,
        status: LegalStatus,
    ) -> &TaxRegime {
        match status {
            LegalStatus::NaturalPerson => &self.natural_person,
            LegalStatus::SimplifiedCorporation => &self.simplified_corporation,
        }
    }

    pub fn get_mut(
        &mut self,
        status: LegalStatus,
    ) -> &mut TaxRegime {
        match status {
            LegalStatus::NaturalPerson => &mut self.natural_person,
            LegalStatus::SimplifiedCorporation => &mut self.simplified_corporation,
        }
    }
}

/// Per-category deduction ceilings, in currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionCaps {
    pub afc: Decimal,
    pub mortgage_interest: Decimal,
}

impl DeductionCaps {
    pub fn get(
        &self,
        category: DeductionCategory,
    ) -> Decimal {
        match category {
            DeductionCategory::Afc => self.afc,
            DeductionCategory::MortgageInterest => self.mortgage_interest,
        }
    }

    pub fn set(
        &mut self,
        category: DeductionCategory,
        amount: Decimal,
    ) {
        match category {
            DeductionCategory::Afc => self.afc = amount,
            DeductionCategory::MortgageInterest => self.mortgage_interest = amount,
        }
    }
}

/// Ceiling on the sum of all capped deductions, as a function of income.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateDeductionCap {
    /// Fraction of gross annual income that may be deducted.
    pub income_fraction: Decimal,
    /// Absolute ceiling, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<Decimal>,
}

impl AggregateDeductionCap {
    pub fn for_income(
        &self,
        annual_income: Decimal,
    ) -> Decimal {
        let income = annual_income.max(Decimal::ZERO);
        let by_fraction = income * self.income_fraction;
        let capped = match self.max_amount {
            Some(max_amount) => by_fraction.min(max_amount),
            None => by_fraction,
        };
        capped.min(income).max(Decimal::ZERO)
    }
}

/// Rate and optional base limits for one contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRate {
    pub rate: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_base: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_base: Option<Decimal>,
}

impl ContributionRate {
    pub fn new(rate: Decimal) -> Self {
        Self {
            rate,
            min_base: None,
            max_base: None,
        }
    }

    /// Income the rate applies to.
    ///
    /// Income above `max_base` is ignored. A positive income below
    /// `min_base` is raised to it; zero income always yields a zero base.
    pub fn base_for(
        &self,
        annual_income: Decimal,
    ) -> Decimal {
        if annual_income <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let mut base = annual_income;
        if let Some(max_base) = self.max_base {
            base = base.min(max_base);
        }
        if let Some(min_base) = self.min_base {
            base = base.max(min_base);
        }
        base
    }
}

/// Contribution settings per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRates {
    pub health: ContributionRate,
    pub pension: ContributionRate,
    pub occupational_risk: ContributionRate,
}

impl ContributionRates {
    pub fn get(
        &self,
        kind: ContributionKind,
    ) -> &ContributionRate {
        match kind {
            ContributionKind::Health => &self.health,
            ContributionKind::Pension => &self.pension,
            ContributionKind::OccupationalRisk => &self.occupational_risk,
        }
    }

    pub fn get_mut(
        &mut self,
        kind: ContributionKind,
    ) -> &mut ContributionRate {
        match kind {
            ContributionKind::Health => &mut self.health,
            ContributionKind::Pension => &mut self.pension,
            ContributionKind::OccupationalRisk => &mut self.occupational_risk,
        }
    }
}

/// Complete policy data for one tax year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    pub tax_year: i32,
    /// Minor-unit precision used when presenting monetary amounts.
    #[serde(default)]
    pub currency_decimals: u32,
    /// Unidad de Valor Tributario for the year, in currency units.
    pub uvt: Decimal,
    pub regimes: Regimes,
    pub deduction_caps: DeductionCaps,
    pub aggregate_deduction_cap: AggregateDeductionCap,
    pub contributions: ContributionRates,
}

impl RuleTable {
    /// Colombian rules for tax year 2025.
    pub fn colombia_2025() -> Self {
        let uvt = dec!(47065);
        Self {
            tax_year: 2025,
            currency_decimals: 0,
            uvt,
            regimes: Regimes {
                natural_person: TaxRegime::Progressive {
                    brackets: vec![
                        TaxBracket::new(dec!(0), Some(dec!(133000000)), dec!(0.00)),
                        TaxBracket::new(dec!(133000000), Some(dec!(332500000)), dec!(0.19)),
                        TaxBracket::new(dec!(332500000), Some(dec!(874000000)), dec!(0.28)),
                        TaxBracket::new(dec!(874000000), None, dec!(0.33)),
                    ],
                },
                simplified_corporation: TaxRegime::Flat { rate: dec!(0.35) },
            },
            deduction_caps: DeductionCaps {
                afc: dec!(3800) * uvt,
                mortgage_interest: dec!(1200) * uvt,
            },
            aggregate_deduction_cap: AggregateDeductionCap {
                income_fraction: dec!(0.40),
                max_amount: Some(dec!(1340) * uvt),
            },
            contributions: ContributionRates {
                health: ContributionRate::new(dec!(0.125)),
                pension: ContributionRate::new(dec!(0.16)),
                occupational_risk: ContributionRate::new(dec!(0.00522)),
            },
        }
    }

    pub fn regime_for(
        &self,
        status: LegalStatus,
    ) -> &TaxRegime {
        self.regimes.get(status)
    }

    /// Bracket schedule for `status`, or `None` when it is taxed at a flat rate.
    pub fn brackets_for(
        &self,
        status: LegalStatus,
    ) -> Option<&[TaxBracket]> {
        match self.regimes.get(status) {
            TaxRegime::Progressive { brackets } => Some(brackets),
            TaxRegime::Flat { .. } => None,
        }
    }

    /// Flat rate for `status`, or `None` when it is taxed progressively.
    pub fn flat_rate_for(
        &self,
        status: LegalStatus,
    ) -> Option<Decimal> {
        match self.regimes.get(status) {
            TaxRegime::Flat { rate } => Some(*rate),
            TaxRegime::Progressive { .. } => None,
        }
    }

    pub fn deduction_cap(
        &self,
        category: DeductionCategory,
    ) -> Decimal {
        self.deduction_caps.get(category)
    }

    pub fn aggregate_deduction_cap(
        &self,
        annual_income: Decimal,
    ) -> Decimal {
        self.aggregate_deduction_cap.for_income(annual_income)
    }

    pub fn contribution_rate(
        &self,
        kind: ContributionKind,
    ) -> &ContributionRate {
        self.contributions.get(kind)
    }

    /// Checks every structural invariant the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuleTableError`] found.
    pub fn validate(&self) -> Result<(), RuleTableError> {
        if self.uvt <= Decimal::ZERO {
            return Err(RuleTableError::InvalidUvt(self.uvt));
        }
        if self.currency_decimals > 10 {
            return Err(RuleTableError::InvalidCurrencyDecimals(
                self.currency_decimals,
            ));
        }

        for status in LegalStatus::ALL {
            match self.regimes.get(status) {
                TaxRegime::Progressive { brackets } => validate_schedule(status, brackets)?,
                TaxRegime::Flat { rate } => {
                    check_rate(&format!("flat regime '{status}'"), *rate)?;
                }
            }
        }

        for category in [DeductionCategory::Afc, DeductionCategory::MortgageInterest] {
            let amount = self.deduction_caps.get(category);
            if amount < Decimal::ZERO {
                return Err(RuleTableError::NegativeDeductionCap { category, amount });
            }
        }

        check_rate(
            "aggregate deduction income fraction",
            self.aggregate_deduction_cap.income_fraction,
        )?;
        if let Some(max_amount) = self.aggregate_deduction_cap.max_amount {
            if max_amount < Decimal::ZERO {
                return Err(RuleTableError::NegativeAggregateCap(max_amount));
            }
        }

        for kind in ContributionKind::ALL {
            validate_contribution(kind, self.contributions.get(kind))?;
        }

        Ok(())
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::colombia_2025()
    }
}

fn check_rate(
    context: &str,
    rate: Decimal,
) -> Result<(), RuleTableError> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(RuleTableError::RateOutOfRange {
            context: context.to_string(),
            rate,
        });
    }
    Ok(())
}

fn validate_schedule(
    status: LegalStatus,
    brackets: &[TaxBracket],
) -> Result<(), RuleTableError> {
    let first = brackets
        .first()
        .ok_or(RuleTableError::EmptySchedule(status))?;
    if first.lower_bound != Decimal::ZERO {
        return Err(RuleTableError::ScheduleNotFromZero {
            status,
            lower_bound: first.lower_bound,
        });
    }

    let last_index = brackets.len() - 1;
    let mut expected_lower = Decimal::ZERO;
    let mut previous_rate = Decimal::ZERO;

    for (index, bracket) in brackets.iter().enumerate() {
        check_rate(&format!("bracket {index} of '{status}'"), bracket.rate)?;

        if bracket.lower_bound != expected_lower {
            return Err(RuleTableError::NonContiguous {
                status,
                index,
                lower_bound: bracket.lower_bound,
                expected: expected_lower,
            });
        }
        if bracket.rate < previous_rate {
            return Err(RuleTableError::DecreasingRate {
                status,
                index,
                rate: bracket.rate,
            });
        }

        match bracket.upper_bound {
            Some(_) if index == last_index => {
                return Err(RuleTableError::BoundedFinalBracket(status));
            }
            Some(upper_bound) => {
                if upper_bound <= bracket.lower_bound {
                    return Err(RuleTableError::EmptyBracket {
                        status,
                        index,
                        lower_bound: bracket.lower_bound,
                        upper_bound,
                    });
                }
                expected_lower = upper_bound;
            }
            None if index != last_index => {
                return Err(RuleTableError::UnboundedInnerBracket { status, index });
            }
            None => {}
        }

        previous_rate = bracket.rate;
    }

    Ok(())
}

fn validate_contribution(
    kind: ContributionKind,
    contribution: &ContributionRate,
) -> Result<(), RuleTableError> {
    check_rate(&format!("contribution '{}'", kind.as_str()), contribution.rate)?;

    if let Some(min_base) = contribution.min_base {
        if min_base < Decimal::ZERO {
            return Err(RuleTableError::InvalidContributionBase {
                kind,
                reason: format!("minimum base {min_base} is negative"),
            });
        }
    }
    if let Some(max_base) = contribution.max_base {
        if max_base < Decimal::ZERO {
            return Err(RuleTableError::InvalidContributionBase {
                kind,
                reason: format!("maximum base {max_base} is negative"),
            });
        }
    }
    if let (Some(min_base), Some(max_base)) = (contribution.min_base, contribution.max_base) {
        if min_base > max_base {
            return Err(RuleTableError::InvalidContributionBase {
                kind,
                reason: format!("minimum base {min_base} exceeds maximum base {max_base}"),
            });
        }
    }
    Ok(())
}
