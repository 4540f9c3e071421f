use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{ContributionKind, DeductionCategory, LegalStatus};

/// Errors surfaced by the calculation boundary.
///
/// Once a [`crate::CalculationInput`] exists and the engine has been built
/// from a valid table, calculation itself cannot fail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalculationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("failed to encode response: {0}")]
    Encoding(String),

    #[error("rule table rejected: {0}")]
    Rules(#[from] RuleTableError),
}

/// Reasons a [`crate::RuleTable`] fails validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleTableError {
    #[error("progressive schedule for '{0}' has no brackets")]
    EmptySchedule(LegalStatus),

    #[error("schedule for '{status}' must start at 0, starts at {lower_bound}")]
    ScheduleNotFromZero {
        status: LegalStatus,
        lower_bound: Decimal,
    },

    #[error("bracket {index} for '{status}' starts at {lower_bound}, expected {expected}")]
    NonContiguous {
        status: LegalStatus,
        index: usize,
        lower_bound: Decimal,
        expected: Decimal,
    },

    #[error("bracket {index} for '{status}' has upper bound {upper_bound} not above {lower_bound}")]
    EmptyBracket {
        status: LegalStatus,
        index: usize,
        lower_bound: Decimal,
        upper_bound: Decimal,
    },

    #[error("bracket {index} for '{status}' is unbounded but is not the last bracket")]
    UnboundedInnerBracket { status: LegalStatus, index: usize },

    #[error("last bracket for '{0}' must be unbounded")]
    BoundedFinalBracket(LegalStatus),

    #[error("bracket {index} for '{status}' lowers the rate to {rate}")]
    DecreasingRate {
        status: LegalStatus,
        index: usize,
        rate: Decimal,
    },

    #[error("rate for {context} must be between 0 and 1, got {rate}")]
    RateOutOfRange { context: String, rate: Decimal },

    #[error("cap for '{}' must be non-negative, got {amount}", .category.as_str())]
    NegativeDeductionCap {
        category: DeductionCategory,
        amount: Decimal,
    },

    #[error("aggregate deduction cap maximum must be non-negative, got {0}")]
    NegativeAggregateCap(Decimal),

    #[error("contribution base for '{}' is invalid: {reason}", .kind.as_str())]
    InvalidContributionBase {
        kind: ContributionKind,
        reason: String,
    },

    #[error("UVT must be positive, got {0}")]
    InvalidUvt(Decimal),

    #[error("currency precision must be at most 10 decimal places, got {0}")]
    InvalidCurrencyDecimals(u32),
}
