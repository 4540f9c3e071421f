//! Tax and contribution calculators.
//!
//! Each stage is usable on its own; [`TaxEngine`] composes them into a full
//! [`crate::CalculationResult`].

pub mod common;
pub mod contributions;
pub mod deductions;
pub mod engine;
pub mod income_tax;

pub use contributions::ContributionCalculator;
pub use deductions::DeductionResolver;
pub use engine::TaxEngine;
pub use income_tax::{IncomeTaxCalculator, flat_tax, progressive_tax};
