use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CalculationError;

/// Declared legal status of the person being taxed.
///
/// The set is closed: every component that branches on status does so with an
/// exhaustive `match`, so adding a variant is a compile error until each rule
/// lookup handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LegalStatus {
    /// Persona natural, taxed on a progressive bracket schedule.
    #[serde(rename = "natural")]
    NaturalPerson,
    /// Sociedad por acciones simplificada, taxed at a flat rate.
    #[serde(rename = "sas")]
    SimplifiedCorporation,
}

impl LegalStatus {
    pub const ALL: [LegalStatus; 2] = [Self::NaturalPerson, Self::SimplifiedCorporation];

    /// Wire code used by the JSON boundary and the CSV loaders.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NaturalPerson => "natural",
            Self::SimplifiedCorporation => "sas",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "natural" => Some(Self::NaturalPerson),
            "sas" => Some(Self::SimplifiedCorporation),
            _ => None,
        }
    }

    /// Deduction categories a filer with this status may claim.
    pub fn deduction_categories(&self) -> &'static [DeductionCategory] {
        match self {
            Self::NaturalPerson => &[DeductionCategory::Afc, DeductionCategory::MortgageInterest],
            Self::SimplifiedCorporation => &[],
        }
    }
}

impl fmt::Display for LegalStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LegalStatus {
    type Err = CalculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            CalculationError::InvalidInput(format!(
                "unknown legal status '{s}'; expected \"natural\" or \"sas\""
            ))
        })
    }
}

/// Deductible expense category with its own cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionCategory {
    /// Voluntary savings in an AFC account.
    Afc,
    /// Interest paid on a home mortgage.
    MortgageInterest,
}

impl DeductionCategory {
    pub const ALL: [DeductionCategory; 2] = [Self::Afc, Self::MortgageInterest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Afc => "afc",
            Self::MortgageInterest => "mortgage_interest",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "afc" => Some(Self::Afc),
            "mortgage_interest" => Some(Self::MortgageInterest),
            _ => None,
        }
    }
}

/// Mandatory contribution ("parafiscal") computed on gross income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionKind {
    /// Salud.
    Health,
    /// Pensión.
    Pension,
    /// ARL (riesgos laborales).
    OccupationalRisk,
}

impl ContributionKind {
    pub const ALL: [ContributionKind; 3] = [Self::Health, Self::Pension, Self::OccupationalRisk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Pension => "pension",
            Self::OccupationalRisk => "occupational_risk",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "health" => Some(Self::Health),
            "pension" => Some(Self::Pension),
            "occupational_risk" => Some(Self::OccupationalRisk),
            _ => None,
        }
    }
}
