//! JSON boundary consumed by front ends.
//!
//! ## Request
//!
//! | Field               | Type            | Notes |
//! |---------------------|-----------------|-------|
//! | `legal_status`      | string          | `"natural"` or `"sas"`; anything else is rejected |
//! | `monthly_income`    | number / string | |
//! | `monthly_expenses`  | number / string | |
//! | `afc_contributions` | number / string | annual |
//! | `mortgage_interest` | number / string | annual |
//! | `patrimony`         | number / string | accepted, unused |
//!
//! Numeric fields are permissive: absent, `null`, non-numeric or negative
//! values become 0, and amounts above [`MAX_AMOUNT`] become [`MAX_AMOUNT`].
//! A comma is only read as a thousands separator (`"5,000,000"`); a decimal
//! comma such as `"5000000,50"` is non-numeric. Validation beyond that
//! belongs to the caller.
//!
//! ## Response
//!
//! ```json
//! {
//!   "annual_income": 60000000.0,
//!   "taxable_income": 21000000.0,
//!   "income_tax": 0.0,
//!   "parafiscales": { "salud": 7500000.0, "pension": 9600000.0, "arl": 313200.0, "total": 17413200.0 },
//!   "total_tax_burden": 17413200.0,
//!   "net_annual_income": 42586800.0,
//!   "effective_tax_rate": 29.02,
//!   "deductions_applied": 15000000.0
//! }
//! ```

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::calculations::TaxEngine;
use crate::calculations::common::{MAX_AMOUNT, round_half_up, round_rate};
use crate::error::CalculationError;
use crate::models::{CalculationInput, CalculationResult, LegalStatus};

/// Raw request as received from a front end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRequest {
    #[serde(default, deserialize_with = "lenient_status")]
    pub legal_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub monthly_income: Decimal,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub monthly_expenses: Decimal,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub afc_contributions: Decimal,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub mortgage_interest: Decimal,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub patrimony: Decimal,
}

impl TaxRequest {
    /// Parses a JSON document into a request.
    ///
    /// # Errors
    ///
    /// [`CalculationError::MalformedRequest`] when `json` is not a JSON object.
    pub fn from_json(json: &str) -> Result<Self, CalculationError> {
        serde_json::from_str(json).map_err(|e| CalculationError::MalformedRequest(e.to_string()))
    }

    /// Resolves the legal status and produces engine input.
    ///
    /// # Errors
    ///
    /// [`CalculationError::InvalidInput`] when `legal_status` is missing or
    /// not a recognised code.
    pub fn into_input(self) -> Result<CalculationInput, CalculationError> {
        let legal_status: LegalStatus = self
            .legal_status
            .as_deref()
            .ok_or_else(|| CalculationError::InvalidInput("legal_status is required".to_string()))?
            .parse()?;

        Ok(CalculationInput {
            legal_status,
            monthly_income: self.monthly_income,
            monthly_expenses: self.monthly_expenses,
            afc_contributions: self.afc_contributions,
            mortgage_interest: self.mortgage_interest,
            patrimony: self.patrimony,
        })
    }
}

/// Contribution breakdown in the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParafiscalesDetail {
    #[serde(with = "rust_decimal::serde::float")]
    pub salud: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub pension: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub arl: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

/// Presentation form of a [`CalculationResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub annual_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub taxable_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub income_tax: Decimal,
    pub parafiscales: ParafiscalesDetail,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_tax_burden: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net_annual_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub effective_tax_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub deductions_applied: Decimal,
}

impl TaxResponse {
    /// Rounds every field of `result` for display.
    ///
    /// Monetary amounts are rounded to `currency_decimals` places and the
    /// effective rate to two, each from its own unrounded value.
    pub fn from_result(
        result: &CalculationResult,
        currency_decimals: u32,
    ) -> Self {
        let money = |value: Decimal| round_half_up(value, currency_decimals);
        Self {
            annual_income: money(result.annual_income),
            taxable_income: money(result.taxable_income),
            income_tax: money(result.income_tax),
            parafiscales: ParafiscalesDetail {
                salud: money(result.parafiscales.health),
                pension: money(result.parafiscales.pension),
                arl: money(result.parafiscales.occupational_risk),
                total: money(result.parafiscales.total),
            },
            total_tax_burden: money(result.total_tax_burden),
            net_annual_income: money(result.net_annual_income),
            effective_tax_rate: round_rate(result.effective_tax_rate),
            deductions_applied: money(result.deductions_applied),
        }
    }
}

/// Parses `request_json`, runs `engine` and returns the response JSON.
///
/// # Errors
///
/// * [`CalculationError::MalformedRequest`] if the body is not a JSON object.
/// * [`CalculationError::InvalidInput`] if the legal status is missing or unknown.
pub fn calculate_json(
    engine: &TaxEngine<'_>,
    request_json: &str,
) -> Result<String, CalculationError> {
    let response = calculate_request(engine, TaxRequest::from_json(request_json)?)?;
    serde_json::to_string(&response).map_err(|e| CalculationError::Encoding(e.to_string()))
}

/// Runs `engine` over an already-parsed request.
///
/// # Errors
///
/// [`CalculationError::InvalidInput`] if the legal status is missing or unknown.
pub fn calculate_request(
    engine: &TaxEngine<'_>,
    request: TaxRequest,
) -> Result<TaxResponse, CalculationError> {
    let input = request.into_input()?;
    let result = engine.calculate(&input);
    Ok(TaxResponse::from_result(
        &result,
        engine.rules().currency_decimals,
    ))
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    })
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_amount(&value))
}

/// Best-effort conversion of a JSON value to a non-negative amount.
fn coerce_amount(value: &Value) -> Decimal {
    let parsed = match value {
        Value::Null => return Decimal::ZERO,
        Value::Number(number) => parse_decimal(&number.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => None,
    };

    match parsed {
        Some(amount) if amount > MAX_AMOUNT => {
            warn!(value = %amount, limit = %MAX_AMOUNT, "Amount above limit clamped");
            MAX_AMOUNT
        }
        Some(amount) if amount >= Decimal::ZERO => amount,
        Some(amount) => {
            warn!(value = %amount, "Negative amount coerced to 0");
            Decimal::ZERO
        }
        None => {
            warn!(value = %value, "Non-numeric amount coerced to 0");
            Decimal::ZERO
        }
    }
}

/// Parses plain or scientific notation, tolerating well-formed thousands
/// separators. Empty input parses as zero.
fn parse_decimal(s: &str) -> Option<Decimal> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(Decimal::ZERO);
    }
    let normalized = strip_thousands_separators(trimmed)?;
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

/// Removes commas from the integer part when they group digits in threes
/// (`1,234,567.89`). Any other comma makes the text non-numeric.
fn strip_thousands_separators(s: &str) -> Option<String> {
    if !s.contains(',') {
        return Some(s.to_string());
    }

    let (integer, fraction) = match s.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (s, None),
    };
    if fraction.is_some_and(|f| f.contains(',')) {
        return None;
    }

    let digits = integer.strip_prefix(['-', '+']).unwrap_or(integer);
    let mut groups = digits.split(',');
    let leading = groups.next()?;
    let is_digits = |g: &str| g.bytes().all(|b| b.is_ascii_digit());
    if leading.is_empty() || leading.len() > 3 || !is_digits(leading) {
        return None;
    }
    if !groups.all(|g| g.len() == 3 && is_digits(g)) {
        return None;
    }

    Some(s.replace(',', ""))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;
    use crate::models::RuleTable;

    const SCENARIO_NATURAL: &str = r#"{
        "legal_status": "natural",
        "monthly_income": 5000000,
        "monthly_expenses": 2000000,
        "afc_contributions": 10000000,
        "mortgage_interest": 5000000,
        "patrimony": 100000000
    }"#;

    // =========================================================================
    // request parsing
    // =========================================================================

    #[test]
    fn from_json_reads_numbers_and_strings() {
        let request = TaxRequest::from_json(
            r#"{"legal_status":"sas","monthly_income":"5,000,000","monthly_expenses":2000000.5}"#,
        )
        .unwrap();

        assert_eq!(
            request,
            TaxRequest {
                legal_status: Some("sas".to_string()),
                monthly_income: dec!(5000000),
                monthly_expenses: dec!(2000000.5),
                ..TaxRequest::default()
            }
        );
    }

    #[test]
    fn from_json_defaults_absent_and_invalid_amounts_to_zero() {
        let request = TaxRequest::from_json(
            r#"{"legal_status":"natural","monthly_income":"abc","afc_contributions":null,"patrimony":[1]}"#,
        )
        .unwrap();

        assert_eq!(request.monthly_income, dec!(0));
        assert_eq!(request.monthly_expenses, dec!(0));
        assert_eq!(request.afc_contributions, dec!(0));
        assert_eq!(request.mortgage_interest, dec!(0));
        assert_eq!(request.patrimony, dec!(0));
    }

    #[test]
    fn from_json_coerces_negative_amounts_to_zero() {
        let request =
            TaxRequest::from_json(r#"{"legal_status":"natural","monthly_income":-5000}"#).unwrap();

        assert_eq!(request.monthly_income, dec!(0));
    }

    #[test]
    fn from_json_rejects_non_object_body() {
        let err = TaxRequest::from_json("[1, 2, 3]").unwrap_err();

        assert!(matches!(err, CalculationError::MalformedRequest(_)));
    }

    #[test]
    fn into_input_requires_legal_status() {
        let err = TaxRequest::default().into_input().unwrap_err();

        assert_eq!(
            err,
            CalculationError::InvalidInput("legal_status is required".to_string())
        );
    }

    #[test]
    fn into_input_rejects_unknown_legal_status() {
        let request = TaxRequest {
            legal_status: Some("cooperative".to_string()),
            ..TaxRequest::default()
        };

        assert!(matches!(
            request.into_input(),
            Err(CalculationError::InvalidInput(_))
        ));
    }

    #[test]
    fn into_input_rejects_numeric_legal_status() {
        let request = TaxRequest::from_json(r#"{"legal_status": 1}"#).unwrap();

        assert!(matches!(
            request.into_input(),
            Err(CalculationError::InvalidInput(_))
        ));
    }

    // =========================================================================
    // coerce_amount
    // =========================================================================

    #[test]
    fn coerce_amount_accepts_scientific_notation() {
        assert_eq!(coerce_amount(&json!("5e6")), dec!(5000000));
    }

    #[test]
    fn coerce_amount_treats_booleans_as_zero() {
        assert_eq!(coerce_amount(&json!(true)), dec!(0));
    }

    #[test]
    fn coerce_amount_treats_blank_string_as_zero() {
        assert_eq!(coerce_amount(&json!("  ")), dec!(0));
    }

    #[test]
    fn coerce_amount_accepts_grouped_thousands() {
        assert_eq!(coerce_amount(&json!("1,234,567.89")), dec!(1234567.89));
        assert_eq!(coerce_amount(&json!("950,000")), dec!(950000));
    }

    #[test]
    fn coerce_amount_rejects_decimal_comma() {
        assert_eq!(coerce_amount(&json!("5000000,50")), dec!(0));
    }

    #[test]
    fn coerce_amount_rejects_misplaced_separators() {
        assert_eq!(coerce_amount(&json!("5,00,000")), dec!(0));
        assert_eq!(coerce_amount(&json!(",500")), dec!(0));
        assert_eq!(coerce_amount(&json!("1,000.5,0")), dec!(0));
    }

    #[test]
    fn coerce_amount_clamps_amounts_above_limit() {
        assert_eq!(coerce_amount(&json!("1e28")), MAX_AMOUNT);
        assert_eq!(coerce_amount(&json!(1e27)), MAX_AMOUNT);
    }

    // =========================================================================
    // response
    // =========================================================================

    #[test]
    fn from_result_rounds_money_to_currency_precision() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();
        let input = CalculationInput::new(LegalStatus::NaturalPerson, dec!(1000.04));

        let response = TaxResponse::from_result(&engine.calculate(&input), 0);

        // 12000.48 × 0.00522 = 62.6425056
        assert_eq!(response.annual_income, dec!(12000));
        assert_eq!(response.parafiscales.arl, dec!(63));
    }

    #[test]
    fn from_result_rounds_rate_to_two_places() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();
        let input = TaxRequest::from_json(SCENARIO_NATURAL)
            .unwrap()
            .into_input()
            .unwrap();

        let response = TaxResponse::from_result(&engine.calculate(&input), 0);

        assert_eq!(response.effective_tax_rate, dec!(29.02));
    }

    #[test]
    fn calculate_json_produces_boundary_shape() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();

        let body = calculate_json(&engine, SCENARIO_NATURAL).unwrap();
        let value: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(
            value,
            json!({
                "annual_income": 60000000.0,
                "taxable_income": 21000000.0,
                "income_tax": 0.0,
                "parafiscales": {
                    "salud": 7500000.0,
                    "pension": 9600000.0,
                    "arl": 313200.0,
                    "total": 17413200.0
                },
                "total_tax_burden": 17413200.0,
                "net_annual_income": 42586800.0,
                "effective_tax_rate": 29.02,
                "deductions_applied": 15000000.0
            })
        );
    }

    #[test]
    fn calculate_json_handles_zero_income() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();

        let body = calculate_json(&engine, r#"{"legal_status":"sas"}"#).unwrap();
        let response: TaxResponse = serde_json::from_str(&body).unwrap();

        assert_eq!(response.annual_income, dec!(0));
        assert_eq!(response.effective_tax_rate, dec!(0));
        assert_eq!(response.net_annual_income, dec!(0));
    }

    #[test]
    fn calculate_json_bounds_amounts_too_large_to_annualize() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();

        let body =
            calculate_json(&engine, r#"{"legal_status":"natural","monthly_income":"1e28"}"#)
                .unwrap();
        let value: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(value["annual_income"], json!(1.2e21));
        assert!(value["net_annual_income"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn from_json_does_not_inflate_decimal_comma_amounts() {
        let request =
            TaxRequest::from_json(r#"{"legal_status":"natural","monthly_income":"5000000,50"}"#)
                .unwrap();

        assert_eq!(request.monthly_income, dec!(0));
    }

    #[test]
    fn calculate_json_rejects_unknown_status() {
        let rules = RuleTable::colombia_2025();
        let engine = TaxEngine::new(&rules).unwrap();

        let err = calculate_json(&engine, r#"{"legal_status":"eu","monthly_income":1}"#)
            .unwrap_err();

        assert!(matches!(err, CalculationError::InvalidInput(_)));
    }
}
