use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One band of a progressive schedule: income in `[lower_bound, upper_bound)`
/// is taxed at `rate`. An `upper_bound` of `None` extends to infinity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub lower_bound: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

impl TaxBracket {
    pub fn new(
        lower_bound: Decimal,
        upper_bound: Option<Decimal>,
        rate: Decimal,
    ) -> Self {
        Self {
            lower_bound,
            upper_bound,
            rate,
        }
    }

    /// Portion of `taxable_income` that falls inside this bracket.
    pub fn slice_of(
        &self,
        taxable_income: Decimal,
    ) -> Decimal {
        if taxable_income <= self.lower_bound {
            return Decimal::ZERO;
        }
        let top = match self.upper_bound {
            Some(upper) => taxable_income.min(upper),
            None => taxable_income,
        };
        top - self.lower_bound
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn slice_is_zero_below_lower_bound() {
        let bracket = TaxBracket::new(dec!(100), Some(dec!(200)), dec!(0.19));

        assert_eq!(bracket.slice_of(dec!(50)), dec!(0));
        assert_eq!(bracket.slice_of(dec!(100)), dec!(0));
    }

    #[test]
    fn slice_is_partial_inside_bracket() {
        let bracket = TaxBracket::new(dec!(100), Some(dec!(200)), dec!(0.19));

        assert_eq!(bracket.slice_of(dec!(150)), dec!(50));
    }

    #[test]
    fn slice_is_full_width_above_upper_bound() {
        let bracket = TaxBracket::new(dec!(100), Some(dec!(200)), dec!(0.19));

        assert_eq!(bracket.slice_of(dec!(10000)), dec!(100));
    }

    #[test]
    fn unbounded_slice_grows_with_income() {
        let bracket = TaxBracket::new(dec!(100), None, dec!(0.33));

        assert_eq!(bracket.slice_of(dec!(1000100)), dec!(1000000));
    }
}
