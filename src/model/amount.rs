//! Amount type for handling monetary values that arrive either as numbers or as text.
//!
//! The statement server stores amounts as floating point numbers, but older rows (and hand-edited
//! ones) may hold strings such as `"-$1,250.00"`. Both are normalized into `Amount`, which wraps a
//! `Decimal`, once at the load boundary. Values that cannot be parsed are kept as `None` by the
//! caller and sort after every parsable value.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// The number of fraction digits used when an `Amount` is displayed.
const DISPLAY_DP: u32 = 2;

/// Represents a currency value.
///
/// # Examples
///
/// ```
/// # use duckle::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("-$1,250.5").unwrap();
/// assert_eq!(amount.to_string(), "-1250.50");
/// assert_eq!(amount.to_currency(), "-$1,250.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    value: Decimal,
}

impl Amount {
    pub const fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Converts a floating point number using its shortest round-trip representation, so that
    /// `0.1` becomes exactly `0.1` rather than the nearest binary fraction. Returns `None` for
    /// non-finite numbers and for numbers outside the range of `Decimal`.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Decimal::from_str(&value.to_string()).ok().map(Self::new)
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn is_negative(&self) -> bool {
        self.value.is_sign_negative() && !self.value.is_zero()
    }

    /// Formats the amount with a dollar sign and thousands separators, e.g. `-$60,000.00`.
    pub fn to_currency(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = self.rounded().abs();
        format!(
            "{sign}${}",
            format_num::format_num!(",.2", abs.to_f64().unwrap_or_default())
        )
    }

    fn rounded(&self) -> Decimal {
        let rounded = self
            .value
            .round_dp_with_strategy(DISPLAY_DP, RoundingStrategy::MidpointAwayFromZero);
        // Avoid rendering "-0.00".
        if rounded.is_zero() {
            Decimal::ZERO
        } else {
            rounded
        }
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError(rust_decimal::Error);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Accepts plain decimals as well as values with a leading dollar sign and comma separators,
    /// e.g. `50`, `-20.00`, `$1,000.00` or `-$60,000.00`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let without_dollar = if let Some(after_minus) = trimmed.strip_prefix('-') {
            match after_minus.strip_prefix('$') {
                Some(after_dollar) => format!("-{after_dollar}"),
                None => trimmed.to_string(),
            }
        } else if let Some(after_dollar) = trimmed.strip_prefix('$') {
            after_dollar.to_string()
        } else {
            trimmed.to_string()
        };
        let without_commas = without_dollar.replace(',', "");
        let value = Decimal::from_str(&without_commas)
            .or_else(|_| Decimal::from_scientific(&without_commas))
            .map_err(AmountError)?;
        Ok(Amount::new(value))
    }
}

impl Display for Amount {
    /// Always shows exactly two fraction digits, e.g. `-20.00`.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rounded())
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

/// An amount exactly as it appears on the wire: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    /// Coerces the wire value to an `Amount`, or `None` if it is not numeric.
    pub fn normalize(&self) -> Option<Amount> {
        match self {
            RawAmount::Number(n) => Amount::from_f64(*n),
            RawAmount::Text(s) => Amount::from_str(s).ok(),
        }
    }
}

impl From<&str> for RawAmount {
    fn from(value: &str) -> Self {
        RawAmount::Text(value.to_string())
    }
}

impl From<f64> for RawAmount {
    fn from(value: f64) -> Self {
        RawAmount::Number(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        let amount = Amount::from_str("50.00").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("50.00").unwrap());
    }

    #[test]
    fn test_parse_negative_with_dollar_sign_and_commas() {
        let amount = Amount::from_str("-$60,000.00").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("-60000.00").unwrap());
    }

    #[test]
    fn test_parse_whitespace() {
        let amount = Amount::from_str("  $50.00  ").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("50.00").unwrap());
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(Amount::from_str("fifty").is_err());
        assert!(Amount::from_str("").is_err());
    }

    #[test]
    fn test_display_two_fraction_digits() {
        assert_eq!(Amount::from_str("50").unwrap().to_string(), "50.00");
        assert_eq!(Amount::from_str("-20.5").unwrap().to_string(), "-20.50");
        assert_eq!(Amount::from_str("3.14159").unwrap().to_string(), "3.14");
        assert_eq!(Amount::from_str("0.005").unwrap().to_string(), "0.01");
    }

    #[test]
    fn test_to_currency() {
        assert_eq!(Amount::from_str("1234.5").unwrap().to_currency(), "$1,234.50");
        assert_eq!(Amount::from_str("-87.43").unwrap().to_currency(), "-$87.43");
        assert_eq!(Amount::from_str("0").unwrap().to_currency(), "$0.00");
    }

    #[test]
    fn test_from_f64_is_exact_for_short_values() {
        let amount = Amount::from_f64(0.1).unwrap();
        assert_eq!(amount.value(), Decimal::from_str("0.1").unwrap());
        assert!(Amount::from_f64(f64::NAN).is_none());
        assert!(Amount::from_f64(f64::INFINITY).is_none());
    }

    #[test]
    fn test_raw_amount_from_json_number_or_string() {
        let raw: Vec<RawAmount> = serde_json::from_str(r#"[12.5, "-20.00", "n/a"]"#).unwrap();
        assert_eq!(
            raw[0].normalize().unwrap().value(),
            Decimal::from_str("12.5").unwrap()
        );
        assert_eq!(
            raw[1].normalize().unwrap().value(),
            Decimal::from_str("-20.00").unwrap()
        );
        assert_eq!(raw[2].normalize(), None);
    }

    #[test]
    fn test_ordering_is_numeric() {
        let a = Amount::from_str("-20.00").unwrap();
        let b = Amount::from_str("5").unwrap();
        let c = Amount::from_str("$50.00").unwrap();
        assert!(a < b);
        assert!(b < c);
    }
}
