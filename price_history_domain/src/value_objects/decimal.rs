// /////////////////////////////////////////////////////////////////////////////
// Price History Service
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Decimal Price Value Object
//!
//! Prices are carried as lossless decimal strings end to end -- never parsed
//! into a float, which would silently lose precision on the wire and at
//! rest. `Decimal` validates the string looks like a decimal number at
//! construction time and is otherwise an opaque, `Display`-able wrapper;
//! arithmetic on prices is out of scope for this service.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PriceHistoryError;

/// Matches unsigned decimal numbers: `123`, `123.45`, `.45`, `0.0`.
static DECIMAL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$|^\.\d+$").unwrap());

/// A validated, lossless decimal price, e.g. `"42.00"` or `"3"`.
///
/// Never empty -- the "no price" case is modeled as `Option<Decimal>` (for
/// `previousPrice`) or as an `Entry`-less result (for `lastPrice` misses),
/// never as a `"0"`/`""` sentinel value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Decimal(String);

impl Decimal {
    pub fn parse(s: impl Into<String>) -> Result<Self, PriceHistoryError> {
        let s = s.into();
        if !DECIMAL_PATTERN.is_match(&s) {
            return Err(PriceHistoryError::input_validation(format!(
                "invalid or missing price (must be a positive decimal number): {s:?}"
            )));
        }
        if s == "0" || s.chars().all(|c| c == '0' || c == '.') {
            return Err(PriceHistoryError::input_validation(
                "invalid or missing price (must be a positive number)",
            ));
        }
        Ok(Decimal(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Decimal {
    type Error = PriceHistoryError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Decimal::parse(s)
    }
}

impl From<Decimal> for String {
    fn from(d: Decimal) -> Self {
        d.0
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_fractional() {
        assert!(Decimal::parse("42").is_ok());
        assert!(Decimal::parse("42.00").is_ok());
        assert!(Decimal::parse(".5").is_ok());
    }

    #[test]
    fn rejects_zero_and_empty() {
        assert!(Decimal::parse("0").is_err());
        assert!(Decimal::parse("0.00").is_err());
        assert!(Decimal::parse("").is_err());
    }

    #[test]
    fn rejects_non_numeric() {
        assert!(Decimal::parse("abc").is_err());
        assert!(Decimal::parse("-1.5").is_err());
    }

    #[test]
    fn display_round_trips_input_string() {
        let d = Decimal::parse("3.1400").unwrap();
        assert_eq!(d.as_str(), "3.1400");
        assert_eq!(d.to_string(), "3.1400");
    }
}
