use std::{fmt::Display, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

pub const DEFAULT_CURRENCY_CODE: &str = "USD";
/// Card networks send amounts in cents. Every supported currency has two minor-unit digits.
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

//--------------------------------------       Amount        ---------------------------------------------------------
/// A currency amount held as a whole number of minor units (cents).
///
/// `Amount` is the normalized, major-unit decimal value the authorization engine works with. It is displayed, parsed
/// and serialized as a decimal string with two fractional digits (`"12.34"`), while the database stores the minor-unit
/// integer. Because the representation is an integer, limit and balance comparisons are exact: `400.00 + 100.01` is
/// strictly greater than `500.00`.
///
/// Amounts only combine through [`Amount::checked_add`]. A card network can send any `i64`, so a sum may not fit.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[sqlx(transparent)]
pub struct Amount(i64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Value cannot be represented as an amount: {0}")]
pub struct AmountConversionError(String);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Normalizes an integer amount in minor units (as sent by the card network) into an `Amount`.
    pub const fn from_minor_units(minor: i64) -> Self {
        Self(minor)
    }

    /// Creates an amount from whole major units, e.g. `Amount::from_major_units(500)` is 500.00.
    pub fn from_major_units(major: i64) -> Self {
        Self(major * MINOR_UNITS_PER_MAJOR)
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// `None` if the sum does not fit.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = MINOR_UNITS_PER_MAJOR.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / per, abs % per)
    }
}

impl FromStr for Amount {
    type Err = AmountConversionError;

    /// Parses a major-unit decimal string with at most two fractional digits. `"12"`, `"12.3"` and `"-12.34"` are all
    /// valid.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        let err = || AmountConversionError(s.to_string());
        if whole.is_empty() || frac.len() > 2 {
            return Err(err());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        let whole = whole.parse::<i64>().map_err(|_| err())?;
        let frac = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| err())? * 10,
            _ => frac.parse::<i64>().map_err(|_| err())?,
        };
        let minor = whole.checked_mul(MINOR_UNITS_PER_MAJOR).and_then(|v| v.checked_add(frac)).ok_or_else(err)?;
        Ok(Self(if negative { -minor } else { minor }))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(de::Error::custom)
    }
}
