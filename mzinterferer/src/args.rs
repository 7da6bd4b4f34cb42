use std::{error::Error, fmt::Display, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};

use mzinterference::{ChargeRange, InterferenceParams};

/// A charge range given on the command line, written as `low-high` or just `high`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArgChargeRange(pub i32, pub i32);

impl Default for ArgChargeRange {
    fn default() -> Self {
        Self(1, 4)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChargeRangeParseError {
    MalformedLow(ParseIntError),
    MalformedHigh(ParseIntError),
    NotPositive(i32, i32),
}

impl Display for ChargeRangeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChargeRangeParseError::MalformedLow(e) => {
                write!(f, "Failed to parse charge range low {e}")
            }
            ChargeRangeParseError::MalformedHigh(e) => {
                write!(f, "Failed to parse charge range high {e}")
            }
            ChargeRangeParseError::NotPositive(low, high) => {
                write!(f, "Charge range {low}-{high} must only include positive charges")
            }
        }
    }
}

impl Error for ChargeRangeParseError {}

impl FromStr for ArgChargeRange {
    type Err = ChargeRangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (low, high) = match s.split_once(['-', ' ', ':']) {
            Some((low_s, high_s)) if !low_s.is_empty() => {
                let low = low_s
                    .trim()
                    .parse()
                    .map_err(ChargeRangeParseError::MalformedLow)?;
                let high = high_s
                    .trim()
                    .parse()
                    .map_err(ChargeRangeParseError::MalformedHigh)?;
                (low, high)
            }
            _ => {
                let high: i32 = s.parse().map_err(ChargeRangeParseError::MalformedHigh)?;
                (high.min(1), high)
            }
        };
        if low <= 0 || high <= 0 {
            return Err(ChargeRangeParseError::NotPositive(low, high));
        }
        Ok(Self(low, high))
    }
}

impl Display for ArgChargeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

impl TryFrom<String> for ArgChargeRange {
    type Error = ChargeRangeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ArgChargeRange> for String {
    fn from(value: ArgChargeRange) -> Self {
        value.to_string()
    }
}

impl From<ArgChargeRange> for ChargeRange {
    fn from(value: ArgChargeRange) -> Self {
        (value.0, value.1)
    }
}

/// Parse a tolerance for `clap`, which must be strictly positive
pub fn parse_tolerance(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    if value <= 0.0 {
        Err(format!("`{s}` must be greater than zero"))
    } else {
        Ok(value)
    }
}

/// Build the scoring parameters from the values given on the command line
pub fn make_interference_params(
    charge_range: ArgChargeRange,
    charge_tolerance: f64,
    precursor_tolerance_ppm: f64,
    isotopes_to_check: usize,
    search_tolerance: f64,
) -> InterferenceParams {
    InterferenceParams {
        charge_tolerance,
        precursor_tolerance_ppm,
        isotopes_to_check,
        charge_range: charge_range.into(),
        search_tolerance,
    }
}
