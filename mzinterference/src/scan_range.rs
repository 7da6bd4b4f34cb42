use std::{error::Error, fmt::Display, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};

/// An inclusive range of scan numbers. Either bound may be left open.
///
/// Written as `start-end`, where either side may be omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScanRange {
    pub start: u32,
    pub end: u32,
}

impl ScanRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, scan_number: u32) -> bool {
        self.start <= scan_number && scan_number <= self.end
    }
}

impl Default for ScanRange {
    fn default() -> Self {
        Self {
            start: 1,
            end: u32::MAX,
        }
    }
}

impl Display for ScanRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.end == u32::MAX {
            write!(f, "{}-", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanRangeParseError {
    MalformedStart(ParseIntError),
    MalformedEnd(ParseIntError),
}

impl Display for ScanRangeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanRangeParseError::MalformedStart(e) => {
                write!(f, "Failed to parse scan range start {e}")
            }
            ScanRangeParseError::MalformedEnd(e) => {
                write!(f, "Failed to parse scan range end {e}")
            }
        }
    }
}

impl Error for ScanRangeParseError {}

impl FromStr for ScanRange {
    type Err = ScanRangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (start_s, end_s) = if let Some(pair) = s.split_once('-') {
            pair
        } else if let Some(pair) = s.split_once(':') {
            pair
        } else {
            (s, s)
        };
        let start = if start_s.is_empty() {
            1
        } else {
            start_s
                .trim()
                .parse()
                .map_err(ScanRangeParseError::MalformedStart)?
        };
        let end = if end_s.is_empty() {
            u32::MAX
        } else {
            end_s
                .trim()
                .parse()
                .map_err(ScanRangeParseError::MalformedEnd)?
        };
        Ok(ScanRange { start, end })
    }
}

impl TryFrom<String> for ScanRange {
    type Error = ScanRangeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScanRange> for String {
    fn from(value: ScanRange) -> Self {
        value.to_string()
    }
}
