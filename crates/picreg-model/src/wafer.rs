use core::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

fn wafer_pattern() -> &'static Regex {
    static WAFER_RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    WAFER_RE.get_or_init(|| {
        Regex::new(r"^(?:\d{5}-\d{3}|\D{2}\d{6,}|[0-9A-Z-]{6,})$").expect("valid regex")
    })
}

/// A validated wafer number, fixed once per run.
///
/// Accepted shapes (whole-string match):
/// - five digits, a hyphen, three digits (`12345-001`)
/// - two non-digit characters followed by six or more digits (`AB123456`)
/// - six or more digits/uppercase letters/hyphens (`WAF-01X` style lot codes)
///
/// The value is embedded verbatim into every derived chip identifier, so no
/// trimming or case folding is applied.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct WaferNumber(String);

impl WaferNumber {
    /// The wafer number as entered.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WaferNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WaferNumber {
    type Err = WaferNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(WaferNumberError::Empty);
        }
        if !wafer_pattern().is_match(s) {
            return Err(WaferNumberError::InvalidFormat);
        }
        Ok(Self(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for WaferNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|err| {
            D::Error::custom(format!("invalid wafer number '{raw}': {err}"))
        })
    }
}

/// Errors raised when parsing a wafer number.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WaferNumberError {
    Empty,
    InvalidFormat,
}

impl fmt::Display for WaferNumberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            WaferNumberError::Empty => "wafer number cannot be empty",
            WaferNumberError::InvalidFormat => "wafer number does not match an accepted format",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for WaferNumberError {}
