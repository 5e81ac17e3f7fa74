//! Shared newtypes used across domain modules.
//!
//! These types are serialization-transparent: they serialize/deserialize identically
//! to the raw format the server sends, so they can be used directly in wire types.

use crate::error::SdkError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

// ─── Symbol ──────────────────────────────────────────────────────────────────

/// Newtype for ticker symbols (e.g. `"BTCUSDT"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl FromStr for Symbol {
    type Err = SdkError;

    /// Parse user input; surrounding whitespace is trimmed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(SdkError::Validation("symbol must not be empty".into()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(SdkError::Validation(format!(
                "symbol must not contain whitespace: {trimmed:?}"
            )));
        }
        Ok(Symbol(trimmed.to_string()))
    }
}

/// Parse a comma-separated symbol list such as `"BTCUSDT, ETHUSDT"`.
pub fn parse_symbol_list(s: &str) -> Result<Vec<Symbol>, SdkError> {
    s.split(',').map(str::parse).collect()
}

impl Serialize for Symbol {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Symbol(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_serializes_as_plain_string() {
        let sym = Symbol::new("BTCUSDT");
        assert_eq!(serde_json::to_string(&sym).unwrap(), "\"BTCUSDT\"");
        let back: Symbol = serde_json::from_str("\"ETHUSDT\"").unwrap();
        assert_eq!(back.as_str(), "ETHUSDT");
    }

    #[test]
    fn test_symbol_from_str_trims_and_validates() {
        assert_eq!(" BTCUSDT ".parse::<Symbol>().unwrap().as_str(), "BTCUSDT");
        assert!(matches!("".parse::<Symbol>(), Err(SdkError::Validation(_))));
        assert!(matches!("BTC USDT".parse::<Symbol>(), Err(SdkError::Validation(_))));
    }

    #[test]
    fn test_parse_symbol_list() {
        let symbols = parse_symbol_list("BTCUSDT, ETHUSDT").unwrap();
        assert_eq!(symbols, vec![Symbol::from("BTCUSDT"), Symbol::from("ETHUSDT")]);
        assert!(parse_symbol_list("BTCUSDT,,ETHUSDT").is_err());
    }
}
