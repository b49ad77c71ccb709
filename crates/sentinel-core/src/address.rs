//! Wallet and transaction-hash identity types.
//!
//! Addresses arriving from upstream clients may be mixed-case or missing
//! the `0x` prefix; `Address::parse` is the single place that normalizes
//! them so every other component can assume a canonical 42-char lowercase
//! hex string (§3 Trade invariant).

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 20-byte EVM-style address, stored lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.strip_prefix("0x").unwrap_or(raw);
        if trimmed.len() != 40 {
            return Err(CoreError::InvalidAddress(format!(
                "expected 40 hex chars after 0x, got {}",
                trimmed.len()
            )));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(trimmed, &mut bytes)
            .map_err(|e| CoreError::InvalidAddress(format!("not valid hex: {e}")))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_string()
    }
}

/// A 32-byte transaction hash, stored lowercase with its `0x` prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn parse(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("0x") {
            Self(lower)
        } else {
            Self(format!("0x{lower}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_case_with_prefix() {
        let a = Address::parse("0xABCDEF0123456789abcdef0123456789ABCDEF01").unwrap();
        assert_eq!(a.to_string(), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn parses_without_prefix() {
        let a = Address::parse("1111111111111111111111111111111111111111").unwrap();
        assert_eq!(a.to_string(), "0x1111111111111111111111111111111111111111");
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Address::parse("0x1234").is_err());
    }

    #[test]
    fn rejects_non_hex() {
        assert!(Address::parse("0xzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz").is_err());
    }

    #[test]
    fn tx_hash_lowercases_and_prefixes() {
        let h = TxHash::parse("ABCDEF");
        assert_eq!(h.as_str(), "0xabcdef");
    }
}
