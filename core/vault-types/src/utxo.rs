// SPDX-License-Identifier: MIT
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error type for parsing UTXO reference strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoParseError {
    pub message: String,
}

impl fmt::Display for UtxoParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid utxo reference: {}", self.message)
    }
}

impl std::error::Error for UtxoParseError {}

/// Reference to a transaction output, `txid:vout`.
///
/// The txid is kept in its canonical lowercase hex form so that the
/// `Display` output is stable; the vault identity is a hash of that string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UtxoRef {
    txid: String,
    vout: u32,
}

impl UtxoRef {
    pub fn txid(&self) -> &str {
        &self.txid
    }

    pub fn vout(&self) -> u32 {
        self.vout
    }
}

impl fmt::Display for UtxoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

impl FromStr for UtxoRef {
    type Err = UtxoParseError;

    /// Parse a reference in the format `<64 hex chars>:<vout>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |msg: &str| UtxoParseError {
            message: msg.to_string(),
        };

        let (txid, vout) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| err("expected format '<txid>:<vout>'"))?;

        if txid.len() != 64 {
            return Err(err("txid must be exactly 64 hex characters"));
        }
        if !txid.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err("txid must be hex"));
        }
        if vout.is_empty() {
            return Err(err("vout cannot be empty"));
        }
        let vout = vout
            .parse::<u32>()
            .map_err(|e| err(&format!("invalid vout: {e}")))?;

        Ok(UtxoRef {
            txid: txid.to_ascii_lowercase(),
            vout,
        })
    }
}

impl TryFrom<String> for UtxoRef {
    type Error = UtxoParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UtxoRef> for String {
    fn from(value: UtxoRef) -> Self {
        value.to_string()
    }
}
