// SPDX-License-Identifier: MIT
use std::future::Future;

use anyhow::{bail, Context, Result};

/// Read-only view of the chain needed to evaluate a vault.
///
/// Implemented by [`crate::rpc::RpcClient`] against a real node and by fakes
/// in tests.
pub trait ChainClient {
    /// Raw transaction `txid`, hex-encoded.
    fn fetch_raw_transaction(&self, txid: &str) -> impl Future<Output = Result<String>> + Send;

    /// Height of the current chain tip.
    fn current_height(&self) -> impl Future<Output = Result<u64>> + Send;
}

/// Decode a hex transaction as returned by the node.
pub fn decode_raw_transaction(tx_hex: &str) -> Result<Vec<u8>> {
    let trimmed = tx_hex.trim();
    if trimmed.is_empty() {
        bail!("raw transaction is empty");
    }
    hex::decode(trimmed).context("raw transaction is not valid hex")
}

/// Check that `txid` looks like a transaction id before sending it anywhere.
pub fn validate_txid(txid: &str) -> Result<()> {
    if txid.len() != 64 || !txid.bytes().all(|b| b.is_ascii_hexdigit()) {
        bail!("invalid txid '{}': expected 64 hex characters", txid);
    }
    Ok(())
}
