// SPDX-License-Identifier: MIT
//! Minimal JSON-RPC client for Bitcoin node communication.
//!
//! Only the two read-only calls the vault pipeline needs are exposed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain::{validate_txid, ChainClient};

/// Credentials for the node's HTTP basic auth.
#[derive(Clone)]
pub struct RpcAuth {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for RpcAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcAuth")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A minimal Bitcoin Core JSON-RPC client.
#[derive(Clone)]
pub struct RpcClient {
    url: String,
    client: reqwest::Client,
    id: Arc<AtomicU64>,
    auth: Option<RpcAuth>,
    max_retries: u32,
    timeout: Duration,
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    method: &'a str,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize, Debug)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// bitcoind: RPC in warm-up.
const RPC_IN_WARMUP: i64 = -28;

impl RpcClient {
    /// Retries are off unless requested; retry policy belongs to the caller.
    pub const DEFAULT_MAX_RETRIES: u32 = 0;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Initial backoff delay in milliseconds.
    const INITIAL_BACKOFF_MS: u64 = 1000;
    /// Maximum backoff delay in milliseconds.
    const MAX_BACKOFF_MS: u64 = 30_000;

    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: reqwest::Client::new(),
            id: Arc::new(AtomicU64::new(1)),
            auth: None,
            max_retries: Self::DEFAULT_MAX_RETRIES,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_auth(mut self, auth: Option<RpcAuth>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let id = self.id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "1.0",
            method,
            params,
            id,
        };

        debug!(method, %id, "RPC request");

        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    Self::INITIAL_BACKOFF_MS.saturating_mul(2u64.saturating_pow(attempt - 1)),
                    Self::MAX_BACKOFF_MS,
                );
                debug!(
                    method,
                    attempt,
                    backoff_ms = backoff,
                    "Retrying RPC request"
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let mut builder = self
                .client
                .post(&self.url)
                .timeout(self.timeout)
                .json(&request);
            if let Some(auth) = &self.auth {
                builder = builder.basic_auth(&auth.user, Some(&auth.password));
            }

            let response = match builder.send().await {
                Ok(r) => r,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_err = Some(anyhow::anyhow!(e).context(format!(
                        "RPC request to {} failed (attempt {})",
                        method,
                        attempt + 1
                    )));
                    continue;
                }
                Err(e) => {
                    return Err(
                        anyhow::anyhow!(e).context(format!("RPC request to {} failed", method))
                    );
                }
            };

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                anyhow::bail!("RPC {} rejected credentials (status {})", method, status);
            }

            // Work queue full or rate limited
            if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
            {
                last_err = Some(anyhow::anyhow!(
                    "RPC {} returned status {} (attempt {})",
                    method,
                    status,
                    attempt + 1
                ));
                continue;
            }

            // bitcoind reports RPC errors with a JSON body on 404/500, so the
            // body is parsed before the status is judged.
            let body: JsonRpcResponse = response.json().await.with_context(|| {
                format!("Failed to parse RPC response for {} (status {})", method, status)
            })?;

            if let Some(err) = body.error {
                if err.code == RPC_IN_WARMUP {
                    last_err = Some(anyhow::anyhow!(
                        "RPC node warming up for {} (attempt {}): {}",
                        method,
                        attempt + 1,
                        err.message
                    ));
                    continue;
                }
                anyhow::bail!(
                    "RPC error for {}: {} (code {})",
                    method,
                    err.message,
                    err.code
                );
            }

            return body
                .result
                .with_context(|| format!("RPC response for {} has no result", method));
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("RPC {} failed after retries", method)))
    }

    /// Get a raw transaction as hex (`getrawtransaction <txid> false`).
    pub async fn get_raw_transaction(&self, txid: &str) -> Result<String> {
        validate_txid(txid)?;
        let result = self
            .call("getrawtransaction", serde_json::json!([txid, false]))
            .await?;
        let hex_str = result
            .as_str()
            .context("getrawtransaction result is not a string")?;
        Ok(hex_str.to_string())
    }

    /// Get the height of the most-work chain tip.
    pub async fn get_block_count(&self) -> Result<u64> {
        let result = self.call("getblockcount", serde_json::json!([])).await?;
        result
            .as_u64()
            .context("getblockcount result is not a non-negative integer")
    }
}

impl ChainClient for RpcClient {
    async fn fetch_raw_transaction(&self, txid: &str) -> Result<String> {
        self.get_raw_transaction(txid).await
    }

    async fn current_height(&self) -> Result<u64> {
        self.get_block_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_debug_redacts_password() {
        let auth = RpcAuth {
            user: "vault".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{auth:?}");
        assert!(rendered.contains("vault"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_request_shape() {
        let request = JsonRpcRequest {
            jsonrpc: "1.0",
            method: "getblockcount",
            params: serde_json::json!([]),
            id: 7,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "jsonrpc": "1.0",
                "method": "getblockcount",
                "params": [],
                "id": 7
            })
        );
    }

    #[test]
    fn test_error_response_parses() {
        let body: JsonRpcResponse = serde_json::from_str(
            r#"{"result":null,"error":{"code":-5,"message":"No such mempool or blockchain transaction"},"id":1}"#,
        )
        .unwrap();
        assert!(body.result.is_none());
        let err = body.error.unwrap();
        assert_eq!(err.code, -5);
        assert!(err.message.contains("No such"));
    }

    #[tokio::test]
    async fn test_rejects_bad_txid_without_network() {
        // Port 9 is never contacted: the txid is validated first.
        let client = RpcClient::new("http://127.0.0.1:9");
        let err = client.get_raw_transaction("not-a-txid").await.unwrap_err();
        assert!(err.to_string().contains("invalid txid"));
    }

    #[tokio::test]
    async fn test_unreachable_node_fails_without_retry() {
        let client = RpcClient::new("http://127.0.0.1:9")
            .with_timeout(Duration::from_millis(500));
        assert!(client.get_block_count().await.is_err());
    }
}
