// SPDX-License-Identifier: MIT
use anyhow::{bail, Context, Result};
use url::Url;

/// Validate a node RPC URL. Only http(s) is allowed.
/// Rejects file://, ws://, and other schemes a Bitcoin node does not speak.
pub fn validate_rpc_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).context("failed to parse RPC URL")?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => bail!(
            "unsupported RPC URL scheme '{}'. Only http and https are allowed",
            scheme
        ),
    }

    if url.host_str().is_none() {
        bail!("RPC URL has no host: {}", raw);
    }

    Ok(url)
}
