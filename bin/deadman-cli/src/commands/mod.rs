// SPDX-License-Identifier: MIT
pub mod extract;
pub mod list;
pub mod status;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use host_utils::provider::validate_rpc_url;
use host_utils::rpc::RpcClient;
use host_utils::spell::CommandSpellVerifier;

use crate::config;

/// Node connection flags shared by commands that talk to the chain.
#[derive(Args, Debug)]
pub struct NodeArgs {
    /// Bitcoin node RPC URL.
    ///
    /// If omitted, tries `DEADMAN_RPC_URL`, then `RPC_URL`, then `~/.deadman/config.toml`.
    #[arg(long = "rpc-url")]
    pub rpc_url: Option<String>,

    /// RPC user (or `DEADMAN_RPC_USER`).
    #[arg(long = "rpc-user")]
    pub rpc_user: Option<String>,

    /// RPC password (or `DEADMAN_RPC_PASSWORD`).
    #[arg(long = "rpc-password")]
    pub rpc_password: Option<String>,

    /// Retries for transient node failures. Off by default.
    #[arg(long = "rpc-retries", default_value_t = 0)]
    pub rpc_retries: u32,

    /// Per-request timeout in seconds.
    #[arg(long = "rpc-timeout", default_value_t = 30)]
    pub rpc_timeout_secs: u64,
}

impl NodeArgs {
    pub fn client(&self) -> Result<RpcClient> {
        let url = config::resolve_rpc_url(self.rpc_url.as_deref())?;
        let url = validate_rpc_url(&url).context("invalid node RPC URL")?;
        let auth = config::resolve_rpc_auth(self.rpc_user.as_deref(), self.rpc_password.as_deref());
        Ok(RpcClient::new(url.as_str())
            .with_auth(auth)
            .with_max_retries(self.rpc_retries)
            .with_timeout(Duration::from_secs(self.rpc_timeout_secs)))
    }
}

/// Spell verification flags.
#[derive(Args, Debug)]
pub struct VerifierArgs {
    /// Spell verifier program (or `DEADMAN_SPELL_VERIFIER`). Defaults to `charms`.
    #[arg(long = "spell-verifier")]
    pub spell_verifier: Option<String>,

    /// Accept mock proofs (test networks only).
    #[arg(long)]
    pub lenient: bool,
}

impl VerifierArgs {
    pub fn verifier(&self) -> CommandSpellVerifier {
        CommandSpellVerifier::new(config::resolve_spell_verifier(
            self.spell_verifier.as_deref(),
        ))
    }
}

/// Registry location flag.
#[derive(Args, Debug)]
pub struct RegistryArgs {
    /// Vault metadata directory (or `DEADMAN_VAULT_DIR`). Defaults to `./vault-data`.
    #[arg(long = "vault-dir")]
    pub vault_dir: Option<PathBuf>,
}

impl RegistryArgs {
    pub fn dir(&self) -> PathBuf {
        config::resolve_vault_dir(self.vault_dir.as_deref())
    }
}
