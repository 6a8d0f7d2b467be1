// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;
use tracing::warn;

use host_utils::rpc::RpcAuth;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub rpc_url: Option<String>,
    pub rpc_user: Option<String>,
    pub rpc_password: Option<String>,
    pub vault_dir: Option<PathBuf>,
    pub spell_verifier: Option<String>,
}

fn config_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|h| h.join(".deadman").join("config.toml"))
}

pub fn load_config() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => parse_config(&contents).unwrap_or_else(|e| {
            warn!("Ignoring malformed config {}: {}", path.display(), e);
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

pub fn parse_config(contents: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(contents)
}

/// First candidate that is present and non-empty.
fn first_non_empty<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Resolve the node RPC URL from CLI flag, environment variable, or config file.
pub fn resolve_rpc_url(cli_flag: Option<&str>) -> Result<String> {
    let config = load_config();
    // Prefer the tool-specific env var, but also support the ubiquitous `RPC_URL`.
    first_non_empty([
        cli_flag.map(str::to_string),
        env("DEADMAN_RPC_URL"),
        env("RPC_URL"),
        config.rpc_url,
    ])
    .ok_or_else(|| {
        anyhow::anyhow!(
            "No RPC URL provided. Use --rpc-url, DEADMAN_RPC_URL/RPC_URL env var, or ~/.deadman/config.toml"
        )
    })
}

/// Resolve node credentials. Both user and password must be known for auth to be used.
pub fn resolve_rpc_auth(user_flag: Option<&str>, password_flag: Option<&str>) -> Option<RpcAuth> {
    let config = load_config();
    let user = first_non_empty([
        user_flag.map(str::to_string),
        env("DEADMAN_RPC_USER"),
        config.rpc_user,
    ])?;
    let password = first_non_empty([
        password_flag.map(str::to_string),
        env("DEADMAN_RPC_PASSWORD"),
        config.rpc_password,
    ])?;
    Some(RpcAuth { user, password })
}

/// Resolve the vault registry directory. Defaults to `./vault-data`.
pub fn resolve_vault_dir(cli_flag: Option<&std::path::Path>) -> PathBuf {
    if let Some(path) = cli_flag {
        return path.to_path_buf();
    }
    if let Some(dir) = first_non_empty([env("DEADMAN_VAULT_DIR")]) {
        return PathBuf::from(dir);
    }
    load_config()
        .vault_dir
        .unwrap_or_else(|| PathBuf::from("vault-data"))
}

/// Resolve the spell verifier program. Defaults to `charms` on PATH.
pub fn resolve_spell_verifier(cli_flag: Option<&str>) -> String {
    first_non_empty([
        cli_flag.map(str::to_string),
        env("DEADMAN_SPELL_VERIFIER"),
        load_config().spell_verifier,
    ])
    .unwrap_or_else(|| host_utils::spell::CommandSpellVerifier::DEFAULT_PROGRAM.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_non_empty_order() {
        assert_eq!(
            first_non_empty([None, Some(String::new()), Some("b".into()), Some("c".into())]),
            Some("b".to_string())
        );
        assert_eq!(first_non_empty([None, Some(String::new())]), None);
    }

    #[test]
    fn test_parse_config() {
        let config = parse_config(
            r#"
            rpc_url = "http://127.0.0.1:18443"
            rpc_user = "vault"
            vault_dir = "/var/lib/deadman"
            "#,
        )
        .unwrap();
        assert_eq!(config.rpc_url.as_deref(), Some("http://127.0.0.1:18443"));
        assert_eq!(config.rpc_user.as_deref(), Some("vault"));
        assert!(config.rpc_password.is_none());
        assert_eq!(config.vault_dir, Some(PathBuf::from("/var/lib/deadman")));
    }

    #[test]
    fn test_parse_config_rejects_wrong_types() {
        assert!(parse_config("rpc_url = 5").is_err());
    }

    #[test]
    fn test_vault_dir_flag_wins() {
        let flag = std::path::Path::new("/tmp/vaults");
        assert_eq!(resolve_vault_dir(Some(flag)), PathBuf::from("/tmp/vaults"));
    }
}
