// SPDX-License-Identifier: MIT
use anyhow::Result;
use clap::Args;
use tracing::info;

use host_utils::registry::VaultRegistry;

use super::RegistryArgs;

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub registry: RegistryArgs,
}

pub fn run(args: ListArgs, json_output: bool) -> Result<()> {
    let registry = VaultRegistry::open(&args.registry.dir())?;
    let entries = registry.list()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        info!("No vaults found in {}", registry.root().display());
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{}  txid={}  utxo={}  app={}",
            entry.id, entry.attestation_txid, entry.vault_output_ref, entry.app_id
        );
    }
    Ok(())
}
