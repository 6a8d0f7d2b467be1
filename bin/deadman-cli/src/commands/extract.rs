// SPDX-License-Identifier: MIT
use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use host_utils::chain::decode_raw_transaction;
use host_utils::registry::VaultRegistry;
use host_utils::status::{
    fetch_vault_state, resolve_output_index, state_from_raw, verify_heartbeat,
};
use vault_types::constants::VAULT_OUTPUT_INDEX;
use vault_types::types::VaultState;

use super::{NodeArgs, RegistryArgs, VerifierArgs};

/// Where the transaction comes from. Exactly one is required.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct TxSource {
    /// Raw transaction hex.
    #[arg(long = "tx-hex")]
    pub tx_hex: Option<String>,

    /// Transaction id to fetch from the node.
    #[arg(long)]
    pub txid: Option<String>,

    /// Vault id whose recorded attestation transaction is fetched from the node.
    #[arg(long = "from-vault")]
    pub from_vault: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub source: TxSource,

    /// Output carrying the vault state.
    #[arg(long = "output-index")]
    pub output_index: Option<usize>,

    /// Attestation spent by this transaction. When given, the extracted state
    /// must be a legal heartbeat from the vault state it carries.
    #[arg(long = "prior-txid")]
    pub prior_txid: Option<String>,

    /// Output of the prior attestation carrying the vault state.
    #[arg(long = "prior-output-index", default_value_t = VAULT_OUTPUT_INDEX)]
    pub prior_output_index: usize,

    #[command(flatten)]
    pub node: NodeArgs,

    #[command(flatten)]
    pub verifier: VerifierArgs,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

pub async fn run(args: ExtractArgs, json_output: bool) -> Result<()> {
    let verifier = args.verifier.verifier();
    let strict = !args.verifier.lenient;

    let state = if let Some(tx_hex) = &args.source.tx_hex {
        let raw_tx = decode_raw_transaction(tx_hex)?;
        let index = args.output_index.unwrap_or(VAULT_OUTPUT_INDEX);
        state_from_raw(&verifier, &raw_tx, index, strict).await
    } else if let Some(txid) = &args.source.txid {
        let client = args.node.client()?;
        let index = args.output_index.unwrap_or(VAULT_OUTPUT_INDEX);
        fetch_vault_state(&client, &verifier, txid, index, strict).await
    } else if let Some(vault_id) = &args.source.from_vault {
        let registry = VaultRegistry::open(&args.registry.dir())?;
        let entry = registry.load(vault_id)?;
        info!(txid = %entry.attestation_txid, "Loading transaction");
        let client = args.node.client()?;
        let index = resolve_output_index(&entry, args.output_index);
        fetch_vault_state(&client, &verifier, &entry.attestation_txid, index, strict).await
    } else {
        anyhow::bail!("one of --tx-hex, --txid or --from-vault is required");
    };

    let state = state.map_err(|err| {
        let stage = err.stage();
        anyhow::Error::new(err).context(format!("could not extract vault state ({stage} stage)"))
    })?;

    if let Some(prior_txid) = &args.prior_txid {
        let client = args.node.client()?;
        verify_heartbeat(
            &client,
            &verifier,
            prior_txid,
            args.prior_output_index,
            &state,
            strict,
        )
        .await
        .map_err(|err| {
            let stage = err.stage();
            anyhow::Error::new(err)
                .context(format!("heartbeat from {prior_txid} is not valid ({stage} stage)"))
        })?;
    }

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&state).context("failed to encode vault state")?
        );
    } else {
        print_state(&state);
        if let Some(prior_txid) = &args.prior_txid {
            println!();
            println!("VALID HEARTBEAT: spends vault state from {prior_txid}");
        }
    }
    Ok(())
}

fn print_state(state: &VaultState) {
    println!("  owner:                {}", state.owner);
    println!("  beneficiary:          {}", state.beneficiary);
    println!("  last_heartbeat_block: {}", state.last_heartbeat_block);
    println!("  heartbeat_interval:   {}", state.heartbeat_interval);
}
