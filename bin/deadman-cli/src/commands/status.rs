// SPDX-License-Identifier: MIT
use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use host_utils::registry::VaultRegistry;
use host_utils::status::{check_vault, StatusOptions};
use vault_types::types::{HeartbeatDecision, VaultPhase};

use super::{NodeArgs, RegistryArgs, VerifierArgs};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Vault identifier (directory name with or without the `vault-` prefix).
    pub vault_id: String,

    /// Output carrying the vault state. Defaults to the registry's vault output.
    #[arg(long = "output-index")]
    pub output_index: Option<usize>,

    #[command(flatten)]
    pub node: NodeArgs,

    #[command(flatten)]
    pub verifier: VerifierArgs,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

pub async fn run(args: StatusArgs, json_output: bool) -> Result<()> {
    let registry = VaultRegistry::open(&args.registry.dir())?;
    let client = args.node.client()?;
    let verifier = args.verifier.verifier();

    if args.verifier.lenient {
        warn!("Lenient mode: mock proofs are accepted. Do not use on mainnet.");
    }

    let options = StatusOptions {
        output_index: args.output_index,
        strict: !args.verifier.lenient,
    };

    let report = match check_vault(&registry, &args.vault_id, &client, &verifier, options).await {
        Ok(report) => report,
        Err(err) => {
            let stage = err.stage();
            return Err(anyhow::Error::new(err)
                .context(format!("could not determine vault state ({stage} stage)")));
        }
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report.decision)?);
    } else {
        info!(
            vault = %report.entry.id,
            app_id = %report.entry.app_id,
            vault_utxo = %report.entry.vault_output_ref,
            "Vault state verified"
        );
        print_decision(&report.decision);
    }

    Ok(())
}

fn print_decision(decision: &HeartbeatDecision) {
    println!("  owner:                  {}", decision.owner);
    println!("  beneficiary:            {}", decision.beneficiary);
    println!("  last heartbeat block:   {}", decision.last_heartbeat_block);
    println!("  heartbeat interval:     {}", decision.heartbeat_interval);
    println!("  current height:         {}", decision.current_height);
    println!("  blocks since heartbeat: {}", decision.blocks_since_heartbeat);
    println!();
    match decision.phase() {
        VaultPhase::Armed => println!(
            "ARMED: heartbeat allowed for {} ({} blocks left, release possible at block {})",
            decision.authorized_party(),
            decision.blocks_remaining(),
            decision.release_height()
        ),
        VaultPhase::Expired => println!(
            "EXPIRED: release allowed for {} ({} >= {})",
            decision.authorized_party(),
            decision.blocks_since_heartbeat,
            decision.heartbeat_interval
        ),
    }
}
