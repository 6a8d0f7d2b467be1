// SPDX-License-Identifier: MIT
//! Vault status pipeline: registry → node → spell verifier → extractor → evaluator.
//!
//! Also checks an observed heartbeat against the transition rules.
//!
//! Every stage fails fast. The error names the stage so that "could not
//! determine the vault state" is never confused with "the vault expired",
//! which is a successful result.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use vault_logic::error::{EvaluationError, ExtractionError, TransitionError};
use vault_logic::evaluator::evaluate;
use vault_logic::extractor::extract;
use vault_logic::transition::check_heartbeat;
use vault_types::constants::VAULT_OUTPUT_INDEX;
use vault_types::types::{HeartbeatDecision, VaultRegistryEntry, VaultState};

use crate::chain::{decode_raw_transaction, ChainClient};
use crate::registry::VaultRegistry;
use crate::spell::{SpellVerifier, VerificationError};

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("registry lookup failed: {0:#}")]
    Registry(anyhow::Error),

    #[error("node request failed: {0:#}")]
    Node(anyhow::Error),

    #[error("spell verification failed: {0}")]
    Verification(#[from] VerificationError),

    #[error("vault state extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("heartbeat evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("illegal vault transition: {0}")]
    Transition(#[from] TransitionError),
}

impl StatusError {
    pub fn stage(&self) -> &'static str {
        match self {
            StatusError::Registry(_) => "registry",
            StatusError::Node(_) => "node",
            StatusError::Verification(_) => "verification",
            StatusError::Extraction(_) => "extraction",
            StatusError::Evaluation(_) => "evaluation",
            StatusError::Transition(_) => "transition",
        }
    }
}

/// Knobs for a status query.
#[derive(Debug, Clone, Copy)]
pub struct StatusOptions {
    /// Output to decode. `None` uses the registry's vault output when it
    /// belongs to the attestation transaction, else the conventional index.
    pub output_index: Option<usize>,
    /// Reject mock proofs.
    pub strict: bool,
}

impl Default for StatusOptions {
    fn default() -> Self {
        StatusOptions {
            output_index: None,
            strict: true,
        }
    }
}

/// Outcome of a successful status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultReport {
    pub entry: VaultRegistryEntry,
    pub output_index: usize,
    pub decision: HeartbeatDecision,
}

/// Output index to decode for `entry`.
pub fn resolve_output_index(entry: &VaultRegistryEntry, requested: Option<usize>) -> usize {
    if let Some(index) = requested {
        return index;
    }
    let vault_ref = &entry.vault_output_ref;
    if vault_ref.txid().eq_ignore_ascii_case(&entry.attestation_txid) {
        vault_ref.vout() as usize
    } else {
        VAULT_OUTPUT_INDEX
    }
}

/// Verify a raw transaction and decode the vault state at `output_index`.
pub async fn state_from_raw<V: SpellVerifier>(
    verifier: &V,
    raw_tx: &[u8],
    output_index: usize,
    strict: bool,
) -> Result<VaultState, StatusError> {
    let spell = verifier.verify(raw_tx, strict).await?;
    debug!(
        version = spell.version,
        inputs = spell.tx.ins.len(),
        outputs = spell.tx.outs.len(),
        "Spell verified"
    );
    Ok(extract(&spell, output_index)?)
}

/// Fetch transaction `txid` and decode its vault state.
pub async fn fetch_vault_state<C, V>(
    client: &C,
    verifier: &V,
    txid: &str,
    output_index: usize,
    strict: bool,
) -> Result<VaultState, StatusError>
where
    C: ChainClient,
    V: SpellVerifier,
{
    let tx_hex = client
        .fetch_raw_transaction(txid)
        .await
        .map_err(StatusError::Node)?;
    let raw_tx = decode_raw_transaction(&tx_hex).map_err(StatusError::Node)?;
    debug!(txid, bytes = raw_tx.len(), "Fetched attestation transaction");

    state_from_raw(verifier, &raw_tx, output_index, strict).await
}

/// Evaluate the vault registered under `id` against the current chain tip.
pub async fn check_vault<C, V>(
    registry: &VaultRegistry,
    id: &str,
    client: &C,
    verifier: &V,
    options: StatusOptions,
) -> Result<VaultReport, StatusError>
where
    C: ChainClient,
    V: SpellVerifier,
{
    let entry = registry.load(id).map_err(StatusError::Registry)?;
    let output_index = resolve_output_index(&entry, options.output_index);

    info!(
        vault = %entry.id,
        txid = %entry.attestation_txid,
        output_index,
        "Reading vault state"
    );

    let state = fetch_vault_state(
        client,
        verifier,
        &entry.attestation_txid,
        output_index,
        options.strict,
    )
    .await?;

    let current_height = client.current_height().await.map_err(StatusError::Node)?;
    let decision = evaluate(&state, current_height)?;

    info!(
        vault = %entry.id,
        current_height,
        blocks_since_heartbeat = decision.blocks_since_heartbeat,
        expired = decision.expired,
        action = %decision.permitted_action,
        "Vault evaluated"
    );

    Ok(VaultReport {
        entry,
        output_index,
        decision,
    })
}

/// Check that `next` is a legal heartbeat from `prior`.
///
/// The heartbeat is judged at the height it records, which must not be ahead
/// of the chain tip `tip`.
pub fn check_recorded_heartbeat(
    prior: &VaultState,
    next: &VaultState,
    tip: u64,
) -> Result<(), StatusError> {
    if next.last_heartbeat_block > tip {
        return Err(EvaluationError::InconsistentHeight {
            current_height: tip,
            last_heartbeat_block: next.last_heartbeat_block,
        }
        .into());
    }
    check_heartbeat(prior, next, next.last_heartbeat_block)?;
    Ok(())
}

/// Fetch the vault state spent by a heartbeat and check the transition to `next`.
pub async fn verify_heartbeat<C, V>(
    client: &C,
    verifier: &V,
    prior_txid: &str,
    prior_output_index: usize,
    next: &VaultState,
    strict: bool,
) -> Result<(), StatusError>
where
    C: ChainClient,
    V: SpellVerifier,
{
    let prior = fetch_vault_state(client, verifier, prior_txid, prior_output_index, strict).await?;
    let tip = client.current_height().await.map_err(StatusError::Node)?;
    check_recorded_heartbeat(&prior, next, tip)?;

    info!(
        prior_txid,
        previous = prior.last_heartbeat_block,
        recorded = next.last_heartbeat_block,
        "Heartbeat transition is valid"
    );
    Ok(())
}
