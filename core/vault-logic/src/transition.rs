// SPDX-License-Identifier: MIT
//! Contract rules for the three vault transitions: creation, heartbeat and
//! release. Each check takes already-decoded states and reports the first
//! rule that does not hold.
//!
//! `deadman extract --prior-txid` runs [`check_heartbeat`] on an observed
//! heartbeat. Creation and release checks are library-only: the tool never
//! builds transactions.

use vault_types::types::{compute_vault_identity, SpellResult, VaultState};
use vault_types::utxo::UtxoRef;

use crate::error::TransitionError;
use crate::evaluator::evaluate;
use crate::extractor::vault_outputs;

/// Check a creation spell: the vault identity is bound to the funding output,
/// that output is spent, and exactly one well-formed vault is created.
pub fn check_creation(
    identity: &[u8; 32],
    funding: &UtxoRef,
    spell: &SpellResult,
) -> Result<VaultState, TransitionError> {
    if compute_vault_identity(funding) != *identity {
        return Err(TransitionError::IdentityMismatch);
    }

    if !spell.tx.ins.iter().any(|input| input == funding) {
        return Err(TransitionError::FundingNotSpent(funding.to_string()));
    }

    let mut created = vault_outputs(spell)?;
    if created.len() != 1 {
        return Err(TransitionError::VaultCount(created.len()));
    }
    let (_, state) = created.remove(0);

    if state.owner.is_empty() {
        return Err(TransitionError::InvalidInitialState("owner is empty"));
    }
    if state.beneficiary.is_empty() {
        return Err(TransitionError::InvalidInitialState("beneficiary is empty"));
    }
    if state.heartbeat_interval == 0 {
        return Err(TransitionError::InvalidInitialState(
            "heartbeat_interval is zero",
        ));
    }
    if state.last_heartbeat_block == 0 {
        return Err(TransitionError::InvalidInitialState(
            "last_heartbeat_block is zero",
        ));
    }

    Ok(state)
}

/// Check a heartbeat from `incoming` to `outgoing` at `current_height`.
pub fn check_heartbeat(
    incoming: &VaultState,
    outgoing: &VaultState,
    current_height: u64,
) -> Result<(), TransitionError> {
    if incoming.owner != outgoing.owner {
        return Err(TransitionError::FieldChanged("owner"));
    }
    if incoming.beneficiary != outgoing.beneficiary {
        return Err(TransitionError::FieldChanged("beneficiary"));
    }
    if incoming.heartbeat_interval != outgoing.heartbeat_interval {
        return Err(TransitionError::FieldChanged("heartbeat_interval"));
    }

    if evaluate(incoming, current_height)?.expired {
        return Err(TransitionError::HeartbeatExpired);
    }

    if outgoing.last_heartbeat_block != current_height {
        return Err(TransitionError::HeartbeatBlockMismatch {
            recorded: outgoing.last_heartbeat_block,
            current_height,
        });
    }
    if outgoing.last_heartbeat_block <= incoming.last_heartbeat_block {
        return Err(TransitionError::HeartbeatNotAdvanced {
            recorded: outgoing.last_heartbeat_block,
            previous: incoming.last_heartbeat_block,
        });
    }

    Ok(())
}

/// Check a release of `incoming` at `current_height`.
///
/// `outgoing_vaults` is the number of vault states the release transaction
/// creates; a release is terminal, so it must be zero.
pub fn check_release(
    incoming: &VaultState,
    current_height: u64,
    outgoing_vaults: usize,
) -> Result<(), TransitionError> {
    let decision = evaluate(incoming, current_height)?;
    if !decision.expired {
        return Err(TransitionError::NotExpired {
            blocks_remaining: decision.blocks_remaining(),
        });
    }
    if outgoing_vaults != 0 {
        return Err(TransitionError::VaultNotConsumed(outgoing_vaults));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EvaluationError, ExtractionError};
    use vault_types::types::{OutputRecord, SpellTx, StateValue};

    const FUNDING: &str = "dc78b09d767c8565c4a58a95e7ad5ee22b28fc1685535056a395dc94929cdd5f:1";

    fn state(last_heartbeat_block: u64) -> VaultState {
        VaultState {
            owner: "bc1qowner".to_string(),
            beneficiary: "bc1qbeneficiary".to_string(),
            last_heartbeat_block,
            heartbeat_interval: 144,
        }
    }

    fn vault_output(state: &VaultState) -> OutputRecord {
        OutputRecord::with_slot(
            0,
            StateValue::Map(
                [
                    ("owner", StateValue::Text(state.owner.clone())),
                    ("beneficiary", StateValue::Text(state.beneficiary.clone())),
                    (
                        "last_heartbeat_block",
                        StateValue::Integer(state.last_heartbeat_block.into()),
                    ),
                    (
                        "heartbeat_interval",
                        StateValue::Integer(state.heartbeat_interval.into()),
                    ),
                ]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            ),
        )
    }

    fn creation_spell(outs: Vec<OutputRecord>) -> SpellResult {
        SpellResult {
            version: 1,
            tx: SpellTx {
                ins: vec![FUNDING.parse().unwrap()],
                outs,
            },
        }
    }

    fn funding() -> UtxoRef {
        FUNDING.parse().unwrap()
    }

    #[test]
    fn test_creation_accepted() {
        let spell = creation_spell(vec![vault_output(&state(850_000))]);
        let identity = compute_vault_identity(&funding());
        let created = check_creation(&identity, &funding(), &spell).unwrap();
        assert_eq!(created, state(850_000));
    }

    #[test]
    fn test_creation_identity_mismatch() {
        let spell = creation_spell(vec![vault_output(&state(850_000))]);
        assert_eq!(
            check_creation(&[0u8; 32], &funding(), &spell),
            Err(TransitionError::IdentityMismatch)
        );
    }

    #[test]
    fn test_creation_funding_not_spent() {
        let mut spell = creation_spell(vec![vault_output(&state(850_000))]);
        spell.tx.ins.clear();
        let identity = compute_vault_identity(&funding());
        assert!(matches!(
            check_creation(&identity, &funding(), &spell),
            Err(TransitionError::FundingNotSpent(_))
        ));
    }

    #[test]
    fn test_creation_requires_single_vault() {
        let identity = compute_vault_identity(&funding());
        let spell = creation_spell(vec![]);
        assert_eq!(
            check_creation(&identity, &funding(), &spell),
            Err(TransitionError::VaultCount(0))
        );

        let two = creation_spell(vec![
            vault_output(&state(850_000)),
            vault_output(&state(850_000)),
        ]);
        assert_eq!(
            check_creation(&identity, &funding(), &two),
            Err(TransitionError::VaultCount(2))
        );
    }

    #[test]
    fn test_creation_rejects_zero_initial_height() {
        let identity = compute_vault_identity(&funding());
        let spell = creation_spell(vec![vault_output(&state(0))]);
        assert!(matches!(
            check_creation(&identity, &funding(), &spell),
            Err(TransitionError::InvalidInitialState(_))
        ));
    }

    #[test]
    fn test_creation_rejects_malformed_vault() {
        let identity = compute_vault_identity(&funding());
        let spell = creation_spell(vec![OutputRecord::with_slot(0, StateValue::Null)]);
        assert_eq!(
            check_creation(&identity, &funding(), &spell),
            Err(TransitionError::Extraction(ExtractionError::MalformedState {
                found: "null"
            }))
        );
    }

    #[test]
    fn test_heartbeat_accepted() {
        assert_eq!(
            check_heartbeat(&state(850_000), &state(850_100), 850_100),
            Ok(())
        );
    }

    #[test]
    fn test_heartbeat_must_preserve_fields() {
        let mut outgoing = state(850_100);
        outgoing.beneficiary = "bc1qattacker".to_string();
        assert_eq!(
            check_heartbeat(&state(850_000), &outgoing, 850_100),
            Err(TransitionError::FieldChanged("beneficiary"))
        );

        let mut outgoing = state(850_100);
        outgoing.heartbeat_interval = 1_000_000;
        assert_eq!(
            check_heartbeat(&state(850_000), &outgoing, 850_100),
            Err(TransitionError::FieldChanged("heartbeat_interval"))
        );
    }

    #[test]
    fn test_heartbeat_after_expiry_rejected() {
        assert_eq!(
            check_heartbeat(&state(850_000), &state(850_144), 850_144),
            Err(TransitionError::HeartbeatExpired)
        );
    }

    #[test]
    fn test_heartbeat_must_record_current_height() {
        assert_eq!(
            check_heartbeat(&state(850_000), &state(850_050), 850_100),
            Err(TransitionError::HeartbeatBlockMismatch {
                recorded: 850_050,
                current_height: 850_100,
            })
        );
    }

    #[test]
    fn test_heartbeat_must_advance() {
        assert_eq!(
            check_heartbeat(&state(850_000), &state(850_000), 850_000),
            Err(TransitionError::HeartbeatNotAdvanced {
                recorded: 850_000,
                previous: 850_000,
            })
        );
    }

    #[test]
    fn test_heartbeat_with_stale_height() {
        assert_eq!(
            check_heartbeat(&state(850_000), &state(849_000), 849_000),
            Err(TransitionError::Evaluation(
                EvaluationError::InconsistentHeight {
                    current_height: 849_000,
                    last_heartbeat_block: 850_000,
                }
            ))
        );
    }

    #[test]
    fn test_release_accepted_at_boundary() {
        assert_eq!(check_release(&state(850_000), 850_144, 0), Ok(()));
    }

    #[test]
    fn test_release_before_expiry_rejected() {
        assert_eq!(
            check_release(&state(850_000), 850_143, 0),
            Err(TransitionError::NotExpired {
                blocks_remaining: 1
            })
        );
    }

    #[test]
    fn test_release_must_consume_vault() {
        assert_eq!(
            check_release(&state(850_000), 860_000, 1),
            Err(TransitionError::VaultNotConsumed(1))
        );
    }
}
