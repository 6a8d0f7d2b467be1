// SPDX-License-Identifier: MIT
use tracing::debug;

use vault_types::types::{HeartbeatDecision, PermittedAction, VaultState};

use crate::error::EvaluationError;

/// Classify a vault at `current_height`.
///
/// The boundary is inclusive: a gap exactly equal to the interval is expired,
/// matching the release rule enforced on-chain.
pub fn evaluate(
    state: &VaultState,
    current_height: u64,
) -> Result<HeartbeatDecision, EvaluationError> {
    let blocks_since_heartbeat = current_height
        .checked_sub(state.last_heartbeat_block)
        .ok_or(EvaluationError::InconsistentHeight {
            current_height,
            last_heartbeat_block: state.last_heartbeat_block,
        })?;

    let expired = is_expired(blocks_since_heartbeat, state.heartbeat_interval);
    let permitted_action = if expired {
        PermittedAction::Release
    } else {
        PermittedAction::Heartbeat
    };

    debug!(
        current_height,
        blocks_since_heartbeat,
        heartbeat_interval = state.heartbeat_interval,
        expired,
        "Evaluated heartbeat"
    );

    Ok(HeartbeatDecision {
        owner: state.owner.clone(),
        beneficiary: state.beneficiary.clone(),
        last_heartbeat_block: state.last_heartbeat_block,
        heartbeat_interval: state.heartbeat_interval,
        current_height,
        blocks_since_heartbeat,
        expired,
        permitted_action,
    })
}

fn is_expired(blocks_since_heartbeat: u64, heartbeat_interval: u64) -> bool {
    blocks_since_heartbeat >= heartbeat_interval
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_state() -> VaultState {
        VaultState {
            owner: "O".to_string(),
            beneficiary: "B".to_string(),
            last_heartbeat_block: 800_000,
            heartbeat_interval: 144,
        }
    }

    #[test]
    fn test_armed_within_interval() {
        let decision = evaluate(&scenario_state(), 800_100).unwrap();
        assert_eq!(decision.blocks_since_heartbeat, 100);
        assert!(!decision.expired);
        assert_eq!(decision.permitted_action, PermittedAction::Heartbeat);
        assert_eq!(decision.current_height, 800_100);
    }

    #[test]
    fn test_expired_at_exact_interval() {
        let decision = evaluate(&scenario_state(), 800_144).unwrap();
        assert_eq!(decision.blocks_since_heartbeat, 144);
        assert!(decision.expired);
        assert_eq!(decision.permitted_action, PermittedAction::Release);
    }

    #[test]
    fn test_armed_one_block_before_interval() {
        let decision = evaluate(&scenario_state(), 800_143).unwrap();
        assert!(!decision.expired);
        assert_eq!(decision.permitted_action, PermittedAction::Heartbeat);
    }

    #[test]
    fn test_same_block_is_armed() {
        let decision = evaluate(&scenario_state(), 800_000).unwrap();
        assert_eq!(decision.blocks_since_heartbeat, 0);
        assert!(!decision.expired);
    }

    #[test]
    fn test_interval_of_one() {
        let state = VaultState {
            heartbeat_interval: 1,
            ..scenario_state()
        };
        assert!(!evaluate(&state, 800_000).unwrap().expired);
        assert!(evaluate(&state, 800_001).unwrap().expired);
    }

    #[test]
    fn test_stale_height_is_inconsistent() {
        for height in [0, 1, 799_999] {
            assert_eq!(
                evaluate(&scenario_state(), height),
                Err(EvaluationError::InconsistentHeight {
                    current_height: height,
                    last_heartbeat_block: 800_000,
                })
            );
        }
    }

    #[test]
    fn test_expiry_matches_gap_rule() {
        let state = scenario_state();
        for height in (800_000..800_400).step_by(7) {
            let decision = evaluate(&state, height).unwrap();
            assert_eq!(
                decision.expired,
                height - state.last_heartbeat_block >= state.heartbeat_interval
            );
            assert_eq!(
                decision.permitted_action == PermittedAction::Heartbeat,
                !decision.expired
            );
        }
    }

    #[test]
    fn test_extreme_heights() {
        let state = VaultState {
            last_heartbeat_block: 0,
            heartbeat_interval: u64::MAX,
            ..scenario_state()
        };
        let decision = evaluate(&state, u64::MAX).unwrap();
        assert!(decision.expired);
        assert_eq!(decision.blocks_since_heartbeat, u64::MAX);
    }
}
