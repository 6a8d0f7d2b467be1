// SPDX-License-Identifier: MIT
use thiserror::Error;

/// The spell verified, but the selected output does not encode a well-formed vault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("output {index} not found (transaction has {outputs} outputs)")]
    OutputNotFound { index: usize, outputs: usize },

    #[error("output {index} carries no application state")]
    NoStateAttached { index: usize },

    #[error("output {index} has no state in slot {slot}")]
    SlotMissing { index: usize, slot: u32 },

    #[error("vault state must be a map, found {found}")]
    MalformedState { found: &'static str },

    #[error("vault state is missing field '{0}'")]
    MissingField(&'static str),

    #[error("vault state field '{0}' has the wrong type or range")]
    TypeMismatch(&'static str),
}

/// Inputs to the evaluator contradict each other.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error(
        "chain height {current_height} is below the recorded heartbeat block {last_heartbeat_block}"
    )]
    InconsistentHeight {
        current_height: u64,
        last_heartbeat_block: u64,
    },
}

/// A vault transition breaks one of the contract rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("vault identity does not match the funding utxo")]
    IdentityMismatch,

    #[error("funding utxo {0} is not spent by the transaction")]
    FundingNotSpent(String),

    #[error("expected exactly one vault output, found {0}")]
    VaultCount(usize),

    #[error("invalid initial vault state: {0}")]
    InvalidInitialState(&'static str),

    #[error("heartbeat must preserve '{0}'")]
    FieldChanged(&'static str),

    #[error("heartbeat window has expired")]
    HeartbeatExpired,

    #[error("heartbeat window has not expired yet ({blocks_remaining} blocks remaining)")]
    NotExpired { blocks_remaining: u64 },

    #[error("new heartbeat block {recorded} must equal the current height {current_height}")]
    HeartbeatBlockMismatch { recorded: u64, current_height: u64 },

    #[error("new heartbeat block {recorded} must be greater than {previous}")]
    HeartbeatNotAdvanced { recorded: u64, previous: u64 },

    #[error("release must consume the vault, found {0} vault outputs")]
    VaultNotConsumed(usize),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}
