// SPDX-License-Identifier: MIT

/// Slot id under which an output carries the vault's own state.
pub const VAULT_STATE_SLOT: u32 = 0;

/// Output index read by default when extracting vault state.
///
/// The vault output is the first output of every vault transaction by
/// convention; callers that know better pass the index explicitly.
pub const VAULT_OUTPUT_INDEX: usize = 0;

pub const FIELD_OWNER: &str = "owner";
pub const FIELD_BENEFICIARY: &str = "beneficiary";
pub const FIELD_LAST_HEARTBEAT_BLOCK: &str = "last_heartbeat_block";
pub const FIELD_HEARTBEAT_INTERVAL: &str = "heartbeat_interval";
