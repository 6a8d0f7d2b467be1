// SPDX-License-Identifier: MIT
use std::collections::BTreeMap;

use tracing::debug;

use vault_types::constants::{
    FIELD_BENEFICIARY, FIELD_HEARTBEAT_INTERVAL, FIELD_LAST_HEARTBEAT_BLOCK, FIELD_OWNER,
    VAULT_OUTPUT_INDEX, VAULT_STATE_SLOT,
};
use vault_types::types::{SpellResult, StateValue, VaultState};

use crate::error::ExtractionError;

/// Decode the vault state carried by output `output_index` of a verified spell.
///
/// Decoding follows a fixed schema: every field must be present with the
/// expected shape, nothing is defaulted. Unknown extra keys are ignored.
pub fn extract(spell: &SpellResult, output_index: usize) -> Result<VaultState, ExtractionError> {
    let outs = &spell.tx.outs;
    if outs.is_empty() {
        return Err(ExtractionError::NoOutputs);
    }

    let output = outs
        .get(output_index)
        .ok_or(ExtractionError::OutputNotFound {
            index: output_index,
            outputs: outs.len(),
        })?;

    let slots = output
        .state()
        .ok_or(ExtractionError::NoStateAttached {
            index: output_index,
        })?;

    let value = slots
        .get(&VAULT_STATE_SLOT)
        .ok_or(ExtractionError::SlotMissing {
            index: output_index,
            slot: VAULT_STATE_SLOT,
        })?;

    let state = decode_vault_state(value)?;
    debug!(
        output_index,
        owner = %state.owner,
        last_heartbeat_block = state.last_heartbeat_block,
        heartbeat_interval = state.heartbeat_interval,
        "Extracted vault state"
    );
    Ok(state)
}

/// [`extract`] at the conventional vault output.
pub fn extract_default(spell: &SpellResult) -> Result<VaultState, ExtractionError> {
    extract(spell, VAULT_OUTPUT_INDEX)
}

/// Every output that decodes as a vault state, with its index.
///
/// Outputs without a vault slot are skipped; an output that has the slot
/// but fails to decode is an error.
pub fn vault_outputs(spell: &SpellResult) -> Result<Vec<(usize, VaultState)>, ExtractionError> {
    let mut found = Vec::new();
    for (index, output) in spell.tx.outs.iter().enumerate() {
        let Some(value) = output
            .state()
            .and_then(|slots| slots.get(&VAULT_STATE_SLOT))
        else {
            continue;
        };
        found.push((index, decode_vault_state(value)?));
    }
    Ok(found)
}

/// Decode a slot value into a [`VaultState`].
pub fn decode_vault_state(value: &StateValue) -> Result<VaultState, ExtractionError> {
    let map = value.as_map().ok_or(ExtractionError::MalformedState {
        found: value.kind(),
    })?;

    Ok(VaultState {
        owner: identity_field(map, FIELD_OWNER)?,
        beneficiary: identity_field(map, FIELD_BENEFICIARY)?,
        last_heartbeat_block: height_field(map, FIELD_LAST_HEARTBEAT_BLOCK)?,
        heartbeat_interval: interval_field(map, FIELD_HEARTBEAT_INTERVAL)?,
    })
}

fn field<'a>(
    map: &'a BTreeMap<String, StateValue>,
    name: &'static str,
) -> Result<&'a StateValue, ExtractionError> {
    map.get(name).ok_or(ExtractionError::MissingField(name))
}

fn identity_field(
    map: &BTreeMap<String, StateValue>,
    name: &'static str,
) -> Result<String, ExtractionError> {
    match field(map, name)? {
        StateValue::Text(s) if !s.is_empty() => Ok(s.clone()),
        _ => Err(ExtractionError::TypeMismatch(name)),
    }
}

fn height_field(
    map: &BTreeMap<String, StateValue>,
    name: &'static str,
) -> Result<u64, ExtractionError> {
    match field(map, name)? {
        StateValue::Integer(n) => {
            u64::try_from(*n).map_err(|_| ExtractionError::TypeMismatch(name))
        }
        _ => Err(ExtractionError::TypeMismatch(name)),
    }
}

fn interval_field(
    map: &BTreeMap<String, StateValue>,
    name: &'static str,
) -> Result<u64, ExtractionError> {
    match height_field(map, name)? {
        0 => Err(ExtractionError::TypeMismatch(name)),
        n => Ok(n),
    }
}
