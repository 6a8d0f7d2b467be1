// SPDX-License-Identifier: MIT
use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::utxo::UtxoRef;

// --- Attestation (spell) types ---

/// A single application-state value attached to an output.
///
/// Integers are widened to `i128` so that both signed and unsigned wire
/// values survive decoding and range checks happen in the extractor.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    Null,
    Bool(bool),
    Integer(i128),
    Float(f64),
    Text(String),
    List(Vec<StateValue>),
    Map(BTreeMap<String, StateValue>),
}

impl StateValue {
    /// Short name of the value's shape, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            StateValue::Null => "null",
            StateValue::Bool(_) => "bool",
            StateValue::Integer(_) => "integer",
            StateValue::Float(_) => "float",
            StateValue::Text(_) => "text",
            StateValue::List(_) => "list",
            StateValue::Map(_) => "map",
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, StateValue>> {
        match self {
            StateValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

struct StateValueVisitor;

impl<'de> Visitor<'de> for StateValueVisitor {
    type Value = StateValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an application state value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<StateValue, E> {
        Ok(StateValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<StateValue, E> {
        Ok(StateValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<StateValue, D::Error> {
        d.deserialize_any(self)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<StateValue, E> {
        Ok(StateValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<StateValue, E> {
        Ok(StateValue::Integer(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<StateValue, E> {
        Ok(StateValue::Integer(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<StateValue, E> {
        Ok(StateValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<StateValue, E> {
        Ok(StateValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<StateValue, E> {
        Ok(StateValue::Text(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<StateValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(StateValue::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<StateValue, A::Error> {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<String, StateValue>()? {
            if map.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate key '{key}'")));
            }
            map.insert(key, value);
        }
        Ok(StateValue::Map(map))
    }
}

impl<'de> Deserialize<'de> for StateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StateValueVisitor)
    }
}

/// One transaction output as seen by the spell verifier.
///
/// `slots` maps an application slot id to the state that application
/// attached to this output. Outputs without application state carry `None`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct OutputRecord {
    #[serde(deserialize_with = "deserialize_slots")]
    pub slots: Option<BTreeMap<u32, StateValue>>,
}

/// Slot maps reject repeated slot ids instead of keeping the last one.
fn deserialize_slots<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<BTreeMap<u32, StateValue>>, D::Error> {
    struct SlotsVisitor;

    impl<'de> Visitor<'de> for SlotsVisitor {
        type Value = Option<BTreeMap<u32, StateValue>>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of slot ids to state values, or null")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_map(self)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut slots = BTreeMap::new();
            while let Some((slot, value)) = access.next_entry::<u32, StateValue>()? {
                if slots.contains_key(&slot) {
                    return Err(de::Error::custom(format!("duplicate slot {slot}")));
                }
                slots.insert(slot, value);
            }
            Ok(Some(slots))
        }
    }

    deserializer.deserialize_option(SlotsVisitor)
}

impl OutputRecord {
    pub fn with_slot(slot: u32, value: StateValue) -> Self {
        OutputRecord {
            slots: Some(BTreeMap::from([(slot, value)])),
        }
    }

    /// The state mapping, if the output carries any state at all.
    pub fn state(&self) -> Option<&BTreeMap<u32, StateValue>> {
        self.slots.as_ref().filter(|slots| !slots.is_empty())
    }
}

/// Transaction view contained in a verified spell.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SpellTx {
    #[serde(default)]
    pub ins: Vec<UtxoRef>,
    #[serde(default)]
    pub outs: Vec<OutputRecord>,
}

/// Structured result of a successful spell verification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpellResult {
    pub version: u32,
    pub tx: SpellTx,
}

// --- Vault domain types ---

/// Vault state decoded from the vault output's state slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultState {
    pub owner: String,
    pub beneficiary: String,
    pub last_heartbeat_block: u64,
    pub heartbeat_interval: u64,
}

/// Action currently legal for a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermittedAction {
    /// The owner may extend the deadline.
    Heartbeat,
    /// The beneficiary may spend the vault.
    Release,
}

impl fmt::Display for PermittedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermittedAction::Heartbeat => f.write_str("HEARTBEAT"),
            PermittedAction::Release => f.write_str("RELEASE"),
        }
    }
}

/// Lifecycle phase of a switch instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultPhase {
    Armed,
    /// Terminal: there is no transition back to `Armed`.
    Expired,
}

/// Deadline status of a vault at a given chain height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatDecision {
    pub owner: String,
    pub beneficiary: String,
    pub last_heartbeat_block: u64,
    pub heartbeat_interval: u64,
    pub current_height: u64,
    pub blocks_since_heartbeat: u64,
    pub expired: bool,
    pub permitted_action: PermittedAction,
}

impl HeartbeatDecision {
    pub fn phase(&self) -> VaultPhase {
        if self.expired {
            VaultPhase::Expired
        } else {
            VaultPhase::Armed
        }
    }

    /// Blocks left before the vault expires; zero once expired.
    pub fn blocks_remaining(&self) -> u64 {
        self.heartbeat_interval
            .saturating_sub(self.blocks_since_heartbeat)
    }

    /// First height at which release is legal.
    pub fn release_height(&self) -> u64 {
        self.last_heartbeat_block
            .saturating_add(self.heartbeat_interval)
    }

    /// Identity allowed to perform `permitted_action`.
    pub fn authorized_party(&self) -> &str {
        match self.permitted_action {
            PermittedAction::Heartbeat => &self.owner,
            PermittedAction::Release => &self.beneficiary,
        }
    }
}

/// Persisted metadata locating a vault's latest attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRegistryEntry {
    #[serde(default)]
    pub id: String,
    #[serde(alias = "spell_txid")]
    pub attestation_txid: String,
    #[serde(alias = "vault_utxo")]
    pub vault_output_ref: UtxoRef,
    pub app_id: String,
}

/// Compute the identity of a vault created by spending `funding`.
///
/// The identity is the SHA-256 of the canonical `txid:vout` string, which
/// makes it unique per funding output.
pub fn compute_vault_identity(funding: &UtxoRef) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(funding.to_string().as_bytes());
    hasher.finalize().into()
}
