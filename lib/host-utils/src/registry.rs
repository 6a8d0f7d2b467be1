// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::warn;

use vault_types::types::VaultRegistryEntry;

const VAULT_DIR_PREFIX: &str = "vault-";
const INFO_FILE: &str = "info.json";

/// Read-only view of the vault metadata directory.
///
/// Each vault lives in `<root>/vault-<id>/info.json`.
#[derive(Debug, Clone)]
pub struct VaultRegistry {
    root: PathBuf,
}

impl VaultRegistry {
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            bail!("vault registry directory does not exist: {}", root.display());
        }
        Ok(VaultRegistry {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the metadata file for `id` (with or without the `vault-` prefix).
    pub fn entry_path(&self, id: &str) -> Result<PathBuf> {
        let id = normalize_id(id)?;
        Ok(self
            .root
            .join(format!("{VAULT_DIR_PREFIX}{id}"))
            .join(INFO_FILE))
    }

    /// Load the entry for vault `id`.
    pub fn load(&self, id: &str) -> Result<VaultRegistryEntry> {
        let path = self.entry_path(id)?;
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read vault metadata {}", path.display()))?;
        let mut entry: VaultRegistryEntry = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse vault metadata {}", path.display()))?;
        if entry.id.is_empty() {
            entry.id = normalize_id(id)?.to_string();
        }
        Ok(entry)
    }

    /// All readable entries, sorted by id. Unreadable entries are skipped with a warning.
    pub fn list(&self) -> Result<Vec<VaultRegistryEntry>> {
        let mut entries = Vec::new();
        let dir = std::fs::read_dir(&self.root)
            .with_context(|| format!("failed to list {}", self.root.display()))?;

        for item in dir {
            let item = item.with_context(|| format!("failed to list {}", self.root.display()))?;
            let name = item.file_name();
            let Some(id) = name
                .to_str()
                .and_then(|n| n.strip_prefix(VAULT_DIR_PREFIX))
            else {
                continue;
            };
            if !item.path().join(INFO_FILE).is_file() {
                continue;
            }
            match self.load(id) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping vault {}: {:#}", id, e),
            }
        }

        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }
}

fn normalize_id(id: &str) -> Result<&str> {
    let id = id.strip_prefix(VAULT_DIR_PREFIX).unwrap_or(id);
    if id.is_empty() {
        bail!("vault id cannot be empty");
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        bail!("invalid vault id '{}'", id);
    }
    Ok(id)
}
