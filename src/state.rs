use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::{Error, Result};

const STATE_FILE: &str = "depredict_state.json";

/// Addresses produced by a completed market-creator setup, persisted
/// locally so the wizard need not be replayed after a reload.
///
/// This is a resumption hint only. The authoritative check is always the
/// on-chain read; these values are never trusted beyond deriving which
/// account to query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreatorDetails {
    pub market_creator: String,
    pub admin_key: String,
    pub core_collection: String,
    pub merkle_tree: String,
    pub verified: bool,
    pub created_at: String,
}

impl CreatorDetails {
    pub fn new(
        market_creator: &Pubkey,
        admin_key: &Pubkey,
        core_collection: &Pubkey,
        merkle_tree: &Pubkey,
    ) -> Self {
        Self {
            market_creator: market_creator.to_string(),
            admin_key: admin_key.to_string(),
            core_collection: core_collection.to_string(),
            merkle_tree: merkle_tree.to_string(),
            verified: true,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn admin_pubkey(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.admin_key)
            .map_err(|e| Error::State(format!("stored admin key: {e}")))
    }
}

/// Single-blob JSON persistence under the data directory.
pub struct StateStore {
    file_path: PathBuf,
}

impl StateStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            file_path: data_dir.join(STATE_FILE),
        }
    }

    pub fn exists(&self) -> bool {
        self.file_path.exists()
    }

    /// Load the persisted details. A missing file is `None`; a corrupt file
    /// is also `None` (the hint is disposable, the chain is authoritative).
    pub fn load(&self) -> Option<CreatorDetails> {
        let contents = fs::read_to_string(&self.file_path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(details) => Some(details),
            Err(e) => {
                log::warn!("ignoring corrupt state file {}: {e}", self.file_path.display());
                None
            }
        }
    }

    pub fn save(&self, details: &CreatorDetails) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(details)?;
        fs::write(&self.file_path, json)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.file_path.exists() {
            fs::remove_file(&self.file_path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> CreatorDetails {
        CreatorDetails::new(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
        )
    }

    #[test]
    fn round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        assert!(!store.exists());
        assert!(store.load().is_none());

        let d = details();
        store.save(&d).unwrap();
        assert!(store.exists());
        assert_eq!(store.load().unwrap(), d);

        store.clear().unwrap();
        assert!(!store.exists());
    }

    #[test]
    fn corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        fs::write(dir.path().join(STATE_FILE), "not json").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn uses_camel_case_keys() {
        let json = serde_json::to_string(&details()).unwrap();
        assert!(json.contains("marketCreator"));
        assert!(json.contains("coreCollection"));
        assert!(json.contains("merkleTree"));
        assert!(json.contains("createdAt"));
    }
}
