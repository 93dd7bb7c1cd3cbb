use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;

use crate::error::{Error, Result};

const ENV_RPC_URL: &str = "DEPREDICT_RPC_URL";
const ENV_DAS_URL: &str = "DEPREDICT_DAS_URL";
const ENV_ADMIN_KEY: &str = "DEPREDICT_CREATOR_ADMIN_KEY";
const ENV_COLLECTION: &str = "DEPREDICT_COLLECTION_ADDRESS";
const ENV_DATA_DIR: &str = "DEPREDICT_DATA_DIR";

const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

/// Deployment-time configuration.
///
/// The admin key and collection address identify the authoritative market
/// creator; their absence is not an error — it routes callers into the
/// "setup required" path instead.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub rpc_url: String,
    /// DAS-capable endpoint for asset queries. Falls back to `rpc_url`.
    pub das_url: String,
    pub admin_key: Option<Pubkey>,
    pub collection: Option<Pubkey>,
    pub data_dir: PathBuf,
}

impl ClientConfig {
    pub fn new(rpc_url: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        let rpc_url = rpc_url.into();
        Self {
            das_url: rpc_url.clone(),
            rpc_url,
            admin_key: None,
            collection: None,
            data_dir: data_dir.into(),
        }
    }

    /// Read configuration from the environment. Malformed pubkeys are
    /// errors; missing ones are simply `None`.
    pub fn from_env() -> Result<Self> {
        let rpc_url = env::var(ENV_RPC_URL).unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());
        let das_url = env::var(ENV_DAS_URL).unwrap_or_else(|_| rpc_url.clone());
        let data_dir = env::var(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let admin_key = parse_optional_pubkey(ENV_ADMIN_KEY)?;
        let collection = parse_optional_pubkey(ENV_COLLECTION)?;

        if admin_key.is_none() {
            log::info!("no {ENV_ADMIN_KEY} configured; market creator setup required");
        }

        Ok(Self {
            rpc_url,
            das_url,
            admin_key,
            collection,
            data_dir,
        })
    }

    pub fn with_admin_key(mut self, admin_key: Pubkey) -> Self {
        self.admin_key = Some(admin_key);
        self
    }

    pub fn with_collection(mut self, collection: Pubkey) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn has_env_key(&self) -> bool {
        self.admin_key.is_some()
    }
}

fn parse_optional_pubkey(var: &str) -> Result<Option<Pubkey>> {
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => Pubkey::from_str(raw.trim())
            .map(Some)
            .map_err(|e| Error::Config(format!("{var}: {e}"))),
        _ => Ok(None),
    }
}
