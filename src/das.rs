use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Value, json};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;

use crate::error::{Error, Result};

/// Digital-asset-standard view of a compressed NFT, reduced to the fields
/// the coordinators need.
#[derive(Debug, Clone)]
pub struct AssetInfo {
    pub id: Pubkey,
    pub name: Option<String>,
    pub burnt: bool,
    pub owner: Pubkey,
    pub delegate: Option<Pubkey>,
    /// Parent collection, if the asset is grouped under one.
    pub collection: Option<Pubkey>,
    pub data_hash: Option<Hash>,
    pub creator_hash: Option<Hash>,
    pub leaf_id: u64,
}

/// Merkle inclusion proof for a compressed NFT, sufficient to build a burn
/// instruction.
#[derive(Debug, Clone)]
pub struct AssetProof {
    pub root: Hash,
    pub proof: Vec<Pubkey>,
    pub tree: Pubkey,
    pub node_index: u64,
}

/// One page of a `searchAssets` result.
#[derive(Debug, Clone)]
pub struct AssetPage {
    pub total: u64,
    pub limit: u64,
    pub items: Vec<AssetInfo>,
}

/// External digital-asset search index (DAS API).
#[async_trait]
pub trait AssetIndex: Send + Sync {
    async fn get_asset(&self, asset: &Pubkey) -> Result<AssetInfo>;

    async fn get_asset_proof(&self, asset: &Pubkey) -> Result<AssetProof>;

    /// Search assets held by `owner` within `collection`, paginated.
    /// Pages are 1-based, matching the DAS API.
    async fn search_assets(
        &self,
        owner: &Pubkey,
        collection: &Pubkey,
        page: u64,
        limit: u64,
    ) -> Result<AssetPage>;
}

/// DAS client over HTTP JSON-RPC (Helius-style endpoint).
pub struct DasClient {
    url: String,
    http: reqwest::Client,
}

impl DasClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
        }
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "1",
            "method": method,
            "params": params,
        });
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Index(format!("{method}: {e}")))?;

        if response.status().as_u16() == 429 {
            return Err(Error::RateLimited(format!("{method}: HTTP 429")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::Index(format!("{method}: invalid json: {e}")))?;

        if let Some(err) = payload.get("error") {
            return Err(Error::Index(format!("{method}: {err}")));
        }
        payload
            .get("result")
            .cloned()
            .ok_or_else(|| Error::Index(format!("{method}: missing result")))
    }
}

fn parse_pubkey(value: &Value, field: &str) -> Result<Pubkey> {
    let raw = value
        .as_str()
        .ok_or_else(|| Error::Index(format!("missing {field}")))?;
    Pubkey::from_str(raw).map_err(|e| Error::Index(format!("bad {field}: {e}")))
}

fn parse_optional_pubkey(value: &Value) -> Option<Pubkey> {
    value.as_str().and_then(|s| Pubkey::from_str(s).ok())
}

fn parse_optional_hash(value: &Value) -> Option<Hash> {
    value.as_str().and_then(|s| Hash::from_str(s).ok())
}

/// Parse one DAS asset object. The `grouping` array maps the asset to its
/// parent collection via the `collection` group key.
fn parse_asset(value: &Value) -> Result<AssetInfo> {
    let id = parse_pubkey(&value["id"], "asset id")?;
    let ownership = &value["ownership"];
    let owner = parse_pubkey(&ownership["owner"], "ownership.owner")?;
    let delegate = parse_optional_pubkey(&ownership["delegate"]);

    let collection = value["grouping"]
        .as_array()
        .and_then(|groups| {
            groups
                .iter()
                .find(|g| g["group_key"].as_str() == Some("collection"))
        })
        .and_then(|g| parse_optional_pubkey(&g["group_value"]));

    let compression = &value["compression"];

    Ok(AssetInfo {
        id,
        name: value["content"]["metadata"]["name"]
            .as_str()
            .map(str::to_string),
        burnt: value["burnt"].as_bool().unwrap_or(false),
        owner,
        delegate,
        collection,
        data_hash: parse_optional_hash(&compression["data_hash"]),
        creator_hash: parse_optional_hash(&compression["creator_hash"]),
        leaf_id: compression["leaf_id"].as_u64().unwrap_or(0),
    })
}

#[async_trait]
impl AssetIndex for DasClient {
    async fn get_asset(&self, asset: &Pubkey) -> Result<AssetInfo> {
        let result = self
            .rpc_call("getAsset", json!({"id": asset.to_string()}))
            .await?;
        parse_asset(&result)
    }

    async fn get_asset_proof(&self, asset: &Pubkey) -> Result<AssetProof> {
        let result = self
            .rpc_call("getAssetProof", json!({"id": asset.to_string()}))
            .await?;

        let root = result["root"]
            .as_str()
            .and_then(|s| Hash::from_str(s).ok())
            .ok_or_else(|| Error::Index("getAssetProof: missing root".into()))?;
        let tree = parse_pubkey(&result["tree_id"], "tree_id")?;
        let node_index = result["node_index"]
            .as_u64()
            .ok_or_else(|| Error::Index("getAssetProof: missing node_index".into()))?;
        let proof = result["proof"]
            .as_array()
            .ok_or_else(|| Error::Index("getAssetProof: missing proof".into()))?
            .iter()
            .map(|p| parse_pubkey(p, "proof node"))
            .collect::<Result<Vec<_>>>()?;

        Ok(AssetProof {
            root,
            proof,
            tree,
            node_index,
        })
    }

    async fn search_assets(
        &self,
        owner: &Pubkey,
        collection: &Pubkey,
        page: u64,
        limit: u64,
    ) -> Result<AssetPage> {
        let result = self
            .rpc_call(
                "searchAssets",
                json!({
                    "ownerAddress": owner.to_string(),
                    "grouping": ["collection", collection.to_string()],
                    "page": page,
                    "limit": limit,
                    "options": {
                        "showCollectionMetadata": true,
                        "showUnverifiedCollections": true,
                    },
                }),
            )
            .await?;

        let items = result["items"]
            .as_array()
            .ok_or_else(|| Error::Index("searchAssets: missing items".into()))?;

        let mut parsed = Vec::with_capacity(items.len());
        for item in items {
            match parse_asset(item) {
                Ok(asset) => parsed.push(asset),
                // Unrelated or malformed entries in the collection are
                // skipped, not fatal.
                Err(e) => log::warn!("searchAssets: skipping malformed asset: {e}"),
            }
        }

        Ok(AssetPage {
            total: result["total"].as_u64().unwrap_or(parsed.len() as u64),
            limit: result["limit"].as_u64().unwrap_or(limit),
            items: parsed,
        })
    }
}
