use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use solana_sdk::instruction::Instruction;

use crate::error::{Error, Result};
use crate::wallet::WalletSigner;

/// Build a transaction from `instructions`, sign it, submit it, and wait
/// for confirmation. The unit of work for every single-transaction flow.
pub async fn send_and_confirm(
    rpc: &dyn RpcBackend,
    wallet: &dyn WalletSigner,
    instructions: &[Instruction],
    payer: &Pubkey,
) -> Result<Signature> {
    let (blockhash, last_valid_block_height) = rpc.latest_blockhash().await?;
    let tx = Transaction::new_with_payer(instructions, Some(payer));
    let mut txs = [tx];
    wallet.sign_all(&mut txs, blockhash).await?;
    let [tx] = txs;
    let signature = rpc.send_transaction(&tx).await?;
    rpc.confirm_transaction(&signature, last_valid_block_height)
        .await?;
    Ok(signature)
}

/// Backend for interacting with a Solana JSON-RPC node.
///
/// Coordinators depend on this trait rather than a concrete client so tests
/// can script submission and confirmation outcomes.
#[async_trait]
pub trait RpcBackend: Send + Sync {
    /// Fetch a fresh blockhash and the last block height it is valid for.
    async fn latest_blockhash(&self) -> Result<(Hash, u64)>;

    /// Submit a signed transaction and return its signature.
    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature>;

    /// Wait until the transaction is confirmed or its blockhash expires.
    /// A confirmation that reports an on-chain error is an `Err`.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<()>;

    /// Whether an account exists (has been allocated) on-chain.
    async fn account_exists(&self, address: &Pubkey) -> Result<bool>;
}

/// HTTP JSON-RPC backend.
pub struct HttpRpcBackend {
    url: String,
    http: reqwest::Client,
    poll_interval: Duration,
}

impl HttpRpcBackend {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
            poll_interval: Duration::from_millis(500),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Rpc(format!("{method}: {e}")))?;

        if response.status().as_u16() == 429 {
            return Err(Error::RateLimited(format!("{method}: HTTP 429")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::Rpc(format!("{method}: invalid json: {e}")))?;

        if let Some(err) = payload.get("error") {
            return Err(Error::classify(format!("{method}: {err}")));
        }
        payload
            .get("result")
            .cloned()
            .ok_or_else(|| Error::Rpc(format!("{method}: missing result")))
    }
}

#[async_trait]
impl RpcBackend for HttpRpcBackend {
    async fn latest_blockhash(&self) -> Result<(Hash, u64)> {
        let result = self
            .rpc_call("getLatestBlockhash", json!([{"commitment": "confirmed"}]))
            .await?;
        let value = &result["value"];
        let blockhash = value["blockhash"]
            .as_str()
            .ok_or_else(|| Error::Rpc("getLatestBlockhash: missing blockhash".into()))?;
        let last_valid = value["lastValidBlockHeight"]
            .as_u64()
            .ok_or_else(|| Error::Rpc("getLatestBlockhash: missing lastValidBlockHeight".into()))?;
        let hash = Hash::from_str(blockhash)
            .map_err(|e| Error::Rpc(format!("getLatestBlockhash: bad blockhash: {e}")))?;
        Ok((hash, last_valid))
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature> {
        let bytes =
            bincode::serialize(tx).map_err(|e| Error::Rpc(format!("serialize transaction: {e}")))?;
        let encoded = BASE64.encode(bytes);
        let result = self
            .rpc_call(
                "sendTransaction",
                json!([encoded, {"encoding": "base64", "skipPreflight": false}]),
            )
            .await?;
        let signature = result
            .as_str()
            .ok_or_else(|| Error::Rpc("sendTransaction: non-string signature".into()))?;
        Signature::from_str(signature)
            .map_err(|e| Error::Rpc(format!("sendTransaction: bad signature: {e}")))
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<()> {
        loop {
            let result = self
                .rpc_call(
                    "getSignatureStatuses",
                    json!([[signature.to_string()], {"searchTransactionHistory": false}]),
                )
                .await?;
            let status = &result["value"][0];

            if !status.is_null() {
                if !status["err"].is_null() {
                    return Err(Error::classify(format!(
                        "transaction {signature} failed: {}",
                        status["err"]
                    )));
                }
                match status["confirmationStatus"].as_str() {
                    Some("confirmed") | Some("finalized") => return Ok(()),
                    _ => {}
                }
            }

            let height = self
                .rpc_call("getBlockHeight", json!([{"commitment": "confirmed"}]))
                .await?
                .as_u64()
                .ok_or_else(|| Error::Rpc("getBlockHeight: non-numeric result".into()))?;
            if height > last_valid_block_height {
                return Err(Error::StaleBlockhash(format!(
                    "transaction {signature} expired at block height {height}"
                )));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        let result = self
            .rpc_call(
                "getAccountInfo",
                json!([address.to_string(), {"encoding": "base64"}]),
            )
            .await?;
        Ok(!result["value"].is_null())
    }
}
