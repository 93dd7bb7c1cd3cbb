//! Claim-and-burn coordinator.
//!
//! Releases the payout for a winning position, then destroys the redeemed
//! position NFT. The two transactions are built against one blockhash and
//! signed in one batch, but submitted strictly in order: the burn is never
//! sent unless the payout confirmed, so a failed claim always leaves the
//! token intact for a retry.

use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::bubblegum;
use crate::das::AssetIndex;
use crate::error::{Error, Result};
use crate::rpc::RpcBackend;
use crate::sdk::MarketSdk;
use crate::wallet::WalletSigner;

/// Delay between the confirmed payout and the burn submission, giving the
/// network time to propagate state before the burn's ownership check is
/// re-validated.
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ClaimConfig {
    pub settle_delay: Duration,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Outcome of a claim-and-burn invocation that released the payout.
///
/// Total failure (payout never confirmed) is the `Err` arm of
/// [`claim_and_burn`]; in that case no on-chain effect is guaranteed and
/// the whole operation is safe to retry.
#[derive(Debug)]
pub enum ClaimOutcome {
    /// Both transactions confirmed.
    Complete {
        payout_signature: Signature,
        burn_signature: Signature,
    },
    /// The payout confirmed but the burn did not. Winnings are safe; the
    /// position token remains and only the burn should be retried.
    Partial {
        payout_signature: Signature,
        burn_error: Error,
    },
}

impl ClaimOutcome {
    pub fn payout_signature(&self) -> &Signature {
        match self {
            ClaimOutcome::Complete {
                payout_signature, ..
            }
            | ClaimOutcome::Partial {
                payout_signature, ..
            } => payout_signature,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ClaimOutcome::Complete { .. })
    }
}

/// Claim the payout for a winning position and burn its NFT.
///
/// The caller wallet must be the current owner or delegate of the asset;
/// this is checked against the index before any transaction is built. If
/// `core_collection` is not supplied it is detected from the asset's
/// grouping.
pub async fn claim_and_burn(
    rpc: &dyn RpcBackend,
    index: &dyn AssetIndex,
    sdk: &dyn MarketSdk,
    wallet: &dyn WalletSigner,
    asset_id: &Pubkey,
    market_id: u64,
    core_collection: Option<Pubkey>,
    config: &ClaimConfig,
) -> Result<ClaimOutcome> {
    let payer = wallet.pubkey();

    // 1. Payout instructions from the market SDK.
    let payout_ixs = sdk.payout_position(market_id, &payer, asset_id).await?;
    if payout_ixs.is_empty() {
        return Err(Error::NoPayoutInstructions { market_id });
    }

    // 2. Current owner/delegate and inclusion proof. The authorization
    //    check runs before anything is built or signed.
    let asset = index.get_asset(asset_id).await?;
    if asset.burnt {
        return Err(Error::AssetBurned(asset_id.to_string()));
    }
    let is_owner = asset.owner == payer;
    let is_delegate = asset.delegate == Some(payer);
    if !is_owner && !is_delegate {
        return Err(Error::NotAssetAuthority {
            asset: asset_id.to_string(),
            wallet: payer.to_string(),
        });
    }
    let collection = core_collection.or(asset.collection);
    let proof = index.get_asset_proof(asset_id).await?;

    let leaf_owner = asset.owner;
    let leaf_delegate = asset.delegate.unwrap_or(leaf_owner);
    let burn_ix = bubblegum::burn_instruction(
        &payer,
        &asset,
        &proof,
        &leaf_owner,
        &leaf_delegate,
        collection.as_ref(),
    )?;

    // 3. Two independent transactions sharing one fresh blockhash.
    let (blockhash, last_valid_block_height) = rpc.latest_blockhash().await?;
    let payout_tx = Transaction::new_with_payer(&payout_ixs, Some(&payer));
    let burn_tx = Transaction::new_with_payer(&[burn_ix], Some(&payer));

    // 4. One signing prompt for both.
    let mut txs = [payout_tx, burn_tx];
    wallet.sign_all(&mut txs, blockhash).await?;
    let [payout_tx, burn_tx] = txs;

    // 5. Payout first. Any failure here aborts before the burn is sent so
    //    the position token survives for a retry.
    let payout_signature = rpc.send_transaction(&payout_tx).await?;
    rpc.confirm_transaction(&payout_signature, last_valid_block_height)
        .await?;
    log::info!("payout confirmed for market {market_id}: {payout_signature}");

    // 6. Let state propagate before the burn's ownership re-validation.
    tokio::time::sleep(config.settle_delay).await;

    // 7. Burn. Failure past this point is partial, never total: funds are
    //    already released.
    let burn_result = async {
        let signature = rpc.send_transaction(&burn_tx).await?;
        rpc.confirm_transaction(&signature, last_valid_block_height)
            .await?;
        Ok::<_, Error>(signature)
    }
    .await;

    match burn_result {
        Ok(burn_signature) => {
            log::info!("burn confirmed for asset {asset_id}: {burn_signature}");
            Ok(ClaimOutcome::Complete {
                payout_signature,
                burn_signature,
            })
        }
        Err(burn_error) => {
            log::warn!("payout {payout_signature} landed but burn failed: {burn_error}");
            Ok(ClaimOutcome::Partial {
                payout_signature,
                burn_error,
            })
        }
    }
}
