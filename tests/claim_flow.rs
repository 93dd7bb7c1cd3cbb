//! End-to-end claim-and-burn flow against mocked collaborators.

use std::time::Duration;

use solana_sdk::pubkey::Pubkey;

use depredict_client::bubblegum::BUBBLEGUM_PROGRAM_ID;
use depredict_client::claim::{ClaimConfig, claim_and_burn};
use depredict_client::error::Error;
use depredict_client::testing::{MockIndex, MockRpc, MockSdk, MockWallet, test_asset, test_proof};
use depredict_client::wallet::WalletSigner;

fn fast_config() -> ClaimConfig {
    ClaimConfig {
        settle_delay: Duration::ZERO,
    }
}

struct Setup {
    rpc: MockRpc,
    index: MockIndex,
    sdk: MockSdk,
    wallet: MockWallet,
    asset_id: Pubkey,
}

impl Setup {
    fn owned_by_wallet() -> Self {
        let wallet = MockWallet::new();
        let index = MockIndex::new();
        let asset_id = Pubkey::new_unique();
        index.insert_asset(
            test_asset(asset_id, wallet.pubkey(), "DEPREDICT-1-1"),
            test_proof(Pubkey::new_unique()),
        );
        Self {
            rpc: MockRpc::new(),
            index,
            sdk: MockSdk::new(),
            wallet,
            asset_id,
        }
    }

    async fn claim(&self) -> depredict_client::error::Result<depredict_client::ClaimOutcome> {
        claim_and_burn(
            &self.rpc,
            &self.index,
            &self.sdk,
            &self.wallet,
            &self.asset_id,
            1,
            None,
            &fast_config(),
        )
        .await
    }
}

#[tokio::test]
async fn happy_path_sends_payout_then_burn() {
    let setup = Setup::owned_by_wallet();

    let outcome = setup.claim().await.unwrap();
    assert!(outcome.is_complete());

    let sent = setup.rpc.sent();
    assert_eq!(sent.len(), 2);
    // Payout instructions come from the market program, the burn from
    // Bubblegum, submitted strictly in that order.
    assert_eq!(
        sent[0].message.instructions.len(),
        1,
        "payout tx carries the sdk instruction"
    );
    let burn_program_index = sent[1].message.instructions[0].program_id_index as usize;
    assert_eq!(
        sent[1].message.account_keys[burn_program_index],
        BUBBLEGUM_PROGRAM_ID
    );
    // Both transactions were built against the same blockhash.
    assert_eq!(
        sent[0].message.recent_blockhash,
        sent[1].message.recent_blockhash
    );
}

#[tokio::test]
async fn payout_failure_aborts_before_burn() {
    let setup = Setup::owned_by_wallet();
    setup
        .rpc
        .push_confirm_result(Err("Blockhash not found".into()));

    let err = setup.claim().await.unwrap_err();
    assert!(matches!(err, Error::StaleBlockhash(_)));
    // The payout was submitted, the burn never was: the position token
    // survives for a retry.
    assert_eq!(setup.rpc.sent_count(), 1);
    assert!(err.is_retry_safe());
}

#[tokio::test]
async fn burn_failure_is_partial_with_payout_signature() {
    let setup = Setup::owned_by_wallet();
    setup.rpc.push_confirm_result(Ok(()));
    setup
        .rpc
        .push_confirm_result(Err("Invalid root recomputed from proof".into()));

    let outcome = setup.claim().await.unwrap();
    let sent = setup.rpc.sent();
    assert_eq!(sent.len(), 2);
    match outcome {
        depredict_client::ClaimOutcome::Partial {
            payout_signature,
            burn_error,
        } => {
            assert_eq!(payout_signature, sent[0].signatures[0]);
            assert!(matches!(burn_error, Error::ProofOrOwnership(_)));
        }
        other => panic!("expected partial outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn non_owner_rejected_before_anything_is_sent() {
    let setup = Setup::owned_by_wallet();
    // Re-point the asset at a stranger.
    let stranger = Pubkey::new_unique();
    setup.index.insert_asset(
        test_asset(setup.asset_id, stranger, "DEPREDICT-1-1"),
        test_proof(Pubkey::new_unique()),
    );

    let err = setup.claim().await.unwrap_err();
    assert!(matches!(err, Error::NotAssetAuthority { .. }));
    assert_eq!(setup.rpc.sent_count(), 0);
}

#[tokio::test]
async fn delegate_may_claim() {
    let setup = Setup::owned_by_wallet();
    let mut asset = test_asset(setup.asset_id, Pubkey::new_unique(), "DEPREDICT-1-1");
    asset.delegate = Some(setup.wallet.pubkey());
    setup
        .index
        .insert_asset(asset, test_proof(Pubkey::new_unique()));

    let outcome = setup.claim().await.unwrap();
    assert!(outcome.is_complete());
}

#[tokio::test]
async fn burnt_asset_rejected() {
    let setup = Setup::owned_by_wallet();
    let mut asset = test_asset(setup.asset_id, setup.wallet.pubkey(), "DEPREDICT-1-1");
    asset.burnt = true;
    setup
        .index
        .insert_asset(asset, test_proof(Pubkey::new_unique()));

    let err = setup.claim().await.unwrap_err();
    assert!(matches!(err, Error::AssetBurned(_)));
    assert_eq!(setup.rpc.sent_count(), 0);
}

#[tokio::test]
async fn empty_payout_instructions_rejected() {
    let setup = Setup::owned_by_wallet();
    setup.sdk.clear_payout_instructions();

    let err = setup.claim().await.unwrap_err();
    assert!(matches!(
        err,
        Error::NoPayoutInstructions { market_id: 1 }
    ));
    assert_eq!(setup.rpc.sent_count(), 0);
}

#[tokio::test]
async fn wallet_rejection_surfaces_before_any_send() {
    let setup = Setup::owned_by_wallet();
    setup.wallet.reject_signing();

    let err = setup.claim().await.unwrap_err();
    assert!(matches!(err, Error::WalletRejected(_)));
    assert_eq!(setup.rpc.sent_count(), 0);
}

#[tokio::test]
async fn collection_detected_from_asset_grouping() {
    let setup = Setup::owned_by_wallet();
    let collection = Pubkey::new_unique();
    let mut asset = test_asset(setup.asset_id, setup.wallet.pubkey(), "DEPREDICT-1-1");
    asset.collection = Some(collection);
    setup
        .index
        .insert_asset(asset, test_proof(Pubkey::new_unique()));

    setup.claim().await.unwrap();
    let sent = setup.rpc.sent();
    assert!(
        sent[1].message.account_keys.contains(&collection),
        "burn tx references the detected collection"
    );
}

#[tokio::test]
async fn explicit_collection_overrides_detection() {
    let setup = Setup::owned_by_wallet();
    let detected = Pubkey::new_unique();
    let explicit = Pubkey::new_unique();
    let mut asset = test_asset(setup.asset_id, setup.wallet.pubkey(), "DEPREDICT-1-1");
    asset.collection = Some(detected);
    setup
        .index
        .insert_asset(asset, test_proof(Pubkey::new_unique()));

    claim_and_burn(
        &setup.rpc,
        &setup.index,
        &setup.sdk,
        &setup.wallet,
        &setup.asset_id,
        1,
        Some(explicit),
        &fast_config(),
    )
    .await
    .unwrap();

    let sent = setup.rpc.sent();
    assert!(sent[1].message.account_keys.contains(&explicit));
    assert!(!sent[1].message.account_keys.contains(&detected));
}
