//! Market book behavior through the `DepredictNode` facade.

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;

use depredict_client::bootstrap::BootstrapConfig;
use depredict_client::claim::ClaimConfig;
use depredict_client::config::ClientConfig;
use depredict_client::market::{Direction, MarketEvent, MarketState, WinningDirection};
use depredict_client::node::DepredictNode;
use depredict_client::sdk::OpenPositionArgs;
use depredict_client::testing::{
    MockIndex, MockRpc, MockSdk, MockToolkit, MockWallet, test_asset, test_market, test_proof,
};
use depredict_client::wallet::WalletSigner;

struct Setup {
    node: DepredictNode,
    rpc: Arc<MockRpc>,
    index: Arc<MockIndex>,
    sdk: Arc<MockSdk>,
    wallet: Arc<MockWallet>,
    _dir: tempfile::TempDir,
}

impl Setup {
    fn new(configure: impl FnOnce(ClientConfig) -> ClientConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let rpc = Arc::new(MockRpc::new());
        let index = Arc::new(MockIndex::new());
        let sdk = Arc::new(MockSdk::new());
        let toolkit = Arc::new(MockToolkit::new());
        let wallet = Arc::new(MockWallet::new());

        let config = configure(ClientConfig::new("http://localhost:8899", dir.path()));
        let (node, _rx) = DepredictNode::new(
            config,
            rpc.clone(),
            index.clone(),
            sdk.clone(),
            toolkit,
            wallet.clone(),
        );
        let node = node
            .with_claim_config(ClaimConfig {
                settle_delay: Duration::ZERO,
            })
            .with_bootstrap_config(BootstrapConfig {
                settle_delay: Duration::ZERO,
                delegate_retry_delay: Duration::ZERO,
            });
        Self {
            node,
            rpc,
            index,
            sdk,
            wallet,
            _dir: dir,
        }
    }

    fn with_admin(admin: Pubkey) -> Self {
        Self::new(|config| config.with_admin_key(admin))
    }
}

#[tokio::test]
async fn optimistic_bet_is_reconciled_by_authoritative_event() {
    let admin = Pubkey::new_unique();
    let setup = Setup::with_admin(admin);
    setup.sdk.set_markets(vec![test_market(9)]);

    setup.node.fetch_markets().await.unwrap();
    let before = setup.node.market(9).unwrap().unwrap();
    assert_eq!(before.yes_liquidity, 1_000);

    setup
        .node
        .open_position(&OpenPositionArgs {
            market_id: 9,
            direction: Direction::Yes,
            amount: 250,
            payer: setup.wallet.pubkey(),
        })
        .await
        .unwrap();
    assert_eq!(setup.rpc.sent_count(), 1);

    // Optimistic view until the program's event arrives.
    let optimistic = setup.node.market(9).unwrap().unwrap();
    assert_eq!(optimistic.yes_liquidity, 1_250);
    assert_eq!(optimistic.volume, 2_250);

    // The authoritative event carries slightly different numbers (fees);
    // it wins outright.
    setup
        .node
        .apply_market_event(MarketEvent {
            market_id: 9,
            state: MarketState::Active,
            yes_liquidity: 1_240,
            no_liquidity: 1_000,
            volume: 2_240,
            update_ts: 1,
            next_position_id: 2,
            market_start: 0,
            market_end: i64::MAX,
            winning_direction: WinningDirection::None,
        })
        .await
        .unwrap();
    let reconciled = setup.node.market(9).unwrap().unwrap();
    assert_eq!(reconciled.yes_liquidity, 1_240);
    assert_eq!(reconciled.volume, 2_240);
}

#[tokio::test]
async fn event_for_unknown_market_triggers_a_fetch() {
    let setup = Setup::with_admin(Pubkey::new_unique());
    setup.sdk.set_markets(vec![test_market(3)]);
    assert!(setup.node.market(3).unwrap().is_none());

    setup
        .node
        .apply_market_event(MarketEvent {
            market_id: 3,
            state: MarketState::Resolved,
            yes_liquidity: 500,
            no_liquidity: 500,
            volume: 1_000,
            update_ts: 1,
            next_position_id: 4,
            market_start: 0,
            market_end: 10,
            winning_direction: WinningDirection::Yes,
        })
        .await
        .unwrap();

    let market = setup.node.market(3).unwrap().unwrap();
    assert_eq!(market.state, MarketState::Resolved);
    assert_eq!(market.winning_direction, WinningDirection::Yes);
}

#[tokio::test]
async fn fetch_markets_requires_admin_key() {
    let setup = Setup::new(|config| config);
    let err = setup.node.fetch_markets().await.unwrap_err();
    assert!(matches!(
        err,
        depredict_client::Error::MissingAdminKey
    ));
}

#[tokio::test]
async fn claim_falls_back_to_configured_collection() {
    let collection = Pubkey::new_unique();
    let setup = Setup::new(|config| config.with_collection(collection));

    let asset_id = Pubkey::new_unique();
    setup.index.insert_asset(
        test_asset(asset_id, setup.wallet.pubkey(), "DEPREDICT-1-1"),
        test_proof(Pubkey::new_unique()),
    );

    let outcome = setup.node.claim_and_burn(&asset_id, 1, None).await.unwrap();
    assert!(outcome.is_complete());
    let sent = setup.rpc.sent();
    assert!(sent[1].message.account_keys.contains(&collection));
}

#[tokio::test]
async fn positions_require_configured_collection() {
    let setup = Setup::new(|config| config);
    let err = setup.node.positions().await.unwrap_err();
    assert!(matches!(err, depredict_client::Error::Config(_)));
}

#[tokio::test]
async fn bootstrap_flips_status_through_the_node() {
    let setup = Setup::new(|config| config);
    let mut events = setup.node.subscribe();

    // No admin key, nothing persisted: setup required.
    let status = setup.node.market_creator_status().await.unwrap();
    assert!(!status.exists);
    assert!(!status.has_env_key);

    let outcome = setup.node.bootstrap_market_creator().await.unwrap();

    // The persisted hint now carries the admin key, so the status check
    // finds the verified account without env configuration.
    let status = setup.node.market_creator_status().await.unwrap();
    assert!(status.exists);
    assert!(status.is_verified);
    assert_eq!(status.pda, Some(outcome.market_creator));

    let mut saw_events = 0;
    while events.try_recv().is_ok() {
        saw_events += 1;
    }
    assert!(saw_events > 0, "bootstrap progress was broadcast");
}
