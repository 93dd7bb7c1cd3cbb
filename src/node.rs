//! `DepredictNode` — unified client coordinator.
//!
//! Owns the RPC backend, asset index, market SDK, NFT toolkit, and signing
//! wallet behind a single `&self` API, plus the two-tier market book and
//! the persisted setup state. All collaborators are injected; nothing is
//! read from ambient context.

use std::sync::{Arc, Mutex};

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tokio::sync::broadcast;

use crate::bootstrap::{
    BootstrapConfig, BootstrapEvent, BootstrapOutcome, MarketCreatorBootstrap, MarketCreatorStatus,
    market_creator_status,
};
use crate::claim::{ClaimConfig, ClaimOutcome, claim_and_burn};
use crate::config::ClientConfig;
use crate::das::AssetIndex;
use crate::error::{Error, Result};
use crate::market::{Market, MarketBook, MarketDelta, MarketEvent};
use crate::positions::{DiscoveredPosition, discover_positions};
use crate::rpc::{RpcBackend, send_and_confirm};
use crate::sdk::{CreateMarketArgs, MarketSdk, NftToolkit, OpenPositionArgs, ResolveMarketArgs};
use crate::state::StateStore;
use crate::wallet::WalletSigner;

pub struct DepredictNode {
    config: ClientConfig,
    rpc: Arc<dyn RpcBackend>,
    index: Arc<dyn AssetIndex>,
    sdk: Arc<dyn MarketSdk>,
    toolkit: Arc<dyn NftToolkit>,
    wallet: Arc<dyn WalletSigner>,
    store: StateStore,
    book: Mutex<MarketBook>,
    claim_config: ClaimConfig,
    bootstrap_config: BootstrapConfig,
    bootstrap_events: broadcast::Sender<BootstrapEvent>,
}

impl DepredictNode {
    pub fn new(
        config: ClientConfig,
        rpc: Arc<dyn RpcBackend>,
        index: Arc<dyn AssetIndex>,
        sdk: Arc<dyn MarketSdk>,
        toolkit: Arc<dyn NftToolkit>,
        wallet: Arc<dyn WalletSigner>,
    ) -> (Self, broadcast::Receiver<BootstrapEvent>) {
        let store = StateStore::new(&config.data_dir);
        let (bootstrap_events, rx) = broadcast::channel(64);
        (
            Self {
                config,
                rpc,
                index,
                sdk,
                toolkit,
                wallet,
                store,
                book: Mutex::new(MarketBook::new()),
                claim_config: ClaimConfig::default(),
                bootstrap_config: BootstrapConfig::default(),
                bootstrap_events,
            },
            rx,
        )
    }

    pub fn with_claim_config(mut self, claim_config: ClaimConfig) -> Self {
        self.claim_config = claim_config;
        self
    }

    pub fn with_bootstrap_config(mut self, bootstrap_config: BootstrapConfig) -> Self {
        self.bootstrap_config = bootstrap_config;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn wallet_pubkey(&self) -> Pubkey {
        self.wallet.pubkey()
    }

    /// An additional receiver for bootstrap progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<BootstrapEvent> {
        self.bootstrap_events.subscribe()
    }

    fn book(&self) -> Result<std::sync::MutexGuard<'_, MarketBook>> {
        self.book.lock().map_err(|_| Error::MutexPoisoned)
    }

    // ── Claim and burn ──────────────────────────────────────────────────

    /// Claim the payout for a winning position and burn its NFT. The
    /// collection override falls back to the configured collection, then to
    /// detection from the asset's grouping.
    pub async fn claim_and_burn(
        &self,
        asset_id: &Pubkey,
        market_id: u64,
        core_collection: Option<Pubkey>,
    ) -> Result<ClaimOutcome> {
        let collection = core_collection.or(self.config.collection);
        claim_and_burn(
            self.rpc.as_ref(),
            self.index.as_ref(),
            self.sdk.as_ref(),
            self.wallet.as_ref(),
            asset_id,
            market_id,
            collection,
            &self.claim_config,
        )
        .await
    }

    // ── Position discovery ──────────────────────────────────────────────

    /// Positions held by the connected wallet.
    pub async fn positions(&self) -> Result<Vec<DiscoveredPosition>> {
        self.positions_of(&self.wallet.pubkey()).await
    }

    pub async fn positions_of(&self, owner: &Pubkey) -> Result<Vec<DiscoveredPosition>> {
        let collection = self
            .config
            .collection
            .ok_or_else(|| Error::Config("collection address not configured".into()))?;
        discover_positions(self.index.as_ref(), owner, &collection).await
    }

    // ── Market creator ──────────────────────────────────────────────────

    /// Recompute the market-creator status from the chain, using the
    /// persisted blob only as a PDA-derivation hint.
    pub async fn market_creator_status(&self) -> Result<MarketCreatorStatus> {
        let hint = self.store.load();
        market_creator_status(self.sdk.as_ref(), self.config.admin_key, hint.as_ref()).await
    }

    /// Run the four-step setup flow. Progress is emitted on the channel
    /// returned from [`DepredictNode::new`] / [`DepredictNode::subscribe`].
    pub async fn bootstrap_market_creator(&self) -> Result<BootstrapOutcome> {
        let bootstrap = MarketCreatorBootstrap::with_events(
            self.rpc.as_ref(),
            self.sdk.as_ref(),
            self.toolkit.as_ref(),
            self.wallet.as_ref(),
            &self.store,
            self.bootstrap_config.clone(),
            self.bootstrap_events.clone(),
        );
        bootstrap.run().await
    }

    // ── Markets ─────────────────────────────────────────────────────────

    /// Fetch all markets for the configured authority and replace the
    /// authoritative tier of the book.
    pub async fn fetch_markets(&self) -> Result<Vec<Market>> {
        let admin = self.config.admin_key.ok_or(Error::MissingAdminKey)?;
        let markets = self.sdk.get_markets_by_authority(&admin).await?;
        self.book()?.replace_all(markets);
        Ok(self.book()?.markets())
    }

    /// Merged (authoritative + optimistic) view of the known markets.
    pub fn markets(&self) -> Result<Vec<Market>> {
        Ok(self.book()?.markets())
    }

    pub fn market(&self, market_id: u64) -> Result<Option<Market>> {
        Ok(self.book()?.get(market_id))
    }

    /// Ingest a confirmed on-chain market event, superseding any optimistic
    /// delta for that market. Events for unknown markets trigger a fetch.
    pub async fn apply_market_event(&self, event: MarketEvent) -> Result<()> {
        let known = self.book()?.get(event.market_id).is_some();
        if !known {
            if let Some(market) = self.sdk.get_market_by_id(event.market_id).await? {
                self.book()?.insert(market);
            }
        }
        self.book()?.apply_event(event);
        Ok(())
    }

    // ── Trading and admin operations ────────────────────────────────────

    /// Place a bet. On confirmation the market book gets an optimistic
    /// delta, reconciled by the next authoritative event.
    pub async fn open_position(&self, args: &OpenPositionArgs) -> Result<Signature> {
        let ixs = self.sdk.open_position(args).await?;
        let signature =
            send_and_confirm(self.rpc.as_ref(), self.wallet.as_ref(), &ixs, &args.payer).await?;
        self.book()?
            .apply_optimistic(args.market_id, MarketDelta::for_bet(args.direction, args.amount));
        log::info!(
            "position opened on market {} for {}: {signature}",
            args.market_id,
            args.amount
        );
        Ok(signature)
    }

    /// Create a new market. Returns the confirmation signature and the id
    /// the program assigned.
    pub async fn create_market(&self, args: &CreateMarketArgs) -> Result<(Signature, u64)> {
        let (ixs, market_id) = self.sdk.create_market(args).await?;
        let signature =
            send_and_confirm(self.rpc.as_ref(), self.wallet.as_ref(), &ixs, &args.payer).await?;
        log::info!("market {market_id} created: {signature}");
        Ok((signature, market_id))
    }

    pub async fn resolve_market(&self, args: &ResolveMarketArgs) -> Result<Signature> {
        let ixs = self.sdk.resolve_market(args).await?;
        let signature =
            send_and_confirm(self.rpc.as_ref(), self.wallet.as_ref(), &ixs, &args.payer).await?;
        log::info!("market {} resolved: {signature}", args.market_id);
        Ok(signature)
    }
}
