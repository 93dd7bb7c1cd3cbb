//! Market-creator bootstrap: the four-step on-chain setup flow.
//!
//! Sequences create-creator, collection, tree (with delegated authority),
//! and verify, emitting progress over a broadcast channel. Each step costs
//! real money; confirmed steps are never rolled back. A failure returns the
//! flow to ready with the failing step attached to the error. Re-invoking
//! after a partial failure re-runs from step 1.

use std::fmt;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::retry::retry_with_backoff;
use crate::rpc::{RpcBackend, send_and_confirm};
use crate::sdk::{
    CreateMarketCreatorArgs, MarketSdk, NftToolkit, derive_market_creator_pda,
};
use crate::state::{CreatorDetails, StateStore};
use crate::wallet::WalletSigner;

const CREATOR_NAME: &str = "Market Creator";
const CREATOR_FEE_BPS: u16 = 100;
const DELEGATE_ATTEMPTS: u32 = 3;

/// Coarse flow state, mirrored to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    Ready,
    Creating,
    Verifying,
    Complete,
}

/// The individual on-chain steps, used for failure attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    CreateCreator,
    CreateCollection,
    CreateTree,
    DelegateTree,
    Verify,
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BootstrapStep::CreateCreator => "create market creator",
            BootstrapStep::CreateCollection => "create core collection",
            BootstrapStep::CreateTree => "create merkle tree",
            BootstrapStep::DelegateTree => "delegate merkle tree",
            BootstrapStep::Verify => "verify market creator",
        };
        f.write_str(name)
    }
}

/// Progress notifications for UI layers.
#[derive(Debug, Clone)]
pub enum BootstrapEvent {
    StageChanged(BootstrapStage),
    StepStarted(BootstrapStep),
    StepCompleted(BootstrapStep),
    DelegateRetry { attempt: u32, max: u32 },
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Pause after account-creating transactions before the next step reads
    /// the new account.
    pub settle_delay: Duration,
    /// Fixed delay between tree-delegation attempts.
    pub delegate_retry_delay: Duration,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            delegate_retry_delay: Duration::from_secs(4),
        }
    }
}

/// Addresses and signatures produced by a completed bootstrap.
#[derive(Debug, Clone)]
pub struct BootstrapOutcome {
    pub market_creator: Pubkey,
    pub core_collection: Pubkey,
    pub merkle_tree: Pubkey,
    pub create_signature: Signature,
    pub verify_signature: Signature,
}

/// Local view of whether the configured market creator exists and is
/// verified. Recomputed from the chain on every call, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketCreatorStatus {
    pub exists: bool,
    pub pda: Option<Pubkey>,
    pub is_verified: bool,
    pub has_env_key: bool,
}

impl MarketCreatorStatus {
    fn absent(has_env_key: bool) -> Self {
        Self {
            exists: false,
            pda: None,
            is_verified: false,
            has_env_key,
        }
    }
}

/// Resolve the market-creator status.
///
/// `admin_key` is the deployment-time key; `hint` is the persisted local
/// blob. With neither, the status resolves to "setup required" without any
/// network call. The hint only supplies the admin key for PDA derivation —
/// existence and verification always come from the on-chain read.
pub async fn market_creator_status(
    sdk: &dyn MarketSdk,
    admin_key: Option<Pubkey>,
    hint: Option<&CreatorDetails>,
) -> Result<MarketCreatorStatus> {
    let has_env_key = admin_key.is_some();
    let admin = match admin_key {
        Some(key) => key,
        None => match hint.map(CreatorDetails::admin_pubkey).transpose()? {
            Some(key) => key,
            None => return Ok(MarketCreatorStatus::absent(false)),
        },
    };

    let pda = derive_market_creator_pda(&sdk.program_id(), &admin);
    match sdk.get_market_creator(&pda).await? {
        Some(account) => Ok(MarketCreatorStatus {
            exists: true,
            pda: Some(pda),
            is_verified: account.verified,
            has_env_key,
        }),
        None => Ok(MarketCreatorStatus {
            exists: false,
            pda: Some(pda),
            is_verified: false,
            has_env_key,
        }),
    }
}

/// Drives the setup flow. Holds its collaborators by reference; one
/// instance per invocation is fine, but the broadcast sender can be shared
/// across invocations for a stable subscription.
pub struct MarketCreatorBootstrap<'a> {
    rpc: &'a dyn RpcBackend,
    sdk: &'a dyn MarketSdk,
    toolkit: &'a dyn NftToolkit,
    wallet: &'a dyn WalletSigner,
    store: &'a StateStore,
    config: BootstrapConfig,
    events: broadcast::Sender<BootstrapEvent>,
}

impl<'a> MarketCreatorBootstrap<'a> {
    pub fn new(
        rpc: &'a dyn RpcBackend,
        sdk: &'a dyn MarketSdk,
        toolkit: &'a dyn NftToolkit,
        wallet: &'a dyn WalletSigner,
        store: &'a StateStore,
        config: BootstrapConfig,
    ) -> (Self, broadcast::Receiver<BootstrapEvent>) {
        let (events, rx) = broadcast::channel(64);
        (
            Self {
                rpc,
                sdk,
                toolkit,
                wallet,
                store,
                config,
                events,
            },
            rx,
        )
    }

    /// Use an existing sender instead of a fresh channel.
    pub fn with_events(
        rpc: &'a dyn RpcBackend,
        sdk: &'a dyn MarketSdk,
        toolkit: &'a dyn NftToolkit,
        wallet: &'a dyn WalletSigner,
        store: &'a StateStore,
        config: BootstrapConfig,
        events: broadcast::Sender<BootstrapEvent>,
    ) -> Self {
        Self {
            rpc,
            sdk,
            toolkit,
            wallet,
            store,
            config,
            events,
        }
    }

    fn emit(&self, event: BootstrapEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn step_failed(step: BootstrapStep, source: Error) -> Error {
        Error::Bootstrap {
            step,
            source: Box::new(source),
        }
    }

    /// Run the full flow: create the creator account, then collection,
    /// tree, delegation, and the verify transaction, persisting the
    /// resulting addresses on success.
    pub async fn run(&self) -> Result<BootstrapOutcome> {
        let payer = self.wallet.pubkey();
        self.emit(BootstrapEvent::StageChanged(BootstrapStage::Creating));

        // Step 1: create the market-creator account.
        self.emit(BootstrapEvent::StepStarted(BootstrapStep::CreateCreator));
        let create = self
            .sdk
            .create_market_creator(&CreateMarketCreatorArgs {
                name: CREATOR_NAME.to_string(),
                fee_vault: payer,
                creator_fee_bps: CREATOR_FEE_BPS,
                signer: payer,
            })
            .await
            .map_err(|e| Self::step_failed(BootstrapStep::CreateCreator, e))?;
        let pda = create.market_creator;
        let create_signature =
            send_and_confirm(self.rpc, self.wallet, &create.instructions, &payer)
                .await
                .map_err(|e| Self::step_failed(BootstrapStep::CreateCreator, e))?;
        log::info!("market creator created at {pda}: {create_signature}");
        self.emit(BootstrapEvent::StepCompleted(BootstrapStep::CreateCreator));

        tokio::time::sleep(self.config.settle_delay).await;
        self.emit(BootstrapEvent::StageChanged(BootstrapStage::Verifying));

        // Step 2: core collection, update authority handed to the creator.
        self.emit(BootstrapEvent::StepStarted(BootstrapStep::CreateCollection));
        let collection = self
            .toolkit
            .create_core_collection(&payer, &pda)
            .await
            .map_err(|e| Self::step_failed(BootstrapStep::CreateCollection, e))?;
        log::info!("core collection created: {collection}");
        self.emit(BootstrapEvent::StepCompleted(BootstrapStep::CreateCollection));

        tokio::time::sleep(self.config.settle_delay).await;

        // Step 3: Merkle tree, then check it actually landed.
        self.emit(BootstrapEvent::StepStarted(BootstrapStep::CreateTree));
        let tree = self
            .toolkit
            .create_merkle_tree(&payer)
            .await
            .map_err(|e| Self::step_failed(BootstrapStep::CreateTree, e))?;
        tokio::time::sleep(self.config.settle_delay).await;
        let exists = self
            .rpc
            .account_exists(&tree)
            .await
            .map_err(|e| Self::step_failed(BootstrapStep::CreateTree, e))?;
        if !exists {
            return Err(Self::step_failed(
                BootstrapStep::CreateTree,
                Error::Rpc(format!("merkle tree account {tree} not found after creation")),
            ));
        }
        log::info!("merkle tree created: {tree}");
        self.emit(BootstrapEvent::StepCompleted(BootstrapStep::CreateTree));

        // Delegation commonly fails transiently against a just-created
        // account, hence the bounded retry.
        self.emit(BootstrapEvent::StepStarted(BootstrapStep::DelegateTree));
        retry_with_backoff(DELEGATE_ATTEMPTS, self.config.delegate_retry_delay, |attempt| {
            if attempt > 1 {
                self.emit(BootstrapEvent::DelegateRetry {
                    attempt,
                    max: DELEGATE_ATTEMPTS,
                });
            }
            self.toolkit.set_tree_delegate(&tree, &pda)
        })
        .await
        .map_err(|e| {
            Self::step_failed(
                BootstrapStep::DelegateTree,
                Error::Generic(format!("tree delegation {e}")),
            )
        })?;
        self.emit(BootstrapEvent::StepCompleted(BootstrapStep::DelegateTree));

        // Step 4: the on-chain verify referencing both new accounts.
        self.emit(BootstrapEvent::StepStarted(BootstrapStep::Verify));
        let verify_ixs = self
            .sdk
            .verify_market_creator(&payer, &collection, &tree)
            .await
            .map_err(|e| Self::step_failed(BootstrapStep::Verify, e))?;
        let verify_signature = send_and_confirm(self.rpc, self.wallet, &verify_ixs, &payer)
            .await
            .map_err(|e| Self::step_failed(BootstrapStep::Verify, e))?;
        log::info!("market creator verified: {verify_signature}");
        self.emit(BootstrapEvent::StepCompleted(BootstrapStep::Verify));

        // Persist the addresses as a resumption hint. On-chain state is
        // the source of truth, so a persistence failure only warns.
        let details = CreatorDetails::new(&pda, &payer, &collection, &tree);
        if let Err(e) = self.store.save(&details) {
            log::warn!("failed to persist creator details: {e}");
        }

        self.emit(BootstrapEvent::StageChanged(BootstrapStage::Complete));
        Ok(BootstrapOutcome {
            market_creator: pda,
            core_collection: collection,
            merkle_tree: tree,
            create_signature,
            verify_signature,
        })
    }
}
