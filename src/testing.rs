//! Mock collaborators for tests.
//!
//! Enabled with the `testing` feature. The mocks apply on-chain effects at
//! instruction-build time rather than at confirmation, which is enough for
//! flows that confirm every transaction they submit.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;

use crate::das::{AssetIndex, AssetInfo, AssetPage, AssetProof};
use crate::error::{Error, Result};
use crate::market::{Market, MarketState, WinningDirection};
use crate::rpc::RpcBackend;
use crate::sdk::{
    CreateMarketArgs, CreateMarketCreatorArgs, CreateMarketCreatorResult, MarketCreatorAccount,
    MarketSdk, NftToolkit, OpenPositionArgs, ResolveMarketArgs, derive_market_creator_pda,
};
use crate::wallet::WalletSigner;

/// An instruction with no accounts, standing in for an opaque SDK-built
/// instruction.
pub fn opaque_instruction(program_id: Pubkey) -> Instruction {
    Instruction {
        program_id,
        accounts: vec![],
        data: vec![0xde, 0xad],
    }
}

pub fn test_market(market_id: u64) -> Market {
    Market {
        market_id,
        question: format!("Test market {market_id}?"),
        yes_liquidity: 1_000,
        no_liquidity: 1_000,
        volume: 2_000,
        market_start: 0,
        market_end: i64::MAX,
        state: MarketState::Active,
        winning_direction: WinningDirection::None,
        next_position_id: 1,
    }
}

pub fn test_asset(id: Pubkey, owner: Pubkey, name: &str) -> AssetInfo {
    AssetInfo {
        id,
        name: Some(name.to_string()),
        burnt: false,
        owner,
        delegate: None,
        collection: None,
        data_hash: Some(Hash::new_unique()),
        creator_hash: Some(Hash::new_unique()),
        leaf_id: 0,
    }
}

pub fn test_proof(tree: Pubkey) -> AssetProof {
    AssetProof {
        root: Hash::new_unique(),
        proof: (0..4).map(|_| Pubkey::new_unique()).collect(),
        tree,
        node_index: 0,
    }
}

// ── MockRpc ─────────────────────────────────────────────────────────────

/// Scriptable RPC backend that records every submitted transaction.
#[derive(Default)]
pub struct MockRpc {
    sent: Mutex<Vec<Transaction>>,
    send_failures: Mutex<VecDeque<String>>,
    confirm_results: Mutex<VecDeque<std::result::Result<(), String>>>,
    missing_accounts: Mutex<Vec<Pubkey>>,
}

impl MockRpc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transaction submitted so far, in order.
    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Make the next `send_transaction` call fail with `message`.
    pub fn fail_next_send(&self, message: &str) {
        self.send_failures.lock().unwrap().push_back(message.into());
    }

    /// Script the outcome of the next `confirm_transaction` call. Calls
    /// with no scripted outcome succeed.
    pub fn push_confirm_result(&self, result: std::result::Result<(), String>) {
        self.confirm_results.lock().unwrap().push_back(result);
    }

    /// Make `account_exists` report `address` as missing.
    pub fn mark_account_missing(&self, address: Pubkey) {
        self.missing_accounts.lock().unwrap().push(address);
    }
}

#[async_trait]
impl RpcBackend for MockRpc {
    async fn latest_blockhash(&self) -> Result<(Hash, u64)> {
        Ok((Hash::new_unique(), 1_000))
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature> {
        if let Some(message) = self.send_failures.lock().unwrap().pop_front() {
            return Err(Error::classify(message));
        }
        self.sent.lock().unwrap().push(tx.clone());
        Ok(tx.signatures.first().copied().unwrap_or_default())
    }

    async fn confirm_transaction(&self, _signature: &Signature, _last_valid: u64) -> Result<()> {
        match self.confirm_results.lock().unwrap().pop_front() {
            Some(Ok(())) | None => Ok(()),
            Some(Err(message)) => Err(Error::classify(message)),
        }
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        Ok(!self.missing_accounts.lock().unwrap().contains(address))
    }
}

// ── MockIndex ───────────────────────────────────────────────────────────

/// In-memory asset index.
#[derive(Default)]
pub struct MockIndex {
    assets: Mutex<HashMap<Pubkey, AssetInfo>>,
    proofs: Mutex<HashMap<Pubkey, AssetProof>>,
    search_items: Mutex<Vec<AssetInfo>>,
}

impl MockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_asset(&self, asset: AssetInfo, proof: AssetProof) {
        self.proofs.lock().unwrap().insert(asset.id, proof);
        self.assets.lock().unwrap().insert(asset.id, asset);
    }

    /// Set the full result set returned by `search_assets`, pre-pagination.
    pub fn set_search_items(&self, items: Vec<AssetInfo>) {
        *self.search_items.lock().unwrap() = items;
    }
}

#[async_trait]
impl AssetIndex for MockIndex {
    async fn get_asset(&self, asset: &Pubkey) -> Result<AssetInfo> {
        self.assets
            .lock()
            .unwrap()
            .get(asset)
            .cloned()
            .ok_or_else(|| Error::Index(format!("asset {asset} not found")))
    }

    async fn get_asset_proof(&self, asset: &Pubkey) -> Result<AssetProof> {
        self.proofs
            .lock()
            .unwrap()
            .get(asset)
            .cloned()
            .ok_or_else(|| Error::Index(format!("no proof for asset {asset}")))
    }

    async fn search_assets(
        &self,
        _owner: &Pubkey,
        _collection: &Pubkey,
        page: u64,
        limit: u64,
    ) -> Result<AssetPage> {
        let items = self.search_items.lock().unwrap();
        let start = ((page - 1) * limit) as usize;
        let slice: Vec<AssetInfo> = items
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(AssetPage {
            total: items.len() as u64,
            limit,
            items: slice,
        })
    }
}

// ── MockSdk ─────────────────────────────────────────────────────────────

/// In-memory market SDK with a mutable market-creator registry.
pub struct MockSdk {
    program_id: Pubkey,
    payout_ixs: Mutex<Vec<Instruction>>,
    markets: Mutex<Vec<Market>>,
    creators: Mutex<HashMap<Pubkey, MarketCreatorAccount>>,
    creator_reads: AtomicU32,
    next_market_id: AtomicU32,
}

impl Default for MockSdk {
    fn default() -> Self {
        let program_id = Pubkey::new_unique();
        Self {
            payout_ixs: Mutex::new(vec![opaque_instruction(program_id)]),
            program_id,
            markets: Mutex::new(Vec::new()),
            creators: Mutex::new(HashMap::new()),
            creator_reads: AtomicU32::new(0),
            next_market_id: AtomicU32::new(1),
        }
    }
}

impl MockSdk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Have `payout_position` return no instructions.
    pub fn clear_payout_instructions(&self) {
        self.payout_ixs.lock().unwrap().clear();
    }

    pub fn set_markets(&self, markets: Vec<Market>) {
        *self.markets.lock().unwrap() = markets;
    }

    /// How many times `get_market_creator` was queried.
    pub fn creator_read_count(&self) -> u32 {
        self.creator_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketSdk for MockSdk {
    fn program_id(&self) -> Pubkey {
        self.program_id
    }

    async fn payout_position(
        &self,
        _market_id: u64,
        _payer: &Pubkey,
        _asset_id: &Pubkey,
    ) -> Result<Vec<Instruction>> {
        Ok(self.payout_ixs.lock().unwrap().clone())
    }

    async fn open_position(&self, _args: &OpenPositionArgs) -> Result<Vec<Instruction>> {
        Ok(vec![opaque_instruction(self.program_id)])
    }

    async fn create_market(&self, _args: &CreateMarketArgs) -> Result<(Vec<Instruction>, u64)> {
        let id = self.next_market_id.fetch_add(1, Ordering::SeqCst) as u64;
        Ok((vec![opaque_instruction(self.program_id)], id))
    }

    async fn resolve_market(&self, _args: &ResolveMarketArgs) -> Result<Vec<Instruction>> {
        Ok(vec![opaque_instruction(self.program_id)])
    }

    async fn get_markets_by_authority(&self, _authority: &Pubkey) -> Result<Vec<Market>> {
        Ok(self.markets.lock().unwrap().clone())
    }

    async fn get_market_by_id(&self, market_id: u64) -> Result<Option<Market>> {
        Ok(self
            .markets
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.market_id == market_id)
            .cloned())
    }

    async fn create_market_creator(
        &self,
        args: &CreateMarketCreatorArgs,
    ) -> Result<CreateMarketCreatorResult> {
        let pda = derive_market_creator_pda(&self.program_id, &args.signer);
        self.creators.lock().unwrap().insert(
            pda,
            MarketCreatorAccount {
                authority: args.signer,
                verified: false,
                core_collection: None,
                merkle_tree: None,
            },
        );
        Ok(CreateMarketCreatorResult {
            instructions: vec![opaque_instruction(self.program_id)],
            market_creator: pda,
        })
    }

    async fn verify_market_creator(
        &self,
        signer: &Pubkey,
        core_collection: &Pubkey,
        merkle_tree: &Pubkey,
    ) -> Result<Vec<Instruction>> {
        let pda = derive_market_creator_pda(&self.program_id, signer);
        let mut creators = self.creators.lock().unwrap();
        let account = creators
            .get_mut(&pda)
            .ok_or_else(|| Error::Sdk(format!("market creator {pda} does not exist")))?;
        account.verified = true;
        account.core_collection = Some(*core_collection);
        account.merkle_tree = Some(*merkle_tree);
        Ok(vec![opaque_instruction(self.program_id)])
    }

    async fn get_market_creator(&self, pda: &Pubkey) -> Result<Option<MarketCreatorAccount>> {
        self.creator_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.creators.lock().unwrap().get(pda).cloned())
    }
}

// ── MockToolkit ─────────────────────────────────────────────────────────

/// NFT toolkit whose delegation step can be scripted to fail a number of
/// times before succeeding.
#[derive(Default)]
pub struct MockToolkit {
    delegate_failures: AtomicU32,
    delegate_calls: AtomicU32,
    next_tree: Mutex<Option<Pubkey>>,
}

impl MockToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the address the next `create_merkle_tree` call returns.
    pub fn set_next_tree(&self, tree: Pubkey) {
        *self.next_tree.lock().unwrap() = Some(tree);
    }

    /// Fail the first `n` `set_tree_delegate` calls.
    pub fn fail_delegations(&self, n: u32) {
        self.delegate_failures.store(n, Ordering::SeqCst);
    }

    pub fn delegate_call_count(&self) -> u32 {
        self.delegate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NftToolkit for MockToolkit {
    async fn create_core_collection(
        &self,
        _payer: &Pubkey,
        _update_authority: &Pubkey,
    ) -> Result<Pubkey> {
        Ok(Pubkey::new_unique())
    }

    async fn create_merkle_tree(&self, _payer: &Pubkey) -> Result<Pubkey> {
        Ok(self
            .next_tree
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(Pubkey::new_unique))
    }

    async fn set_tree_delegate(&self, _tree: &Pubkey, _new_delegate: &Pubkey) -> Result<()> {
        self.delegate_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.delegate_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.delegate_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Sdk("delegation failed against fresh account".into()));
        }
        Ok(())
    }
}

// ── MockWallet ──────────────────────────────────────────────────────────

/// Keypair-backed signer that can simulate a user rejection.
pub struct MockWallet {
    keypair: Keypair,
    reject: Mutex<bool>,
}

impl Default for MockWallet {
    fn default() -> Self {
        Self {
            keypair: Keypair::new(),
            reject: Mutex::new(false),
        }
    }
}

impl MockWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse all subsequent signing requests.
    pub fn reject_signing(&self) {
        *self.reject.lock().unwrap() = true;
    }
}

#[async_trait]
impl WalletSigner for MockWallet {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_all(&self, txs: &mut [Transaction], blockhash: Hash) -> Result<()> {
        if *self.reject.lock().unwrap() {
            return Err(Error::classify("User rejected the request."));
        }
        for tx in txs.iter_mut() {
            tx.try_sign(&[&self.keypair], blockhash)
                .map_err(|e| Error::Signer(e.to_string()))?;
        }
        Ok(())
    }
}
