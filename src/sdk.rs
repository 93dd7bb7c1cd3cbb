//! Fixed interface to the external Depredict market SDK.
//!
//! The market program owns all betting math and state transitions; this
//! crate only consumes its instruction builders and account reads. The
//! trait keeps that boundary explicit and mockable.

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

use crate::error::Result;
use crate::market::{Direction, Market, MarketState, WinningDirection};

/// Seed for the market-creator program-derived address.
pub const MARKET_CREATOR_SEED: &[u8] = b"market_creator";

/// Derive the market-creator PDA for an admin key.
pub fn derive_market_creator_pda(program_id: &Pubkey, admin: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[MARKET_CREATOR_SEED, admin.as_ref()], program_id).0
}

#[derive(Debug, Clone)]
pub struct OpenPositionArgs {
    pub market_id: u64,
    pub direction: Direction,
    pub amount: u64,
    pub payer: Pubkey,
}

#[derive(Debug, Clone)]
pub struct CreateMarketArgs {
    pub question: String,
    pub metadata_uri: String,
    pub market_start: i64,
    pub market_end: i64,
    pub payer: Pubkey,
}

#[derive(Debug, Clone)]
pub struct ResolveMarketArgs {
    pub market_id: u64,
    pub winning_direction: WinningDirection,
    pub state: MarketState,
    pub oracle: Pubkey,
    pub payer: Pubkey,
}

#[derive(Debug, Clone)]
pub struct CreateMarketCreatorArgs {
    pub name: String,
    pub fee_vault: Pubkey,
    pub creator_fee_bps: u16,
    pub signer: Pubkey,
}

/// On-chain market-creator account as read back from the program.
#[derive(Debug, Clone)]
pub struct MarketCreatorAccount {
    pub authority: Pubkey,
    pub verified: bool,
    pub core_collection: Option<Pubkey>,
    pub merkle_tree: Option<Pubkey>,
}

/// Instruction set for creating a market creator, plus the derived address
/// the account will live at.
#[derive(Debug, Clone)]
pub struct CreateMarketCreatorResult {
    pub instructions: Vec<Instruction>,
    pub market_creator: Pubkey,
}

#[async_trait]
pub trait MarketSdk: Send + Sync {
    /// The market program's id, used for PDA derivation.
    fn program_id(&self) -> Pubkey;

    /// Payout instructions for a winning position. Empty means the SDK had
    /// nothing to pay out — callers treat that as an error.
    async fn payout_position(
        &self,
        market_id: u64,
        payer: &Pubkey,
        asset_id: &Pubkey,
    ) -> Result<Vec<Instruction>>;

    async fn open_position(&self, args: &OpenPositionArgs) -> Result<Vec<Instruction>>;

    /// Returns the instructions and the id the new market will get.
    async fn create_market(&self, args: &CreateMarketArgs) -> Result<(Vec<Instruction>, u64)>;

    async fn resolve_market(&self, args: &ResolveMarketArgs) -> Result<Vec<Instruction>>;

    async fn get_markets_by_authority(&self, authority: &Pubkey) -> Result<Vec<Market>>;

    async fn get_market_by_id(&self, market_id: u64) -> Result<Option<Market>>;

    async fn create_market_creator(
        &self,
        args: &CreateMarketCreatorArgs,
    ) -> Result<CreateMarketCreatorResult>;

    async fn verify_market_creator(
        &self,
        signer: &Pubkey,
        core_collection: &Pubkey,
        merkle_tree: &Pubkey,
    ) -> Result<Vec<Instruction>>;

    /// Read the market-creator account at `pda`, if it exists.
    async fn get_market_creator(&self, pda: &Pubkey) -> Result<Option<MarketCreatorAccount>>;
}

/// Fixed interface to the Metaplex side of setup: collection and tree
/// management. Implementations submit and confirm their own transactions
/// (the way the UMI toolchain does); the bootstrap coordinator only
/// sequences them.
#[async_trait]
pub trait NftToolkit: Send + Sync {
    /// Create a core collection whose update authority is `update_authority`.
    async fn create_core_collection(
        &self,
        payer: &Pubkey,
        update_authority: &Pubkey,
    ) -> Result<Pubkey>;

    /// Create a compressed-NFT Merkle tree owned by `payer`.
    async fn create_merkle_tree(&self, payer: &Pubkey) -> Result<Pubkey>;

    /// Delegate an existing tree to `new_delegate`. Commonly fails
    /// transiently right after tree creation; callers retry.
    async fn set_tree_delegate(&self, tree: &Pubkey, new_delegate: &Pubkey) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pda_is_deterministic_per_admin() {
        let program = Pubkey::new_unique();
        let admin = Pubkey::new_unique();
        let a = derive_market_creator_pda(&program, &admin);
        let b = derive_market_creator_pda(&program, &admin);
        assert_eq!(a, b);

        let other = derive_market_creator_pda(&program, &Pubkey::new_unique());
        assert_ne!(a, other);
    }
}
