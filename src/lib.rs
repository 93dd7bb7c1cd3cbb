//! Client-side coordinator for the Depredict prediction-market program.
//!
//! The crate covers the three flows a front-end cannot improvise: the
//! claim-and-burn transaction sequence for winning positions, the
//! market-creator bootstrap wizard, and compressed-NFT position discovery
//! through a DAS index. [`DepredictNode`] ties them together behind a
//! single handle; every network-facing collaborator sits behind a trait so
//! the flows are testable without a validator.

pub mod bootstrap;
pub mod bubblegum;
pub mod claim;
pub mod config;
pub mod das;
pub mod error;
pub mod market;
pub mod node;
pub mod positions;
pub mod retry;
pub mod rpc;
pub mod sdk;
pub mod state;
pub mod wallet;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bootstrap::{
    BootstrapConfig, BootstrapEvent, BootstrapOutcome, BootstrapStage, BootstrapStep,
    MarketCreatorBootstrap, MarketCreatorStatus, market_creator_status,
};
pub use claim::{ClaimConfig, ClaimOutcome, claim_and_burn};
pub use config::ClientConfig;
pub use das::{AssetIndex, AssetInfo, AssetPage, AssetProof, DasClient};
pub use error::{Error, Result};
pub use market::{
    Direction, Market, MarketBook, MarketDelta, MarketEvent, MarketState, PositionStatus,
    WinningDirection, position_status,
};
pub use node::DepredictNode;
pub use positions::{DiscoveredPosition, discover_positions, parse_position_name};
pub use rpc::{HttpRpcBackend, RpcBackend, send_and_confirm};
pub use sdk::{
    CreateMarketArgs, CreateMarketCreatorArgs, CreateMarketCreatorResult, MarketCreatorAccount,
    MarketSdk, NftToolkit, OpenPositionArgs, ResolveMarketArgs,
};
pub use state::{CreatorDetails, StateStore};
pub use wallet::{KeypairSigner, WalletSigner};
