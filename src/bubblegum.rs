//! Burn-instruction construction for compressed NFT positions.
//!
//! The Merkle tree mechanics themselves live in the external Bubblegum
//! program; this module only lays out the canonical account list and
//! argument encoding so the claim coordinator can assemble a burn
//! transaction from a DAS owner/delegate/proof triple.

use sha2::{Digest, Sha256};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::{pubkey, system_program};

use crate::das::{AssetInfo, AssetProof};
use crate::error::{Error, Result};

pub const BUBBLEGUM_PROGRAM_ID: Pubkey = pubkey!("BGUMAp9Gq7iTEuizy4pqaxsTyUCBK68MDfK752saRPUY");
pub const ACCOUNT_COMPRESSION_PROGRAM_ID: Pubkey =
    pubkey!("cmtDvXumGCrqC1Age74AVPhSRVXJMd8PJS91L8KbNCK");
pub const NOOP_PROGRAM_ID: Pubkey = pubkey!("noopb9bkMVfRPU8AsbpTGmwQk5CaqoCrAu56rBMTzSw");
pub const MPL_CORE_PROGRAM_ID: Pubkey = pubkey!("CoREENxT6tW1HoK8ypY1SxRMZTcVPm7R94rH4PZNhX7d");

/// Anchor-style instruction discriminator: first 8 bytes of
/// `sha256("global:{name}")`.
fn anchor_discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// The tree-config account derived from a Merkle tree address.
pub fn tree_config_pda(tree: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[tree.as_ref()], &BUBBLEGUM_PROGRAM_ID).0
}

/// Build a burn instruction for a compressed NFT.
///
/// `leaf_owner` and `leaf_delegate` must be the *current* on-chain values
/// (the network re-validates them against the proof); whichever of them
/// matches `payer` is marked as the signer. The proof path is appended as
/// trailing readonly accounts.
pub fn burn_instruction(
    payer: &Pubkey,
    asset: &AssetInfo,
    proof: &AssetProof,
    leaf_owner: &Pubkey,
    leaf_delegate: &Pubkey,
    core_collection: Option<&Pubkey>,
) -> Result<Instruction> {
    let data_hash = asset
        .data_hash
        .ok_or_else(|| Error::ProofOrOwnership(format!("asset {} missing data hash", asset.id)))?;
    let creator_hash = asset.creator_hash.ok_or_else(|| {
        Error::ProofOrOwnership(format!("asset {} missing creator hash", asset.id))
    })?;

    let mut accounts = vec![
        AccountMeta::new(tree_config_pda(&proof.tree), false),
        AccountMeta::new_readonly(*leaf_owner, leaf_owner == payer),
        AccountMeta::new_readonly(*leaf_delegate, leaf_delegate == payer),
        AccountMeta::new(proof.tree, false),
        AccountMeta::new_readonly(NOOP_PROGRAM_ID, false),
        AccountMeta::new_readonly(ACCOUNT_COMPRESSION_PROGRAM_ID, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    if let Some(collection) = core_collection {
        accounts.push(AccountMeta::new_readonly(*collection, false));
        accounts.push(AccountMeta::new_readonly(MPL_CORE_PROGRAM_ID, false));
    }
    for node in &proof.proof {
        accounts.push(AccountMeta::new_readonly(*node, false));
    }

    let mut data = Vec::with_capacity(8 + 32 + 32 + 32 + 8 + 4);
    data.extend_from_slice(&anchor_discriminator("burn_v2"));
    data.extend_from_slice(&proof.root.to_bytes());
    data.extend_from_slice(&data_hash.to_bytes());
    data.extend_from_slice(&creator_hash.to_bytes());
    data.extend_from_slice(&asset.leaf_id.to_le_bytes());
    data.extend_from_slice(&(asset.leaf_id as u32).to_le_bytes());

    Ok(Instruction {
        program_id: BUBBLEGUM_PROGRAM_ID,
        accounts,
        data,
    })
}
