use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;

use crate::error::{Error, Result};

/// A signing wallet.
///
/// `sign_all` signs every transaction in one call so that flows submitting
/// several dependent transactions need only a single approval from the
/// user, while each transaction stays independently submittable.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Sign all transactions against the given blockhash. A refusal leaves
    /// every transaction unsigned.
    async fn sign_all(&self, txs: &mut [Transaction], blockhash: Hash) -> Result<()>;
}

/// In-process signer backed by a local keypair.
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl WalletSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_all(&self, txs: &mut [Transaction], blockhash: Hash) -> Result<()> {
        for tx in txs.iter_mut() {
            tx.try_sign(&[&self.keypair], blockhash)
                .map_err(|e| Error::Signer(e.to_string()))?;
        }
        Ok(())
    }
}
