use thiserror::Error;

use crate::bootstrap::BootstrapStep;

/// How many characters of a raw transport/program message survive into the
/// fallback error variant.
const RAW_MESSAGE_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("wallet rejected the signing request: {0}")]
    WalletRejected(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("blockhash expired before confirmation: {0}")]
    StaleBlockhash(String),

    #[error("asset proof or ownership invalid: {0}")]
    ProofOrOwnership(String),

    #[error("already processed (burned or resolved): {0}")]
    AlreadyProcessed(String),

    #[error("rate limited by RPC provider: {0}")]
    RateLimited(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("asset index error: {0}")]
    Index(String),

    #[error("market sdk error: {0}")]
    Sdk(String),

    #[error("signer error: {0}")]
    Signer(String),

    #[error("no payout instructions returned for market {market_id}")]
    NoPayoutInstructions { market_id: u64 },

    #[error("wallet {wallet} is neither owner nor delegate of asset {asset}")]
    NotAssetAuthority { asset: String, wallet: String },

    #[error("asset {0} is already burned")]
    AssetBurned(String),

    #[error("market creator admin key is not configured")]
    MissingAdminKey,

    #[error("bootstrap failed at step {step}: {source}")]
    Bootstrap {
        step: BootstrapStep,
        #[source]
        source: Box<Error>,
    },

    #[error("state persistence error: {0}")]
    State(String),

    #[error("internal mutex poisoned by a prior panic")]
    MutexPoisoned,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Generic(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Map a raw transport/program error message onto the user-facing error
    /// taxonomy by substring matching, mirroring how wallets and RPC
    /// providers phrase these failures. Anything unrecognized falls back to
    /// [`Error::Generic`] with the message truncated.
    pub fn classify(raw: impl AsRef<str>) -> Error {
        let raw = raw.as_ref();
        let lower = raw.to_lowercase();

        if lower.contains("user rejected") || lower.contains("user denied") {
            Error::WalletRejected(raw.to_string())
        } else if lower.contains("insufficient funds") || lower.contains("insufficient lamports") {
            Error::InsufficientFunds(raw.to_string())
        } else if lower.contains("blockhash not found")
            || lower.contains("block height exceeded")
            || lower.contains("transaction expired")
        {
            Error::StaleBlockhash(raw.to_string())
        } else if lower.contains("invalid root")
            || lower.contains("invalid proof")
            || lower.contains("leaf authority")
            || lower.contains("proof verification")
        {
            Error::ProofOrOwnership(raw.to_string())
        } else if lower.contains("already burned")
            || lower.contains("already been processed")
            || lower.contains("already resolved")
            || lower.contains("leaf not found")
        {
            Error::AlreadyProcessed(raw.to_string())
        } else if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
            Error::RateLimited(raw.to_string())
        } else {
            let mut msg = raw.to_string();
            if msg.len() > RAW_MESSAGE_LIMIT {
                let mut cut = RAW_MESSAGE_LIMIT;
                while !msg.is_char_boundary(cut) {
                    cut -= 1;
                }
                msg.truncate(cut);
            }
            Error::Generic(msg)
        }
    }

    /// Whether a retry of the whole operation is safe. Claim-and-burn
    /// callers use this: anything that failed before the payout landed can
    /// be retried wholesale; a partial outcome never reaches this path.
    pub fn is_retry_safe(&self) -> bool {
        !matches!(self, Error::AlreadyProcessed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_wallet_rejection() {
        assert!(matches!(
            Error::classify("User rejected the request."),
            Error::WalletRejected(_)
        ));
        assert!(matches!(
            Error::classify("user denied transaction signature"),
            Error::WalletRejected(_)
        ));
    }

    #[test]
    fn classify_stale_blockhash() {
        assert!(matches!(
            Error::classify("Transaction expired: block height exceeded"),
            Error::StaleBlockhash(_)
        ));
        assert!(matches!(
            Error::classify("Blockhash not found"),
            Error::StaleBlockhash(_)
        ));
    }

    #[test]
    fn classify_proof_failures() {
        assert!(matches!(
            Error::classify("Invalid root recomputed from proof"),
            Error::ProofOrOwnership(_)
        ));
    }

    #[test]
    fn classify_rate_limit() {
        assert!(matches!(
            Error::classify("HTTP 429 Too Many Requests"),
            Error::RateLimited(_)
        ));
    }

    #[test]
    fn classify_fallback_truncates() {
        let long = "x".repeat(500);
        match Error::classify(&long) {
            Error::Generic(msg) => assert_eq!(msg.len(), 100),
            other => panic!("expected Generic, got {other}"),
        }
    }

    #[test]
    fn already_processed_is_not_retry_safe() {
        assert!(!Error::classify("leaf already burned").is_retry_safe());
        assert!(Error::classify("some transient thing").is_retry_safe());
    }
}
