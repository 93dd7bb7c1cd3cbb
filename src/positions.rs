//! Position discovery: map wallet-held compressed NFTs back to
//! (marketId, positionId) pairs via their display names.

use solana_sdk::pubkey::Pubkey;

use crate::das::AssetIndex;
use crate::error::Result;

/// Display-name prefix minted onto every position NFT.
pub const POSITION_NAME_PREFIX: &str = "DEPREDICT";

const SEARCH_PAGE_LIMIT: u64 = 100;

/// A wallet-held position recovered from the asset index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPosition {
    pub asset_id: Pubkey,
    pub market_id: u64,
    pub position_id: u64,
    pub name: String,
}

/// Parse a position NFT name of the form `DEPREDICT-{marketId}-{positionId}`.
///
/// Anything that doesn't match exactly (wrong prefix, missing segment,
/// non-numeric ids, trailing garbage) is unparseable and returns `None`.
pub fn parse_position_name(name: &str) -> Option<(u64, u64)> {
    let rest = name.strip_prefix(POSITION_NAME_PREFIX)?.strip_prefix('-')?;
    let (market, position) = rest.split_once('-')?;
    if market.is_empty() || position.is_empty() {
        return None;
    }
    let market_id = market.parse().ok()?;
    let position_id = position.parse().ok()?;
    Some((market_id, position_id))
}

/// Query the asset index for every NFT `owner` holds in `collection` and
/// parse the matching position names.
///
/// Burned tokens are excluded. Tokens whose names don't match the position
/// pattern are dropped with a warning rather than failing the whole query,
/// since unrelated tokens can share the collection. No ordering guarantee.
pub async fn discover_positions(
    index: &dyn AssetIndex,
    owner: &Pubkey,
    collection: &Pubkey,
) -> Result<Vec<DiscoveredPosition>> {
    let mut positions = Vec::new();
    let mut page = 1;
    let mut seen = 0u64;
    let mut burnt = 0u64;

    loop {
        let batch = index
            .search_assets(owner, collection, page, SEARCH_PAGE_LIMIT)
            .await?;
        let batch_len = batch.items.len() as u64;
        seen += batch_len;

        for asset in batch.items {
            if asset.burnt {
                burnt += 1;
                log::debug!("skipping burnt asset {}", asset.id);
                continue;
            }
            let Some(name) = asset.name.as_deref() else {
                log::warn!("asset {} has no name; skipping", asset.id);
                continue;
            };
            match parse_position_name(name) {
                Some((market_id, position_id)) => positions.push(DiscoveredPosition {
                    asset_id: asset.id,
                    market_id,
                    position_id,
                    name: name.to_string(),
                }),
                None => {
                    log::warn!("asset {} has unrecognized name {name:?}; skipping", asset.id);
                }
            }
        }

        if batch_len < SEARCH_PAGE_LIMIT {
            break;
        }
        page += 1;
    }

    log::debug!(
        "discovered {} positions for {owner} ({seen} assets scanned, {burnt} burnt)",
        positions.len()
    );
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wellformed_names() {
        assert_eq!(parse_position_name("DEPREDICT-12-7"), Some((12, 7)));
        assert_eq!(parse_position_name("DEPREDICT-0-0"), Some((0, 0)));
    }

    #[test]
    fn rejects_malformed_names() {
        assert_eq!(parse_position_name("random-name"), None);
        assert_eq!(parse_position_name("DEPREDICT-12"), None);
        assert_eq!(parse_position_name("DEPREDICT-"), None);
        assert_eq!(parse_position_name("DEPREDICT-a-b"), None);
        assert_eq!(parse_position_name("DEPREDICT-12-"), None);
        assert_eq!(parse_position_name("depredict-12-7"), None);
    }

    #[test]
    fn rejects_trailing_garbage_in_position_id() {
        assert_eq!(parse_position_name("DEPREDICT-12-7x"), None);
    }
}
