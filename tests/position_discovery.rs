//! Discovery of position NFTs through the asset index.

use std::collections::HashSet;

use solana_sdk::pubkey::Pubkey;

use depredict_client::positions::discover_positions;
use depredict_client::testing::{MockIndex, test_asset};

#[tokio::test]
async fn discovers_across_pages() {
    let index = MockIndex::new();
    let owner = Pubkey::new_unique();
    let collection = Pubkey::new_unique();

    // Three full pages plus a partial one at the default page size of 100.
    let items: Vec<_> = (0..342)
        .map(|i| {
            test_asset(
                Pubkey::new_unique(),
                owner,
                &format!("DEPREDICT-{}-{}", i / 10, i % 10),
            )
        })
        .collect();
    index.set_search_items(items);

    let positions = discover_positions(&index, &owner, &collection)
        .await
        .unwrap();
    assert_eq!(positions.len(), 342);
}

#[tokio::test]
async fn burnt_and_foreign_assets_are_skipped() {
    let index = MockIndex::new();
    let owner = Pubkey::new_unique();
    let collection = Pubkey::new_unique();

    let good = test_asset(Pubkey::new_unique(), owner, "DEPREDICT-3-14");
    let mut burnt = test_asset(Pubkey::new_unique(), owner, "DEPREDICT-4-1");
    burnt.burnt = true;
    let foreign = test_asset(Pubkey::new_unique(), owner, "Some Art Piece #42");
    let mut unnamed = test_asset(Pubkey::new_unique(), owner, "unused");
    unnamed.name = None;

    index.set_search_items(vec![good.clone(), burnt, foreign, unnamed]);

    let positions = discover_positions(&index, &owner, &collection)
        .await
        .unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].asset_id, good.id);
    assert_eq!(positions[0].market_id, 3);
    assert_eq!(positions[0].position_id, 14);
    assert_eq!(positions[0].name, "DEPREDICT-3-14");
}

#[tokio::test]
async fn repeated_discovery_is_idempotent() {
    let index = MockIndex::new();
    let owner = Pubkey::new_unique();
    let collection = Pubkey::new_unique();

    index.set_search_items(
        (1..=5)
            .map(|i| test_asset(Pubkey::new_unique(), owner, &format!("DEPREDICT-{i}-1")))
            .collect(),
    );

    let first = discover_positions(&index, &owner, &collection)
        .await
        .unwrap();
    let second = discover_positions(&index, &owner, &collection)
        .await
        .unwrap();

    let first: HashSet<_> = first.into_iter().map(|p| p.asset_id).collect();
    let second: HashSet<_> = second.into_iter().map(|p| p.asset_id).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
}

#[tokio::test]
async fn empty_wallet_discovers_nothing() {
    let index = MockIndex::new();
    let positions = discover_positions(&index, &Pubkey::new_unique(), &Pubkey::new_unique())
        .await
        .unwrap();
    assert!(positions.is_empty());
}
