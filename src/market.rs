use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarketState {
    Active,
    Resolving,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WinningDirection {
    Yes,
    No,
    Draw,
    None,
}

/// Side of a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Yes,
    No,
}

/// Display status of a position, derived from its market's state. Never
/// stored; the on-chain market is the only ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PositionStatus {
    Active,
    Pending,
    Won,
    Lost,
}

/// A prediction market, read-only from this crate's perspective. Liquidity
/// and volume are in base units of the collateral token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub market_id: u64,
    pub question: String,
    pub yes_liquidity: u64,
    pub no_liquidity: u64,
    pub volume: u64,
    pub market_start: i64,
    pub market_end: i64,
    pub state: MarketState,
    pub winning_direction: WinningDirection,
    pub next_position_id: u64,
}

/// Authoritative market update emitted by the on-chain program.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketEvent {
    pub market_id: u64,
    pub state: MarketState,
    pub yes_liquidity: u64,
    pub no_liquidity: u64,
    pub volume: u64,
    pub update_ts: i64,
    pub next_position_id: u64,
    pub market_start: i64,
    pub market_end: i64,
    pub winning_direction: WinningDirection,
}

/// Optimistic delta applied locally right after a confirmed bet, before the
/// authoritative event arrives.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketDelta {
    pub yes_liquidity_added: u64,
    pub no_liquidity_added: u64,
    pub volume_added: u64,
}

impl MarketDelta {
    pub fn for_bet(direction: Direction, amount: u64) -> Self {
        match direction {
            Direction::Yes => Self {
                yes_liquidity_added: amount,
                volume_added: amount,
                ..Self::default()
            },
            Direction::No => Self {
                no_liquidity_added: amount,
                volume_added: amount,
                ..Self::default()
            },
        }
    }
}

/// Derive the display status of a position from its market.
pub fn position_status(direction: Direction, market: &Market) -> PositionStatus {
    match market.state {
        MarketState::Active => PositionStatus::Active,
        MarketState::Resolving => PositionStatus::Pending,
        MarketState::Resolved => match (market.winning_direction, direction) {
            (WinningDirection::Yes, Direction::Yes) | (WinningDirection::No, Direction::No) => {
                PositionStatus::Won
            }
            (WinningDirection::Yes, Direction::No) | (WinningDirection::No, Direction::Yes) => {
                PositionStatus::Lost
            }
            // Draw or unresolved direction: payout rules are the program's
            // business; display as pending.
            _ => PositionStatus::Pending,
        },
    }
}

/// Two-tier market store.
///
/// The authoritative tier is only ever written from confirmed external
/// events; the overlay holds optimistic deltas from locally submitted bets
/// and is cleared for a market as soon as the next authoritative event for
/// it arrives.
#[derive(Debug, Default)]
pub struct MarketBook {
    authoritative: HashMap<u64, Market>,
    overlay: HashMap<u64, MarketDelta>,
}

impl MarketBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the authoritative set wholesale (e.g. after a full refetch).
    /// Overlay entries for refreshed markets are dropped.
    pub fn replace_all(&mut self, markets: Vec<Market>) {
        self.authoritative.clear();
        for market in markets {
            self.overlay.remove(&market.market_id);
            self.authoritative.insert(market.market_id, market);
        }
    }

    /// Add or replace a single authoritative market. Any optimistic delta
    /// for it is left pending until the next authoritative event.
    pub fn insert(&mut self, market: Market) {
        self.authoritative.insert(market.market_id, market);
    }

    /// Apply a confirmed on-chain event. The optimistic overlay for that
    /// market is superseded and removed.
    pub fn apply_event(&mut self, event: MarketEvent) {
        self.overlay.remove(&event.market_id);
        match self.authoritative.get_mut(&event.market_id) {
            Some(market) => {
                market.state = event.state;
                market.yes_liquidity = event.yes_liquidity;
                market.no_liquidity = event.no_liquidity;
                market.volume = event.volume;
                market.market_start = event.market_start;
                market.market_end = event.market_end;
                market.winning_direction = event.winning_direction;
                market.next_position_id = event.next_position_id;
            }
            None => {
                log::debug!(
                    "event for unknown market {}; caller should fetch it",
                    event.market_id
                );
            }
        }
    }

    /// Record an optimistic delta for a market. Deltas for the same market
    /// accumulate until the next authoritative event.
    pub fn apply_optimistic(&mut self, market_id: u64, delta: MarketDelta) {
        let entry = self.overlay.entry(market_id).or_default();
        entry.yes_liquidity_added += delta.yes_liquidity_added;
        entry.no_liquidity_added += delta.no_liquidity_added;
        entry.volume_added += delta.volume_added;
    }

    /// Merged view of a market: authoritative state plus any pending
    /// optimistic delta.
    pub fn get(&self, market_id: u64) -> Option<Market> {
        let market = self.authoritative.get(&market_id)?;
        let mut merged = market.clone();
        if let Some(delta) = self.overlay.get(&market_id) {
            merged.yes_liquidity = merged.yes_liquidity.saturating_add(delta.yes_liquidity_added);
            merged.no_liquidity = merged.no_liquidity.saturating_add(delta.no_liquidity_added);
            merged.volume = merged.volume.saturating_add(delta.volume_added);
        }
        Some(merged)
    }

    /// Whether this market still has an optimistic delta pending.
    pub fn has_pending_delta(&self, market_id: u64) -> bool {
        self.overlay.contains_key(&market_id)
    }

    /// All merged markets, unordered.
    pub fn markets(&self) -> Vec<Market> {
        self.authoritative
            .keys()
            .filter_map(|id| self.get(*id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.authoritative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authoritative.is_empty()
    }
}
