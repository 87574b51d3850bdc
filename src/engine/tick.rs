use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One level of a depth ladder.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DepthItem {
    /// Price of the level.
    pub price: f64,
    /// Resting quantity at this price.
    pub quantity: u64,
    /// Number of resting orders at this price.
    pub orders: u32,
}

impl From<(f64, u64, u32)> for DepthItem {
    fn from((price, quantity, orders): (f64, u64, u32)) -> Self {
        Self {
            price,
            quantity,
            orders,
        }
    }
}

/// A market data update for one symbol.
///
/// `volume` is the cumulative quantity traded in the session, not the size of
/// the last trade. Bid and ask ladders are ordered best first.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// Trading symbol.
    pub symbol: String,
    /// Exchange timestamp.
    pub timestamp: DateTime<Utc>,
    /// Last traded price.
    pub last_price: f64,
    /// Cumulative volume traded.
    pub volume: u64,
    /// Whether the instrument can be traded (false for indices).
    pub tradable: bool,
    /// Best-N bids, best first.
    #[cfg_attr(feature = "serde", serde(default))]
    pub bids: Vec<DepthItem>,
    /// Best-N asks, best first.
    #[cfg_attr(feature = "serde", serde(default))]
    pub asks: Vec<DepthItem>,
}

impl Tick {
    /// Creates a tradable tick without depth.
    pub fn new(symbol: impl Into<String>, timestamp: DateTime<Utc>, last_price: f64, volume: u64) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            last_price,
            volume,
            tradable: true,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    /// Sets the depth ladders.
    pub fn with_depth(mut self, bids: Vec<DepthItem>, asks: Vec<DepthItem>) -> Self {
        self.bids = bids;
        self.asks = asks;
        self
    }

    /// Sets the tradable flag.
    pub fn with_tradable(mut self, tradable: bool) -> Self {
        self.tradable = tradable;
        self
    }

    /// Returns the best bid level, if any.
    pub fn best_bid(&self) -> Option<&DepthItem> {
        self.bids.first()
    }

    /// Returns the best ask level, if any.
    pub fn best_ask(&self) -> Option<&DepthItem> {
        self.asks.first()
    }

    /// Price a market buy fills at: best ask, or the last price when the ask
    /// side is empty or not positive.
    pub fn buy_price(&self) -> f64 {
        match self.best_ask() {
            Some(ask) if ask.price > 0.0 => ask.price,
            _ => self.last_price,
        }
    }

    /// Price a market sell fills at: best bid, or the last price when the bid
    /// side is empty or not positive.
    pub fn sell_price(&self) -> f64 {
        match self.best_bid() {
            Some(bid) if bid.price > 0.0 => bid.price,
            _ => self.last_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick() -> Tick {
        Tick::new("ACME", DateTime::default(), 50.0, 10)
    }

    #[test]
    fn market_prices_use_best_level() {
        let tick = tick().with_depth(
            vec![(49.5, 10, 1).into(), (49.0, 20, 2).into()],
            vec![(50.5, 10, 1).into(), (51.0, 5, 1).into()],
        );
        assert_eq!(tick.buy_price(), 50.5);
        assert_eq!(tick.sell_price(), 49.5);
    }

    #[test]
    fn market_prices_fall_back_to_last_price() {
        let tick = tick();
        assert_eq!(tick.buy_price(), 50.0);
        assert_eq!(tick.sell_price(), 50.0);

        let tick = tick.with_depth(vec![(0.0, 0, 0).into()], vec![(0.0, 0, 0).into()]);
        assert_eq!(tick.buy_price(), 50.0);
        assert_eq!(tick.sell_price(), 50.0);
    }
}
