//! Liquidity taken at the touch, per price.
//!
//! [`OrderFlowMonitor`] follows one symbol's ticks and splits the traded
//! volume between the two sides of the book: a trade printing at or below
//! the best bid took bid liquidity (seller initiated), a trade at or above
//! the best ask took ask liquidity (buyer initiated).

use std::collections::BTreeMap;
use std::fmt;

use crate::engine::{DepthItem, Tick};

/// Volume counters of one price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceCell {
    /// Quantity traded against the bids.
    pub bid_quantity_taken: u64,
    /// Quantity traded against the asks.
    pub ask_quantity_taken: u64,
    /// Quantity traded at this price, attributed or not.
    pub volume_traded: u64,
}

/// Order flow tracker for a single symbol.
///
/// Trades are attributed against the ladder held from the previous tick, the
/// book as it stood before the trade printed.
#[derive(Debug, Clone, Default)]
pub struct OrderFlowMonitor {
    // cumulative volume of the last tick, `None` until a baseline is set
    last_volume: Option<u64>,
    bids: Vec<DepthItem>,
    asks: Vec<DepthItem>,
    total_bid_taken: u64,
    total_ask_taken: u64,
    ticks_updated: u64,
    // price in hundredths -> cell
    prices: BTreeMap<i64, PriceCell>,
}

fn price_key(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

impl OrderFlowMonitor {
    /// Creates an empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts for `tick`.
    ///
    /// The volume of a tick is cumulative, so the first tick only sets the
    /// baseline. A volume decrease is read as a new session and also
    /// re-baselines.
    pub fn update(&mut self, tick: &Tick) {
        let delta = match self.last_volume {
            Some(last) if tick.volume > last => tick.volume - last,
            _ => 0,
        };

        if delta > 0 {
            self.ticks_updated += 1;
            let price = tick.last_price;
            let cell = self.prices.entry(price_key(price)).or_default();
            if self.bids.first().is_some_and(|bid| price <= bid.price) {
                cell.bid_quantity_taken += delta;
                self.total_bid_taken += delta;
            } else if self.asks.first().is_some_and(|ask| price >= ask.price) {
                cell.ask_quantity_taken += delta;
                self.total_ask_taken += delta;
            }
            cell.volume_traded += delta;
        }

        self.last_volume = Some(tick.volume);
        self.bids.clone_from(&tick.bids);
        self.asks.clone_from(&tick.asks);
    }

    /// Clears the counters and the baseline. Price levels already seen are
    /// kept, their traded volume included.
    pub fn reset(&mut self) {
        self.total_bid_taken = 0;
        self.total_ask_taken = 0;
        self.ticks_updated = 0;
        for cell in self.prices.values_mut() {
            cell.bid_quantity_taken = 0;
            cell.ask_quantity_taken = 0;
        }
        self.last_volume = None;
    }

    /// Returns the cell of `price`, if it ever traded.
    pub fn price_cell(&self, price: f64) -> Option<&PriceCell> {
        self.prices.get(&price_key(price))
    }

    /// Returns every `(price, cell)` pair, ascending by price.
    pub fn cells(&self) -> impl Iterator<Item = (f64, &PriceCell)> {
        self.prices.iter().map(|(key, cell)| (*key as f64 / 100.0, cell))
    }

    /// Returns the total quantity taken from the bids.
    pub fn total_bid_taken(&self) -> u64 {
        self.total_bid_taken
    }

    /// Returns the total quantity taken from the asks.
    pub fn total_ask_taken(&self) -> u64 {
        self.total_ask_taken
    }

    /// Returns the number of ticks that carried new volume.
    pub fn ticks_updated(&self) -> u64 {
        self.ticks_updated
    }

    /// Returns `ask taken - bid taken`. Positive values mean buyers were
    /// more aggressive.
    pub fn imbalance(&self) -> i64 {
        self.total_ask_taken as i64 - self.total_bid_taken as i64
    }

    /// Returns the cumulative volume of the last tick, if a baseline is set.
    pub fn last_volume(&self) -> Option<u64> {
        self.last_volume
    }

    /// Returns the held bid ladder.
    pub fn bids(&self) -> &[DepthItem] {
        &self.bids
    }

    /// Returns the held ask ladder.
    pub fn asks(&self) -> &[DepthItem] {
        &self.asks
    }

    /// Returns the resting level of the held ladder at `price`, if any.
    pub fn resting(&self, price: f64) -> (Option<&DepthItem>, Option<&DepthItem>) {
        let key = price_key(price);
        (level(&self.bids, key), level(&self.asks, key))
    }
}

fn level(ladder: &[DepthItem], key: i64) -> Option<&DepthItem> {
    ladder.iter().find(|item| price_key(item.price) == key)
}

impl fmt::Display for OrderFlowMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column = |value: Option<u64>| value.map(|v| v.to_string()).unwrap_or_default();

        writeln!(
            f,
            "{:>8}|{:>8}|{:>8}|{:>8}|{:>8}|{:>8}|{:>8}|{:>8}",
            "volume", "price", "bid ord", "bid qty", "bid tkn", "ask tkn", "ask qty", "ask ord"
        )?;
        for (price, cell) in self.cells().collect::<Vec<_>>().into_iter().rev() {
            let (bid, ask) = self.resting(price);
            writeln!(
                f,
                "{:>8}|{:>8.2}|{:>8}|{:>8}|{:>8}|{:>8}|{:>8}|{:>8}",
                cell.volume_traded,
                price,
                column(bid.map(|b| b.orders as u64)),
                column(bid.map(|b| b.quantity)),
                cell.bid_quantity_taken,
                cell.ask_quantity_taken,
                column(ask.map(|a| a.quantity)),
                column(ask.map(|a| a.orders as u64)),
            )?;
        }
        write!(
            f,
            "{:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            self.last_volume.unwrap_or(0),
            "",
            "",
            "",
            self.total_bid_taken,
            self.total_ask_taken
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn tick(secs: u32, price: f64, volume: u64) -> Tick {
        Tick::new("ACME", Utc.with_ymd_and_hms(2024, 5, 6, 9, 15, secs).unwrap(), price, volume).with_depth(
            vec![DepthItem::from((10.0, 100, 3)), DepthItem::from((9.95, 50, 2))],
            vec![DepthItem::from((10.05, 80, 4)), DepthItem::from((10.1, 40, 1))],
        )
    }

    #[test]
    fn first_tick_is_baseline() {
        let mut monitor = OrderFlowMonitor::new();
        monitor.update(&tick(0, 10.0, 1_000));
        assert_eq!(monitor.ticks_updated(), 0);
        assert_eq!(monitor.cells().count(), 0);
        assert_eq!(monitor.last_volume(), Some(1_000));
        assert_eq!(monitor.asks()[0].price, 10.05);
    }

    #[test]
    fn volume_is_attributed_by_side() {
        let mut monitor = OrderFlowMonitor::new();
        monitor.update(&tick(0, 10.0, 1_000));
        monitor.update(&tick(1, 10.0, 1_030));
        monitor.update(&tick(2, 10.05, 1_050));
        monitor.update(&tick(3, 10.02, 1_055));
        monitor.update(&tick(4, 10.1, 1_065));

        assert_eq!(monitor.ticks_updated(), 4);
        assert_eq!(monitor.total_bid_taken(), 30);
        assert_eq!(monitor.total_ask_taken(), 30);
        assert_eq!(monitor.imbalance(), 0);

        let cell = monitor.price_cell(10.0).unwrap();
        assert_eq!((cell.bid_quantity_taken, cell.ask_quantity_taken, cell.volume_traded), (30, 0, 30));
        // inside the spread, counted as volume only
        let cell = monitor.price_cell(10.02).unwrap();
        assert_eq!((cell.bid_quantity_taken, cell.ask_quantity_taken, cell.volume_traded), (0, 0, 5));
        assert_eq!(monitor.price_cell(10.1).unwrap().ask_quantity_taken, 10);
        assert!(monitor.price_cell(9.0).is_none());
    }

    #[test]
    fn unchanged_volume_is_ignored() {
        let mut monitor = OrderFlowMonitor::new();
        monitor.update(&tick(0, 10.0, 1_000));
        monitor.update(&tick(1, 10.05, 1_000));
        assert_eq!(monitor.ticks_updated(), 0);
        assert_eq!(monitor.total_ask_taken(), 0);
    }

    #[test]
    fn volume_decrease_rebaselines() {
        let mut monitor = OrderFlowMonitor::new();
        monitor.update(&tick(0, 10.0, 1_000));
        monitor.update(&tick(1, 10.05, 20));
        monitor.update(&tick(2, 10.05, 45));
        assert_eq!(monitor.ticks_updated(), 1);
        assert_eq!(monitor.total_ask_taken(), 25);
    }

    #[test]
    fn empty_ladder_counts_volume_only() {
        let mut monitor = OrderFlowMonitor::new();
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 9, 15, 0).unwrap();
        monitor.update(&Tick::new("ACME", at, 10.0, 0));
        monitor.update(&Tick::new("ACME", at, 10.0, 7));
        let cell = monitor.price_cell(10.0).unwrap();
        assert_eq!((cell.bid_quantity_taken, cell.ask_quantity_taken, cell.volume_traded), (0, 0, 7));
    }

    #[test]
    fn reset_keeps_price_levels() {
        let mut monitor = OrderFlowMonitor::new();
        monitor.update(&tick(0, 10.0, 1_000));
        monitor.update(&tick(1, 10.0, 1_010));
        monitor.update(&tick(2, 10.05, 1_030));
        monitor.reset();

        assert_eq!(monitor.ticks_updated(), 0);
        assert_eq!(monitor.total_bid_taken(), 0);
        assert_eq!(monitor.total_ask_taken(), 0);
        assert!(monitor.last_volume().is_none());
        let prices = monitor.cells().map(|(p, _)| p).collect::<Vec<_>>();
        assert_eq!(prices, vec![10.0, 10.05]);
        assert!(monitor.cells().all(|(_, c)| c.bid_quantity_taken == 0 && c.ask_quantity_taken == 0));

        // the next tick is a baseline again
        monitor.update(&tick(3, 10.0, 1_040));
        assert_eq!(monitor.ticks_updated(), 0);
    }

    #[test]
    fn attribution_uses_the_ladder_before_the_trade() {
        let at = |s| Utc.with_ymd_and_hms(2024, 5, 6, 9, 15, s).unwrap();
        let mut monitor = OrderFlowMonitor::new();
        monitor.update(&tick(0, 10.0, 1_000));
        // the trade clears the 10.05 ask, the new ladder has it as best bid
        let swept = Tick::new("ACME", at(1), 10.05, 1_080).with_depth(
            vec![DepthItem::from((10.05, 20, 1))],
            vec![DepthItem::from((10.1, 40, 1))],
        );
        monitor.update(&swept);
        assert_eq!(monitor.total_ask_taken(), 80);
        assert_eq!(monitor.total_bid_taken(), 0);

        // next trade is judged against the swept ladder
        monitor.update(&Tick::new("ACME", at(2), 10.05, 1_090));
        assert_eq!(monitor.total_bid_taken(), 10);
        assert!(monitor.bids().is_empty());
    }

    #[test]
    fn resting_depth_is_read_from_the_held_ladder() {
        let mut monitor = OrderFlowMonitor::new();
        monitor.update(&tick(0, 10.0, 1_000));
        let (bid, ask) = monitor.resting(9.95);
        assert_eq!(bid.map(|b| (b.quantity, b.orders)), Some((50, 2)));
        assert!(ask.is_none());
        let (bid, ask) = monitor.resting(10.1);
        assert!(bid.is_none());
        assert_eq!(ask.map(|a| (a.quantity, a.orders)), Some((40, 1)));
        assert_eq!(monitor.resting(12.0), (None, None));
    }

    #[test]
    fn display_lists_cells_and_totals() {
        let mut monitor = OrderFlowMonitor::new();
        monitor.update(&tick(0, 10.0, 1_000));
        monitor.update(&tick(1, 10.0, 1_010));
        monitor.update(&tick(2, 10.05, 1_030));
        let out = monitor.to_string();
        let lines = out.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("10.05"));
        assert!(lines[2].contains("10.00"));
        // resting depth of the held ladder next to the taken counters
        let row = lines[1].split('|').map(str::trim).collect::<Vec<_>>();
        assert_eq!(row, vec!["20", "10.05", "", "", "0", "20", "80", "4"]);
        let row = lines[2].split('|').map(str::trim).collect::<Vec<_>>();
        assert_eq!(row, vec!["10", "10.00", "3", "100", "10", "0", "", ""]);
        assert!(lines[3].contains("1030"));
    }
}
