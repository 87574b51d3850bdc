//! Scoring of a fill ledger.
//!
//! Fills are grouped per algorithm and symbol, replayed in time order and
//! consolidated into round-trip trades: a trade opens when the position
//! leaves zero and closes when it comes back to exactly zero. The trades of a
//! group are then summarized in an [`AlgoScore`]:
//! - Win/loss count and longest streaks
//! - Net P&L
//! - Mean and standard deviation of the per-trade P&L%
//! - System Quality Number
//!
//! ```rust
//! use tick_bts::prelude::*;
//! use chrono::{DateTime, Duration, Utc};
//!
//! let at = DateTime::<Utc>::default();
//! let fill = |quantity, price, secs| Fill {
//!     algo: "momentum".to_string(),
//!     symbol: "ACME".to_string(),
//!     at: at + Duration::seconds(secs),
//!     quantity,
//!     price,
//! };
//! let scores = ScoreEngine::from(&[fill(10, 100.0, 0), fill(-10, 110.0, 60)][..]).scores();
//!
//! assert_eq!(scores[0].trades, 1);
//! assert_eq!(scores[0].net_pnl, 100.0);
//! ```

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::Fill;

/// A flat-to-flat sequence of fills.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RoundTripTrade {
    /// Number of fills composing the trade.
    pub fills: usize,
    /// Total value bought.
    pub buy_value: f64,
    /// Total value sold.
    pub sell_value: f64,
    /// Realized profit and loss (`sell_value - buy_value`).
    pub pnl: f64,
    /// P&L metric used for the statistics.
    pub pnl_percent: f64,
}

impl RoundTripTrade {
    fn push(&mut self, fill: &Fill) {
        if fill.quantity > 0 {
            self.buy_value += fill.value();
        } else {
            self.sell_value -= fill.value();
        }
        self.fills += 1;
    }

    fn settle(mut self) -> Self {
        self.pnl = self.sell_value - self.buy_value;
        self.pnl_percent = if self.buy_value > 0.0 {
            self.pnl
        } else if self.pnl == 0.0 {
            0.0
        } else if self.pnl < 0.0 {
            -100.0
        } else {
            100.0
        };
        self
    }

    /// Returns `true` for a profitable trade.
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

/// Statistics of one algorithm on one symbol.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlgoScore {
    /// Algorithm name.
    pub algo: String,
    /// Symbol.
    pub symbol: String,
    /// Number of fills, open trade included.
    pub fills: usize,
    /// Number of round-trip trades.
    pub trades: usize,
    /// Trades with a positive P&L.
    pub won: usize,
    /// Trades with a zero or negative P&L.
    pub lost: usize,
    /// Longest run of consecutive wins.
    pub win_streak: usize,
    /// Longest run of consecutive losses.
    pub loss_streak: usize,
    /// Sum of the trades P&L.
    pub net_pnl: f64,
    /// Mean of the trades P&L%.
    pub pnl_percent_mean: f64,
    /// Population standard deviation of the trades P&L%.
    pub pnl_percent_std_dev: f64,
    /// System Quality Number, `sqrt(trades) * mean / std_dev`.
    pub sqn: f64,
}

impl AlgoScore {
    /// Computes the score of `trades`.
    pub fn new(algo: impl Into<String>, symbol: impl Into<String>, fills: usize, trades: &[RoundTripTrade]) -> Self {
        let mut score = Self {
            algo: algo.into(),
            symbol: symbol.into(),
            fills,
            trades: trades.len(),
            ..Default::default()
        };
        if trades.is_empty() {
            return score;
        }

        let (mut win_streak, mut loss_streak) = (0, 0);
        for trade in trades {
            if trade.is_win() {
                score.won += 1;
                win_streak += 1;
                loss_streak = 0;
            } else {
                score.lost += 1;
                loss_streak += 1;
                win_streak = 0;
            }
            score.win_streak = score.win_streak.max(win_streak);
            score.loss_streak = score.loss_streak.max(loss_streak);
            score.net_pnl += trade.pnl;
        }

        let n = trades.len() as f64;
        let first = trades[0].pnl_percent;
        let (mean, std_dev) = if trades.iter().all(|t| t.pnl_percent == first) {
            (first, 0.0)
        } else {
            let mean = trades.iter().map(|t| t.pnl_percent).sum::<f64>() / n;
            // compensated two-pass variance
            let (ss, comp) = trades.iter().fold((0.0, 0.0), |(ss, comp), t| {
                let d = t.pnl_percent - mean;
                (ss + d * d, comp + d)
            });
            (mean, ((ss - comp * comp / n) / n).max(0.0).sqrt())
        };
        score.pnl_percent_mean = mean;
        score.pnl_percent_std_dev = std_dev;
        if std_dev != 0.0 {
            score.sqn = n.sqrt() * mean / std_dev;
        }
        score
    }

    /// Returns the header matching the [`fmt::Display`] layout.
    pub fn header() -> String {
        format!(
            "{:>12}|{:>20}|{:>5}|{:>4}|{:>4}:{:<4}|{:>3}:{:<3}| {:>9} |{:>9}|{:>9}| {:>7}",
            "algo", "symbol", "fills", "trd", "won", "lost", "ws", "ls", "net p/l", "mean %", "stddev %", "sqn"
        )
    }
}

impl fmt::Display for AlgoScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>12}|{:>20}|{:>5}|{:>4}|{:>4}:{:<4}|{:>3}:{:<3}| {:>9.2} |{:>9.2}|{:>9.2}| {:>7.3}",
            self.algo,
            self.symbol,
            self.fills,
            self.trades,
            self.won,
            self.lost,
            self.win_streak,
            self.loss_streak,
            self.net_pnl,
            self.pnl_percent_mean,
            self.pnl_percent_std_dev,
            self.sqn
        )
    }
}

/// Fills partitioned per algorithm and symbol.
///
/// Partitions are kept in a sorted map so the scores come out ordered by
/// algorithm, then symbol.
#[derive(Debug, Clone, Default)]
pub struct ScoreEngine {
    partitions: BTreeMap<(String, String), Vec<Fill>>,
}

impl From<&[Fill]> for ScoreEngine {
    fn from(fills: &[Fill]) -> Self {
        let mut engine = Self::default();
        engine.extend(fills.iter().cloned());
        engine
    }
}

impl Extend<Fill> for ScoreEngine {
    fn extend<T: IntoIterator<Item = Fill>>(&mut self, fills: T) {
        // a zero quantity moves no position and no cash
        for fill in fills.into_iter().filter(|fill| fill.quantity != 0) {
            self.partitions
                .entry((fill.algo.clone(), fill.symbol.clone()))
                .or_default()
                .push(fill);
        }
    }
}

impl ScoreEngine {
    /// Returns the fills of a partition in replay order.
    ///
    /// Sorting is stable: fills with the same timestamp keep their ledger
    /// order.
    pub fn fills(&self, algo: &str, symbol: &str) -> Vec<&Fill> {
        let mut fills = self
            .partitions
            .get(&(algo.to_string(), symbol.to_string()))
            .map(|fills| fills.iter().collect::<Vec<_>>())
            .unwrap_or_default();
        fills.sort_by_key(|fill| fill.at);
        fills
    }

    /// Consolidates the fills of a partition into round-trip trades.
    ///
    /// Fills left after the last return to a flat position form an open
    /// trade, which is not reported.
    pub fn round_trips(&self, algo: &str, symbol: &str) -> Vec<RoundTripTrade> {
        let mut trades = Vec::new();
        let mut position = 0i64;
        let mut open = RoundTripTrade::default();

        for fill in self.fills(algo, symbol) {
            position += fill.quantity;
            open.push(fill);
            if position == 0 {
                trades.push(std::mem::take(&mut open).settle());
            }
        }
        trades
    }

    /// Scores every partition, ordered by algorithm then symbol.
    pub fn scores(&self) -> Vec<AlgoScore> {
        self.partitions
            .iter()
            .map(|((algo, symbol), fills)| {
                let trades = self.round_trips(algo, symbol);
                AlgoScore::new(algo, symbol, fills.len(), &trades)
            })
            .collect()
    }
}
