//! # tick-bts: Tick-level backtesting for trading algorithms
//!
//! **tick-bts** replays historical market ticks against pluggable trading
//! algorithms and measures their simulated profitability.
//! Every algorithm runs once per symbol, with its own virtual account. Runners
//! of the same day replay concurrently and their fills are merged into one
//! ledger, which is then consolidated into round-trip trades and statistics.
//!
//! ## Core Components
//! | Component   | Description                                                                                     |
//! |-------------|-------------------------------------------------------------------------------------------------|
//! | **`Tick`** | Market data update: last price, cumulative volume, best-N bid and ask ladders.                   |
//! | **`Book`** | Virtual account of one algorithm on one symbol: cash, position and a single pending order.       |
//! | **`CandleAggregator`** | OHLCV bars built from ticks, aligned on the session start.                           |
//! | **`Strategy`** | Lifecycle callbacks implemented by an algorithm.                                             |
//! | **`StrategyRegistry`** | Named algorithm factories.                                                           |
//! | **`DayRunner`** | Routes a day's ticks to the runners and replays them concurrently.                          |
//! | **`Engine`** | Walks the trading dates and scores the merged ledger.                                          |
//! | **`ScoreEngine`** | Round-trip trades, win/loss streaks, net P&L and System Quality Number.                   |
//! | **`OrderFlowMonitor`** | Volume taken at the bid and at the ask, per price.                                   |
//!
//! ## Order Resolution
//! | Order Type       | Description                                                                              |
//! |------------------|------------------------------------------------------------------------------------------|
//! | **Market Order** | Fills on the next own tick, at the best ask (buy) or best bid (sell), else the last price. |
//! | **Limit Order**  | Fills at the limit price once the last price crosses it.                                 |
//!
//! A book holds at most one pending order: new orders are ignored while one is
//! waiting. Cash is tracked but not enforced.
//!
//! ## Features
//! | Feature      | Description                                                                              |
//! |--------------|------------------------------------------------------------------------------------------|
//! | `parallel`   | *(default)* Replays the runners of a day on a [`rayon`](https://crates.io/crates/rayon) thread pool. |
//! | `serde`      | Serializable types, `JsonFeed` and TOML configuration.                                   |
//!
//! ## Getting Started
//! ```toml
//! [dependencies]
//! tick-bts = "*"
//! ta = "*"  # Optional: For technical analysis indicators
//! ```
//!
//! ```rust
//! use tick_bts::prelude::*;
//! use chrono::NaiveDate;
//!
//! /// Buys the first tick, sells at the close.
//! #[derive(Default)]
//! struct Hold;
//!
//! impl Strategy for Hold {
//!     fn setup(&mut self, symbol: &str, book: &mut Book) -> Result<Vec<String>> {
//!         book.allocate_cash(10_000.0);
//!         Ok(vec![symbol.to_string()])
//!     }
//!
//!     fn on_tick(&mut self, tick: &Tick, book: &mut Book) -> Result<()> {
//!         if book.is_book_clean() && book.fill_count() == 0 {
//!             book.buy(book.quantity_affordable(tick.buy_price()));
//!         }
//!         Ok(())
//!     }
//!
//!     fn on_close(&mut self, book: &mut Book) -> Result<()> {
//!         book.exit();
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = StrategyRegistry::new();
//! registry.register_default::<Hold>("hold").unwrap();
//!
//! let first = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
//! let feed = SyntheticFeed::new(7, &["ALFA", "BETA"], first, 3).ticks_per_day(300);
//!
//! let mut engine = Engine::new(registry);
//! engine.run(&feed).unwrap();
//!
//! println!("{}", AlgoScore::header());
//! for score in engine.scores() {
//!     println!("{score}");
//! }
//! assert_eq!(engine.scores().len(), 2);
//! ```
//!
//! ## Logging
//! The engine reports through [`tracing`](https://crates.io/crates/tracing):
//! one span per day and a P/L summary per runner when it closes. Install any
//! subscriber to see them.
//!
//! ## License
//! MIT
#![warn(missing_docs)]

/// Engine configuration: run mode and worker threads.
pub mod config;

/// Core simulation components: ticks, books, runners and the engine.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Tick sources the engine replays.
pub mod feed;

/// Order flow monitoring.
pub mod orderflow;

/// Round-trip trades and performance statistics.
pub mod score;

/// Strategy trait and registry.
pub mod strategy;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::config::*;
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::feed::*;
    pub use crate::orderflow::*;
    pub use crate::score::*;
    pub use crate::strategy::*;
}
