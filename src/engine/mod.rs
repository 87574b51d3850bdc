//! Core simulation components.
//!
//! This module provides the building blocks of a tick replay:
//! - `Tick`: market data update with depth ladders.
//! - `Order` and `Book`: the virtual account an algorithm trades through.
//! - `Fill`: a resolved order, as recorded in the ledger.
//! - `CandleAggregator`: OHLCV bars built from ticks.
//! - `AlgoRunner` and `DayRunner`: per-symbol execution and per-day scheduling.
//! - `Engine`: drives the whole run over a [`TickSource`].

mod book;
mod candle;
mod day;
mod fill;
mod order;
mod runner;
mod tick;

use tracing::{info, info_span, warn};

use crate::config::{EngineConfig, RunMode};
use crate::errors::{Error, Result};
use crate::feed::TickSource;
use crate::score::{AlgoScore, ScoreEngine};
use crate::strategy::StrategyRegistry;

pub use book::*;
pub use candle::*;
pub use day::*;
pub use fill::*;
pub use order::*;
pub use runner::*;
pub use tick::*;

/// Threads replaying the runners of a day.
struct Workers {
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
}

impl Workers {
    #[cfg(feature = "parallel")]
    fn new(config: &EngineConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_count())
            .thread_name(|i| format!("tick-bts-{i}"))
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;
        Ok(Self { pool })
    }

    #[cfg(not(feature = "parallel"))]
    fn new(_config: &EngineConfig) -> Result<Self> {
        Ok(Self {})
    }

    #[cfg(feature = "parallel")]
    fn execute(&self, day: &mut DayRunner) -> Result<()> {
        day.execute(&self.pool)
    }

    #[cfg(not(feature = "parallel"))]
    fn execute(&self, day: &mut DayRunner) -> Result<()> {
        day.execute()
    }
}

/// Backtest driver.
///
/// The engine walks the trading dates of a [`TickSource`] in order. Each
/// day's ticks are routed to the runners, replayed concurrently, and their
/// fills merged into a single ledger once every runner is done. After the
/// last day the ledger is scored.
///
/// ```rust
/// use tick_bts::prelude::*;
/// use chrono::NaiveDate;
///
/// #[derive(Default)]
/// struct Flip;
///
/// impl Strategy for Flip {
///     fn setup(&mut self, symbol: &str, book: &mut Book) -> Result<Vec<String>> {
///         book.allocate_cash(10_000.0);
///         Ok(vec![symbol.to_string()])
///     }
///
///     fn on_tick(&mut self, _tick: &Tick, book: &mut Book) -> Result<()> {
///         if book.in_position() {
///             book.exit();
///         } else {
///             book.buy(1);
///         }
///         Ok(())
///     }
///
///     fn on_close(&mut self, book: &mut Book) -> Result<()> {
///         book.exit();
///         Ok(())
///     }
/// }
///
/// let mut registry = StrategyRegistry::new();
/// registry.register_default::<Flip>("flip").unwrap();
///
/// let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
/// let feed = SyntheticFeed::new(42, &["ACME"], date, 1).ticks_per_day(100);
///
/// let mut engine = Engine::new(registry);
/// engine.run(&feed).unwrap();
///
/// assert_eq!(engine.scores().len(), 1);
/// assert!(engine.scores()[0].trades > 0);
/// ```
#[derive(Debug)]
pub struct Engine {
    registry: StrategyRegistry,
    config: EngineConfig,
    ledger: Vec<Fill>,
    scores: Vec<AlgoScore>,
}

impl Engine {
    /// Creates an engine with the default configuration.
    pub fn new(registry: StrategyRegistry) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
            ledger: Vec::new(),
            scores: Vec::new(),
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the registered algorithms.
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the merged fill ledger of the last run.
    pub fn ledger(&self) -> &[Fill] {
        &self.ledger
    }

    /// Returns the scores of the last run, ordered by algorithm then symbol.
    pub fn scores(&self) -> &[AlgoScore] {
        &self.scores
    }

    /// Replays every date of `source`.
    ///
    /// Dates the source reports as unavailable are skipped. Results of a
    /// previous run are discarded.
    ///
    /// ### Returns
    /// The first strategy fault, if any strategy callback failed.
    pub fn run(&mut self, source: &dyn TickSource) -> Result<()> {
        if self.registry.is_empty() {
            return Err(Error::NoAlgoRegistered);
        }
        self.config.validate()?;
        self.ledger.clear();
        self.scores.clear();

        let workers = Workers::new(&self.config)?;
        let dates = source.dates()?;
        info!(days = dates.len(), algos = self.registry.len(), mode = ?self.config.mode, "backtest started");

        let daily = self.config.mode == RunMode::Daily;
        let mut carried = (!daily).then(|| DayRunner::new(&self.registry));

        for date in dates {
            let span = info_span!("day", %date);
            let _enter = span.enter();

            let ticks = match source.ticks(date) {
                Ok(ticks) => ticks,
                Err(Error::DataUnavailable(date, reason)) => {
                    warn!(%date, %reason, "no data, day skipped");
                    continue;
                }
                Err(e) => return Err(e),
            };
            info!(ticks = ticks.len(), "replaying day");

            let mut fresh;
            let day = match carried.as_mut() {
                Some(day) => day,
                None => {
                    fresh = DayRunner::new(&self.registry);
                    &mut fresh
                }
            };
            day.route(ticks)?;
            workers.execute(day)?;
            if daily {
                day.close()?;
            }
            self.ledger.extend(day.drain_fills());
        }

        if let Some(mut day) = carried {
            day.close()?;
            self.ledger.extend(day.drain_fills());
        }

        self.scores = ScoreEngine::from(self.ledger.as_slice()).scores();
        info!(fills = self.ledger.len(), scores = self.scores.len(), "backtest finished");
        Ok(())
    }
}
