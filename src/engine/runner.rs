use std::sync::Arc;

use chrono::DateTime;
use tracing::info;

use crate::engine::{Book, Fill, Tick};
use crate::errors::{Error, Result};
use crate::strategy::Strategy;

/// Runs one algorithm instance bound to one symbol.
///
/// The runner owns its book, its tick queue and its fill ledger, nothing is
/// shared with other runners.
pub struct AlgoRunner {
    algo: Arc<str>,
    symbol: String,
    strategy: Box<dyn Strategy>,
    book: Book,
    watch: Vec<String>,
    last_tick: Option<Arc<Tick>>,
    queue: Vec<Arc<Tick>>,
    // Unix second of the last `on_periodic` call
    last_periodic: i64,
    fills: Vec<Fill>,
}

impl std::fmt::Debug for AlgoRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgoRunner")
            .field("id", &self.id())
            .field("book", &self.book)
            .field("watch", &self.watch)
            .field("queued", &self.queue.len())
            .field("fills", &self.fills.len())
            .finish()
    }
}

impl AlgoRunner {
    /// Binds `strategy` to `symbol` and runs its setup.
    pub(crate) fn new(algo: Arc<str>, symbol: &str, mut strategy: Box<dyn Strategy>) -> Result<Self> {
        let mut book = Book::default();
        let watch = strategy.setup(symbol, &mut book).map_err(|e| fault(&algo, symbol, e))?;

        Ok(Self {
            algo,
            symbol: symbol.to_string(),
            strategy,
            book,
            watch,
            last_tick: None,
            queue: Vec::new(),
            last_periodic: i64::MIN,
            fills: Vec::new(),
        })
    }

    /// Returns the runner identifier (`algo::symbol`).
    pub fn id(&self) -> String {
        format!("{}::{}", self.algo, self.symbol)
    }

    /// Returns the algorithm name.
    pub fn algo(&self) -> &str {
        &self.algo
    }

    /// Returns the symbol the instance is bound to.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the book.
    pub fn book(&self) -> &Book {
        &self.book
    }

    /// Returns the subscribed symbols.
    pub fn watch(&self) -> &[String] {
        &self.watch
    }

    /// Returns `false` when setup subscribed to nothing.
    pub fn is_enabled(&self) -> bool {
        !self.watch.is_empty()
    }

    /// Returns the fills not yet drained.
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Returns the number of ticks waiting for replay.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn queue(&mut self, tick: Arc<Tick>) {
        if self.is_enabled() {
            self.queue.push(tick);
        }
    }

    /// Replays the queued ticks in arrival order and empties the queue.
    pub(crate) fn replay(&mut self) -> Result<()> {
        let queue = std::mem::take(&mut self.queue);
        for tick in queue {
            self.check_clock(&tick)?;
            self.handle_tick(tick)?;
        }
        Ok(())
    }

    /// Runs the close sequence: `on_close`, then a last order resolution.
    pub(crate) fn close(&mut self) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        self.strategy
            .on_close(&mut self.book)
            .map_err(|e| fault(&self.algo, &self.symbol, e))?;
        self.handle_book();
        info!(
            runner = %self.id(),
            pnl = self.book.pnl(),
            fills = self.book.fill_count(),
            "P/L {:9.2} | Fills {:3} | {}",
            self.book.pnl(),
            self.book.fill_count(),
            self.id()
        );
        Ok(())
    }

    pub(crate) fn drain_fills(&mut self) -> Vec<Fill> {
        std::mem::take(&mut self.fills)
    }

    fn check_clock(&mut self, tick: &Tick) -> Result<()> {
        let now = tick.timestamp.timestamp();
        if self.last_periodic < now {
            self.last_periodic = now;
            let second = DateTime::from_timestamp(now, 0)
                .ok_or_else(|| Error::Unreachable(format!("timestamp out of range: {now}")))?;
            self.strategy
                .on_periodic(second, &mut self.book)
                .map_err(|e| fault(&self.algo, &self.symbol, e))?;
        }
        Ok(())
    }

    fn handle_tick(&mut self, tick: Arc<Tick>) -> Result<()> {
        if tick.symbol == self.symbol && tick.tradable {
            self.last_tick = Some(Arc::clone(&tick));
            self.handle_book();
        }
        self.strategy
            .on_tick(&tick, &mut self.book)
            .map_err(|e| fault(&self.algo, &self.symbol, e))
    }

    /// Resolves the pending order against the last own tick.
    fn handle_book(&mut self) {
        let Some(tick) = self.last_tick.as_deref() else {
            return;
        };
        let Some(order) = self.book.pending_order().copied() else {
            return;
        };
        let Some(price) = order.execution_price(tick) else {
            return;
        };

        self.book.take_order();
        self.book.apply_fill(order.quantity(), price);
        self.fills.push(Fill {
            algo: self.algo.to_string(),
            symbol: self.symbol.clone(),
            at: tick.timestamp,
            quantity: order.quantity(),
            price,
        });
    }
}

fn fault(algo: &str, symbol: &str, error: Error) -> Error {
    Error::StrategyFault {
        runner: format!("{algo}::{symbol}"),
        reason: error.to_string(),
    }
}
