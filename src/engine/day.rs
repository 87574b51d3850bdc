use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::engine::{AlgoRunner, Fill, Tick};
use crate::errors::Result;
use crate::strategy::StrategyRegistry;

/// Schedules the runners of a trading day.
///
/// Ticks are first routed to the runner queues in a single sequential pass,
/// then every runner replays its own queue. Runners share nothing, so the
/// replay runs them concurrently and joins before returning.
#[derive(Debug)]
pub struct DayRunner<'r> {
    registry: &'r StrategyRegistry,
    runners: Vec<AlgoRunner>,
    // symbol -> indexes of subscribed runners
    subscribers: HashMap<String, Vec<usize>>,
    symbols: HashSet<String>,
}

impl<'r> DayRunner<'r> {
    /// Creates a scheduler instantiating algorithms from `registry`.
    pub fn new(registry: &'r StrategyRegistry) -> Self {
        Self {
            registry,
            runners: Vec::new(),
            subscribers: HashMap::new(),
            symbols: HashSet::new(),
        }
    }

    /// Returns the runners, sorted by algorithm then symbol.
    pub fn runners(&self) -> Vec<&AlgoRunner> {
        let mut runners = self.runners.iter().collect::<Vec<_>>();
        runners.sort_by(|a, b| (a.algo(), a.symbol()).cmp(&(b.algo(), b.symbol())));
        runners
    }

    /// Returns the number of instantiated runners.
    pub fn len(&self) -> usize {
        self.runners.len()
    }

    /// Returns `true` if no runner was instantiated.
    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    fn instantiate(&mut self, symbol: &str) -> Result<()> {
        for (algo, strategy) in self.registry.instantiate() {
            let runner = AlgoRunner::new(algo, symbol, strategy)?;
            let index = self.runners.len();
            debug!(runner = %runner.id(), watch = ?runner.watch(), "runner instantiated");
            for watched in runner.watch() {
                let subscribers = self.subscribers.entry(watched.clone()).or_default();
                if !subscribers.contains(&index) {
                    subscribers.push(index);
                }
            }
            self.runners.push(runner);
        }
        Ok(())
    }

    /// Distributes `ticks` to the queues of the subscribed runners.
    ///
    /// The first tradable tick of a symbol instantiates every registered
    /// algorithm for it before being routed.
    pub fn route<I>(&mut self, ticks: I) -> Result<()>
    where
        I: IntoIterator<Item = Tick>,
    {
        for tick in ticks {
            if tick.tradable && !self.symbols.contains(&tick.symbol) {
                self.symbols.insert(tick.symbol.clone());
                self.instantiate(&tick.symbol)?;
            }

            if let Some(subscribers) = self.subscribers.get(&tick.symbol) {
                let tick = Arc::new(tick);
                for &index in subscribers {
                    self.runners[index].queue(Arc::clone(&tick));
                }
            }
        }
        Ok(())
    }

    /// Replays every queue and waits for all runners to finish.
    ///
    /// ### Returns
    /// The first strategy fault, in runner order, if any.
    #[cfg(feature = "parallel")]
    pub fn execute(&mut self, pool: &rayon::ThreadPool) -> Result<()> {
        use rayon::prelude::*;

        pool.install(|| {
            self.runners
                .par_iter_mut()
                .map(|runner| runner.replay())
                .collect::<Vec<_>>()
        })
        .into_iter()
        .collect()
    }

    /// Replays every queue, one runner after the other.
    #[cfg(not(feature = "parallel"))]
    pub fn execute(&mut self) -> Result<()> {
        self.runners.iter_mut().map(|runner| runner.replay()).collect::<Vec<_>>().into_iter().collect()
    }

    /// Runs the close sequence of every runner.
    pub fn close(&mut self) -> Result<()> {
        self.runners.iter_mut().try_for_each(|runner| runner.close())
    }

    /// Takes the fills of every runner, in instantiation order.
    pub fn drain_fills(&mut self) -> Vec<Fill> {
        self.runners.iter_mut().flat_map(|runner| runner.drain_fills()).collect()
    }
}
