//! Pluggable trading algorithms.
//!
//! An algorithm implements [`Strategy`] and is registered by name in a
//! [`StrategyRegistry`]. The scheduler asks the registry for a fresh instance
//! for every symbol it discovers, so each instance only ever sees one
//! [`Book`].

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::engine::{Book, Tick};
use crate::errors::{Error, Result};

/// Lifecycle callbacks of a trading algorithm.
///
/// Every callback receives the runner's book. Returning an error aborts the
/// whole backtest.
pub trait Strategy: Send {
    /// Binds the instance to `symbol` and returns the symbols whose ticks it
    /// wants to receive. An empty list disables the instance.
    fn setup(&mut self, symbol: &str, book: &mut Book) -> Result<Vec<String>>;

    /// Called for every subscribed tick, after pending orders were resolved
    /// against it.
    fn on_tick(&mut self, _tick: &Tick, _book: &mut Book) -> Result<()> {
        Ok(())
    }

    /// Called at most once per second of simulated time, before the first
    /// tick of that second.
    fn on_periodic(&mut self, _now: DateTime<Utc>, _book: &mut Book) -> Result<()> {
        Ok(())
    }

    /// Called when the runner closes, before the last order resolution.
    fn on_close(&mut self, _book: &mut Book) -> Result<()> {
        Ok(())
    }
}

type Factory = Arc<dyn Fn() -> Box<dyn Strategy> + Send + Sync>;

/// Named constructors of strategies, kept in registration order.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    entries: Vec<(Arc<str>, Factory)>,
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry").field("names", &self.names().collect::<Vec<_>>()).finish()
    }
}

impl StrategyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`.
    ///
    /// ### Returns
    /// An error if the name is already taken.
    pub fn register<F, S>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Strategy + 'static,
    {
        let name = name.into();
        if self.entries.iter().any(|(n, _)| n.as_ref() == name) {
            return Err(Error::DuplicateAlgo(name));
        }
        let factory: Factory = Arc::new(move || Box::new(factory()) as Box<dyn Strategy>);
        self.entries.push((Arc::from(name), factory));
        Ok(())
    }

    /// Registers a strategy built with [`Default`].
    pub fn register_default<S>(&mut self, name: impl Into<String>) -> Result<()>
    where
        S: Strategy + Default + 'static,
    {
        self.register(name, S::default)
    }

    /// Returns the registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_ref())
    }

    /// Returns the number of registered algorithms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds one instance of every registered algorithm.
    pub(crate) fn instantiate(&self) -> impl Iterator<Item = (Arc<str>, Box<dyn Strategy>)> + '_ {
        self.entries.iter().map(|(name, factory)| (Arc::clone(name), factory()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Idle;

    impl Strategy for Idle {
        fn setup(&mut self, symbol: &str, _book: &mut Book) -> Result<Vec<String>> {
            Ok(vec![symbol.to_string()])
        }
    }

    #[test]
    fn register_keeps_order() {
        let mut registry = StrategyRegistry::new();
        registry.register_default::<Idle>("b").unwrap();
        registry.register("a", || Idle).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut registry = StrategyRegistry::new();
        registry.register_default::<Idle>("idle").unwrap();
        let result = registry.register_default::<Idle>("idle");
        assert!(matches!(result, Err(Error::DuplicateAlgo(name)) if name == "idle"));
    }

    #[test]
    fn instantiate_builds_fresh_instances() {
        let mut registry = StrategyRegistry::new();
        registry.register_default::<Idle>("idle").unwrap();
        let mut book = Book::default();
        for (name, mut strategy) in registry.instantiate() {
            assert_eq!(name.as_ref(), "idle");
            assert_eq!(strategy.setup("ACME", &mut book).unwrap(), vec!["ACME".to_string()]);
        }
    }
}
