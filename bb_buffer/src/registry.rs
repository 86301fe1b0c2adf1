//! Strategy registry.
//!
//! Maps strategy names to factory functions. Constructed by the caller and
//! passed by reference; there is no process-wide registry.

use crate::error::WorkerError;
use crate::strategies::PollingStrategy;
use crate::worker::WorkerStrategy;
use std::collections::BTreeMap;

/// Factory function type for creating strategy instances.
pub type StrategyFactory = fn() -> Box<dyn WorkerStrategy>;

/// Name of the strategy used when none is requested.
pub const DEFAULT_STRATEGY: &str = "spin";

/// Registry of available worker strategies.
pub struct StrategyRegistry {
    factories: BTreeMap<&'static str, StrategyFactory>,
}

impl StrategyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in strategies.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("spin", || Box::new(PollingStrategy::spin()));
        registry.register("yield", || Box::new(PollingStrategy::yielding()));
        registry
    }

    /// Register a strategy factory.
    ///
    /// # Panics
    /// Panics if a strategy with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: StrategyFactory) {
        if self.factories.contains_key(name) {
            panic!("Strategy '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Create a strategy instance by name.
    ///
    /// # Errors
    /// Returns `WorkerError::StrategyNotFound` if no strategy has that name.
    pub fn create(&self, name: &str) -> Result<Box<dyn WorkerStrategy>, WorkerError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| WorkerError::StrategyNotFound(name.to_string()))?;
        Ok(factory())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_strategies_present() {
        let registry = StrategyRegistry::with_builtin();
        assert_eq!(registry.names(), vec!["spin", "yield"]);
        assert_eq!(registry.create(DEFAULT_STRATEGY).unwrap().name(), "spin");
        assert_eq!(registry.create("yield").unwrap().name(), "yield");
    }

    #[test]
    fn unknown_strategy() {
        let registry = StrategyRegistry::new();
        assert!(matches!(
            registry.create("turbo"),
            Err(WorkerError::StrategyNotFound(name)) if name == "turbo"
        ));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut registry = StrategyRegistry::with_builtin();
        registry.register("spin", || Box::new(PollingStrategy::spin()));
    }
}
