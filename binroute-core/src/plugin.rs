//! Registry for the assignment strategies the service can run.

use std::collections::HashMap;
use std::sync::Arc;

use crate::assignment::{AssignmentStrategy, CapacityAware, LoadBalanced, NearestVan, StrategyId};
use crate::ports::PortError;

/// Registry that resolves strategies by identifier.
pub struct StrategyRegistry {
    strategies: HashMap<StrategyId, Arc<dyn AssignmentStrategy>>,
}

impl StrategyRegistry {
    /// Build a registry from the provided strategy list.
    #[must_use]
    pub fn new(strategies: Vec<Arc<dyn AssignmentStrategy>>) -> Self {
        let strategies_map = strategies
            .into_iter()
            .map(|strategy| (strategy.id(), strategy))
            .collect();
        Self {
            strategies: strategies_map,
        }
    }

    /// Registry holding the built-in strategies.
    #[must_use]
    pub fn standard() -> Self {
        let nearest: Arc<dyn AssignmentStrategy> = Arc::new(NearestVan);
        let capacity: Arc<dyn AssignmentStrategy> = Arc::new(CapacityAware);
        let balanced: Arc<dyn AssignmentStrategy> = Arc::new(LoadBalanced);
        Self::new(vec![nearest, capacity, balanced])
    }

    /// Identifiers and descriptions of all registered strategies, sorted by id.
    #[must_use]
    pub fn strategies(&self) -> Vec<(StrategyId, &'static str)> {
        let mut listed: Vec<_> = self
            .strategies
            .values()
            .map(|strategy| (strategy.id(), strategy.describe()))
            .collect();
        listed.sort_by(|left, right| left.0.0.cmp(&right.0.0));
        listed
    }

    /// Look up a strategy by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::UnknownStrategy`] when nothing is registered under `id`.
    pub fn strategy(&self, id: &StrategyId) -> Result<Arc<dyn AssignmentStrategy>, PortError> {
        self.strategies
            .get(id)
            .map(Arc::clone)
            .ok_or_else(|| PortError::UnknownStrategy(id.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::Strategies;

    #[test]
    fn standard_registry_resolves_every_builtin() {
        let registry = StrategyRegistry::standard();
        for strategy in [Strategies::Nearest, Strategies::Capacity, Strategies::Balanced] {
            let id = StrategyId::from(strategy);
            let resolved = registry.strategy(&id).expect("builtin strategy registered");
            assert_eq!(resolved.id(), id);
        }
    }

    #[test]
    fn unknown_strategy_is_an_error() {
        let registry = StrategyRegistry::standard();
        let err = registry
            .strategy(&StrategyId("genetic".to_owned()))
            .err()
            .expect("not registered");
        assert!(matches!(err, PortError::UnknownStrategy(name) if name == "genetic"));
    }

    #[test]
    fn listing_is_sorted() {
        let listed: Vec<String> = StrategyRegistry::standard()
            .strategies()
            .into_iter()
            .map(|(id, _)| id.0)
            .collect();
        assert_eq!(listed, ["balanced", "capacity", "nearest"]);
    }
}
