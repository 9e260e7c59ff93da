//! Optimizer choices

use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, RunContext};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace, HyperparameterSearchSpace};
use crate::dataset::DatasetProperties;
use crate::error::Result;
use crate::nn::OptimizerSpec;

fn emit(spec: OptimizerSpec) -> ContextUpdate {
    ContextUpdate {
        optimizer: Some(spec),
        ..ContextUpdate::none()
    }
}

/// Adam with decoupled-from-loss L2 weight decay
#[derive(Debug, Clone)]
pub struct AdamOptimizer {
    spec: OptimizerSpec,
    is_fitted: bool,
}

impl Default for AdamOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl AdamOptimizer {
    pub fn new() -> Self {
        Self {
            spec: OptimizerSpec::Adam {
                lr: 1e-2,
                beta1: 0.9,
                beta2: 0.9,
                weight_decay: 0.0,
            },
            is_fitted: false,
        }
    }
}

impl Component for AdamOptimizer {
    fn name(&self) -> &'static str {
        "AdamOptimizer"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::Optimizer
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("AdamOptimizer", "Adaptive Momentum Optimizer")
    }

    fn get_hyperparameter_search_space(
        &self,
        _dataset_properties: &DatasetProperties,
        updates: &ComponentUpdates,
    ) -> Result<ConfigurationSpace> {
        let mut space = ConfigurationSpace::new();
        space.add_hyperparameters([
            updates.hyperparameter(HyperparameterSearchSpace::float("lr", 1e-5, 1e-1, 1e-2, true))?,
            updates.hyperparameter(HyperparameterSearchSpace::float("beta1", 0.85, 0.999, 0.9, false))?,
            updates.hyperparameter(HyperparameterSearchSpace::float("beta2", 0.9, 0.9999, 0.9, false))?,
            updates.hyperparameter(HyperparameterSearchSpace::float("weight_decay", 0.0, 0.1, 0.0, false))?,
        ])?;
        Ok(space)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        self.spec = OptimizerSpec::Adam {
            lr: configuration.float("lr")?,
            beta1: configuration.float("beta1")?,
            beta2: configuration.float("beta2")?,
            weight_decay: configuration.float("weight_decay")?,
        };
        Ok(())
    }

    fn fit(&mut self, _context: &RunContext) -> Result<ContextUpdate> {
        self.is_fitted = true;
        Ok(emit(self.spec))
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

/// Stochastic gradient descent with momentum
#[derive(Debug, Clone)]
pub struct SGDOptimizer {
    spec: OptimizerSpec,
    is_fitted: bool,
}

impl Default for SGDOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SGDOptimizer {
    pub fn new() -> Self {
        Self {
            spec: OptimizerSpec::Sgd {
                lr: 1e-2,
                momentum: 0.0,
                weight_decay: 0.0,
            },
            is_fitted: false,
        }
    }
}

impl Component for SGDOptimizer {
    fn name(&self) -> &'static str {
        "SGDOptimizer"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::Optimizer
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("SGDOptimizer", "Stochastic gradient descent (optionally with momentum)")
    }

    fn get_hyperparameter_search_space(
        &self,
        _dataset_properties: &DatasetProperties,
        updates: &ComponentUpdates,
    ) -> Result<ConfigurationSpace> {
        let mut space = ConfigurationSpace::new();
        space.add_hyperparameters([
            updates.hyperparameter(HyperparameterSearchSpace::float("lr", 1e-5, 1e-1, 1e-2, true))?,
            updates.hyperparameter(HyperparameterSearchSpace::float("momentum", 0.0, 0.99, 0.0, false))?,
            updates.hyperparameter(HyperparameterSearchSpace::float("weight_decay", 0.0, 0.1, 0.0, false))?,
        ])?;
        Ok(space)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        self.spec = OptimizerSpec::Sgd {
            lr: configuration.float("lr")?,
            momentum: configuration.float("momentum")?,
            weight_decay: configuration.float("weight_decay")?,
        };
        Ok(())
    }

    fn fit(&mut self, _context: &RunContext) -> Result<ContextUpdate> {
        self.is_fitted = true;
        Ok(emit(self.spec))
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adam_binds_configuration() {
        let adam = AdamOptimizer::new();
        let space = adam
            .get_hyperparameter_search_space(&DatasetProperties::new(), &ComponentUpdates::new())
            .unwrap();
        let mut config = space.get_default_configuration();
        config.insert("lr", 0.001);
        let mut adam = AdamOptimizer::new();
        adam.set_hyperparameters(&config).unwrap();
        assert_eq!(adam.spec.learning_rate(), 0.001);
    }
}
