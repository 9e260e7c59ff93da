//! Learning-rate scheduler choices

use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, RunContext};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace, HyperparameterSearchSpace};
use crate::dataset::DatasetProperties;
use crate::error::{AutoNetError, Result};
use crate::nn::LrSchedule;

/// Implements [`Component`] for a scheduler holding a `schedule` field
macro_rules! scheduler_component {
    ($ty:ident, $long:expr, |$updates:ident| $space:block, |$config:ident| $bind:block) => {
        impl Component for $ty {
            fn name(&self) -> &'static str {
                stringify!($ty)
            }

            fn category(&self) -> ComponentCategory {
                ComponentCategory::LrScheduler
            }

            fn properties(&self) -> ComponentProperties {
                ComponentProperties::new(stringify!($ty), $long)
            }

            fn get_hyperparameter_search_space(
                &self,
                _dataset_properties: &DatasetProperties,
                $updates: &ComponentUpdates,
            ) -> Result<ConfigurationSpace> {
                $space
            }

            fn set_hyperparameters(&mut self, $config: &Configuration) -> Result<()> {
                self.schedule = $bind;
                Ok(())
            }

            fn fit(&mut self, _context: &RunContext) -> Result<ContextUpdate> {
                self.is_fitted = true;
                Ok(ContextUpdate {
                    lr_scheduler: Some(self.schedule),
                    ..ContextUpdate::none()
                })
            }

            fn is_fitted(&self) -> bool {
                self.is_fitted
            }
        }
    };
}

fn positive_int(configuration: &Configuration, name: &str) -> Result<usize> {
    let value = configuration.int(name)?;
    if value < 1 {
        return Err(AutoNetError::configuration(format!("{} must be >= 1, got {}", name, value)));
    }
    Ok(value as usize)
}

/// Constant learning rate
#[derive(Debug, Clone)]
pub struct NoScheduler {
    schedule: LrSchedule,
    is_fitted: bool,
}

impl Default for NoScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl NoScheduler {
    pub fn new() -> Self {
        Self {
            schedule: LrSchedule::Constant,
            is_fitted: false,
        }
    }
}

scheduler_component!(
    NoScheduler,
    "No LR Scheduling",
    |_updates| { Ok(ConfigurationSpace::new()) },
    |_config| { LrSchedule::Constant }
);

/// Decays the learning rate by `gamma` every `step_size` epochs
#[derive(Debug, Clone)]
pub struct StepLR {
    schedule: LrSchedule,
    is_fitted: bool,
}

impl Default for StepLR {
    fn default() -> Self {
        Self::new()
    }
}

impl StepLR {
    pub fn new() -> Self {
        Self {
            schedule: LrSchedule::Step { step_size: 5, gamma: 0.1 },
            is_fitted: false,
        }
    }
}

scheduler_component!(
    StepLR,
    "StepLR",
    |updates| {
        let mut space = ConfigurationSpace::new();
        space.add_hyperparameters([
            updates.hyperparameter(HyperparameterSearchSpace::int("step_size", 1, 10, 5, false))?,
            updates.hyperparameter(HyperparameterSearchSpace::float("gamma", 0.001, 0.9, 0.1, false))?,
        ])?;
        Ok(space)
    },
    |config| {
        LrSchedule::Step {
            step_size: positive_int(config, "step_size")?,
            gamma: config.float("gamma")?,
        }
    }
);

/// Cosine annealing towards zero over `T_max` epochs
#[derive(Debug, Clone)]
pub struct CosineAnnealingLR {
    schedule: LrSchedule,
    is_fitted: bool,
}

impl Default for CosineAnnealingLR {
    fn default() -> Self {
        Self::new()
    }
}

impl CosineAnnealingLR {
    pub fn new() -> Self {
        Self {
            schedule: LrSchedule::CosineAnnealing { t_max: 200, eta_min: 0.0 },
            is_fitted: false,
        }
    }
}

scheduler_component!(
    CosineAnnealingLR,
    "Cosine Annealing",
    |updates| {
        let mut space = ConfigurationSpace::new();
        space.add_hyperparameter(updates.hyperparameter(HyperparameterSearchSpace::int("T_max", 10, 500, 200, false))?)?;
        Ok(space)
    },
    |config| {
        LrSchedule::CosineAnnealing {
            t_max: positive_int(config, "T_max")?,
            eta_min: 0.0,
        }
    }
);

/// Multiplies the learning rate by `gamma` every epoch
#[derive(Debug, Clone)]
pub struct ExponentialLR {
    schedule: LrSchedule,
    is_fitted: bool,
}

impl Default for ExponentialLR {
    fn default() -> Self {
        Self::new()
    }
}

impl ExponentialLR {
    pub fn new() -> Self {
        Self {
            schedule: LrSchedule::Exponential { gamma: 0.9 },
            is_fitted: false,
        }
    }
}

scheduler_component!(
    ExponentialLR,
    "Exponential Learning Rate Scheduler",
    |updates| {
        let mut space = ConfigurationSpace::new();
        space.add_hyperparameter(updates.hyperparameter(HyperparameterSearchSpace::float(
            "gamma", 0.7, 0.9999, 0.9, false,
        ))?)?;
        Ok(space)
    },
    |config| { LrSchedule::Exponential { gamma: config.float("gamma")? } }
);
