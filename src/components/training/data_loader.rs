//! Mini-batch loader settings

use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, LoaderSpec, RunContext};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace, HyperparameterSearchSpace};
use crate::dataset::DatasetProperties;
use crate::error::{AutoNetError, Result};

/// Serves shuffled mini-batches of the feature matrix to the trainer
#[derive(Debug, Clone)]
pub struct FeatureDataLoader {
    batch_size: usize,
    is_fitted: bool,
}

impl Default for FeatureDataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureDataLoader {
    pub fn new() -> Self {
        Self {
            batch_size: 64,
            is_fitted: false,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Component for FeatureDataLoader {
    fn name(&self) -> &'static str {
        "FeatureDataLoader"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::DataLoader
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("FeatureDataLoader", "Feature Data Loader")
    }

    fn get_hyperparameter_search_space(
        &self,
        _dataset_properties: &DatasetProperties,
        updates: &ComponentUpdates,
    ) -> Result<ConfigurationSpace> {
        let mut space = ConfigurationSpace::new();
        space.add_hyperparameter(
            updates.hyperparameter(HyperparameterSearchSpace::int("batch_size", 16, 512, 64, true))?,
        )?;
        Ok(space)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        let batch_size = configuration.int("batch_size")?;
        if batch_size < 1 {
            return Err(AutoNetError::configuration(format!("batch_size must be >= 1, got {}", batch_size)));
        }
        self.batch_size = batch_size as usize;
        Ok(())
    }

    fn fit(&mut self, _context: &RunContext) -> Result<ContextUpdate> {
        self.is_fitted = true;
        Ok(ContextUpdate {
            data_loader: Some(LoaderSpec {
                batch_size: self.batch_size,
            }),
            ..ContextUpdate::none()
        })
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}
