//! Network heads mapping backbone features to the task's outputs

use super::{layer_condition, resolve_count};
use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, RunContext};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace, HyperparameterSearchSpace};
use crate::dataset::DatasetProperties;
use crate::error::{AutoNetError, Result};
use crate::nn::{Activation, HeadSpec};

/// Fully connected head: `num_layers - 1` hidden layers followed by the
/// output layer sized from the dataset's output shape
#[derive(Debug, Clone)]
pub struct FullyConnectedHead {
    units: Vec<usize>,
    activation: Activation,
    spec: Option<HeadSpec>,
}

impl Default for FullyConnectedHead {
    fn default() -> Self {
        Self::new()
    }
}

impl FullyConnectedHead {
    pub fn new() -> Self {
        Self {
            units: vec![128],
            activation: Activation::ReLU,
            spec: None,
        }
    }

    pub fn head_spec(&self, output_dim: usize) -> HeadSpec {
        HeadSpec {
            hidden: self.units.clone(),
            activation: self.activation,
            output_dim,
        }
    }
}

impl Component for FullyConnectedHead {
    fn name(&self) -> &'static str {
        "FullyConnectedHead"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::NetworkHead
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("FullyConnectedHead", "FullyConnectedHead")
    }

    fn get_hyperparameter_search_space(
        &self,
        _dataset_properties: &DatasetProperties,
        updates: &ComponentUpdates,
    ) -> Result<ConfigurationSpace> {
        let mut space = ConfigurationSpace::new();
        let (num_layers, max_layers) =
            resolve_count(updates, HyperparameterSearchSpace::int("num_layers", 1, 4, 2, false))?;
        space.add_hyperparameter(num_layers.clone())?;
        space.add_hyperparameter(updates.hyperparameter(HyperparameterSearchSpace::choices(
            "activation",
            ["relu", "sigmoid", "tanh"],
            "relu",
        ))?)?;
        // layer i is hidden layer i; it exists once num_layers reaches i + 1
        for i in 1..max_layers {
            let units = format!("units_layer_{}", i);
            space.add_hyperparameter(
                updates.hyperparameter(HyperparameterSearchSpace::int(units.as_str(), 64, 512, 128, true))?,
            )?;
            if let Some(condition) = layer_condition(&units, &num_layers, i + 1) {
                space.add_condition(condition)?;
            }
        }
        Ok(space)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        let num_layers = configuration.int("num_layers")?;
        if num_layers < 1 {
            return Err(AutoNetError::configuration(format!("num_layers must be >= 1, got {}", num_layers)));
        }
        self.units = (1..num_layers)
            .map(|i| configuration.int(&format!("units_layer_{}", i)).map(|u| u.max(1) as usize))
            .collect::<Result<_>>()?;
        self.activation = Activation::from_name(configuration.string("activation")?)?;
        Ok(())
    }

    fn fit(&mut self, context: &RunContext) -> Result<ContextUpdate> {
        let spec = self.head_spec(context.dataset_properties.require_output_shape()?);
        self.spec = Some(spec.clone());
        Ok(ContextUpdate {
            head: Some(spec),
            ..ContextUpdate::none()
        })
    }

    fn is_fitted(&self) -> bool {
        self.spec.is_some()
    }
}
