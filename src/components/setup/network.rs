//! Assembly of embedding, backbone and head into a trainable network

use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, RunContext, TransformContext};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace};
use crate::dataset::DatasetProperties;
use crate::error::{AutoNetError, Result};
use crate::nn::{Network, OutputKind};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::debug;

/// Builds the [`Network`] from the specs collected in the run context.
/// Inference runs through the trainer step, so `transform` passes through.
#[derive(Debug, Clone, Default)]
pub struct NetworkComponent {
    num_parameters: Option<usize>,
}

impl NetworkComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_parameters(&self) -> Option<usize> {
        self.num_parameters
    }
}

impl Component for NetworkComponent {
    fn name(&self) -> &'static str {
        "NetworkComponent"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::Network
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("nn.Sequential", "torch.nn.Sequential")
    }

    fn get_hyperparameter_search_space(&self, _: &DatasetProperties, _: &ComponentUpdates) -> Result<ConfigurationSpace> {
        Ok(ConfigurationSpace::new())
    }

    fn set_hyperparameters(&mut self, _: &Configuration) -> Result<()> {
        Ok(())
    }

    fn fit(&mut self, context: &RunContext) -> Result<ContextUpdate> {
        let input_dim = context
            .train_matrix
            .as_ref()
            .map(|m| m.ncols())
            .ok_or_else(|| AutoNetError::configuration("network step needs the assembled feature matrix"))?;
        let output_kind = if context.dataset_properties.is_classification() {
            OutputKind::Softmax
        } else {
            OutputKind::Linear
        };
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(context.seed);
        let network = Network::build(
            input_dim,
            context.embedding.as_ref(),
            context.require_backbone()?,
            context.require_head()?,
            output_kind,
            &mut rng,
        )?;
        debug!(
            input_dim,
            output_dim = network.output_dim(),
            layers = network.layers().len(),
            parameters = network.num_parameters(),
            "built network"
        );
        self.num_parameters = Some(network.num_parameters());
        Ok(ContextUpdate {
            network: Some(network),
            ..ContextUpdate::none()
        })
    }

    fn transform(&self, context: TransformContext) -> Result<TransformContext> {
        if self.num_parameters.is_none() {
            return Err(AutoNetError::not_fitted(self.name()));
        }
        Ok(context)
    }

    fn is_fitted(&self) -> bool {
        self.num_parameters.is_some()
    }
}
