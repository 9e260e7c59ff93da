//! Weight initialisers

use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, RunContext};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace, HyperparameterSearchSpace};
use crate::dataset::DatasetProperties;
use crate::error::{AutoNetError, Result};
use crate::nn::{BiasInit, WeightInit};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

fn bias_space(updates: &ComponentUpdates) -> Result<ConfigurationSpace> {
    let mut space = ConfigurationSpace::new();
    space.add_hyperparameter(updates.hyperparameter(HyperparameterSearchSpace::choices(
        "bias_strategy",
        ["Zero", "Normal"],
        "Zero",
    ))?)?;
    Ok(space)
}

fn bias_from(configuration: &Configuration) -> Result<BiasInit> {
    match configuration.string("bias_strategy")? {
        "Zero" => Ok(BiasInit::Zero),
        "Normal" => Ok(BiasInit::Normal),
        other => Err(AutoNetError::configuration(format!("unknown bias strategy '{}'", other))),
    }
}

/// Re-draw the context's network with `scheme`; the seed is offset so the
/// draw differs from the one made at build time
fn reinitialize(context: &RunContext, scheme: WeightInit, bias: BiasInit) -> Result<ContextUpdate> {
    let mut network = context.require_network()?.clone();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(context.seed.wrapping_add(1));
    network.initialize(scheme, bias, &mut rng);
    Ok(ContextUpdate {
        network: Some(network),
        ..ContextUpdate::none()
    })
}

macro_rules! initializer {
    ($ty:ident, $doc:expr, $scheme:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $ty {
            bias: BiasInit,
            is_fitted: bool,
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $ty {
            pub fn new() -> Self {
                Self {
                    bias: BiasInit::Zero,
                    is_fitted: false,
                }
            }
        }

        impl Component for $ty {
            fn name(&self) -> &'static str {
                stringify!($ty)
            }

            fn category(&self) -> ComponentCategory {
                ComponentCategory::NetworkInitializer
            }

            fn properties(&self) -> ComponentProperties {
                ComponentProperties::new(stringify!($ty), stringify!($ty))
            }

            fn get_hyperparameter_search_space(
                &self,
                _dataset_properties: &DatasetProperties,
                updates: &ComponentUpdates,
            ) -> Result<ConfigurationSpace> {
                bias_space(updates)
            }

            fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
                self.bias = bias_from(configuration)?;
                Ok(())
            }

            fn fit(&mut self, context: &RunContext) -> Result<ContextUpdate> {
                let update = reinitialize(context, $scheme, self.bias)?;
                self.is_fitted = true;
                Ok(update)
            }

            fn is_fitted(&self) -> bool {
                self.is_fitted
            }
        }
    };
}

initializer!(XavierInit, "Uniform Glorot initialisation", WeightInit::XavierUniform);
initializer!(KaimingInit, "Normal He initialisation, suited to ReLU networks", WeightInit::KaimingNormal);

/// Keeps the weights the network was built with
#[derive(Debug, Clone, Default)]
pub struct NoInit {
    is_fitted: bool,
}

impl NoInit {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Component for NoInit {
    fn name(&self) -> &'static str {
        "NoInit"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::NetworkInitializer
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("NoInit", "No initialisation")
    }

    fn get_hyperparameter_search_space(&self, _: &DatasetProperties, _: &ComponentUpdates) -> Result<ConfigurationSpace> {
        Ok(ConfigurationSpace::new())
    }

    fn set_hyperparameters(&mut self, _: &Configuration) -> Result<()> {
        Ok(())
    }

    fn fit(&mut self, context: &RunContext) -> Result<ContextUpdate> {
        context.require_network()?;
        self.is_fitted = true;
        Ok(ContextUpdate::none())
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}
