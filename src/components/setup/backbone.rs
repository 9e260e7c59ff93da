//! Network backbones: the hidden layers between embedding and head

use super::{layer_condition, resolve_count};
use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, RunContext};
use crate::config_space::{
    ComponentUpdates, Condition, Configuration, ConfigurationSpace, HyperparameterSearchSpace, HyperparameterValue,
};
use crate::dataset::DatasetProperties;
use crate::error::{AutoNetError, Result};
use crate::nn::{Activation, BackboneSpec};

const ACTIVATIONS: [&str; 3] = ["relu", "sigmoid", "tanh"];

/// Adds `use_dropout`; true when dropout can actually be switched on
fn add_use_dropout(space: &mut ConfigurationSpace, updates: &ComponentUpdates) -> Result<bool> {
    let use_dropout = updates.hyperparameter(HyperparameterSearchSpace::choices("use_dropout", [false, true], false))?;
    let can_drop = use_dropout.contains(&HyperparameterValue::Bool(true));
    space.add_hyperparameter(use_dropout)?;
    Ok(can_drop)
}

fn check_dropout(name: &str, value: f64) -> Result<f64> {
    if !(0.0..1.0).contains(&value) {
        return Err(AutoNetError::configuration(format!("{} must lie in [0, 1), got {}", name, value)));
    }
    Ok(value)
}

/// Plain MLP: `num_groups` layers, each with its own width and dropout
#[derive(Debug, Clone)]
pub struct MLPBackbone {
    units: Vec<usize>,
    activation: Activation,
    dropout: Vec<f64>,
    spec: Option<BackboneSpec>,
}

impl Default for MLPBackbone {
    fn default() -> Self {
        Self::new()
    }
}

impl MLPBackbone {
    pub fn new() -> Self {
        Self {
            units: vec![64; 3],
            activation: Activation::ReLU,
            dropout: Vec::new(),
            spec: None,
        }
    }

    pub fn backbone_spec(&self) -> BackboneSpec {
        BackboneSpec {
            hidden: self.units.clone(),
            activation: self.activation,
            dropout: self.dropout.clone(),
        }
    }
}

impl Component for MLPBackbone {
    fn name(&self) -> &'static str {
        "MLPBackbone"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::NetworkBackbone
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("MLPBackbone", "MLPBackbone")
    }

    fn get_hyperparameter_search_space(
        &self,
        _dataset_properties: &DatasetProperties,
        updates: &ComponentUpdates,
    ) -> Result<ConfigurationSpace> {
        let mut space = ConfigurationSpace::new();
        let (num_groups, max_groups) = resolve_count(updates, HyperparameterSearchSpace::int("num_groups", 1, 8, 3, false))?;
        space.add_hyperparameter(num_groups.clone())?;
        space.add_hyperparameter(
            updates.hyperparameter(HyperparameterSearchSpace::choices("activation", ACTIVATIONS, "relu"))?,
        )?;
        let can_drop = add_use_dropout(&mut space, updates)?;

        for i in 1..=max_groups {
            let units = format!("num_units_{}", i);
            space.add_hyperparameter(
                updates.hyperparameter(HyperparameterSearchSpace::int(units.as_str(), 16, 512, 64, true))?,
            )?;
            if let Some(condition) = layer_condition(&units, &num_groups, i) {
                space.add_condition(condition)?;
            }
            if can_drop {
                let dropout = format!("dropout_{}", i);
                space.add_hyperparameter(
                    updates.hyperparameter(HyperparameterSearchSpace::float(dropout.as_str(), 0.0, 0.8, 0.5, false))?,
                )?;
                space.add_condition(Condition::equals(dropout.as_str(), "use_dropout", true))?;
                if let Some(condition) = layer_condition(&dropout, &num_groups, i) {
                    space.add_condition(condition)?;
                }
            }
        }
        Ok(space)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        let num_groups = configuration.int("num_groups")?;
        if num_groups < 1 {
            return Err(AutoNetError::configuration(format!("num_groups must be >= 1, got {}", num_groups)));
        }
        self.units = (1..=num_groups)
            .map(|i| configuration.int(&format!("num_units_{}", i)).map(|u| u.max(1) as usize))
            .collect::<Result<_>>()?;
        self.activation = Activation::from_name(configuration.string("activation")?)?;
        self.dropout = if configuration.bool("use_dropout")? {
            (1..=num_groups)
                .map(|i| {
                    let name = format!("dropout_{}", i);
                    check_dropout(&name, configuration.float(&name)?)
                })
                .collect::<Result<_>>()?
        } else {
            Vec::new()
        };
        Ok(())
    }

    fn fit(&mut self, _context: &RunContext) -> Result<ContextUpdate> {
        let spec = self.backbone_spec();
        self.spec = Some(spec.clone());
        Ok(ContextUpdate {
            backbone: Some(spec),
            ..ContextUpdate::none()
        })
    }

    fn is_fitted(&self) -> bool {
        self.spec.is_some()
    }
}

/// Layer-width profile of a [`ShapedMLPBackbone`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MlpShape {
    Funnel,
    LongFunnel,
    Diamond,
    Triangle,
    Brick,
}

impl MlpShape {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "funnel" => Ok(Self::Funnel),
            "long_funnel" => Ok(Self::LongFunnel),
            "diamond" => Ok(Self::Diamond),
            "triangle" => Ok(Self::Triangle),
            "brick" => Ok(Self::Brick),
            other => Err(AutoNetError::configuration(format!("unknown mlp shape '{}'", other))),
        }
    }

    /// Widths of `layers` hidden layers; the narrowest layer is a quarter
    /// of `max_units`
    pub fn units(&self, layers: usize, max_units: usize) -> Vec<usize> {
        let max = max_units.max(1) as f64;
        let min = (max / 4.0).max(1.0);
        let ramp = |i: usize, n: usize| -> f64 {
            if n <= 1 {
                0.0
            } else {
                i as f64 / (n - 1) as f64
            }
        };
        (0..layers)
            .map(|i| {
                let width = match self {
                    MlpShape::Brick => max,
                    MlpShape::Funnel => max - (max - min) * ramp(i, layers),
                    MlpShape::Triangle => min + (max - min) * ramp(i, layers),
                    MlpShape::LongFunnel => {
                        let flat = layers / 2;
                        if i < flat {
                            max
                        } else {
                            max - (max - min) * ramp(i - flat, layers - flat)
                        }
                    }
                    MlpShape::Diamond => {
                        let peak = layers / 2;
                        if i <= peak {
                            min + (max - min) * ramp(i, peak + 1)
                        } else {
                            max - (max - min) * ramp(i - peak, layers - peak)
                        }
                    }
                };
                width.round().max(1.0) as usize
            })
            .collect()
    }
}

/// MLP whose layer widths follow a named shape; dropout scales with width
#[derive(Debug, Clone)]
pub struct ShapedMLPBackbone {
    num_groups: usize,
    max_units: usize,
    shape: MlpShape,
    activation: Activation,
    max_dropout: Option<f64>,
    spec: Option<BackboneSpec>,
}

impl Default for ShapedMLPBackbone {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapedMLPBackbone {
    pub fn new() -> Self {
        Self {
            num_groups: 3,
            max_units: 200,
            shape: MlpShape::Funnel,
            activation: Activation::ReLU,
            max_dropout: None,
            spec: None,
        }
    }

    pub fn backbone_spec(&self) -> BackboneSpec {
        let hidden = self.shape.units(self.num_groups, self.max_units);
        let dropout = match self.max_dropout {
            Some(p) => hidden
                .iter()
                .map(|&u| p * u as f64 / self.max_units.max(1) as f64)
                .collect(),
            None => Vec::new(),
        };
        BackboneSpec {
            hidden,
            activation: self.activation,
            dropout,
        }
    }
}

impl Component for ShapedMLPBackbone {
    fn name(&self) -> &'static str {
        "ShapedMLPBackbone"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::NetworkBackbone
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("ShapedMLPBackbone", "ShapedMLPBackbone")
    }

    fn get_hyperparameter_search_space(
        &self,
        _dataset_properties: &DatasetProperties,
        updates: &ComponentUpdates,
    ) -> Result<ConfigurationSpace> {
        let mut space = ConfigurationSpace::new();
        space.add_hyperparameters([
            updates.hyperparameter(HyperparameterSearchSpace::int("num_groups", 1, 8, 3, false))?,
            updates.hyperparameter(HyperparameterSearchSpace::int("max_units", 16, 512, 200, true))?,
            updates.hyperparameter(HyperparameterSearchSpace::choices(
                "mlp_shape",
                ["funnel", "long_funnel", "diamond", "triangle", "brick"],
                "funnel",
            ))?,
            updates.hyperparameter(HyperparameterSearchSpace::choices("activation", ACTIVATIONS, "relu"))?,
        ])?;
        if add_use_dropout(&mut space, updates)? {
            space.add_hyperparameter(
                updates.hyperparameter(HyperparameterSearchSpace::float("max_dropout", 0.0, 0.8, 0.5, false))?,
            )?;
            space.add_condition(Condition::equals("max_dropout", "use_dropout", true))?;
        }
        Ok(space)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        let num_groups = configuration.int("num_groups")?;
        if num_groups < 1 {
            return Err(AutoNetError::configuration(format!("num_groups must be >= 1, got {}", num_groups)));
        }
        self.num_groups = num_groups as usize;
        self.max_units = configuration.int("max_units")?.max(1) as usize;
        self.shape = MlpShape::from_name(configuration.string("mlp_shape")?)?;
        self.activation = Activation::from_name(configuration.string("activation")?)?;
        self.max_dropout = if configuration.bool("use_dropout")? {
            Some(check_dropout("max_dropout", configuration.float("max_dropout")?)?)
        } else {
            None
        };
        Ok(())
    }

    fn fit(&mut self, _context: &RunContext) -> Result<ContextUpdate> {
        let spec = self.backbone_spec();
        self.spec = Some(spec.clone());
        Ok(ContextUpdate {
            backbone: Some(spec),
            ..ContextUpdate::none()
        })
    }

    fn is_fitted(&self) -> bool {
        self.spec.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_units_follow_num_groups() {
        let backbone = MLPBackbone::new();
        let space = backbone
            .get_hyperparameter_search_space(&DatasetProperties::new(), &ComponentUpdates::new())
            .unwrap();
        let mut config = space.get_default_configuration();
        assert!(config.contains("num_units_3"));
        assert!(!config.contains("num_units_4"));
        assert!(!config.contains("dropout_1"));

        config.insert("num_groups", 2i64);
        let mut backbone = MLPBackbone::new();
        backbone.set_hyperparameters(&config).unwrap();
        assert_eq!(backbone.backbone_spec().hidden, vec![64, 64]);
    }

    #[test]
    fn test_sampled_configurations_bind() {
        let backbone = MLPBackbone::new();
        let space = backbone
            .get_hyperparameter_search_space(&DatasetProperties::new(), &ComponentUpdates::new())
            .unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        for config in space.sample_configurations(&mut rng, 20).unwrap() {
            let mut b = MLPBackbone::new();
            b.set_hyperparameters(&config).unwrap();
            let spec = b.backbone_spec();
            assert_eq!(spec.hidden.len() as i64, config.int("num_groups").unwrap());
            assert!(spec.dropout.is_empty() || spec.dropout.len() == spec.hidden.len());
        }
    }

    #[test]
    fn test_fixed_dropout_off_removes_dropout_hyperparameters() {
        let mut updates = ComponentUpdates::new();
        updates.insert(HyperparameterSearchSpace::choices("use_dropout", [false], false));
        let space = MLPBackbone::new()
            .get_hyperparameter_search_space(&DatasetProperties::new(), &updates)
            .unwrap();
        assert!(!space.contains("dropout_1"));
    }

    #[test]
    fn test_shapes() {
        assert_eq!(MlpShape::Brick.units(3, 100), vec![100, 100, 100]);
        assert_eq!(MlpShape::Funnel.units(3, 100), vec![100, 63, 25]);
        assert_eq!(MlpShape::Triangle.units(2, 100), vec![25, 100]);
        assert_eq!(MlpShape::Funnel.units(1, 100), vec![100]);
        let diamond = MlpShape::Diamond.units(5, 100);
        assert_eq!(diamond.iter().max(), Some(&100));
        assert_eq!(diamond[0], 25);
    }

    #[test]
    fn test_shaped_dropout_scales_with_width() {
        let mut backbone = ShapedMLPBackbone::new();
        let config = Configuration::new()
            .with("num_groups", 2i64)
            .with("max_units", 100i64)
            .with("mlp_shape", "triangle")
            .with("activation", "tanh")
            .with("use_dropout", true)
            .with("max_dropout", 0.4);
        backbone.set_hyperparameters(&config).unwrap();
        let spec = backbone.backbone_spec();
        assert_eq!(spec.hidden, vec![25, 100]);
        assert!((spec.dropout[0] - 0.1).abs() < 1e-12);
        assert!((spec.dropout[1] - 0.4).abs() < 1e-12);
        assert_eq!(spec.activation, Activation::Tanh);
    }
}
