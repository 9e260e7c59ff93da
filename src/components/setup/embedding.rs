//! Network embeddings for the categorical part of the feature matrix

use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, FeatureLayout, RunContext};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace, HyperparameterSearchSpace};
use crate::dataset::DatasetProperties;
use crate::error::{AutoNetError, Result};
use crate::nn::{EmbeddingGroup, EmbeddingSpec};

/// Identity embedding: every column passes straight through
#[derive(Debug, Clone, Default)]
pub struct NoEmbedding {
    spec: Option<EmbeddingSpec>,
}

impl NoEmbedding {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Component for NoEmbedding {
    fn name(&self) -> &'static str {
        "NoEmbedding"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::NetworkEmbedding
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("no embedding", "NoEmbedding")
    }

    fn get_hyperparameter_search_space(&self, _: &DatasetProperties, _: &ComponentUpdates) -> Result<ConfigurationSpace> {
        Ok(ConfigurationSpace::new())
    }

    fn set_hyperparameters(&mut self, _: &Configuration) -> Result<()> {
        Ok(())
    }

    fn fit(&mut self, context: &RunContext) -> Result<ContextUpdate> {
        let spec = EmbeddingSpec {
            groups: Vec::new(),
            passthrough: context.require_layout()?.width(),
        };
        self.spec = Some(spec.clone());
        Ok(ContextUpdate {
            embedding: Some(spec),
            ..ContextUpdate::none()
        })
    }

    fn is_fitted(&self) -> bool {
        self.spec.is_some()
    }
}

/// Learned entity embedding: each one-hot encoded categorical feature with
/// enough categories is projected to a smaller dense representation
#[derive(Debug, Clone)]
pub struct LearnedEntityEmbedding {
    dimension_reduction: f64,
    min_unique_values_for_embedding: usize,
    spec: Option<EmbeddingSpec>,
}

impl Default for LearnedEntityEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl LearnedEntityEmbedding {
    pub fn new() -> Self {
        Self {
            dimension_reduction: 0.5,
            min_unique_values_for_embedding: 5,
            spec: None,
        }
    }

    /// Embedding groups for a feature layout
    pub fn spec_for(&self, layout: &FeatureLayout) -> EmbeddingSpec {
        let groups = layout
            .categorical_widths
            .iter()
            .map(|&width| {
                let out_dim = if width >= self.min_unique_values_for_embedding {
                    ((width as f64 * self.dimension_reduction).round() as usize).max(1)
                } else {
                    width
                };
                EmbeddingGroup { width, out_dim }
            })
            .collect();
        EmbeddingSpec {
            groups,
            passthrough: layout.numerical,
        }
    }
}

impl Component for LearnedEntityEmbedding {
    fn name(&self) -> &'static str {
        "LearnedEntityEmbedding"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::NetworkEmbedding
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("embedding", "LearnedEntityEmbedding")
    }

    fn get_hyperparameter_search_space(
        &self,
        _dataset_properties: &DatasetProperties,
        updates: &ComponentUpdates,
    ) -> Result<ConfigurationSpace> {
        let mut space = ConfigurationSpace::new();
        space.add_hyperparameters([
            updates.hyperparameter(HyperparameterSearchSpace::float("dimension_reduction", 0.0, 1.0, 0.5, false))?,
            updates.hyperparameter(HyperparameterSearchSpace::int(
                "min_unique_values_for_embedding",
                3,
                7,
                5,
                false,
            ))?,
        ])?;
        Ok(space)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        let reduction = configuration.float("dimension_reduction")?;
        if !(0.0..=1.0).contains(&reduction) {
            return Err(AutoNetError::configuration(format!(
                "dimension_reduction must lie in [0, 1], got {}",
                reduction
            )));
        }
        self.dimension_reduction = reduction;
        self.min_unique_values_for_embedding = configuration.int("min_unique_values_for_embedding")?.max(1) as usize;
        Ok(())
    }

    fn fit(&mut self, context: &RunContext) -> Result<ContextUpdate> {
        let spec = self.spec_for(context.require_layout()?);
        self.spec = Some(spec.clone());
        Ok(ContextUpdate {
            embedding: Some(spec),
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

    #[test]
    fn test_only_wide_features_are_reduced() {
        let embedding = LearnedEntityEmbedding::new();
        let layout = FeatureLayout {
            categorical_widths: vec![2, 10],
            numerical: 3,
        };
        let spec = embedding.spec_for(&layout);
        assert_eq!(spec.groups[0], EmbeddingGroup { width: 2, out_dim: 2 });
        assert_eq!(spec.groups[1], EmbeddingGroup { width: 10, out_dim: 5 });
        assert_eq!(spec.input_dim(), 15);
        assert_eq!(spec.output_dim(), 10);
    }

    #[test]
    fn test_reduction_never_drops_a_feature() {
        let mut embedding = LearnedEntityEmbedding::new();
        let config = Configuration::new()
            .with("dimension_reduction", 0.0)
            .with("min_unique_values_for_embedding", 3i64);
        embedding.set_hyperparameters(&config).unwrap();
        let spec = embedding.spec_for(&FeatureLayout {
            categorical_widths: vec![4],
            numerical: 0,
        });
        assert_eq!(spec.groups[0].out_dim, 1);
    }
}
