//! Component contract shared by every pipeline stage

use super::context::{ContextUpdate, RunContext, TransformContext};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace};
use crate::dataset::{DatasetProperties, DatasetProperty};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Component category; one per pipeline step kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
    Imputer,
    Coalescer,
    Encoder,
    Scaler,
    FeaturePreprocessor,
    ColumnTransformer,
    EarlyPreprocessor,
    NetworkEmbedding,
    NetworkBackbone,
    NetworkHead,
    Network,
    NetworkInitializer,
    Optimizer,
    LrScheduler,
    DataLoader,
    Trainer,
}

impl ComponentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentCategory::Imputer => "imputer",
            ComponentCategory::Coalescer => "coalescer",
            ComponentCategory::Encoder => "encoder",
            ComponentCategory::Scaler => "scaler",
            ComponentCategory::FeaturePreprocessor => "feature_preprocessor",
            ComponentCategory::ColumnTransformer => "tabular_transformer",
            ComponentCategory::EarlyPreprocessor => "preprocessing",
            ComponentCategory::NetworkEmbedding => "network_embedding",
            ComponentCategory::NetworkBackbone => "network_backbone",
            ComponentCategory::NetworkHead => "network_head",
            ComponentCategory::Network => "network",
            ComponentCategory::NetworkInitializer => "network_init",
            ComponentCategory::Optimizer => "optimizer",
            ComponentCategory::LrScheduler => "lr_scheduler",
            ComponentCategory::DataLoader => "data_loader",
            ComponentCategory::Trainer => "trainer",
        }
    }

    /// Preferred defaults, most preferred first
    pub fn default_priority(&self) -> &'static [&'static str] {
        match self {
            ComponentCategory::Coalescer => &["NoCoalescer", "MinorityCoalescer"],
            ComponentCategory::Encoder => &["OneHotEncoder", "OrdinalEncoder", "NoEncoder"],
            ComponentCategory::Scaler => &["StandardScaler", "Normalizer", "MinMaxScaler", "NoScaler"],
            ComponentCategory::FeaturePreprocessor => &["NoFeaturePreprocessor", "PolynomialFeatures"],
            ComponentCategory::NetworkEmbedding => &["LearnedEntityEmbedding", "NoEmbedding"],
            ComponentCategory::NetworkBackbone => &["ShapedMLPBackbone", "MLPBackbone"],
            ComponentCategory::NetworkHead => &["FullyConnectedHead"],
            ComponentCategory::NetworkInitializer => &["XavierInit", "KaimingInit", "NoInit"],
            ComponentCategory::Optimizer => &["AdamOptimizer", "SGDOptimizer"],
            ComponentCategory::LrScheduler => &["CosineAnnealingLR", "StepLR", "ExponentialLR", "NoScheduler"],
            ComponentCategory::Trainer => &["StandardTrainer", "MixUpTrainer"],
            _ => &[],
        }
    }

    /// The pass-through component of categories that collapse on empty blocks
    pub fn noop_component(&self) -> Option<&'static str> {
        match self {
            ComponentCategory::Coalescer => Some("NoCoalescer"),
            ComponentCategory::Encoder => Some("NoEncoder"),
            ComponentCategory::NetworkEmbedding => Some("NoEmbedding"),
            ComponentCategory::Scaler => Some("NoScaler"),
            ComponentCategory::FeaturePreprocessor => Some("NoFeaturePreprocessor"),
            _ => None,
        }
    }

    /// Whether only the no-op component makes sense for this dataset:
    /// categorical-only categories on data without categorical columns,
    /// numerical-only ones on data without numerical columns
    pub fn collapses_to_noop(&self, dataset_properties: &DatasetProperties) -> bool {
        match self {
            ComponentCategory::Coalescer
            | ComponentCategory::Encoder
            | ComponentCategory::NetworkEmbedding => dataset_properties.has_no_categorical(),
            ComponentCategory::Scaler | ComponentCategory::FeaturePreprocessor => {
                dataset_properties.has_no_numerical()
            }
            _ => false,
        }
    }

    /// Dataset properties a choice of this category cannot be built without
    pub fn required_dataset_properties(&self) -> &'static [DatasetProperty] {
        match self {
            ComponentCategory::Imputer
            | ComponentCategory::Coalescer
            | ComponentCategory::Encoder
            | ComponentCategory::Scaler
            | ComponentCategory::FeaturePreprocessor
            | ComponentCategory::NetworkEmbedding => {
                &[DatasetProperty::NumericalColumns, DatasetProperty::CategoricalColumns]
            }
            ComponentCategory::NetworkHead => &[DatasetProperty::TaskType, DatasetProperty::OutputShape],
            ComponentCategory::Trainer => &[DatasetProperty::TaskType],
            _ => &[],
        }
    }
}

impl fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static metadata of a component
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentProperties {
    pub shortname: &'static str,
    pub name: &'static str,
    pub handles_classification: bool,
    pub handles_regression: bool,
    pub handles_sparse: bool,
    pub handles_missing_values: bool,
}

impl ComponentProperties {
    pub fn new(shortname: &'static str, name: &'static str) -> Self {
        Self {
            shortname,
            name,
            handles_classification: true,
            handles_regression: true,
            handles_sparse: false,
            handles_missing_values: false,
        }
    }

    pub fn classification_only(mut self) -> Self {
        self.handles_regression = false;
        self
    }

    pub fn handles_missing_values(mut self) -> Self {
        self.handles_missing_values = true;
        self
    }
}

/// A single pipeline stage.
///
/// Preprocessing components fit on the column blocks of the run context and
/// return the transformed blocks; setup components return the spec they
/// contribute; the trainer returns the trained network.
pub trait Component: fmt::Debug + Send + Sync {
    /// Registry key, unique within the category
    fn name(&self) -> &'static str;

    fn category(&self) -> ComponentCategory;

    fn properties(&self) -> ComponentProperties;

    /// Whether the component applies to this dataset at all
    fn is_compatible(&self, dataset_properties: &DatasetProperties) -> bool {
        let props = self.properties();
        match dataset_properties.target_type {
            Some(t) if t.is_classification() => props.handles_classification,
            Some(_) => props.handles_regression,
            None => true,
        }
    }

    /// This component's own sub-space; must be deterministic in its inputs
    fn get_hyperparameter_search_space(
        &self,
        dataset_properties: &DatasetProperties,
        updates: &ComponentUpdates,
    ) -> Result<ConfigurationSpace>;

    /// Bind the relevant subset of a sampled configuration
    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()>;

    fn fit(&mut self, context: &RunContext) -> Result<ContextUpdate>;

    fn transform(&self, context: TransformContext) -> Result<TransformContext> {
        Ok(context)
    }

    fn is_fitted(&self) -> bool;
}
