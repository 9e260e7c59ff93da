//! Assembly of the column blocks into the network's feature matrix

use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, FeatureLayout, RunContext, TransformContext};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace};
use crate::dataset::DatasetProperties;
use crate::error::{AutoNetError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Concatenates `[categorical | numerical]` and records the resulting layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TabularColumnTransformer {
    layout: Option<FeatureLayout>,
}

impl TabularColumnTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(&self) -> Option<&FeatureLayout> {
        self.layout.as_ref()
    }
}

impl Component for TabularColumnTransformer {
    fn name(&self) -> &'static str {
        "TabularColumnTransformer"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::ColumnTransformer
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("TabularColumnTransformer", "Tabular Column Transformer")
    }

    fn get_hyperparameter_search_space(&self, _: &DatasetProperties, _: &ComponentUpdates) -> Result<ConfigurationSpace> {
        Ok(ConfigurationSpace::new())
    }

    fn set_hyperparameters(&mut self, _: &Configuration) -> Result<()> {
        Ok(())
    }

    fn fit(&mut self, context: &RunContext) -> Result<ContextUpdate> {
        let blocks = &context.train_blocks;
        let layout = FeatureLayout {
            categorical_widths: blocks.categorical_widths.clone(),
            numerical: blocks.numerical.ncols(),
        };
        if layout.categorical_widths.iter().sum::<usize>() != blocks.categorical.ncols() {
            return Err(AutoNetError::Shape {
                expected: format!("categorical widths summing to {}", blocks.categorical.ncols()),
                actual: format!("{:?}", layout.categorical_widths),
            });
        }
        let train_matrix = blocks.concat()?;
        let valid_matrix = context.valid_blocks.as_ref().map(|b| b.concat()).transpose()?;
        debug!(
            width = layout.width(),
            categorical = layout.categorical_widths.len(),
            numerical = layout.numerical,
            "assembled feature matrix"
        );
        self.layout = Some(layout.clone());
        Ok(ContextUpdate {
            layout: Some(layout),
            train_matrix: Some(train_matrix),
            valid_matrix,
            ..ContextUpdate::none()
        })
    }

    fn transform(&self, mut context: TransformContext) -> Result<TransformContext> {
        let layout = self.layout.as_ref().ok_or_else(|| AutoNetError::not_fitted(self.name()))?;
        let blocks = context.take_blocks()?;
        let matrix = blocks.concat()?;
        if matrix.ncols() != layout.width() {
            return Err(AutoNetError::Shape {
                expected: format!("{} feature columns", layout.width()),
                actual: matrix.ncols().to_string(),
            });
        }
        context.matrix = Some(matrix);
        Ok(context)
    }

    fn is_fitted(&self) -> bool {
        self.layout.is_some()
    }
}
