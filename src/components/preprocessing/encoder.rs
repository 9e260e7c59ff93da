//! Categorical encoders

use super::{distinct_values, fit_on_context, transform_context, BlockTransform};
use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, RunContext, TransformContext};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace};
use crate::dataset::{ColumnBlocks, DatasetProperties};
use crate::error::{AutoNetError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

fn check_width(name: &str, fitted: usize, blocks: &ColumnBlocks) -> Result<()> {
    if blocks.categorical.ncols() != fitted {
        return Err(AutoNetError::Shape {
            expected: format!("{} categorical columns for {}", fitted, name),
            actual: blocks.categorical.ncols().to_string(),
        });
    }
    Ok(())
}

macro_rules! parameterless_component {
    ($ty:ident, $shortname:expr, $long:expr) => {
        impl Component for $ty {
            fn name(&self) -> &'static str {
                stringify!($ty)
            }

            fn category(&self) -> ComponentCategory {
                ComponentCategory::Encoder
            }

            fn properties(&self) -> ComponentProperties {
                ComponentProperties::new($shortname, $long)
            }

            fn get_hyperparameter_search_space(
                &self,
                _: &DatasetProperties,
                _: &ComponentUpdates,
            ) -> Result<ConfigurationSpace> {
                Ok(ConfigurationSpace::new())
            }

            fn set_hyperparameters(&mut self, _: &Configuration) -> Result<()> {
                Ok(())
            }

            fn fit(&mut self, context: &RunContext) -> Result<ContextUpdate> {
                fit_on_context(self, context)
            }

            fn transform(&self, context: TransformContext) -> Result<TransformContext> {
                transform_context(self, self.is_fitted, self.name(), context)
            }

            fn is_fitted(&self) -> bool {
                self.is_fitted
            }
        }
    };
}

/// Leaves category codes as they are
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoEncoder {
    is_fitted: bool,
}

impl NoEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockTransform for NoEncoder {
    fn fit_blocks(&mut self, _blocks: &ColumnBlocks) -> Result<()> {
        self.is_fitted = true;
        Ok(())
    }

    fn transform_blocks(&self, blocks: ColumnBlocks) -> Result<ColumnBlocks> {
        Ok(blocks)
    }
}

parameterless_component!(NoEncoder, "NoEncoder", "No Encoder");

/// Expands every categorical column into one indicator column per category
/// seen at fit time; unseen categories encode as all zeros
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<Vec<f64>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categories(&self) -> &[Vec<f64>] {
        &self.categories
    }
}

impl BlockTransform for OneHotEncoder {
    fn fit_blocks(&mut self, blocks: &ColumnBlocks) -> Result<()> {
        self.categories = blocks.categorical.axis_iter(Axis(1)).map(distinct_values).collect();
        self.is_fitted = true;
        Ok(())
    }

    fn transform_blocks(&self, blocks: ColumnBlocks) -> Result<ColumnBlocks> {
        check_width("OneHotEncoder", self.categories.len(), &blocks)?;
        let widths: Vec<usize> = self.categories.iter().map(Vec::len).collect();
        let n_rows = blocks.categorical.nrows();
        let mut encoded = Array2::zeros((n_rows, widths.iter().sum()));
        let mut offset = 0;
        for (j, cats) in self.categories.iter().enumerate() {
            for i in 0..n_rows {
                let v = blocks.categorical[[i, j]];
                if let Ok(pos) = cats.binary_search_by(|c| c.total_cmp(&v)) {
                    encoded[[i, offset + pos]] = 1.0;
                }
            }
            offset += cats.len();
        }
        Ok(blocks.with_categorical(encoded, widths))
    }
}

parameterless_component!(OneHotEncoder, "OneHotEncoder", "One Hot Encoder");

/// Maps category codes to their rank among the categories seen at fit time;
/// unseen categories map to -1
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    categories: Vec<Vec<f64>>,
    is_fitted: bool,
}

impl OrdinalEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockTransform for OrdinalEncoder {
    fn fit_blocks(&mut self, blocks: &ColumnBlocks) -> Result<()> {
        self.categories = blocks.categorical.axis_iter(Axis(1)).map(distinct_values).collect();
        self.is_fitted = true;
        Ok(())
    }

    fn transform_blocks(&self, mut blocks: ColumnBlocks) -> Result<ColumnBlocks> {
        check_width("OrdinalEncoder", self.categories.len(), &blocks)?;
        for (mut col, cats) in blocks.categorical.axis_iter_mut(Axis(1)).zip(&self.categories) {
            col.mapv_inplace(|v| match cats.binary_search_by(|c| c.total_cmp(&v)) {
                Ok(pos) => pos as f64,
                Err(_) => -1.0,
            });
        }
        Ok(blocks)
    }
}

parameterless_component!(OrdinalEncoder, "OrdinalEncoder", "Ordinal Encoder");
