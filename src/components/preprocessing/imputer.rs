//! Missing-value imputation

use super::{fit_on_context, most_frequent, transform_context, BlockTransform};
use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, RunContext, TransformContext};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace, HyperparameterSearchSpace};
use crate::dataset::{ColumnBlocks, DatasetProperties};
use crate::error::{AutoNetError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Strategy for numerical columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericalStrategy {
    Mean,
    Median,
    MostFrequent,
    ConstantZero,
}

impl NumericalStrategy {
    fn from_name(name: &str) -> Result<Self> {
        match name {
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            "most_frequent" => Ok(Self::MostFrequent),
            "constant_zero" => Ok(Self::ConstantZero),
            other => Err(AutoNetError::configuration(format!("unknown numerical strategy '{}'", other))),
        }
    }
}

/// Strategy for categorical columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoricalStrategy {
    MostFrequent,
    /// Fill with the unknown-category code
    ConstantMissing,
}

impl CategoricalStrategy {
    fn from_name(name: &str) -> Result<Self> {
        match name {
            "most_frequent" => Ok(Self::MostFrequent),
            "constant_!missing!" => Ok(Self::ConstantMissing),
            other => Err(AutoNetError::configuration(format!("unknown categorical strategy '{}'", other))),
        }
    }
}

/// Code given to categories the encoders have never seen
pub(crate) const UNKNOWN_CODE: f64 = -1.0;

/// Per-column imputer for both column blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleImputer {
    numerical_strategy: NumericalStrategy,
    categorical_strategy: CategoricalStrategy,
    numerical_fill: Vec<f64>,
    categorical_fill: Vec<f64>,
    is_fitted: bool,
}

impl Default for SimpleImputer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleImputer {
    pub fn new() -> Self {
        Self {
            numerical_strategy: NumericalStrategy::Mean,
            categorical_strategy: CategoricalStrategy::MostFrequent,
            numerical_fill: Vec::new(),
            categorical_fill: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn with_strategies(numerical: NumericalStrategy, categorical: CategoricalStrategy) -> Self {
        Self {
            numerical_strategy: numerical,
            categorical_strategy: categorical,
            ..Self::new()
        }
    }

    fn numerical_fill_value(&self, values: &mut Vec<f64>) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match self.numerical_strategy {
            NumericalStrategy::Mean => values.iter().sum::<f64>() / values.len() as f64,
            NumericalStrategy::Median => {
                values.sort_by(|a, b| a.total_cmp(b));
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                }
            }
            NumericalStrategy::MostFrequent => {
                most_frequent(ndarray::ArrayView1::from(values.as_slice())).unwrap_or(0.0)
            }
            NumericalStrategy::ConstantZero => 0.0,
        }
    }

    fn fill(block: &mut Array2<f64>, fills: &[f64]) {
        for (mut column, &fill) in block.axis_iter_mut(Axis(1)).zip(fills) {
            column.mapv_inplace(|v| if v.is_finite() { v } else { fill });
        }
    }
}

impl BlockTransform for SimpleImputer {
    fn fit_blocks(&mut self, blocks: &ColumnBlocks) -> Result<()> {
        self.numerical_fill = blocks
            .numerical
            .axis_iter(Axis(1))
            .map(|col| {
                let mut finite: Vec<f64> = col.iter().copied().filter(|v| v.is_finite()).collect();
                self.numerical_fill_value(&mut finite)
            })
            .collect();
        self.categorical_fill = blocks
            .categorical
            .axis_iter(Axis(1))
            .map(|col| match self.categorical_strategy {
                CategoricalStrategy::MostFrequent => most_frequent(col).unwrap_or(UNKNOWN_CODE),
                CategoricalStrategy::ConstantMissing => UNKNOWN_CODE,
            })
            .collect();
        self.is_fitted = true;
        Ok(())
    }

    fn transform_blocks(&self, mut blocks: ColumnBlocks) -> Result<ColumnBlocks> {
        if blocks.numerical.ncols() != self.numerical_fill.len()
            || blocks.categorical.ncols() != self.categorical_fill.len()
        {
            return Err(AutoNetError::Shape {
                expected: format!(
                    "{} categorical and {} numerical columns",
                    self.categorical_fill.len(),
                    self.numerical_fill.len()
                ),
                actual: format!("{} and {}", blocks.categorical.ncols(), blocks.numerical.ncols()),
            });
        }
        Self::fill(&mut blocks.numerical, &self.numerical_fill);
        Self::fill(&mut blocks.categorical, &self.categorical_fill);
        Ok(blocks)
    }
}

impl Component for SimpleImputer {
    fn name(&self) -> &'static str {
        "SimpleImputer"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::Imputer
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("SimpleImputer", "Simple Imputer").handles_missing_values()
    }

    fn get_hyperparameter_search_space(
        &self,
        dataset_properties: &DatasetProperties,
        updates: &ComponentUpdates,
    ) -> Result<ConfigurationSpace> {
        let mut space = ConfigurationSpace::new();
        if !dataset_properties.require_numerical_columns()?.is_empty() {
            space.add_hyperparameter(updates.hyperparameter(HyperparameterSearchSpace::choices(
                "numerical_strategy",
                ["mean", "median", "most_frequent", "constant_zero"],
                "mean",
            ))?)?;
        }
        if !dataset_properties.require_categorical_columns()?.is_empty() {
            space.add_hyperparameter(updates.hyperparameter(HyperparameterSearchSpace::choices(
                "categorical_strategy",
                ["most_frequent", "constant_!missing!"],
                "most_frequent",
            ))?)?;
        }
        Ok(space)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        if configuration.contains("numerical_strategy") {
            self.numerical_strategy = NumericalStrategy::from_name(configuration.string("numerical_strategy")?)?;
        }
        if configuration.contains("categorical_strategy") {
            self.categorical_strategy =
                CategoricalStrategy::from_name(configuration.string("categorical_strategy")?)?;
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn blocks() -> ColumnBlocks {
        ColumnBlocks {
            categorical: array![[0.0], [f64::NAN], [0.0], [1.0]],
            numerical: array![[1.0, f64::NAN], [f64::NAN, 2.0], [3.0, 4.0], [5.0, 6.0]],
            categorical_widths: vec![1],
        }
    }

    #[test]
    fn test_mean_and_mode_imputation() {
        let mut imputer = SimpleImputer::new();
        imputer.fit_blocks(&blocks()).unwrap();
        let out = imputer.transform_blocks(blocks()).unwrap();
        assert_eq!(out.numerical[[1, 0]], 3.0);
        assert_eq!(out.numerical[[0, 1]], 4.0);
        assert_eq!(out.categorical[[1, 0]], 0.0);
    }

    #[test]
    fn test_median_and_constant() {
        let mut imputer =
            SimpleImputer::with_strategies(NumericalStrategy::Median, CategoricalStrategy::ConstantMissing);
        imputer.fit_blocks(&blocks()).unwrap();
        let out = imputer.transform_blocks(blocks()).unwrap();
        assert_eq!(out.numerical[[1, 0]], 3.0);
        assert_eq!(out.categorical[[1, 0]], UNKNOWN_CODE);
    }

    #[test]
    fn test_space_depends_on_columns() {
        let imputer = SimpleImputer::new();
        let dp = DatasetProperties::new().with_columns(vec![], vec![0]);
        let space = imputer.get_hyperparameter_search_space(&dp, &ComponentUpdates::new()).unwrap();
        assert_eq!(space.hyperparameter_names(), vec!["numerical_strategy"]);
    }

    #[test]
    fn test_transform_before_fit() {
        let imputer = SimpleImputer::new();
        let err = imputer.transform(TransformContext::new(blocks())).unwrap_err();
        assert!(matches!(err, AutoNetError::NotFitted(_)));
    }
}
