//! Numerical scalers

use super::{fit_on_context, transform_context, BlockTransform};
use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, RunContext, TransformContext};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace, HyperparameterSearchSpace};
use crate::dataset::{ColumnBlocks, DatasetProperties};
use crate::error::{AutoNetError, Result};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Fitted parameters of one column
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ScalerParams {
    center: f64, // mean or min
    scale: f64,  // std or range
}

fn finite(col: ArrayView1<f64>) -> Vec<f64> {
    col.iter().copied().filter(|v| v.is_finite()).collect()
}

fn apply_params(numerical: &mut Array2<f64>, params: &[ScalerParams], name: &str) -> Result<()> {
    if numerical.ncols() != params.len() {
        return Err(AutoNetError::Shape {
            expected: format!("{} numerical columns for {}", params.len(), name),
            actual: numerical.ncols().to_string(),
        });
    }
    for (mut col, p) in numerical.axis_iter_mut(Axis(1)).zip(params) {
        col.mapv_inplace(|v| (v - p.center) / p.scale);
    }
    Ok(())
}

/// Implements [`Component`] for a scaler; `$space` builds its sub-space,
/// `$set` binds the configuration
macro_rules! scaler_component {
    ($ty:ident, $long:expr, |$dp:ident, $updates:ident| $space:block, |$this:ident, $config:ident| $set:block) => {
        impl Component for $ty {
            fn name(&self) -> &'static str {
                stringify!($ty)
            }

            fn category(&self) -> ComponentCategory {
                ComponentCategory::Scaler
            }

            fn properties(&self) -> ComponentProperties {
                ComponentProperties::new(stringify!($ty), $long)
            }

            fn get_hyperparameter_search_space(
                &self,
                $dp: &DatasetProperties,
                $updates: &ComponentUpdates,
            ) -> Result<ConfigurationSpace> {
                $space
            }

            fn set_hyperparameters(&mut self, $config: &Configuration) -> Result<()> {
                let $this = self;
                $set
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

/// Z-score scaling: (x - mean) / std
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockTransform for StandardScaler {
    fn fit_blocks(&mut self, blocks: &ColumnBlocks) -> Result<()> {
        self.params = blocks
            .numerical
            .axis_iter(Axis(1))
            .map(|col| {
                let values = finite(col);
                let n = values.len() as f64;
                if values.is_empty() {
                    return ScalerParams { center: 0.0, scale: 1.0 };
                }
                let mean = values.iter().sum::<f64>() / n;
                let std = if values.len() < 2 {
                    0.0
                } else {
                    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
                };
                ScalerParams {
                    center: mean,
                    scale: if std == 0.0 { 1.0 } else { std },
                }
            })
            .collect();
        self.is_fitted = true;
        Ok(())
    }

    fn transform_blocks(&self, mut blocks: ColumnBlocks) -> Result<ColumnBlocks> {
        apply_params(&mut blocks.numerical, &self.params, "StandardScaler")?;
        Ok(blocks)
    }
}

scaler_component!(
    StandardScaler,
    "Standard Scaler",
    |_dp, _updates| { Ok(ConfigurationSpace::new()) },
    |_this, _config| { Ok(()) }
);

/// Min-max scaling into [0, 1] on the training range
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinMaxScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockTransform for MinMaxScaler {
    fn fit_blocks(&mut self, blocks: &ColumnBlocks) -> Result<()> {
        self.params = blocks
            .numerical
            .axis_iter(Axis(1))
            .map(|col| {
                let values = finite(col);
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                if values.is_empty() {
                    return ScalerParams { center: 0.0, scale: 1.0 };
                }
                let range = max - min;
                ScalerParams {
                    center: min,
                    scale: if range == 0.0 { 1.0 } else { range },
                }
            })
            .collect();
        self.is_fitted = true;
        Ok(())
    }

    fn transform_blocks(&self, mut blocks: ColumnBlocks) -> Result<ColumnBlocks> {
        apply_params(&mut blocks.numerical, &self.params, "MinMaxScaler")?;
        Ok(blocks)
    }
}

scaler_component!(
    MinMaxScaler,
    "MinMax Scaler",
    |_dp, _updates| { Ok(ConfigurationSpace::new()) },
    |_this, _config| { Ok(()) }
);

/// Row norm used by [`Normalizer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormKind {
    MeanAbs,
    MeanSquared,
    Max,
}

impl NormKind {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "mean_abs" => Ok(Self::MeanAbs),
            "mean_squared" => Ok(Self::MeanSquared),
            "max" => Ok(Self::Max),
            other => Err(AutoNetError::configuration(format!("unknown norm '{}'", other))),
        }
    }

    fn of(&self, row: ArrayView1<f64>) -> f64 {
        match self {
            NormKind::MeanAbs => row.iter().map(|v| v.abs()).sum(),
            NormKind::MeanSquared => row.iter().map(|v| v * v).sum::<f64>().sqrt(),
            NormKind::Max => row.iter().fold(0.0f64, |a, v| a.max(v.abs())),
        }
    }
}

/// Scales every row of the numerical block to unit norm; stateless
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Normalizer {
    norm: NormKind,
    is_fitted: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::with_norm(NormKind::MeanSquared)
    }

    pub fn with_norm(norm: NormKind) -> Self {
        Self { norm, is_fitted: false }
    }
}

impl BlockTransform for Normalizer {
    fn fit_blocks(&mut self, _blocks: &ColumnBlocks) -> Result<()> {
        self.is_fitted = true;
        Ok(())
    }

    fn transform_blocks(&self, mut blocks: ColumnBlocks) -> Result<ColumnBlocks> {
        for mut row in blocks.numerical.axis_iter_mut(Axis(0)) {
            let norm = self.norm.of(row.view());
            let norm = if norm == 0.0 || !norm.is_finite() { 1.0 } else { norm };
            row.mapv_inplace(|v| v / norm);
        }
        Ok(blocks)
    }
}

scaler_component!(
    Normalizer,
    "Normalizer",
    |_dp, updates| {
        let mut space = ConfigurationSpace::new();
        space.add_hyperparameter(updates.hyperparameter(HyperparameterSearchSpace::choices(
            "norm",
            ["mean_abs", "mean_squared", "max"],
            "mean_squared",
        ))?)?;
        Ok(space)
    },
    |this, config| {
        this.norm = NormKind::from_name(config.string("norm")?)?;
        Ok(())
    }
);

/// Pass-through scaler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoScaler {
    is_fitted: bool,
}

impl NoScaler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockTransform for NoScaler {
    fn fit_blocks(&mut self, _blocks: &ColumnBlocks) -> Result<()> {
        self.is_fitted = true;
        Ok(())
    }

    fn transform_blocks(&self, blocks: ColumnBlocks) -> Result<ColumnBlocks> {
        Ok(blocks)
    }
}

scaler_component!(
    NoScaler,
    "No Scaler",
    |_dp, _updates| { Ok(ConfigurationSpace::new()) },
    |_this, _config| { Ok(()) }
);

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn blocks(numerical: Array2<f64>) -> ColumnBlocks {
        let n = numerical.nrows();
        ColumnBlocks {
            categorical: Array2::zeros((n, 0)),
            numerical,
            categorical_widths: vec![],
        }
    }

    #[test]
    fn test_standard_scaler_uses_sample_std() {
        let mut scaler = StandardScaler::new();
        let data = blocks(array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]]);
        scaler.fit_blocks(&data).unwrap();
        let out = scaler.transform_blocks(data).unwrap();
        assert_eq!(out.numerical.column(0).to_vec(), vec![-1.0, 0.0, 1.0]);
        // constant column: std 0 is replaced by 1
        assert_eq!(out.numerical.column(1).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_min_max_range() {
        let mut scaler = MinMaxScaler::new();
        let data = blocks(array![[2.0], [4.0], [6.0]]);
        scaler.fit_blocks(&data).unwrap();
        let out = scaler.transform_blocks(blocks(array![[4.0], [8.0]])).unwrap();
        assert_eq!(out.numerical.column(0).to_vec(), vec![0.5, 1.5]);
    }

    #[test]
    fn test_normalizer_rows() {
        let mut scaler = Normalizer::new();
        let data = blocks(array![[3.0, 4.0], [0.0, 0.0]]);
        scaler.fit_blocks(&data).unwrap();
        let out = scaler.transform_blocks(data).unwrap();
        assert!((out.numerical[[0, 0]] - 0.6).abs() < 1e-12);
        assert!((out.numerical[[0, 1]] - 0.8).abs() < 1e-12);
        assert_eq!(out.numerical.row(1).to_vec(), vec![0.0, 0.0]);

        let mut max = Normalizer::with_norm(NormKind::Max);
        max.fit_blocks(&blocks(array![[2.0, -4.0]])).unwrap();
        let out = max.transform_blocks(blocks(array![[2.0, -4.0]])).unwrap();
        assert_eq!(out.numerical.row(0).to_vec(), vec![0.5, -1.0]);
    }

    #[test]
    fn test_normalizer_norm_is_configurable() {
        let mut scaler = Normalizer::new();
        let config = Configuration::new().with("norm", "mean_abs");
        scaler.set_hyperparameters(&config).unwrap();
        assert_eq!(scaler.norm, NormKind::MeanAbs);
        let bad = Configuration::new().with("norm", "l7");
        assert!(scaler.set_hyperparameters(&bad).is_err());
    }
}
