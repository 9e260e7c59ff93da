//! Coalescing of rare categories

use super::{fit_on_context, transform_context, BlockTransform};
use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, RunContext, TransformContext};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace, HyperparameterSearchSpace};
use crate::dataset::{ColumnBlocks, DatasetProperties};
use crate::error::Result;
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Code rare categories are merged into
pub(crate) const COALESCED_CODE: f64 = -2.0;

/// Pass-through coalescer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoCoalescer {
    is_fitted: bool,
}

impl NoCoalescer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockTransform for NoCoalescer {
    fn fit_blocks(&mut self, _blocks: &ColumnBlocks) -> Result<()> {
        self.is_fitted = true;
        Ok(())
    }

    fn transform_blocks(&self, blocks: ColumnBlocks) -> Result<ColumnBlocks> {
        Ok(blocks)
    }
}

impl Component for NoCoalescer {
    fn name(&self) -> &'static str {
        "NoCoalescer"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::Coalescer
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("NoCoalescer", "No Coalescer")
    }

    fn get_hyperparameter_search_space(&self, _: &DatasetProperties, _: &ComponentUpdates) -> Result<ConfigurationSpace> {
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

/// Merges categories rarer than `min_frequency` into one shared code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinorityCoalescer {
    min_frequency: f64,
    /// Per categorical column, the codes to merge
    rare: Vec<Vec<f64>>,
    is_fitted: bool,
}

impl Default for MinorityCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

impl MinorityCoalescer {
    pub fn new() -> Self {
        Self::with_min_frequency(0.01)
    }

    pub fn with_min_frequency(min_frequency: f64) -> Self {
        Self {
            min_frequency,
            rare: Vec::new(),
            is_fitted: false,
        }
    }
}

impl BlockTransform for MinorityCoalescer {
    fn fit_blocks(&mut self, blocks: &ColumnBlocks) -> Result<()> {
        let n = blocks.categorical.nrows().max(1) as f64;
        self.rare = blocks
            .categorical
            .axis_iter(Axis(1))
            .map(|col| {
                let mut counts: HashMap<u64, (f64, usize)> = HashMap::new();
                for &v in col.iter().filter(|v| v.is_finite()) {
                    counts.entry(v.to_bits()).or_insert((v, 0)).1 += 1;
                }
                let mut rare: Vec<f64> = counts
                    .into_values()
                    .filter(|(_, c)| (*c as f64) / n < self.min_frequency)
                    .map(|(v, _)| v)
                    .collect();
                rare.sort_by(|a, b| a.total_cmp(b));
                rare
            })
            .collect();
        self.is_fitted = true;
        Ok(())
    }

    fn transform_blocks(&self, mut blocks: ColumnBlocks) -> Result<ColumnBlocks> {
        for (mut col, rare) in blocks.categorical.axis_iter_mut(Axis(1)).zip(&self.rare) {
            if rare.is_empty() {
                continue;
            }
            col.mapv_inplace(|v| if rare.contains(&v) { COALESCED_CODE } else { v });
        }
        Ok(blocks)
    }
}

impl Component for MinorityCoalescer {
    fn name(&self) -> &'static str {
        "MinorityCoalescer"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::Coalescer
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("MinorityCoalescer", "Minority Feature-class coalescer")
    }

    fn get_hyperparameter_search_space(
        &self,
        _dataset_properties: &DatasetProperties,
        updates: &ComponentUpdates,
    ) -> Result<ConfigurationSpace> {
        let mut space = ConfigurationSpace::new();
        space.add_hyperparameter(updates.hyperparameter(HyperparameterSearchSpace::float(
            "min_frequency",
            1e-4,
            0.5,
            1e-2,
            true,
        ))?)?;
        Ok(space)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        self.min_frequency = configuration.float("min_frequency")?;
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
