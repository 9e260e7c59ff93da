//! Feature preprocessors acting on the numerical block

use super::{fit_on_context, transform_context, BlockTransform};
use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, RunContext, TransformContext};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace, HyperparameterSearchSpace};
use crate::dataset::{ColumnBlocks, DatasetProperties};
use crate::error::{AutoNetError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Pass-through feature preprocessor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoFeaturePreprocessor {
    is_fitted: bool,
}

impl NoFeaturePreprocessor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockTransform for NoFeaturePreprocessor {
    fn fit_blocks(&mut self, _blocks: &ColumnBlocks) -> Result<()> {
        self.is_fitted = true;
        Ok(())
    }

    fn transform_blocks(&self, blocks: ColumnBlocks) -> Result<ColumnBlocks> {
        Ok(blocks)
    }
}

impl Component for NoFeaturePreprocessor {
    fn name(&self) -> &'static str {
        "NoFeaturePreprocessor"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::FeaturePreprocessor
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("NoFeaturePreprocessor", "No Feature Preprocessing")
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

/// Polynomial and interaction terms of the numerical columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolynomialFeatures {
    degree: usize,
    interaction_only: bool,
    include_bias: bool,
    /// One entry per output column: the input columns multiplied together
    terms: Vec<Vec<usize>>,
    n_input: usize,
    is_fitted: bool,
}

impl Default for PolynomialFeatures {
    fn default() -> Self {
        Self::new()
    }
}

impl PolynomialFeatures {
    pub fn new() -> Self {
        Self::with_params(2, false, false)
    }

    pub fn with_params(degree: usize, interaction_only: bool, include_bias: bool) -> Self {
        Self {
            degree,
            interaction_only,
            include_bias,
            terms: Vec::new(),
            n_input: 0,
            is_fitted: false,
        }
    }

    /// Number of output columns after fit
    pub fn n_output_features(&self) -> usize {
        self.terms.len()
    }

    fn build_terms(&self, n_input: usize) -> Vec<Vec<usize>> {
        let mut terms: Vec<Vec<usize>> = Vec::new();
        if self.include_bias {
            terms.push(Vec::new());
        }
        let mut frontier: Vec<Vec<usize>> = (0..n_input).map(|i| vec![i]).collect();
        for degree in 1..=self.degree {
            terms.extend(frontier.iter().cloned());
            if degree == self.degree {
                break;
            }
            frontier = frontier
                .iter()
                .flat_map(|term| {
                    let last = term.last().copied().unwrap_or(0);
                    let start = if self.interaction_only { last + 1 } else { last };
                    (start..n_input).map(move |next| {
                        let mut t = term.clone();
                        t.push(next);
                        t
                    })
                })
                .collect();
        }
        terms
    }
}

impl BlockTransform for PolynomialFeatures {
    fn fit_blocks(&mut self, blocks: &ColumnBlocks) -> Result<()> {
        self.n_input = blocks.numerical.ncols();
        self.terms = self.build_terms(self.n_input);
        self.is_fitted = true;
        Ok(())
    }

    fn transform_blocks(&self, blocks: ColumnBlocks) -> Result<ColumnBlocks> {
        if blocks.numerical.ncols() != self.n_input {
            return Err(AutoNetError::Shape {
                expected: format!("{} numerical columns for PolynomialFeatures", self.n_input),
                actual: blocks.numerical.ncols().to_string(),
            });
        }
        let n_rows = blocks.numerical.nrows();
        let x = &blocks.numerical;
        let expanded = Array2::from_shape_fn((n_rows, self.terms.len()), |(i, j)| {
            self.terms[j].iter().map(|&c| x[[i, c]]).product::<f64>()
        });
        Ok(blocks.with_numerical(expanded))
    }
}

impl Component for PolynomialFeatures {
    fn name(&self) -> &'static str {
        "PolynomialFeatures"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::FeaturePreprocessor
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("PolynomialFeatures", "PolynomialFeatures")
    }

    fn get_hyperparameter_search_space(
        &self,
        _dataset_properties: &DatasetProperties,
        updates: &ComponentUpdates,
    ) -> Result<ConfigurationSpace> {
        let mut space = ConfigurationSpace::new();
        space.add_hyperparameters([
            updates.hyperparameter(HyperparameterSearchSpace::int("degree", 2, 3, 2, false))?,
            updates.hyperparameter(HyperparameterSearchSpace::choices("interaction_only", [false, true], false))?,
            updates.hyperparameter(HyperparameterSearchSpace::choices("include_bias", [false, true], false))?,
        ])?;
        Ok(space)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        let degree = configuration.int("degree")?;
        if degree < 1 {
            return Err(AutoNetError::configuration(format!("polynomial degree must be >= 1, got {}", degree)));
        }
        self.degree = degree as usize;
        self.interaction_only = configuration.bool("interaction_only")?;
        self.include_bias = configuration.bool("include_bias")?;
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
