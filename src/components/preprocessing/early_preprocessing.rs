//! Last preprocessing step before the network sees the data

use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, RunContext, TransformContext};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace};
use crate::dataset::DatasetProperties;
use crate::error::{AutoNetError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Guards the feature matrix: non-finite entries become 0 and the width
/// must match the one seen at fit time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EarlyPreprocessing {
    width: Option<usize>,
}

impl EarlyPreprocessing {
    pub fn new() -> Self {
        Self::default()
    }

    fn sanitize(&self, mut matrix: Array2<f64>) -> Result<Array2<f64>> {
        if let Some(width) = self.width {
            if matrix.ncols() != width {
                return Err(AutoNetError::Shape {
                    expected: format!("{} feature columns", width),
                    actual: matrix.ncols().to_string(),
                });
            }
        }
        matrix.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });
        Ok(matrix)
    }
}

impl Component for EarlyPreprocessing {
    fn name(&self) -> &'static str {
        "EarlyPreprocessing"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::EarlyPreprocessor
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("EarlyPreprocessing", "Early Preprocessing")
    }

    fn get_hyperparameter_search_space(&self, _: &DatasetProperties, _: &ComponentUpdates) -> Result<ConfigurationSpace> {
        Ok(ConfigurationSpace::new())
    }

    fn set_hyperparameters(&mut self, _: &Configuration) -> Result<()> {
        Ok(())
    }

    fn fit(&mut self, context: &RunContext) -> Result<ContextUpdate> {
        let train = context.require_train_matrix()?;
        self.width = Some(train.ncols());
        let train_matrix = self.sanitize(train.clone())?;
        let valid_matrix = context.valid_matrix.clone().map(|m| self.sanitize(m)).transpose()?;
        Ok(ContextUpdate {
            train_matrix: Some(train_matrix),
            valid_matrix,
            ..ContextUpdate::none()
        })
    }

    fn transform(&self, mut context: TransformContext) -> Result<TransformContext> {
        if self.width.is_none() {
            return Err(AutoNetError::not_fitted(self.name()));
        }
        let matrix = context.take_matrix()?;
        context.matrix = Some(self.sanitize(matrix)?);
        Ok(context)
    }

    fn is_fitted(&self) -> bool {
        self.width.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_non_finite_entries_are_zeroed() {
        let mut early = EarlyPreprocessing::new();
        early.width = Some(2);
        let out = early.sanitize(array![[f64::NAN, 1.0], [f64::INFINITY, 2.0]]).unwrap();
        assert_eq!(out, array![[0.0, 1.0], [0.0, 2.0]]);
        assert!(early.sanitize(array![[1.0]]).is_err());
    }
}
