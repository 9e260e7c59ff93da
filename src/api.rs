//! `AutoNet`: validate, search, refit, predict

use crate::components::ComponentRegistry;
use crate::config::AutoNetConfig;
use crate::config_space::{Configuration, ConfigurationSpace, HyperparameterSearchSpaceUpdates};
use crate::dataset::{DatasetProperties, TabularData, TargetType};
use crate::error::{AutoNetError, Result};
use crate::metrics::Metric;
use crate::pipeline::{FitResult, Pipeline, RefitRequest};
use crate::validation::{FeatureInput, InputValidator, TargetInput};
use ndarray::{concatenate, Array1, Array2, Axis};
use polars::prelude::Series;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::Arc;
use tracing::{info, warn};

/// High-level AutoML front end for one tabular task.
///
/// ```no_run
/// use autonet::prelude::*;
/// use ndarray::{Array1, Array2};
///
/// # fn main() -> autonet::error::Result<()> {
/// let x = Array2::<f64>::zeros((100, 4));
/// let y = Array1::from_shape_fn(100, |i| (i % 2) as f64);
/// let mut autonet = AutoNet::classification(AutoNetConfig::default().with_budget_range(1.0, 9.0));
/// let result = autonet.fit(&x, &y, true)?;
/// println!("best loss: {:?}", result.loss);
/// let labels = autonet.predict(&x)?;
/// # let _ = labels;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AutoNet {
    target_type: TargetType,
    config: AutoNetConfig,
    pipeline: Pipeline,
    infer_string_categoricals: bool,
    validator: Option<InputValidator>,
    data: Option<TabularData>,
    fit_result: Option<FitResult>,
}

impl AutoNet {
    pub fn new(target_type: TargetType, mut config: AutoNetConfig) -> Self {
        let usable = Metric::from_name(&config.optimize_metric)
            .and_then(|m| m.check_target(target_type))
            .is_ok();
        if !usable {
            let fallback = Metric::default_for(target_type);
            warn!(
                metric = %config.optimize_metric,
                fallback = fallback.name(),
                target_type = target_type.as_str(),
                "optimize_metric does not fit the task; using the default metric"
            );
            config.optimize_metric = fallback.name().to_string();
        }
        Self {
            target_type,
            pipeline: Pipeline::new(target_type).with_random_state(config.random_seed),
            config,
            infer_string_categoricals: false,
            validator: None,
            data: None,
            fit_result: None,
        }
    }

    pub fn classification(config: AutoNetConfig) -> Self {
        Self::new(TargetType::TabularClassification, config)
    }

    pub fn regression(config: AutoNetConfig) -> Self {
        Self::new(TargetType::TabularRegression, config)
    }

    pub fn with_registry(mut self, registry: Arc<ComponentRegistry>) -> Self {
        self.pipeline = self.pipeline.with_registry(registry);
        self
    }

    pub fn with_include(mut self, step: impl Into<String>, components: Vec<String>) -> Self {
        self.pipeline = self.pipeline.with_include(step, components);
        self
    }

    pub fn with_exclude(mut self, step: impl Into<String>, components: Vec<String>) -> Self {
        self.pipeline = self.pipeline.with_exclude(step, components);
        self
    }

    pub fn with_search_space_updates(mut self, updates: HyperparameterSearchSpaceUpdates) -> Self {
        self.pipeline = self.pipeline.with_search_space_updates(updates);
        self
    }

    pub fn with_infer_string_categoricals(mut self, infer: bool) -> Self {
        self.infer_string_categoricals = infer;
        self
    }

    pub fn config(&self) -> &AutoNetConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn fit_result(&self) -> Option<&FitResult> {
        self.fit_result.as_ref()
    }

    pub fn dataset_properties(&self) -> Option<&DatasetProperties> {
        self.pipeline.dataset_properties()
    }

    /// Configuration of the currently fitted pipeline
    pub fn get_current_config(&self) -> Option<&Configuration> {
        self.pipeline.configuration()
    }

    fn validate<'a>(
        &mut self,
        x: FeatureInput<'a>,
        y: TargetInput<'a>,
        valid: Option<(FeatureInput<'a>, TargetInput<'a>)>,
    ) -> Result<DatasetProperties> {
        let mut validator =
            InputValidator::new(self.target_type).with_infer_string_categoricals(self.infer_string_categoricals);
        validator.fit(x, y, valid)?;
        let dp = validator.dataset_properties()?;
        self.validator = Some(validator);
        Ok(dp)
    }

    fn require_validator(&self) -> Result<&InputValidator> {
        self.validator
            .as_ref()
            .ok_or_else(|| AutoNetError::not_fitted("AutoNet has not seen any data yet; call fit first"))
    }

    /// Validate the data and build the joint search space it induces
    pub fn get_hyperparameter_search_space<'a>(
        &mut self,
        x: impl Into<FeatureInput<'a>>,
        y: impl Into<TargetInput<'a>>,
    ) -> Result<ConfigurationSpace> {
        let dp = self.validate(x.into(), y.into(), None)?;
        self.pipeline.get_hyperparameter_search_space(&dp)
    }

    /// Search on the training data, holding out `validation_split` of it for
    /// scoring. With `refit`, the incumbent is retrained on all rows.
    pub fn fit<'a>(
        &mut self,
        x_train: impl Into<FeatureInput<'a>>,
        y_train: impl Into<TargetInput<'a>>,
        refit: bool,
    ) -> Result<&FitResult> {
        self.fit_inner(x_train.into(), y_train.into(), None, refit)
    }

    /// Search with an explicit validation set
    pub fn fit_with_validation<'a>(
        &mut self,
        x_train: impl Into<FeatureInput<'a>>,
        y_train: impl Into<TargetInput<'a>>,
        x_valid: impl Into<FeatureInput<'a>>,
        y_valid: impl Into<TargetInput<'a>>,
        refit: bool,
    ) -> Result<&FitResult> {
        self.fit_inner(x_train.into(), y_train.into(), Some((x_valid.into(), y_valid.into())), refit)
    }

    fn fit_inner<'a>(
        &mut self,
        x_train: FeatureInput<'a>,
        y_train: TargetInput<'a>,
        valid: Option<(FeatureInput<'a>, TargetInput<'a>)>,
        refit: bool,
    ) -> Result<&FitResult> {
        self.config.validate()?;
        let dp = self.validate(x_train, y_train, valid)?;
        let validator = self.require_validator()?;
        let (x, y) = validator.transform(x_train, Some(y_train))?;
        let y = y.ok_or_else(|| AutoNetError::invalid_input("the training target is missing"))?;
        let data = match valid {
            Some((x_valid, y_valid)) => {
                let (xv, yv) = validator.transform(x_valid, Some(y_valid))?;
                let yv = yv.ok_or_else(|| AutoNetError::invalid_input("the validation target is missing"))?;
                TabularData::new(x, y)?.with_validation(xv, yv)?
            }
            None => holdout(x, y, self.config.validation_split, self.config.random_seed)?,
        };

        self.pipeline.get_hyperparameter_search_space(&dp)?;
        let result = self.pipeline.fit_pipeline(&self.config, &data, None)?;
        info!(
            loss = result.loss.unwrap_or(f64::NAN),
            budget = result.budget,
            preprocessing = %result.pipeline_representation.preprocessing,
            estimator = %result.pipeline_representation.estimator,
            "search finished"
        );
        self.data = Some(data);
        self.fit_result = Some(result);

        if refit {
            self.refit(None, None, false)?;
        }
        self.fit_result
            .as_ref()
            .ok_or_else(|| AutoNetError::EmptySearchResult("No models fit during training".to_string()))
    }

    /// Retrain one configuration at one budget on all training rows
    /// (training plus validation). Both default to the search result.
    pub fn refit(
        &mut self,
        hyperparameter_config: Option<Configuration>,
        budget: Option<f64>,
        rescore: bool,
    ) -> Result<&FitResult> {
        let previous = self.fit_result.take();
        let (hyperparameter_config, budget) = match (hyperparameter_config, budget, &previous) {
            (Some(c), Some(b), _) => (c, b),
            (c, b, Some(p)) => (
                c.unwrap_or_else(|| p.optimized_hyperparameter_config.clone()),
                b.unwrap_or(p.budget),
            ),
            _ => {
                self.fit_result = previous;
                return Err(AutoNetError::EmptySearchResult(
                    "No models fit during training, please retrain with a larger budget".to_string(),
                ));
            }
        };
        let data = match &self.data {
            Some(data) => all_rows(data)?,
            None => {
                self.fit_result = previous;
                return Err(AutoNetError::not_fitted("refit needs the data of a previous fit"));
            }
        };

        let request = RefitRequest {
            hyperparameter_config,
            budget,
            rescore,
        };
        match self.pipeline.fit_pipeline(&self.config, &data, Some(request)) {
            Ok(mut result) => {
                if let Some(previous) = previous {
                    result.trials = previous.trials;
                }
                self.fit_result = Some(result);
            }
            Err(e) => {
                self.fit_result = previous;
                return Err(e);
            }
        }
        self.fit_result
            .as_ref()
            .ok_or_else(|| AutoNetError::EmptySearchResult("No models fit during training".to_string()))
    }

    /// Predicted labels for classification, predicted values for regression
    pub fn predict<'a>(&self, x: impl Into<FeatureInput<'a>>) -> Result<Series> {
        let validator = self.require_validator()?;
        let (x, _) = validator.transform(x.into(), None)?;
        let predictions = self.pipeline.predict(&x, self.config.predict_batch_size)?;
        validator.target_validator().inverse_transform(&predictions)
    }

    /// Class probabilities, columns in sorted class order
    pub fn predict_proba<'a>(&self, x: impl Into<FeatureInput<'a>>) -> Result<Array2<f64>> {
        let validator = self.require_validator()?;
        let (x, _) = validator.transform(x.into(), None)?;
        self.pipeline.predict_proba(&x, self.config.predict_batch_size)
    }

    /// Score with the configured metric; with `return_loss_value` the
    /// loss-equivalent value
    pub fn score<'a>(
        &self,
        x: impl Into<FeatureInput<'a>>,
        y: impl Into<TargetInput<'a>>,
        return_loss_value: bool,
    ) -> Result<f64> {
        let validator = self.require_validator()?;
        let (x, y) = validator.transform(x.into(), Some(y.into()))?;
        let y = y.ok_or_else(|| AutoNetError::invalid_input("the target is missing"))?;
        let metric = Metric::from_name(&self.config.optimize_metric)?;
        self.pipeline
            .score(&x, &y, metric, return_loss_value, self.config.predict_batch_size)
    }
}

/// Split off a seeded random `split` fraction of the rows for validation
fn holdout(x: Array2<f64>, y: Array1<f64>, split: f64, seed: u64) -> Result<TabularData> {
    let n = x.nrows();
    let n_valid = (n as f64 * split).round() as usize;
    if n_valid == 0 || n_valid >= n {
        if split > 0.0 {
            warn!(n_rows = n, split, "too few rows to hold out a validation set; scoring on training data");
        }
        return TabularData::new(x, y);
    }
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut Xoshiro256PlusPlus::seed_from_u64(seed));
    let (valid_idx, train_idx) = indices.split_at(n_valid);
    TabularData::new(x.select(Axis(0), train_idx), y.select(Axis(0), train_idx))?
        .with_validation(x.select(Axis(0), valid_idx), y.select(Axis(0), valid_idx))
}

/// Training and validation rows stacked; the validation rows stay attached
/// for rescoring
fn all_rows(data: &TabularData) -> Result<TabularData> {
    match (&data.x_valid, &data.y_valid) {
        (Some(xv), Some(yv)) => {
            let x = concatenate(Axis(0), &[data.x_train.view(), xv.view()])?;
            let y = concatenate(Axis(0), &[data.y_train.view(), yv.view()])?;
            TabularData::new(x, y)?.with_validation(xv.clone(), yv.clone())
        }
        _ => Ok(data.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_holdout_is_seeded_and_disjoint() {
        let x = Array2::from_shape_fn((10, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(10, |i| i as f64);
        let a = holdout(x.clone(), y.clone(), 0.3, 7).unwrap();
        let b = holdout(x, y, 0.3, 7).unwrap();
        assert_eq!(a.x_valid, b.x_valid);
        assert_eq!(a.x_train.nrows(), 7);
        let valid = a.y_valid.unwrap();
        assert_eq!(valid.len(), 3);
        assert!(valid.iter().all(|v| !a.y_train.iter().any(|t| t == v)));
    }

    #[test]
    fn test_holdout_without_split() {
        let data = holdout(array![[1.0], [2.0]], array![0.0, 1.0], 0.0, 1).unwrap();
        assert!(data.x_valid.is_none());
    }

    #[test]
    fn test_all_rows_stacks_validation() {
        let data = TabularData::new(array![[1.0], [2.0]], array![0.0, 1.0])
            .unwrap()
            .with_validation(array![[3.0]], array![1.0])
            .unwrap();
        let merged = all_rows(&data).unwrap();
        assert_eq!(merged.x_train.nrows(), 3);
        assert_eq!(merged.y_valid.unwrap().len(), 1);
    }

    #[test]
    fn test_metric_falls_back_for_regression() {
        let autonet = AutoNet::regression(AutoNetConfig::default());
        assert_eq!(autonet.config().optimize_metric, "r2");
    }

    #[test]
    fn test_refit_without_fit() {
        let mut autonet = AutoNet::classification(AutoNetConfig::default());
        let err = autonet.refit(None, None, false).unwrap_err();
        assert!(matches!(err, AutoNetError::EmptySearchResult(_)));
        assert!(autonet.predict(&array![[1.0]]).is_err());
    }
}
