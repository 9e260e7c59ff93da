//! Step table of the tabular regression pipeline

use super::base::Pipeline;
use super::step::PipelineStep;
use crate::components::preprocessing::{EarlyPreprocessing, SimpleImputer, TabularColumnTransformer};
use crate::components::setup::NetworkComponent;
use crate::components::training::FeatureDataLoader;
use crate::components::{ComponentCategory, ComponentRegistry};
use crate::dataset::TargetType;
use std::sync::Arc;

/// Same layout as classification, minus the category coalescer
pub(crate) fn pipeline_steps(registry: &Arc<ComponentRegistry>) -> Vec<PipelineStep> {
    vec![
        PipelineStep::component(SimpleImputer::new()),
        PipelineStep::choice(ComponentCategory::Encoder, registry),
        PipelineStep::choice(ComponentCategory::Scaler, registry),
        PipelineStep::choice(ComponentCategory::FeaturePreprocessor, registry),
        PipelineStep::component(TabularColumnTransformer::new()),
        PipelineStep::component(EarlyPreprocessing::new()),
        PipelineStep::choice(ComponentCategory::NetworkEmbedding, registry),
        PipelineStep::choice(ComponentCategory::NetworkBackbone, registry),
        PipelineStep::choice(ComponentCategory::NetworkHead, registry),
        PipelineStep::component(NetworkComponent::new()),
        PipelineStep::choice(ComponentCategory::NetworkInitializer, registry),
        PipelineStep::choice(ComponentCategory::Optimizer, registry),
        PipelineStep::choice(ComponentCategory::LrScheduler, registry),
        PipelineStep::component(FeatureDataLoader::new()),
        PipelineStep::choice(ComponentCategory::Trainer, registry),
    ]
}

impl Pipeline {
    /// Pipeline for tabular regression
    pub fn regression() -> Self {
        Pipeline::new(TargetType::TabularRegression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Budget;
    use crate::dataset::{DatasetProperties, TabularData, TaskType};
    use crate::error::AutoNetError;
    use crate::metrics::Metric;
    use ndarray::{Array1, Array2};

    fn linear(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| ((i * (j + 1)) % 7) as f64 / 7.0);
        let y = x.column(0).mapv(|v| 2.0 * v) + &x.column(1);
        (x, y)
    }

    fn dataset_properties() -> DatasetProperties {
        DatasetProperties::new()
            .with_task_type(TaskType::Regression)
            .with_output_shape(1)
            .with_input_shape(2)
            .with_columns(vec![], vec![0, 1])
    }

    #[test]
    fn test_no_coalescer_step() {
        let pipeline = Pipeline::regression();
        assert!(pipeline.named_step("coalescer").is_none());
        assert_eq!(pipeline.steps().len(), 15);
    }

    #[test]
    fn test_target_type_filled_in() {
        let mut pipeline = Pipeline::regression();
        pipeline.get_hyperparameter_search_space(&dataset_properties()).unwrap();
        assert_eq!(
            pipeline.dataset_properties().unwrap().target_type,
            Some(TargetType::TabularRegression)
        );
    }

    #[test]
    fn test_fit_and_predict_values() {
        let (x, y) = linear(40);
        let data = TabularData::new(x.clone(), y.clone()).unwrap();
        let mut pipeline = Pipeline::regression();
        let space = pipeline.get_hyperparameter_search_space(&dataset_properties()).unwrap();
        assert!(!space.contains("trainer:StandardTrainer:weighted_loss"));
        pipeline.set_hyperparameters(&space.get_default_configuration()).unwrap();
        pipeline.fit(&data, Budget::epochs(3)).unwrap();

        let predictions = pipeline.predict(&x, Some(16)).unwrap();
        assert_eq!(predictions.len(), 40);
        assert!(predictions.iter().all(|p| p.is_finite()));
        assert!(pipeline.score(&x, &y, Metric::MeanSquaredError, false, None).unwrap() >= 0.0);

        let err = pipeline.predict_proba(&x, None).unwrap_err();
        assert!(matches!(err, AutoNetError::Configuration(_)));
        assert!(pipeline.score(&x, &y, Metric::Accuracy, false, None).is_err());
    }
}
