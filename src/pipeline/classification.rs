//! Step table of the tabular classification pipeline

use super::base::Pipeline;
use super::step::PipelineStep;
use crate::components::preprocessing::{EarlyPreprocessing, SimpleImputer, TabularColumnTransformer};
use crate::components::setup::NetworkComponent;
use crate::components::training::FeatureDataLoader;
use crate::components::{ComponentCategory, ComponentRegistry};
use crate::dataset::TargetType;
use std::sync::Arc;

pub(crate) fn pipeline_steps(registry: &Arc<ComponentRegistry>) -> Vec<PipelineStep> {
    vec![
        PipelineStep::component(SimpleImputer::new()),
        PipelineStep::choice(ComponentCategory::Coalescer, registry),
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
    /// Pipeline for tabular classification
    pub fn classification() -> Self {
        Pipeline::new(TargetType::TabularClassification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Budget;
    use crate::dataset::{DatasetProperties, TabularData, TaskType};
    use crate::error::AutoNetError;
    use crate::metrics::Metric;
    use crate::pipeline::PipelineState;
    use ndarray::{Array1, Array2};

    fn blobs(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| {
            let class = (i % 2) as f64;
            match j {
                0 => (i % 3) as f64,
                1 => class * 4.0 - 2.0 + (i as f64 * 0.37).sin() * 0.3,
                _ => class * -3.0 + (i as f64 * 0.11).cos() * 0.3,
            }
        });
        let y = Array1::from_shape_fn(n, |i| (i % 2) as f64);
        (x, y)
    }

    fn dataset_properties() -> DatasetProperties {
        DatasetProperties::new()
            .with_target_type(TargetType::TabularClassification)
            .with_task_type(TaskType::BinaryClassification)
            .with_output_shape(2)
            .with_input_shape(3)
            .with_columns(vec![0], vec![1, 2])
            .with_num_categories(vec![3])
    }

    #[test]
    fn test_step_order() {
        let pipeline = Pipeline::classification();
        assert_eq!(
            pipeline.step_names(),
            vec![
                "imputer",
                "coalescer",
                "encoder",
                "scaler",
                "feature_preprocessor",
                "tabular_transformer",
                "preprocessing",
                "network_embedding",
                "network_backbone",
                "network_head",
                "network",
                "network_init",
                "optimizer",
                "lr_scheduler",
                "data_loader",
                "trainer",
            ]
        );
    }

    #[test]
    fn test_fit_default_configuration_and_predict() {
        let (x, y) = blobs(60);
        let data = TabularData::new(x.clone(), y.clone()).unwrap();
        let mut pipeline = Pipeline::classification();
        let space = pipeline.get_hyperparameter_search_space(&dataset_properties()).unwrap();
        pipeline.set_hyperparameters(&space.get_default_configuration()).unwrap();
        pipeline.fit(&data, Budget::epochs(5)).unwrap();

        let proba = pipeline.predict_proba(&x, None).unwrap();
        assert_eq!(proba.dim(), (60, 2));
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
            assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
        }
        let predictions = pipeline.predict(&x, None).unwrap();
        assert!(predictions.iter().all(|p| *p == 0.0 || *p == 1.0));

        let accuracy = pipeline.score(&x, &y, Metric::Accuracy, false, None).unwrap();
        let loss = pipeline.score(&x, &y, Metric::Accuracy, true, None).unwrap();
        assert!((accuracy + loss - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_failed_refit_drops_fitted_state() {
        let (x, y) = blobs(40);
        let data = TabularData::new(x.clone(), y.clone()).unwrap();
        let mut pipeline = Pipeline::classification();
        let space = pipeline.get_hyperparameter_search_space(&dataset_properties()).unwrap();
        pipeline.set_hyperparameters(&space.get_default_configuration()).unwrap();
        pipeline.fit(&data, Budget::epochs(3)).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Fitted);

        // the preprocessing steps refit on the scaled data before the trainer rejects label 2
        let mut bad_y = y.clone();
        bad_y[0] = 2.0;
        let bad = TabularData::new(x.mapv(|v| v * 1000.0), bad_y).unwrap();
        let err = pipeline.fit(&bad, Budget::epochs(3)).unwrap_err();
        assert!(matches!(err, AutoNetError::InvalidInput(_)));
        assert_eq!(pipeline.state(), PipelineState::Configured);
        assert!(pipeline.training_report().is_none());
        assert!(matches!(
            pipeline.predict_proba(&x, None).unwrap_err(),
            AutoNetError::NotFitted(_)
        ));

        pipeline.fit(&data, Budget::epochs(3)).unwrap();
        assert_eq!(pipeline.predict_proba(&x, None).unwrap().dim(), (40, 2));
    }

    #[test]
    fn test_batched_prediction_matches_unbatched() {
        let (x, y) = blobs(25);
        let data = TabularData::new(x.clone(), y).unwrap();
        let mut pipeline = Pipeline::classification();
        let space = pipeline.get_hyperparameter_search_space(&dataset_properties()).unwrap();
        pipeline.set_hyperparameters(&space.get_default_configuration()).unwrap();
        pipeline.fit(&data, Budget::epochs(2)).unwrap();

        let full = pipeline.predict_proba(&x, None).unwrap();
        let batched = pipeline.predict_proba(&x, Some(7)).unwrap();
        assert_eq!(full.dim(), batched.dim());
        for (a, b) in full.iter().zip(batched.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
        assert!(pipeline.predict_proba(&x, Some(0)).is_err());
    }

    #[test]
    fn test_wrong_width_is_rejected() {
        let (x, y) = blobs(20);
        let data = TabularData::new(x, y).unwrap();
        let mut pipeline = Pipeline::classification();
        let space = pipeline.get_hyperparameter_search_space(&dataset_properties()).unwrap();
        pipeline.set_hyperparameters(&space.get_default_configuration()).unwrap();
        pipeline.fit(&data, Budget::epochs(1)).unwrap();
        assert!(pipeline.predict(&Array2::zeros((4, 5)), None).is_err());
    }
}
