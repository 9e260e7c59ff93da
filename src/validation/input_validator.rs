//! Joint feature/target validation and dataset-property derivation

use super::feature_validator::FeatureValidator;
use super::input::{FeatureInput, TargetInput};
use super::target_validator::TargetValidator;
use crate::dataset::{DatasetProperties, TargetType};
use crate::error::{AutoNetError, Result};
use ndarray::{Array1, Array2};
use tracing::info;

/// Fits a [`FeatureValidator`] and a [`TargetValidator`] together and
/// describes the validated data as [`DatasetProperties`]
#[derive(Debug, Clone)]
pub struct InputValidator {
    feature_validator: FeatureValidator,
    target_validator: TargetValidator,
}

fn check_rows(x: &FeatureInput<'_>, y: &TargetInput<'_>, what: &str) -> Result<()> {
    if x.n_rows() != y.len() {
        return Err(AutoNetError::invalid_input(format!(
            "{} features have {} rows but the target has {} entries",
            what,
            x.n_rows(),
            y.len()
        )));
    }
    Ok(())
}

impl InputValidator {
    pub fn new(target_type: TargetType) -> Self {
        Self {
            feature_validator: FeatureValidator::new(),
            target_validator: TargetValidator::new(target_type),
        }
    }

    pub fn with_infer_string_categoricals(mut self, infer: bool) -> Self {
        self.feature_validator = self.feature_validator.with_infer_string_categoricals(infer);
        self
    }

    pub fn feature_validator(&self) -> &FeatureValidator {
        &self.feature_validator
    }

    pub fn target_validator(&self) -> &TargetValidator {
        &self.target_validator
    }

    pub fn is_fitted(&self) -> bool {
        self.feature_validator.is_fitted() && self.target_validator.is_fitted()
    }

    pub fn fit(
        &mut self,
        x_train: FeatureInput<'_>,
        y_train: TargetInput<'_>,
        test: Option<(FeatureInput<'_>, TargetInput<'_>)>,
    ) -> Result<()> {
        check_rows(&x_train, &y_train, "training")?;
        if let Some((x_test, y_test)) = &test {
            check_rows(x_test, y_test, "test")?;
        }
        self.feature_validator.fit(x_train, test.map(|(x, _)| x))?;
        self.target_validator.fit(y_train, test.map(|(_, y)| y))?;
        info!(
            n_rows = x_train.n_rows(),
            n_features = self.feature_validator.n_features(),
            n_categorical = self.feature_validator.categorical_columns().len(),
            target_type = self.target_validator.target_type().as_str(),
            "validated input data"
        );
        Ok(())
    }

    pub fn transform(&self, x: FeatureInput<'_>, y: Option<TargetInput<'_>>) -> Result<(Array2<f64>, Option<Array1<f64>>)> {
        if let Some(y) = &y {
            check_rows(&x, y, "given")?;
        }
        let x = self.feature_validator.transform(x)?;
        let y = y.map(|y| self.target_validator.transform(y)).transpose()?;
        Ok((x, y))
    }

    /// Dataset properties of the validated matrix: categorical columns occupy
    /// the leading positions, numerical ones follow
    pub fn dataset_properties(&self) -> Result<DatasetProperties> {
        if !self.is_fitted() {
            return Err(AutoNetError::not_fitted(
                "dataset properties are only known after the input validator is fitted",
            ));
        }
        let n_features = self.feature_validator.n_features();
        let n_categorical = self.feature_validator.categorical_columns().len();
        Ok(DatasetProperties::new()
            .with_target_type(self.target_validator.target_type())
            .with_task_type(self.target_validator.task_type())
            .with_output_shape(self.target_validator.output_shape())
            .with_input_shape(n_features)
            .with_columns((0..n_categorical).collect(), (n_categorical..n_features).collect())
            .with_num_categories(self.feature_validator.num_categories_per_col()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::TaskType;
    use polars::prelude::*;

    #[test]
    fn test_dataset_properties_from_frame() {
        let x = df! {
            "x" => [0.5, 1.5, 2.5, 3.5],
            "flag" => [true, false, false, true],
        }
        .unwrap();
        let y: Vec<String> = ["a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        let mut validator = InputValidator::new(TargetType::TabularClassification);
        validator.fit(FeatureInput::from(&x), TargetInput::from(&y), None).unwrap();

        let dp = validator.dataset_properties().unwrap();
        assert_eq!(dp.task_type, Some(TaskType::MulticlassClassification));
        assert_eq!(dp.output_shape, Some(3));
        assert_eq!(dp.input_shape, Some(2));
        assert_eq!(dp.categorical_columns, Some(vec![0]));
        assert_eq!(dp.numerical_columns, Some(vec![1]));
        assert_eq!(dp.num_categories_per_col, Some(vec![2]));

        let (matrix, target) = validator
            .transform(FeatureInput::from(&x), Some(TargetInput::from(&y)))
            .unwrap();
        assert_eq!(matrix.row(0).to_vec(), vec![1.0, 0.5]);
        assert_eq!(target.unwrap().to_vec(), vec![0.0, 1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_row_count_mismatch() {
        let x = ndarray::Array2::<f64>::zeros((3, 2));
        let y = ndarray::Array1::<f64>::zeros(2);
        let mut validator = InputValidator::new(TargetType::TabularRegression);
        let err = validator.fit(FeatureInput::from(&x), TargetInput::from(&y), None).unwrap_err();
        assert!(matches!(err, AutoNetError::InvalidInput(_)));
    }

    #[test]
    fn test_properties_before_fit() {
        let validator = InputValidator::new(TargetType::TabularRegression);
        assert!(validator.dataset_properties().is_err());
    }
}
