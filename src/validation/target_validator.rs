//! Target validation and label encoding

use super::input::TargetInput;
use crate::dataset::{TargetType, TaskType};
use crate::error::{AutoNetError, Result};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Label-encodes classification targets (classes in sorted order) and
/// checks that regression targets are numeric
#[derive(Debug, Clone)]
pub struct TargetValidator {
    target_type: TargetType,
    classes: Option<Series>,
    class_index: HashMap<String, usize>,
    is_fitted: bool,
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn label_series(y: TargetInput<'_>) -> Result<Series> {
    let series = y.to_series();
    if series.is_empty() {
        return Err(AutoNetError::invalid_input("the target is empty"));
    }
    if series.null_count() > 0 {
        return Err(AutoNetError::invalid_input(format!(
            "the target contains {} missing values",
            series.null_count()
        )));
    }
    match series.dtype() {
        DataType::Categorical(_, _) => Ok(series.cast(&DataType::String)?),
        _ => Ok(series),
    }
}

fn label_keys(series: &Series) -> Result<Vec<String>> {
    let as_string = series.cast(&DataType::String)?;
    Ok(as_string
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

impl TargetValidator {
    pub fn new(target_type: TargetType) -> Self {
        Self {
            target_type,
            classes: None,
            class_index: HashMap::new(),
            is_fitted: false,
        }
    }

    pub fn target_type(&self) -> TargetType {
        self.target_type
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Sorted class labels; `None` for regression
    pub fn classes(&self) -> Option<&Series> {
        self.classes.as_ref()
    }

    pub fn n_classes(&self) -> usize {
        self.class_index.len()
    }

    pub fn task_type(&self) -> TaskType {
        match self.target_type {
            TargetType::TabularRegression => TaskType::Regression,
            TargetType::TabularClassification if self.n_classes() <= 2 => TaskType::BinaryClassification,
            TargetType::TabularClassification => TaskType::MulticlassClassification,
        }
    }

    /// Number of network outputs
    pub fn output_shape(&self) -> usize {
        match self.target_type {
            TargetType::TabularRegression => 1,
            TargetType::TabularClassification => self.n_classes(),
        }
    }

    pub fn fit(&mut self, y_train: TargetInput<'_>, y_test: Option<TargetInput<'_>>) -> Result<()> {
        let mut labels = label_series(y_train)?;
        if let Some(y_test) = y_test {
            let test = label_series(y_test)?.cast(labels.dtype())?;
            labels.append(&test)?;
        }

        match self.target_type {
            TargetType::TabularRegression => {
                if !is_numeric(labels.dtype()) {
                    return Err(AutoNetError::UnsupportedType {
                        column: "target".to_string(),
                        detail: format!("regression targets must be numeric, got {}", labels.dtype()),
                    });
                }
                self.classes = None;
                self.class_index.clear();
            }
            TargetType::TabularClassification => {
                let classes = labels.unique()?.sort(SortOptions::default())?;
                if classes.len() < 2 {
                    return Err(AutoNetError::invalid_input(format!(
                        "classification needs at least two classes, got {}",
                        classes.len()
                    )));
                }
                self.class_index = label_keys(&classes)?
                    .into_iter()
                    .enumerate()
                    .map(|(i, key)| (key, i))
                    .collect();
                debug!(n_classes = classes.len(), "fitted target validator");
                self.classes = Some(classes);
            }
        }
        self.is_fitted = true;
        Ok(())
    }

    /// Class indices for classification, `f64` values for regression
    pub fn transform(&self, y: TargetInput<'_>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(AutoNetError::not_fitted(
                "the target validator must be fitted before transform",
            ));
        }
        let labels = label_series(y)?;
        match self.target_type {
            TargetType::TabularRegression => {
                if !is_numeric(labels.dtype()) {
                    return Err(AutoNetError::UnsupportedType {
                        column: "target".to_string(),
                        detail: format!("regression targets must be numeric, got {}", labels.dtype()),
                    });
                }
                let values = labels.cast(&DataType::Float64)?;
                Ok(values.f64()?.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            }
            TargetType::TabularClassification => label_keys(&labels)?
                .iter()
                .map(|key| {
                    self.class_index
                        .get(key)
                        .map(|&i| i as f64)
                        .ok_or_else(|| AutoNetError::invalid_input(format!("label '{}' was not seen during fit", key)))
                })
                .collect(),
        }
    }

    /// Map encoded predictions back to the original labels
    pub fn inverse_transform(&self, y: &Array1<f64>) -> Result<Series> {
        if !self.is_fitted {
            return Err(AutoNetError::not_fitted(
                "the target validator must be fitted before inverse_transform",
            ));
        }
        let classes = match &self.classes {
            None => return Ok(Series::new("target".into(), y.to_vec())),
            Some(classes) => classes,
        };
        let indices = y
            .iter()
            .map(|&v| {
                if v >= 0.0 && v.fract() == 0.0 && (v as usize) < classes.len() {
                    Ok(v as IdxSize)
                } else {
                    Err(AutoNetError::invalid_input(format!(
                        "{} is not a class index of {} classes",
                        v,
                        classes.len()
                    )))
                }
            })
            .collect::<Result<Vec<IdxSize>>>()?;
        Ok(classes.take(&IdxCa::from_vec("target".into(), indices))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_string_labels_sorted_and_encoded() {
        let labels: Vec<String> = ["dog", "cat", "emu", "cat"].iter().map(|s| s.to_string()).collect();
        let mut validator = TargetValidator::new(TargetType::TabularClassification);
        validator.fit(TargetInput::from(&labels), None).unwrap();
        assert_eq!(validator.n_classes(), 3);
        assert_eq!(validator.task_type(), TaskType::MulticlassClassification);
        let y = validator.transform(TargetInput::from(&labels)).unwrap();
        assert_eq!(y, array![1.0, 0.0, 2.0, 0.0]);

        let back = validator.inverse_transform(&array![2.0, 0.0]).unwrap();
        let back: Vec<Option<&str>> = back.str().unwrap().into_iter().collect();
        assert_eq!(back, vec![Some("emu"), Some("cat")]);
    }

    #[test]
    fn test_numeric_labels_sort_numerically() {
        let y = Series::new("y".into(), [10i64, 2, 10, 2]);
        let mut validator = TargetValidator::new(TargetType::TabularClassification);
        validator.fit(TargetInput::from(&y), None).unwrap();
        assert_eq!(validator.task_type(), TaskType::BinaryClassification);
        assert_eq!(validator.transform(TargetInput::from(&y)).unwrap(), array![1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unseen_label_and_bad_index() {
        let y = array![0.0, 1.0];
        let mut validator = TargetValidator::new(TargetType::TabularClassification);
        validator.fit(TargetInput::from(&y), None).unwrap();
        assert!(validator.transform(TargetInput::from(&array![3.0])).is_err());
        assert!(validator.inverse_transform(&array![2.0]).is_err());
    }

    #[test]
    fn test_regression_requires_numbers() {
        let labels: Vec<String> = vec!["a".into(), "b".into()];
        let mut validator = TargetValidator::new(TargetType::TabularRegression);
        let err = validator.fit(TargetInput::from(&labels), None).unwrap_err();
        assert!(matches!(err, AutoNetError::UnsupportedType { .. }));

        let y = array![0.5, 1.5, -2.0];
        validator.fit(TargetInput::from(&y), None).unwrap();
        assert_eq!(validator.output_shape(), 1);
        assert_eq!(validator.transform(TargetInput::from(&y)).unwrap(), y);
    }

    #[test]
    fn test_missing_labels_rejected() {
        let y = Series::new("y".into(), [Some(1i64), None]);
        let mut validator = TargetValidator::new(TargetType::TabularClassification);
        assert!(validator.fit(TargetInput::from(&y), None).is_err());
    }
}
