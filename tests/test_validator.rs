//! Integration test: feature/target validation on polars frames

use autonet::dataset::{TargetType, TaskType};
use autonet::error::{AutoNetError, ErrorKind};
use autonet::validation::{FeatureInput, FeatureValidator, InputValidator, TargetInput};
use ndarray::array;
use polars::prelude::*;

fn mixed_frame() -> DataFrame {
    let colour = Series::new("colour".into(), ["red", "blue", "red", "green", "blue"])
        .cast(&DataType::Categorical(None, CategoricalOrdering::Physical))
        .unwrap();
    DataFrame::new(vec![
        Column::new("A".into(), [1i64, 2, 3, 4, 5]),
        colour.into(),
        Column::new("C".into(), [Some(0.5), None, Some(1.5), Some(2.0), Some(2.5)]),
    ])
    .unwrap()
}

#[test]
fn test_fit_transform_shape_and_idempotence() {
    let df = mixed_frame();
    let mut validator = FeatureValidator::new();
    validator.fit(FeatureInput::from(&df), None).unwrap();
    let first = validator.transform(FeatureInput::from(&df)).unwrap();
    let second = validator.transform(FeatureInput::from(&df)).unwrap();
    assert_eq!(first.dim(), (5, 3));
    assert_eq!(first.iter().filter(|v| v.is_nan()).count(), 1);
    for (a, b) in first.iter().zip(second.iter()) {
        assert!(a == b || (a.is_nan() && b.is_nan()));
    }
}

#[test]
fn test_reordered_columns_are_schema_drift() {
    let df = df! {
        "A" => [1i64, 2, 3],
        "B" => [true, false, true],
    }
    .unwrap();
    let mut validator = FeatureValidator::new();
    validator.fit(FeatureInput::from(&df), None).unwrap();
    let reordered = df.select(["B", "A"]).unwrap();
    let err = validator.transform(FeatureInput::from(&reordered)).unwrap_err();
    assert!(matches!(err, AutoNetError::SchemaDrift { .. }));
    assert_eq!(err.kind(), ErrorKind::Value);
}

#[test]
fn test_test_categories_are_known() {
    let train = df! { "c" => [true, true] }.unwrap();
    let test = df! { "c" => [false] }.unwrap();
    let mut validator = FeatureValidator::new();
    validator
        .fit(FeatureInput::from(&train), Some(FeatureInput::from(&test)))
        .unwrap();
    let x = validator.transform(FeatureInput::from(&test)).unwrap();
    assert_eq!(x[[0, 0]], 0.0);
}

#[test]
fn test_row_lists_are_coerced() {
    let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
    let mut validator = FeatureValidator::new();
    let x = validator.fit_transform(FeatureInput::from(&rows)).unwrap();
    assert_eq!(x, array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
}

#[test]
fn test_array_width_change_is_schema_drift() {
    let x = array![[1.0, 2.0], [3.0, 4.0]];
    let mut validator = FeatureValidator::new();
    validator.fit(FeatureInput::from(&x), None).unwrap();
    let wider = array![[1.0, 2.0, 3.0]];
    assert!(matches!(
        validator.transform(FeatureInput::from(&wider)).unwrap_err(),
        AutoNetError::SchemaDrift { .. }
    ));
}

#[test]
fn test_input_validator_end_to_end() {
    let df = mixed_frame();
    let y = Series::new("label".into(), ["yes", "no", "yes", "no", "yes"]);
    let mut validator = InputValidator::new(TargetType::TabularClassification);
    validator
        .fit(FeatureInput::from(&df), TargetInput::from(&y), None)
        .unwrap();

    let dp = validator.dataset_properties().unwrap();
    assert_eq!(dp.task_type, Some(TaskType::BinaryClassification));
    assert_eq!(dp.categorical_columns, Some(vec![0]));
    assert_eq!(dp.numerical_columns, Some(vec![1, 2]));
    assert_eq!(dp.num_categories_per_col, Some(vec![3]));

    let (_, encoded) = validator
        .transform(FeatureInput::from(&df), Some(TargetInput::from(&y)))
        .unwrap();
    assert_eq!(encoded.unwrap(), array![1.0, 0.0, 1.0, 0.0, 1.0]);
}
