//! Feature validation: column typing, ordinal encoding, schema drift checks

use super::input::{FeatureInput, InputKind};
use crate::error::{AutoNetError, Result};
use ndarray::Array2;
use polars::prelude::*;
use tracing::{debug, warn};

/// How a column is fed to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Categorical,
    Numerical,
}

#[derive(Debug, Clone)]
struct FittedColumn {
    name: String,
    dtype: DataType,
    kind: ColumnKind,
    /// Sorted categories seen at fit time; empty for numerical columns
    categories: Vec<String>,
}

/// Infers the type of every column at fit time and turns later inputs into
/// a dense matrix with categorical columns first.
///
/// Categorical columns (boolean, polars categorical, and strings when
/// `infer_string_categoricals` is set) are encoded by their rank among the
/// sorted categories seen at fit time. Unknown categories encode as `-1`,
/// missing values as NaN. Numerical columns are cast to `f64`.
#[derive(Debug, Clone, Default)]
pub struct FeatureValidator {
    infer_string_categoricals: bool,
    columns: Vec<FittedColumn>,
    input_kind: Option<InputKind>,
    is_fitted: bool,
}

fn column_kind(name: &str, series: &Series, infer_string_categoricals: bool) -> Result<ColumnKind> {
    if series.len() > 0 && series.null_count() == series.len() {
        return Ok(ColumnKind::Numerical);
    }
    match series.dtype() {
        DataType::Boolean | DataType::Categorical(_, _) => Ok(ColumnKind::Categorical),
        DataType::String if infer_string_categoricals => Ok(ColumnKind::Categorical),
        DataType::String => Err(AutoNetError::UnsupportedType {
            column: name.to_string(),
            detail: "string columns must be cast to categorical first (or enable infer_string_categoricals)"
                .to_string(),
        }),
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
        | DataType::Null => Ok(ColumnKind::Numerical),
        DataType::Date | DataType::Datetime(_, _) | DataType::Duration(_) | DataType::Time => {
            Err(AutoNetError::UnsupportedType {
                column: name.to_string(),
                detail: format!(
                    "temporal dtype {} is not supported; convert it to numerical features first",
                    series.dtype()
                ),
            })
        }
        other => Err(AutoNetError::UnsupportedType {
            column: name.to_string(),
            detail: format!("dtype {} is not supported", other),
        }),
    }
}

fn category_strings(series: &Series) -> Result<Vec<Option<String>>> {
    let as_string = series.cast(&DataType::String)?;
    Ok(as_string.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
}

fn numerical_values(series: &Series) -> Result<Vec<f64>> {
    let as_float = series.cast(&DataType::Float64)?;
    Ok(as_float.f64()?.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

impl FeatureValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat string columns as categorical instead of rejecting them
    pub fn with_infer_string_categoricals(mut self, infer: bool) -> Self {
        self.infer_string_categoricals = infer;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_kinds(&self) -> Vec<ColumnKind> {
        self.columns.iter().map(|c| c.kind).collect()
    }

    /// Names of categorical columns, in input order
    pub fn categorical_columns(&self) -> Vec<&str> {
        self.columns_of(ColumnKind::Categorical)
    }

    pub fn numerical_columns(&self) -> Vec<&str> {
        self.columns_of(ColumnKind::Numerical)
    }

    fn columns_of(&self, kind: ColumnKind) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Categories per categorical column, in output order
    pub fn num_categories_per_col(&self) -> Vec<usize> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Categorical)
            .map(|c| c.categories.len())
            .collect()
    }

    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|c| c.name == column && c.kind == ColumnKind::Categorical)
            .map(|c| c.categories.as_slice())
    }

    /// Infer column types and fit the category encoding on the training
    /// features (plus the test features, when given)
    pub fn fit(&mut self, x_train: FeatureInput<'_>, x_test: Option<FeatureInput<'_>>) -> Result<()> {
        let train = x_train.to_frame()?;
        if train.width() == 0 || train.height() == 0 {
            return Err(AutoNetError::invalid_input("cannot fit on empty features"));
        }
        // the schema recorded by the first fit is fixed for the validator's lifetime
        if self.is_fitted {
            self.check_schema(&train, x_train.kind())?;
        }

        let mut columns = Vec::with_capacity(train.width());
        for column in train.get_columns() {
            let name = column.name().to_string();
            let series = column.as_materialized_series();
            let kind = column_kind(&name, series, self.infer_string_categoricals)?;
            columns.push(FittedColumn {
                name,
                dtype: series.dtype().clone(),
                kind,
                categories: Vec::new(),
            });
        }
        self.columns = columns;
        self.input_kind = Some(x_train.kind());

        let test = match x_test {
            Some(x_test) => {
                let test = x_test.to_frame()?;
                self.check_schema(&test, x_test.kind())?;
                Some(test)
            }
            None => None,
        };

        for (position, fitted) in self.columns.iter_mut().enumerate() {
            if fitted.kind != ColumnKind::Categorical {
                continue;
            }
            let mut seen = category_strings(train.get_columns()[position].as_materialized_series())?;
            if let Some(test) = &test {
                seen.extend(category_strings(test.get_columns()[position].as_materialized_series())?);
            }
            let mut categories: Vec<String> = seen.into_iter().flatten().collect();
            categories.sort();
            categories.dedup();
            fitted.categories = categories;
        }

        debug!(
            n_features = self.columns.len(),
            n_categorical = self.categorical_columns().len(),
            "fitted feature validator"
        );
        self.is_fitted = true;
        Ok(())
    }

    fn check_schema(&self, df: &DataFrame, kind: InputKind) -> Result<()> {
        if df.width() != self.columns.len() {
            return Err(AutoNetError::SchemaDrift {
                expected: format!("{} features", self.columns.len()),
                actual: format!("{} features", df.width()),
            });
        }
        if self.input_kind != Some(kind) {
            warn!(
                fitted = ?self.input_kind,
                given = ?kind,
                "feature input type changed between calls"
            );
            return Ok(());
        }
        if kind == InputKind::Frame {
            let given: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
            let expected: Vec<&str> = self.column_names();
            if given.iter().map(String::as_str).ne(expected.iter().copied()) {
                return Err(AutoNetError::SchemaDrift {
                    expected: format!("columns {:?}", expected),
                    actual: format!("columns {:?}", given),
                });
            }
        }
        for (fitted, column) in self.columns.iter().zip(df.get_columns()) {
            if column.dtype() != &fitted.dtype && column.null_count() != column.len() {
                return Err(AutoNetError::SchemaDrift {
                    expected: format!("column '{}' of dtype {}", fitted.name, fitted.dtype),
                    actual: format!("dtype {}", column.dtype()),
                });
            }
        }
        Ok(())
    }

    /// Encode `x` with the fitted column types; categorical columns first
    pub fn transform(&self, x: FeatureInput<'_>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(AutoNetError::not_fitted(
                "the feature validator must be fitted before transform",
            ));
        }
        let df = x.to_frame()?;
        self.check_schema(&df, x.kind())?;

        let n_rows = df.height();
        let ordered = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == ColumnKind::Categorical)
            .chain(self.columns.iter().enumerate().filter(|(_, c)| c.kind == ColumnKind::Numerical));

        let mut out = Array2::<f64>::zeros((n_rows, self.columns.len()));
        for (j, (position, fitted)) in ordered.enumerate() {
            let series = df.get_columns()[position].as_materialized_series();
            let values = match fitted.kind {
                ColumnKind::Numerical => numerical_values(series)?,
                ColumnKind::Categorical => category_strings(series)?
                    .into_iter()
                    .map(|v| match v {
                        None => f64::NAN,
                        Some(v) => fitted
                            .categories
                            .binary_search(&v)
                            .map(|code| code as f64)
                            .unwrap_or(-1.0),
                    })
                    .collect(),
            };
            for (i, v) in values.into_iter().enumerate() {
                out[[i, j]] = v;
            }
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: FeatureInput<'_>) -> Result<Array2<f64>> {
        self.fit(x, None)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        let city = Series::new("city".into(), ["paris", "oslo", "paris", "rome"])
            .cast(&DataType::Categorical(None, CategoricalOrdering::Physical))
            .unwrap();
        DataFrame::new(vec![
            Column::new("age".into(), [31i64, 45, 27, 52]),
            city.into(),
            Column::new("member".into(), [true, false, true, true]),
        ])
        .unwrap()
    }

    #[test]
    fn test_categoricals_first_and_ordinal() {
        let df = frame();
        let mut validator = FeatureValidator::new();
        let x = validator.fit_transform(FeatureInput::from(&df)).unwrap();
        assert_eq!(validator.categorical_columns(), vec!["city", "member"]);
        assert_eq!(validator.numerical_columns(), vec!["age"]);
        assert_eq!(validator.num_categories_per_col(), vec![3, 2]);
        // oslo < paris < rome; false < true
        assert_eq!(x.row(0).to_vec(), vec![1.0, 1.0, 31.0]);
        assert_eq!(x.row(1).to_vec(), vec![0.0, 0.0, 45.0]);
        assert_eq!(x.row(3).to_vec(), vec![2.0, 1.0, 52.0]);
    }

    #[test]
    fn test_transform_before_fit() {
        let df = frame();
        let err = FeatureValidator::new().transform(FeatureInput::from(&df)).unwrap_err();
        assert!(matches!(err, AutoNetError::NotFitted(_)));
    }

    #[test]
    fn test_string_columns_rejected_unless_inferred() {
        let df = df! { "city" => ["a", "b"], "x" => [1.0, 2.0] }.unwrap();
        let err = FeatureValidator::new().fit(FeatureInput::from(&df), None).unwrap_err();
        assert!(matches!(err, AutoNetError::UnsupportedType { .. }));

        let mut validator = FeatureValidator::new().with_infer_string_categoricals(true);
        validator.fit(FeatureInput::from(&df), None).unwrap();
        assert_eq!(validator.categorical_columns(), vec!["city"]);
    }

    #[test]
    fn test_all_null_column_is_numerical() {
        let df = df! {
            "empty" => [None::<f64>, None, None],
            "x" => [1.0, 2.0, 3.0],
        }
        .unwrap();
        let mut validator = FeatureValidator::new();
        let x = validator.fit_transform(FeatureInput::from(&df)).unwrap();
        assert_eq!(validator.numerical_columns(), vec!["empty", "x"]);
        assert!(x.column(0).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_refit_keeps_first_schema() {
        let df = df! {
            "a" => [1i64, 2, 3],
            "b" => [true, false, true],
        }
        .unwrap();
        let mut validator = FeatureValidator::new();
        validator.fit(FeatureInput::from(&df), None).unwrap();

        let reordered = df.select(["b", "a"]).unwrap();
        let err = validator.fit(FeatureInput::from(&reordered), None).unwrap_err();
        assert!(matches!(err, AutoNetError::SchemaDrift { .. }));
        assert_eq!(validator.column_names(), vec!["a", "b"]);

        // same schema, new rows: categories are refitted
        let more = df! {
            "a" => [4i64, 5],
            "b" => [false, false],
        }
        .unwrap();
        validator.fit(FeatureInput::from(&more), None).unwrap();
        assert_eq!(validator.num_categories_per_col(), vec![1]);
    }

    #[test]
    fn test_schema_drift_detected() {
        let df = frame();
        let mut validator = FeatureValidator::new();
        validator.fit(FeatureInput::from(&df), None).unwrap();

        let reordered = df.select(["city", "age", "member"]).unwrap();
        let err = validator.transform(FeatureInput::from(&reordered)).unwrap_err();
        assert!(matches!(err, AutoNetError::SchemaDrift { .. }));

        let narrower = df.select(["age", "city"]).unwrap();
        assert!(matches!(
            validator.transform(FeatureInput::from(&narrower)).unwrap_err(),
            AutoNetError::SchemaDrift { .. }
        ));

        let mut retyped = df.clone();
        let age = df.column("age").unwrap().cast(&DataType::Float64).unwrap();
        retyped.with_column(age).unwrap();
        assert!(matches!(
            validator.transform(FeatureInput::from(&retyped)).unwrap_err(),
            AutoNetError::SchemaDrift { .. }
        ));
    }

    #[test]
    fn test_unknown_and_missing_categories() {
        let train = df! { "c" => [true, true] }.unwrap();
        let mut validator = FeatureValidator::new();
        validator.fit(FeatureInput::from(&train), None).unwrap();
        let later = df! { "c" => [Some(false), None, Some(true)] }.unwrap();
        let x = validator.transform(FeatureInput::from(&later)).unwrap();
        assert_eq!(x[[0, 0]], -1.0);
        assert!(x[[1, 0]].is_nan());
        assert_eq!(x[[2, 0]], 0.0);
    }

    #[test]
    fn test_temporal_columns_rejected() {
        let t = Series::new("t".into(), [1i64, 2])
            .cast(&DataType::Duration(TimeUnit::Milliseconds))
            .unwrap();
        let df = DataFrame::new(vec![t.into()]).unwrap();
        let err = FeatureValidator::new().fit(FeatureInput::from(&df), None).unwrap_err();
        assert!(matches!(err, AutoNetError::UnsupportedType { .. }));
    }
}
