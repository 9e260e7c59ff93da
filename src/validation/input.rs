//! Accepted raw input forms and their conversion to polars frames

use crate::error::{AutoNetError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use tracing::warn;

/// Which form the caller handed in; tracked so a change between calls can
/// be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Frame,
    Array,
    Rows,
}

/// Raw feature matrix
#[derive(Debug, Clone, Copy)]
pub enum FeatureInput<'a> {
    Frame(&'a DataFrame),
    Array(&'a Array2<f64>),
    /// Row lists; coerced to a frame with a warning
    Rows(&'a [Vec<f64>]),
}

impl<'a> From<&'a DataFrame> for FeatureInput<'a> {
    fn from(df: &'a DataFrame) -> Self {
        FeatureInput::Frame(df)
    }
}

impl<'a> From<&'a Array2<f64>> for FeatureInput<'a> {
    fn from(x: &'a Array2<f64>) -> Self {
        FeatureInput::Array(x)
    }
}

impl<'a> From<&'a [Vec<f64>]> for FeatureInput<'a> {
    fn from(rows: &'a [Vec<f64>]) -> Self {
        FeatureInput::Rows(rows)
    }
}

impl<'a> From<&'a Vec<Vec<f64>>> for FeatureInput<'a> {
    fn from(rows: &'a Vec<Vec<f64>>) -> Self {
        FeatureInput::Rows(rows.as_slice())
    }
}

fn positional_frame(columns: Vec<Vec<f64>>) -> Result<DataFrame> {
    let columns: Vec<Column> = columns
        .into_iter()
        .enumerate()
        .map(|(j, values)| Column::new(j.to_string().into(), values))
        .collect();
    Ok(DataFrame::new(columns)?)
}

impl FeatureInput<'_> {
    pub fn kind(&self) -> InputKind {
        match self {
            FeatureInput::Frame(_) => InputKind::Frame,
            FeatureInput::Array(_) => InputKind::Array,
            FeatureInput::Rows(_) => InputKind::Rows,
        }
    }

    pub fn n_rows(&self) -> usize {
        match self {
            FeatureInput::Frame(df) => df.height(),
            FeatureInput::Array(x) => x.nrows(),
            FeatureInput::Rows(rows) => rows.len(),
        }
    }

    /// Convert to a frame; arrays and row lists get positional column names
    pub fn to_frame(&self) -> Result<DataFrame> {
        match self {
            FeatureInput::Frame(df) => Ok((*df).clone()),
            FeatureInput::Array(x) => positional_frame(x.columns().into_iter().map(|c| c.to_vec()).collect()),
            FeatureInput::Rows(rows) => {
                warn!(n_rows = rows.len(), "row lists are not a frame; coercing them to one");
                let width = rows.first().map(Vec::len).unwrap_or(0);
                if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
                    return Err(AutoNetError::invalid_input(format!(
                        "row {} has {} values, expected {}",
                        i,
                        row.len(),
                        width
                    )));
                }
                positional_frame((0..width).map(|j| rows.iter().map(|r| r[j]).collect()).collect())
            }
        }
    }
}

/// Raw target vector
#[derive(Debug, Clone, Copy)]
pub enum TargetInput<'a> {
    Series(&'a Series),
    Array(&'a Array1<f64>),
    Labels(&'a [String]),
}

impl<'a> From<&'a Series> for TargetInput<'a> {
    fn from(s: &'a Series) -> Self {
        TargetInput::Series(s)
    }
}

impl<'a> From<&'a Array1<f64>> for TargetInput<'a> {
    fn from(y: &'a Array1<f64>) -> Self {
        TargetInput::Array(y)
    }
}

impl<'a> From<&'a [String]> for TargetInput<'a> {
    fn from(labels: &'a [String]) -> Self {
        TargetInput::Labels(labels)
    }
}

impl<'a> From<&'a Vec<String>> for TargetInput<'a> {
    fn from(labels: &'a Vec<String>) -> Self {
        TargetInput::Labels(labels.as_slice())
    }
}

impl TargetInput<'_> {
    pub fn len(&self) -> usize {
        match self {
            TargetInput::Series(s) => s.len(),
            TargetInput::Array(y) => y.len(),
            TargetInput::Labels(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_series(&self) -> Series {
        match self {
            TargetInput::Series(s) => (*s).clone(),
            TargetInput::Array(y) => Series::new("target".into(), y.to_vec()),
            TargetInput::Labels(l) => Series::new("target".into(), l.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_array_to_frame_uses_positional_names() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let df = FeatureInput::from(&x).to_frame().unwrap();
        assert_eq!(df.shape(), (3, 2));
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["0", "1"]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        let err = FeatureInput::from(&rows).to_frame().unwrap_err();
        assert!(matches!(err, AutoNetError::InvalidInput(_)));
    }

    #[test]
    fn test_rows_are_transposed() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let df = FeatureInput::from(&rows).to_frame().unwrap();
        let first: Vec<Option<f64>> = df.column("0").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(first, vec![Some(1.0), Some(3.0)]);
    }
}
