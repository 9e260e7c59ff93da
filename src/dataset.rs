//! Dataset properties and column blocks

use crate::error::{AutoNetError, Result};
use ndarray::{concatenate, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Kind of target the pipeline is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    TabularClassification,
    TabularRegression,
}

impl TargetType {
    pub fn is_classification(&self) -> bool {
        matches!(self, TargetType::TabularClassification)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::TabularClassification => "tabular_classification",
            TargetType::TabularRegression => "tabular_regression",
        }
    }
}

/// Concrete prediction task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    BinaryClassification,
    MulticlassClassification,
    Regression,
}

impl TaskType {
    pub fn is_classification(&self) -> bool {
        !matches!(self, TaskType::Regression)
    }
}

/// Names of the dataset properties components may require
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetProperty {
    TargetType,
    TaskType,
    OutputShape,
    InputShape,
    NumericalColumns,
    CategoricalColumns,
}

impl DatasetProperty {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetProperty::TargetType => "target_type",
            DatasetProperty::TaskType => "task_type",
            DatasetProperty::OutputShape => "output_shape",
            DatasetProperty::InputShape => "input_shape",
            DatasetProperty::NumericalColumns => "numerical_columns",
            DatasetProperty::CategoricalColumns => "categorical_columns",
        }
    }
}

/// Static description of a dataset, consulted while search spaces are built.
///
/// Every field is optional so that partially described datasets can still be
/// used for the parts of the space that do not need the missing keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetProperties {
    pub target_type: Option<TargetType>,
    pub task_type: Option<TaskType>,
    /// Number of network outputs (classes, or 1 for regression)
    pub output_shape: Option<usize>,
    /// Number of validated input features
    pub input_shape: Option<usize>,
    pub numerical_columns: Option<Vec<usize>>,
    pub categorical_columns: Option<Vec<usize>>,
    /// Number of distinct categories of each categorical column
    pub num_categories_per_col: Option<Vec<usize>>,
    #[serde(default)]
    pub is_small_preprocess: bool,
    #[serde(default)]
    pub issparse: bool,
}

impl DatasetProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target_type(mut self, target_type: TargetType) -> Self {
        self.target_type = Some(target_type);
        self
    }

    pub fn with_task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = Some(task_type);
        self
    }

    pub fn with_output_shape(mut self, output_shape: usize) -> Self {
        self.output_shape = Some(output_shape);
        self
    }

    pub fn with_input_shape(mut self, input_shape: usize) -> Self {
        self.input_shape = Some(input_shape);
        self
    }

    pub fn with_columns(mut self, categorical: Vec<usize>, numerical: Vec<usize>) -> Self {
        self.categorical_columns = Some(categorical);
        self.numerical_columns = Some(numerical);
        self
    }

    pub fn with_num_categories(mut self, num_categories_per_col: Vec<usize>) -> Self {
        self.num_categories_per_col = Some(num_categories_per_col);
        self
    }

    pub fn has(&self, property: DatasetProperty) -> bool {
        match property {
            DatasetProperty::TargetType => self.target_type.is_some(),
            DatasetProperty::TaskType => self.task_type.is_some(),
            DatasetProperty::OutputShape => self.output_shape.is_some(),
            DatasetProperty::InputShape => self.input_shape.is_some(),
            DatasetProperty::NumericalColumns => self.numerical_columns.is_some(),
            DatasetProperty::CategoricalColumns => self.categorical_columns.is_some(),
        }
    }

    /// Fail with `MissingDatasetProperty` on the first absent key
    pub fn check_required(&self, required: &[DatasetProperty]) -> Result<()> {
        match required.iter().find(|p| !self.has(**p)) {
            Some(missing) => Err(AutoNetError::MissingDatasetProperty(missing.as_str().to_string())),
            None => Ok(()),
        }
    }

    fn missing(property: DatasetProperty) -> AutoNetError {
        AutoNetError::MissingDatasetProperty(property.as_str().to_string())
    }

    pub fn require_target_type(&self) -> Result<TargetType> {
        self.target_type.ok_or_else(|| Self::missing(DatasetProperty::TargetType))
    }

    pub fn require_task_type(&self) -> Result<TaskType> {
        self.task_type.ok_or_else(|| Self::missing(DatasetProperty::TaskType))
    }

    pub fn require_output_shape(&self) -> Result<usize> {
        self.output_shape.ok_or_else(|| Self::missing(DatasetProperty::OutputShape))
    }

    pub fn require_numerical_columns(&self) -> Result<&[usize]> {
        self.numerical_columns
            .as_deref()
            .ok_or_else(|| Self::missing(DatasetProperty::NumericalColumns))
    }

    pub fn require_categorical_columns(&self) -> Result<&[usize]> {
        self.categorical_columns
            .as_deref()
            .ok_or_else(|| Self::missing(DatasetProperty::CategoricalColumns))
    }

    /// True when the dataset is known to have no categorical columns
    pub fn has_no_categorical(&self) -> bool {
        self.categorical_columns.as_ref().map(|c| c.is_empty()).unwrap_or(false)
    }

    /// True when the dataset is known to have no numerical columns
    pub fn has_no_numerical(&self) -> bool {
        self.numerical_columns.as_ref().map(|c| c.is_empty()).unwrap_or(false)
    }

    pub fn is_classification(&self) -> bool {
        self.target_type.map(|t| t.is_classification()).unwrap_or(false)
    }
}

/// Feature matrix split into its categorical and numerical parts.
///
/// `categorical_widths[i]` is the number of columns original categorical
/// feature `i` occupies in `categorical` (1 until an encoder expands it).
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBlocks {
    pub categorical: Array2<f64>,
    pub numerical: Array2<f64>,
    pub categorical_widths: Vec<usize>,
}

impl ColumnBlocks {
    /// Split `x` by column indices
    pub fn split(x: &Array2<f64>, categorical: &[usize], numerical: &[usize]) -> Result<Self> {
        if let Some(&bad) = categorical.iter().chain(numerical).find(|&&c| c >= x.ncols()) {
            return Err(AutoNetError::Shape {
                expected: format!("column index < {}", x.ncols()),
                actual: bad.to_string(),
            });
        }
        Ok(Self {
            categorical: x.select(Axis(1), categorical),
            numerical: x.select(Axis(1), numerical),
            categorical_widths: vec![1; categorical.len()],
        })
    }

    pub fn n_rows(&self) -> usize {
        self.categorical.nrows().max(self.numerical.nrows())
    }

    /// `[categorical | numerical]`
    pub fn concat(&self) -> Result<Array2<f64>> {
        Ok(concatenate(Axis(1), &[self.categorical.view(), self.numerical.view()])?)
    }

    pub fn with_categorical(&self, categorical: Array2<f64>, widths: Vec<usize>) -> Self {
        Self {
            categorical,
            numerical: self.numerical.clone(),
            categorical_widths: widths,
        }
    }

    pub fn with_numerical(&self, numerical: Array2<f64>) -> Self {
        Self {
            categorical: self.categorical.clone(),
            numerical,
            categorical_widths: self.categorical_widths.clone(),
        }
    }
}

/// Training (and optional validation) data handed to a pipeline fit
#[derive(Debug, Clone)]
pub struct TabularData {
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_valid: Option<Array2<f64>>,
    pub y_valid: Option<Array1<f64>>,
}

impl TabularData {
    pub fn new(x_train: Array2<f64>, y_train: Array1<f64>) -> Result<Self> {
        if x_train.nrows() != y_train.len() {
            return Err(AutoNetError::invalid_input(format!(
                "X has {} rows but y has {} entries",
                x_train.nrows(),
                y_train.len()
            )));
        }
        if x_train.nrows() == 0 {
            return Err(AutoNetError::invalid_input("training data is empty"));
        }
        Ok(Self {
            x_train,
            y_train,
            x_valid: None,
            y_valid: None,
        })
    }

    pub fn with_validation(mut self, x_valid: Array2<f64>, y_valid: Array1<f64>) -> Result<Self> {
        if x_valid.nrows() != y_valid.len() {
            return Err(AutoNetError::invalid_input(format!(
                "X_valid has {} rows but y_valid has {} entries",
                x_valid.nrows(),
                y_valid.len()
            )));
        }
        if x_valid.ncols() != self.x_train.ncols() {
            return Err(AutoNetError::Shape {
                expected: format!("{} validation columns", self.x_train.ncols()),
                actual: x_valid.ncols().to_string(),
            });
        }
        self.x_valid = Some(x_valid);
        self.y_valid = Some(y_valid);
        Ok(self)
    }
}
