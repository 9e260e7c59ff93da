//! Evaluation metrics
//!
//! Every metric knows its optimum and whether greater is better, so a raw
//! score can always be turned into a loss the search minimises.

use crate::dataset::TargetType;
use crate::error::{AutoNetError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

const LOG_LOSS_EPS: f64 = 1e-15;

/// A named metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Accuracy,
    BalancedAccuracy,
    LogLoss,
    MeanSquaredError,
    MeanAbsoluteError,
    R2,
}

impl Metric {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "accuracy" => Ok(Metric::Accuracy),
            "balanced_accuracy" => Ok(Metric::BalancedAccuracy),
            "log_loss" => Ok(Metric::LogLoss),
            "mean_squared_error" | "mse" => Ok(Metric::MeanSquaredError),
            "mean_absolute_error" | "mae" => Ok(Metric::MeanAbsoluteError),
            "r2" => Ok(Metric::R2),
            other => Err(AutoNetError::configuration(format!("unknown metric '{}'", other))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
            Metric::BalancedAccuracy => "balanced_accuracy",
            Metric::LogLoss => "log_loss",
            Metric::MeanSquaredError => "mean_squared_error",
            Metric::MeanAbsoluteError => "mean_absolute_error",
            Metric::R2 => "r2",
        }
    }

    /// Metric used when the caller names none
    pub fn default_for(target_type: TargetType) -> Self {
        if target_type.is_classification() {
            Metric::Accuracy
        } else {
            Metric::R2
        }
    }

    pub fn is_classification(&self) -> bool {
        matches!(self, Metric::Accuracy | Metric::BalancedAccuracy | Metric::LogLoss)
    }

    pub fn greater_is_better(&self) -> bool {
        matches!(self, Metric::Accuracy | Metric::BalancedAccuracy | Metric::R2)
    }

    pub fn optimum(&self) -> f64 {
        match self {
            Metric::Accuracy | Metric::BalancedAccuracy | Metric::R2 => 1.0,
            Metric::LogLoss | Metric::MeanSquaredError | Metric::MeanAbsoluteError => 0.0,
        }
    }

    /// Distance of `score` from the optimum; 0 is perfect
    pub fn loss(&self, score: f64) -> f64 {
        if self.greater_is_better() {
            self.optimum() - score
        } else {
            score - self.optimum()
        }
    }

    /// Fail unless the metric fits the target type
    pub fn check_target(&self, target_type: TargetType) -> Result<()> {
        if self.is_classification() != target_type.is_classification() {
            return Err(AutoNetError::configuration(format!(
                "metric '{}' cannot score a {} task",
                self,
                target_type.as_str()
            )));
        }
        Ok(())
    }

    /// Score `outputs` against `y_true`.
    ///
    /// Classification outputs are class probabilities (one column per
    /// class, labels are column indices); regression outputs are a single
    /// column of predictions.
    pub fn score(&self, y_true: ArrayView1<f64>, outputs: &Array2<f64>) -> Result<f64> {
        if y_true.len() != outputs.nrows() {
            return Err(AutoNetError::Shape {
                expected: format!("{} prediction rows", y_true.len()),
                actual: outputs.nrows().to_string(),
            });
        }
        if y_true.is_empty() {
            return Err(AutoNetError::invalid_input(format!("cannot compute {} on no samples", self)));
        }
        let score = match self {
            Metric::Accuracy => accuracy(y_true, &argmax(outputs)),
            Metric::BalancedAccuracy => balanced_accuracy(y_true, &argmax(outputs)),
            Metric::LogLoss => log_loss(y_true, outputs)?,
            Metric::MeanSquaredError => {
                let errors = &y_true - &regression_column(outputs)?;
                errors.mapv(|e| e * e).mean().unwrap_or(0.0)
            }
            Metric::MeanAbsoluteError => {
                let errors = &y_true - &regression_column(outputs)?;
                errors.mapv(f64::abs).mean().unwrap_or(0.0)
            }
            Metric::R2 => r2(y_true, &regression_column(outputs)?),
        };
        Ok(score)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Index of the largest entry of every row
pub fn argmax(outputs: &Array2<f64>) -> Array1<f64> {
    outputs
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0usize, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
                .0 as f64
        })
        .collect()
}

fn regression_column(outputs: &Array2<f64>) -> Result<Array1<f64>> {
    if outputs.ncols() != 1 {
        return Err(AutoNetError::Shape {
            expected: "a single prediction column".to_string(),
            actual: format!("{} columns", outputs.ncols()),
        });
    }
    Ok(outputs.column(0).to_owned())
}

fn accuracy(y_true: ArrayView1<f64>, y_pred: &Array1<f64>) -> f64 {
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| (*t - *p).abs() < 0.5).count();
    correct as f64 / y_true.len() as f64
}

/// Mean of the per-class recalls over the classes present in `y_true`
fn balanced_accuracy(y_true: ArrayView1<f64>, y_pred: &Array1<f64>) -> f64 {
    let mut classes: Vec<f64> = y_true.to_vec();
    classes.sort_by(|a, b| a.total_cmp(b));
    classes.dedup();
    let recalls: Vec<f64> = classes
        .iter()
        .map(|&c| {
            let (hits, total) = y_true
                .iter()
                .zip(y_pred)
                .filter(|(t, _)| **t == c)
                .fold((0usize, 0usize), |(h, n), (_, p)| (h + usize::from(*p == c), n + 1));
            hits as f64 / total as f64
        })
        .collect();
    recalls.iter().sum::<f64>() / recalls.len() as f64
}

fn log_loss(y_true: ArrayView1<f64>, probabilities: &Array2<f64>) -> Result<f64> {
    let k = probabilities.ncols();
    let mut total = 0.0;
    for (row, &label) in probabilities.axis_iter(Axis(0)).zip(y_true) {
        if label < 0.0 || label.fract() != 0.0 || label as usize >= k {
            return Err(AutoNetError::invalid_input(format!(
                "label {} has no probability column among {}",
                label, k
            )));
        }
        let norm: f64 = row.iter().map(|p| p.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS)).sum();
        let p = row[label as usize].clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS) / norm;
        total -= p.ln();
    }
    Ok(total / y_true.len() as f64)
}

fn r2(y_true: ArrayView1<f64>, y_pred: &Array1<f64>) -> f64 {
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_tot: f64 = y_true.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classification_scores() {
        let y = array![0.0, 1.0, 1.0, 1.0];
        let proba = array![[0.9, 0.1], [0.2, 0.8], [0.6, 0.4], [0.3, 0.7]];
        assert_eq!(Metric::Accuracy.score(y.view(), &proba).unwrap(), 0.75);
        let balanced = Metric::BalancedAccuracy.score(y.view(), &proba).unwrap();
        assert!((balanced - (1.0 + 2.0 / 3.0) / 2.0).abs() < 1e-12);
        let ll = Metric::LogLoss.score(y.view(), &proba).unwrap();
        assert!(ll > 0.0 && ll < 1.0);
    }

    #[test]
    fn test_regression_scores() {
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let pred = array![[1.1], [2.0], [2.9], [4.1], [5.0]];
        let mse = Metric::MeanSquaredError.score(y.view(), &pred).unwrap();
        assert!((mse - 0.006).abs() < 1e-9);
        assert!(Metric::R2.score(y.view(), &pred).unwrap() > 0.99);
        assert!(Metric::R2.score(y.view(), &array![[1.0], [2.0]]).is_err());
    }

    #[test]
    fn test_loss_direction() {
        assert_eq!(Metric::Accuracy.loss(0.75), 0.25);
        assert_eq!(Metric::MeanSquaredError.loss(0.5), 0.5);
        assert_eq!(Metric::R2.loss(1.0), 0.0);
    }

    #[test]
    fn test_names_and_targets() {
        assert_eq!(Metric::from_name("mae").unwrap(), Metric::MeanAbsoluteError);
        assert!(Metric::from_name("f7").is_err());
        assert!(Metric::Accuracy.check_target(TargetType::TabularRegression).is_err());
        assert!(Metric::R2.check_target(TargetType::TabularRegression).is_ok());
    }
}
