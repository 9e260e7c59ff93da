//! Search configuration

use crate::error::{AutoNetError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Unit a trial budget is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetType {
    /// Number of training epochs
    Epochs,
    /// Wall-clock seconds of training
    Runtime,
}

/// Resource allowance handed to one trial fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub budget_type: BudgetType,
    pub value: f64,
    /// Epoch cap when training against a runtime budget
    pub max_epochs: usize,
}

impl Budget {
    pub fn epochs(n: usize) -> Self {
        Self {
            budget_type: BudgetType::Epochs,
            value: n as f64,
            max_epochs: n,
        }
    }

    pub fn runtime(seconds: f64, max_epochs: usize) -> Self {
        Self {
            budget_type: BudgetType::Runtime,
            value: seconds,
            max_epochs,
        }
    }

    /// Number of epochs the trainer may run at most
    pub fn epoch_limit(&self) -> usize {
        match self.budget_type {
            BudgetType::Epochs => (self.value.round() as usize).max(1),
            BudgetType::Runtime => self.max_epochs.max(1),
        }
    }
}

/// Configuration of an AutoNet search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoNetConfig {
    pub budget_type: BudgetType,
    pub min_budget: f64,
    pub max_budget: f64,
    /// Successive-halving reduction factor
    pub eta: f64,
    /// Number of scheduler iterations (rounds of brackets)
    pub num_iterations: usize,
    /// Metric the search minimises the loss of
    pub optimize_metric: String,
    pub random_seed: u64,
    /// Share of training rows held out when no validation data is given
    pub validation_split: f64,
    pub max_epochs_per_runtime_budget: usize,
    /// Row chunk size used by predict_proba; `None` predicts in one pass
    pub predict_batch_size: Option<usize>,
}

impl Default for AutoNetConfig {
    fn default() -> Self {
        Self {
            budget_type: BudgetType::Epochs,
            min_budget: 5.0,
            max_budget: 50.0,
            eta: 3.0,
            num_iterations: 1,
            optimize_metric: "accuracy".to_string(),
            random_seed: 1,
            validation_split: 0.2,
            max_epochs_per_runtime_budget: 1000,
            predict_batch_size: None,
        }
    }
}

impl AutoNetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget_type(mut self, budget_type: BudgetType) -> Self {
        self.budget_type = budget_type;
        self
    }

    pub fn with_budget_range(mut self, min_budget: f64, max_budget: f64) -> Self {
        self.min_budget = min_budget;
        self.max_budget = max_budget;
        self
    }

    pub fn with_eta(mut self, eta: f64) -> Self {
        self.eta = eta;
        self
    }

    pub fn with_num_iterations(mut self, n: usize) -> Self {
        self.num_iterations = n;
        self
    }

    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.optimize_metric = metric.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_validation_split(mut self, split: f64) -> Self {
        self.validation_split = split;
        self
    }

    pub fn with_predict_batch_size(mut self, batch_size: usize) -> Self {
        self.predict_batch_size = Some(batch_size);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_budget > 0.0) {
            return Err(AutoNetError::configuration(format!(
                "min_budget must be positive, got {}",
                self.min_budget
            )));
        }
        if self.min_budget > self.max_budget {
            return Err(AutoNetError::configuration(format!(
                "min_budget ({}) exceeds max_budget ({})",
                self.min_budget, self.max_budget
            )));
        }
        if !(self.eta > 1.0) {
            return Err(AutoNetError::configuration(format!("eta must exceed 1, got {}", self.eta)));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(AutoNetError::configuration(format!(
                "validation_split must lie in [0, 1), got {}",
                self.validation_split
            )));
        }
        if self.num_iterations == 0 {
            return Err(AutoNetError::configuration("num_iterations must be at least 1"));
        }
        Ok(())
    }

    /// Budget object for a scheduler-provided amount
    pub fn budget(&self, value: f64) -> Budget {
        Budget {
            budget_type: self.budget_type,
            value,
            max_epochs: match self.budget_type {
                BudgetType::Epochs => value.round().max(1.0) as usize,
                BudgetType::Runtime => self.max_epochs_per_runtime_budget,
            },
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        AutoNetConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(AutoNetConfig::new().with_budget_range(0.0, 10.0).validate().is_err());
        assert!(AutoNetConfig::new().with_budget_range(10.0, 5.0).validate().is_err());
        assert!(AutoNetConfig::new().with_eta(1.0).validate().is_err());
        assert!(AutoNetConfig::new().with_validation_split(1.0).validate().is_err());
    }

    #[test]
    fn test_budget_epoch_limit() {
        let config = AutoNetConfig::new();
        assert_eq!(config.budget(9.0).epoch_limit(), 9);
        let runtime = AutoNetConfig::new().with_budget_type(BudgetType::Runtime);
        assert_eq!(runtime.budget(2.5).epoch_limit(), 1000);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autonet.json");
        let config = AutoNetConfig::new().with_metric("balanced_accuracy").with_seed(7);
        config.save(&path).unwrap();
        assert_eq!(AutoNetConfig::load(&path).unwrap(), config);
    }
}
