//! Scheduler seam and trial bookkeeping

use crate::config_space::{Configuration, ConfigurationSpace};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Evaluates one configuration at one budget and returns its loss
pub type Evaluator<'a> = dyn Fn(&Configuration, f64) -> Result<f64> + Sync + 'a;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    Success,
    Crashed,
}

/// One evaluation of one configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub id: usize,
    pub configuration: Configuration,
    pub budget: f64,
    pub status: TrialStatus,
    pub loss: Option<f64>,
    pub error: Option<String>,
    pub elapsed_secs: f64,
}

impl Trial {
    pub fn is_success(&self) -> bool {
        self.status == TrialStatus::Success && self.loss.is_some()
    }
}

/// Every trial a search ran, in submission order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub trials: Vec<Trial>,
    pub elapsed_secs: f64,
}

impl SearchResult {
    pub fn successful(&self) -> impl Iterator<Item = &Trial> {
        self.trials.iter().filter(|t| t.is_success())
    }

    /// Lowest loss among the successful trials run at the highest budget
    /// any successful trial reached
    pub fn incumbent(&self) -> Option<&Trial> {
        let top_budget = self.successful().map(|t| t.budget).fold(f64::NEG_INFINITY, f64::max);
        self.successful()
            .filter(|t| t.budget >= top_budget)
            .min_by(|a, b| {
                let (la, lb) = (a.loss.unwrap_or(f64::INFINITY), b.loss.unwrap_or(f64::INFINITY));
                la.total_cmp(&lb).then(a.id.cmp(&b.id))
            })
    }
}

/// External collaborator that drives the search. Each evaluation must run
/// on its own pipeline instance; implementations may evaluate concurrently.
pub trait BudgetScheduler: Send + Sync {
    fn run(&mut self, space: &ConfigurationSpace, evaluate: &Evaluator<'_>) -> Result<SearchResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(id: usize, budget: f64, loss: Option<f64>) -> Trial {
        Trial {
            id,
            configuration: Configuration::new(),
            budget,
            status: if loss.is_some() { TrialStatus::Success } else { TrialStatus::Crashed },
            loss,
            error: None,
            elapsed_secs: 0.0,
        }
    }

    #[test]
    fn test_incumbent_prefers_highest_budget() {
        let result = SearchResult {
            trials: vec![
                trial(0, 1.0, Some(0.01)),
                trial(1, 9.0, Some(0.3)),
                trial(2, 9.0, Some(0.2)),
                trial(3, 27.0, None),
            ],
            elapsed_secs: 0.0,
        };
        assert_eq!(result.incumbent().unwrap().id, 2);
    }

    #[test]
    fn test_no_success_no_incumbent() {
        let result = SearchResult {
            trials: vec![trial(0, 1.0, None)],
            elapsed_secs: 0.0,
        };
        assert!(result.incumbent().is_none());
    }
}
