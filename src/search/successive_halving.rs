//! Successive halving over brackets of geometrically increasing budget

use super::scheduler::{BudgetScheduler, Evaluator, SearchResult, Trial, TrialStatus};
use crate::config::AutoNetConfig;
use crate::config_space::{Configuration, ConfigurationSpace};
use crate::error::{AutoNetError, Result};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Successive-halving configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessiveHalvingConfig {
    /// Smallest budget a configuration is evaluated at
    pub min_budget: f64,
    /// Budget of the final rung of every bracket
    pub max_budget: f64,
    /// Reduction factor: each rung keeps the best `1/eta` configurations
    pub eta: f64,
    /// Rounds over all brackets
    pub num_iterations: usize,
    pub seed: u64,
    /// Evaluate the configurations of a rung concurrently
    pub parallel: bool,
}

impl Default for SuccessiveHalvingConfig {
    fn default() -> Self {
        Self {
            min_budget: 1.0,
            max_budget: 27.0,
            eta: 3.0,
            num_iterations: 1,
            seed: 1,
            parallel: true,
        }
    }
}

impl From<&AutoNetConfig> for SuccessiveHalvingConfig {
    fn from(config: &AutoNetConfig) -> Self {
        Self {
            min_budget: config.min_budget,
            max_budget: config.max_budget,
            eta: config.eta,
            num_iterations: config.num_iterations,
            seed: config.random_seed,
            parallel: true,
        }
    }
}

/// One bracket: `n` configurations starting at budget `r`, `s` halvings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub s: usize,
    pub n: usize,
    pub r: f64,
}

/// Hyperband-style successive halving.
///
/// The very first configuration evaluated is the space's default; every
/// other one is sampled.
#[derive(Debug)]
pub struct SuccessiveHalving {
    config: SuccessiveHalvingConfig,
    rng: Xoshiro256PlusPlus,
    log: Mutex<Vec<Trial>>,
}

impl SuccessiveHalving {
    pub fn new(config: SuccessiveHalvingConfig) -> Result<Self> {
        if !(config.min_budget > 0.0) || config.min_budget > config.max_budget {
            return Err(AutoNetError::configuration(format!(
                "budgets must satisfy 0 < min_budget <= max_budget, got {} and {}",
                config.min_budget, config.max_budget
            )));
        }
        if !(config.eta > 1.0) {
            return Err(AutoNetError::configuration(format!("eta must exceed 1, got {}", config.eta)));
        }
        let rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);
        Ok(Self {
            config,
            rng,
            log: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &SuccessiveHalvingConfig {
        &self.config
    }

    fn s_max(&self) -> usize {
        let ratio = self.config.max_budget / self.config.min_budget;
        (ratio.ln() / self.config.eta.ln() + 1e-9).floor() as usize
    }

    /// Brackets of one iteration, most aggressive first
    pub fn brackets(&self) -> Vec<Bracket> {
        let s_max = self.s_max();
        let eta = self.config.eta;
        (0..=s_max)
            .rev()
            .map(|s| Bracket {
                s,
                n: ((s_max + 1) as f64 * eta.powi(s as i32) / (s + 1) as f64).ceil() as usize,
                r: self.config.max_budget / eta.powi(s as i32),
            })
            .collect()
    }

    fn evaluate_rung(&self, configs: &[Configuration], budget: f64, evaluate: &Evaluator<'_>) -> Vec<Trial> {
        let first_id = self.log.lock().len();
        let run_one = |(i, configuration): (usize, &Configuration)| {
            let id = first_id + i;
            let start = Instant::now();
            let outcome = evaluate(configuration, budget);
            let elapsed_secs = start.elapsed().as_secs_f64();
            let (status, loss, error) = match outcome {
                Ok(loss) if loss.is_finite() => (TrialStatus::Success, Some(loss), None),
                Ok(loss) => (TrialStatus::Crashed, None, Some(format!("non-finite loss {}", loss))),
                Err(e) => (TrialStatus::Crashed, None, Some(e.to_string())),
            };
            match &error {
                None => debug!(trial = id, budget, loss = loss.unwrap_or(f64::NAN), "trial finished"),
                Some(e) => warn!(trial = id, budget, error = %e, "trial crashed"),
            }
            let trial = Trial {
                id,
                configuration: configuration.clone(),
                budget,
                status,
                loss,
                error,
                elapsed_secs,
            };
            self.log.lock().push(trial.clone());
            trial
        };
        if self.config.parallel {
            configs.par_iter().enumerate().map(run_one).collect()
        } else {
            configs.iter().enumerate().map(run_one).collect()
        }
    }
}

impl BudgetScheduler for SuccessiveHalving {
    fn run(&mut self, space: &ConfigurationSpace, evaluate: &Evaluator<'_>) -> Result<SearchResult> {
        let start = Instant::now();
        let eta = self.config.eta;
        self.log.lock().clear();
        let mut default_pending = true;

        for iteration in 0..self.config.num_iterations {
            for bracket in self.brackets() {
                let mut configs = Vec::with_capacity(bracket.n);
                for _ in 0..bracket.n {
                    if default_pending {
                        configs.push(space.get_default_configuration());
                        default_pending = false;
                    } else {
                        configs.push(space.sample_configuration(&mut self.rng)?);
                    }
                }

                for rung in 0..=bracket.s {
                    let budget = if rung == bracket.s {
                        self.config.max_budget
                    } else {
                        bracket.r * eta.powi(rung as i32)
                    };
                    info!(
                        iteration,
                        bracket = bracket.s,
                        rung,
                        n_configs = configs.len(),
                        budget,
                        "evaluating rung"
                    );
                    let trials = self.evaluate_rung(&configs, budget, evaluate);
                    if rung == bracket.s {
                        break;
                    }
                    let mut ranked: Vec<&Trial> = trials.iter().filter(|t| t.is_success()).collect();
                    ranked.sort_by(|a, b| {
                        a.loss
                            .unwrap_or(f64::INFINITY)
                            .total_cmp(&b.loss.unwrap_or(f64::INFINITY))
                    });
                    let n_keep = ((configs.len() as f64 / eta).floor() as usize).max(1);
                    configs = ranked.into_iter().take(n_keep).map(|t| t.configuration.clone()).collect();
                    if configs.is_empty() {
                        debug!(bracket = bracket.s, rung, "no configuration survived the rung");
                        break;
                    }
                }
            }
        }

        let mut trials = std::mem::take(&mut *self.log.lock());
        trials.sort_by_key(|t| t.id);
        Ok(SearchResult {
            trials,
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_space::Hyperparameter;

    fn space() -> ConfigurationSpace {
        let mut space = ConfigurationSpace::new();
        space
            .add_hyperparameter(
                Hyperparameter::float("x", -5.0, 5.0, false)
                    .unwrap()
                    .with_default(4.0)
                    .unwrap(),
            )
            .unwrap();
        space
    }

    fn scheduler(parallel: bool) -> SuccessiveHalving {
        SuccessiveHalving::new(SuccessiveHalvingConfig {
            min_budget: 1.0,
            max_budget: 9.0,
            eta: 3.0,
            parallel,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_bracket_layout() {
        let sh = scheduler(false);
        let brackets = sh.brackets();
        assert_eq!(brackets.len(), 3);
        assert_eq!(brackets[0], Bracket { s: 2, n: 9, r: 1.0 });
        assert_eq!(brackets[2].n, 3);
        assert_eq!(brackets[2].r, 9.0);
    }

    #[test]
    fn test_run_halves_and_finds_minimum() {
        let mut sh = scheduler(true);
        let objective = |c: &Configuration, budget: f64| -> Result<f64> {
            let x = c.float("x")?;
            Ok(x * x + 1.0 / budget)
        };
        let result = sh.run(&space(), &objective).unwrap();
        // bracket s=2: 9 + 3 + 1, s=1: 5 + 1, s=0: 3
        assert_eq!(result.trials.len(), 22);
        assert_eq!(result.trials[0].configuration.float("x").unwrap(), 4.0);
        let ids: Vec<usize> = result.trials.iter().map(|t| t.id).collect();
        assert_eq!(ids, (0..22).collect::<Vec<_>>());
        let best = result.incumbent().unwrap();
        assert_eq!(best.budget, 9.0);
        assert!(best.loss.unwrap() < 16.0);
    }

    #[test]
    fn test_crashed_trials_are_recorded_not_promoted() {
        let mut sh = scheduler(false);
        let objective = |_: &Configuration, _: f64| -> Result<f64> { Err(AutoNetError::Training("diverged".into())) };
        let result = sh.run(&space(), &objective).unwrap();
        assert!(result.trials.iter().all(|t| t.status == TrialStatus::Crashed));
        // only the first rung of each bracket runs
        assert_eq!(result.trials.len(), 9 + 5 + 3);
        assert!(result.incumbent().is_none());
    }

    #[test]
    fn test_invalid_budgets_rejected() {
        let config = SuccessiveHalvingConfig {
            min_budget: 10.0,
            max_budget: 1.0,
            ..Default::default()
        };
        assert!(SuccessiveHalving::new(config).is_err());
    }
}
