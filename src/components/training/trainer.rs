//! Trainers: run the optimisation loop over the assembled network

use crate::components::base::{Component, ComponentCategory, ComponentProperties};
use crate::components::context::{ContextUpdate, RunContext, TrainingReport, TransformContext};
use crate::config::BudgetType;
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace, HyperparameterSearchSpace};
use crate::dataset::DatasetProperties;
use crate::error::{AutoNetError, Result};
use crate::nn::{LrSchedule, Network, OutputKind};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::time::Instant;
use tracing::debug;

/// Training targets in the network's output layout: one-hot rows for
/// softmax networks, a single column for linear ones
fn encode_targets(y: &Array1<f64>, network: &Network) -> Result<Array2<f64>> {
    match network.output_kind() {
        OutputKind::Softmax => {
            let k = network.output_dim();
            let mut targets = Array2::zeros((y.len(), k));
            for (i, &label) in y.iter().enumerate() {
                if label.fract() != 0.0 || label < 0.0 || label as usize >= k {
                    return Err(AutoNetError::invalid_input(format!(
                        "class label {} is not one of the {} encoded classes",
                        label, k
                    )));
                }
                targets[[i, label as usize]] = 1.0;
            }
            Ok(targets)
        }
        OutputKind::Linear => Ok(y.clone().insert_axis(Axis(1))),
    }
}

/// Per-sample weights balancing the classes: n / (k * count(class))
fn balanced_sample_weights(targets: &Array2<f64>) -> Array1<f64> {
    let counts = targets.sum_axis(Axis(0));
    let n = targets.nrows() as f64;
    let present = counts.iter().filter(|&&c| c > 0.0).count().max(1) as f64;
    let class_weight = counts.mapv(|c| if c > 0.0 { n / (present * c) } else { 0.0 });
    targets.dot(&class_weight)
}

/// Mean loss without dropout
fn evaluation_loss(network: &Network, x: &Array2<f64>, targets: &Array2<f64>) -> Result<f64> {
    let predictions = network.predict(x)?;
    let n = x.nrows().max(1) as f64;
    let total = match network.output_kind() {
        OutputKind::Softmax => -(&predictions.mapv(|p| p.max(1e-12).ln()) * targets).sum(),
        OutputKind::Linear => (&predictions - targets).mapv(|d| d * d).sum(),
    };
    Ok(total / n)
}

/// Convex combination of every row with a shuffled partner row
fn mixup<R: Rng + ?Sized>(
    x: Array2<f64>,
    targets: Array2<f64>,
    lambda: f64,
    rng: &mut R,
) -> (Array2<f64>, Array2<f64>) {
    let mut partner: Vec<usize> = (0..x.nrows()).collect();
    partner.shuffle(rng);
    let mixed_x = &x * lambda + &x.select(Axis(0), &partner) * (1.0 - lambda);
    let mixed_t = &targets * lambda + &targets.select(Axis(0), &partner) * (1.0 - lambda);
    (mixed_x, mixed_t)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Regime {
    Standard,
    MixUp { alpha: f64 },
}

fn run_training(context: &RunContext, regime: Regime, weighted_loss: bool) -> Result<(Network, TrainingReport)> {
    let mut network = context.require_network()?.clone();
    let x = context.require_train_matrix()?;
    let targets = encode_targets(&context.y_train, &network)?;
    if x.nrows() == 0 {
        return Err(AutoNetError::invalid_input("cannot train on an empty matrix"));
    }
    if x.nrows() != targets.nrows() {
        return Err(AutoNetError::invalid_input(format!(
            "{} training rows but {} targets",
            x.nrows(),
            targets.nrows()
        )));
    }
    let sample_weights = (weighted_loss && network.output_kind() == OutputKind::Softmax)
        .then(|| balanced_sample_weights(&targets));
    let valid = match (&context.valid_matrix, &context.y_valid) {
        (Some(vx), Some(vy)) => Some((vx, encode_targets(vy, &network)?)),
        _ => None,
    };

    let spec = *context.require_optimizer()?;
    let mut optimizer = spec.build(&network);
    let schedule = context.lr_scheduler.unwrap_or(LrSchedule::Constant);
    let batch_size = context.require_data_loader()?.batch_size.max(1);
    let beta = match regime {
        Regime::MixUp { alpha } if alpha > 0.0 => Beta::new(alpha, alpha).ok(),
        _ => None,
    };
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(context.seed.wrapping_add(2));

    let budget = context.budget;
    let start = Instant::now();
    let mut report = TrainingReport::default();
    let mut indices: Vec<usize> = (0..x.nrows()).collect();

    for epoch in 0..budget.epoch_limit() {
        if budget.budget_type == BudgetType::Runtime && epoch > 0 && start.elapsed().as_secs_f64() >= budget.value {
            break;
        }
        let lr = schedule.learning_rate(spec.learning_rate(), epoch);
        indices.shuffle(&mut rng);

        let mut epoch_loss = 0.0;
        for batch in indices.chunks(batch_size) {
            let mut x_batch = x.select(Axis(0), batch);
            let mut t_batch = targets.select(Axis(0), batch);
            let w_batch = sample_weights.as_ref().map(|w| w.select(Axis(0), batch));
            if let Some(beta) = &beta {
                let lambda = beta.sample(&mut rng);
                (x_batch, t_batch) = mixup(x_batch, t_batch, lambda, &mut rng);
            }
            let (loss, gradients) = network.loss_and_gradients(&x_batch, &t_batch, w_batch.as_ref(), &mut rng)?;
            optimizer.step(&mut network, &gradients, lr);
            epoch_loss += loss * batch.len() as f64;
        }
        report.train_loss.push(epoch_loss / x.nrows() as f64);
        if let Some((vx, vt)) = &valid {
            report.valid_loss.push(evaluation_loss(&network, vx, vt)?);
        }
        report.epochs += 1;
    }
    report.elapsed_secs = start.elapsed().as_secs_f64();

    debug!(
        epochs = report.epochs,
        train_loss = report.final_train_loss().unwrap_or(f64::NAN),
        elapsed_secs = report.elapsed_secs,
        "training finished"
    );
    Ok((network, report))
}

fn predict_outputs(network: Option<&Network>, name: &str, mut context: TransformContext) -> Result<TransformContext> {
    let network = network.ok_or_else(|| AutoNetError::not_fitted(name))?;
    let matrix = context.take_matrix()?;
    context.outputs = Some(network.predict(&matrix)?);
    context.matrix = Some(matrix);
    Ok(context)
}

fn weighted_loss_space(dataset_properties: &DatasetProperties, updates: &ComponentUpdates) -> Result<ConfigurationSpace> {
    let mut space = ConfigurationSpace::new();
    if dataset_properties.is_classification() {
        space.add_hyperparameter(
            updates.hyperparameter(HyperparameterSearchSpace::choices("weighted_loss", [true, false], true))?,
        )?;
    }
    Ok(space)
}

fn weighted_loss_from(configuration: &Configuration) -> Result<bool> {
    if configuration.contains("weighted_loss") {
        configuration.bool("weighted_loss")
    } else {
        Ok(false)
    }
}

/// Plain mini-batch training, optionally with class-balanced loss weights
#[derive(Debug, Clone, Default)]
pub struct StandardTrainer {
    weighted_loss: bool,
    network: Option<Network>,
}

impl StandardTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn network(&self) -> Option<&Network> {
        self.network.as_ref()
    }
}

impl Component for StandardTrainer {
    fn name(&self) -> &'static str {
        "StandardTrainer"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::Trainer
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("StandardTrainer", "Standard Trainer")
    }

    fn get_hyperparameter_search_space(
        &self,
        dataset_properties: &DatasetProperties,
        updates: &ComponentUpdates,
    ) -> Result<ConfigurationSpace> {
        weighted_loss_space(dataset_properties, updates)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        self.weighted_loss = weighted_loss_from(configuration)?;
        Ok(())
    }

    fn fit(&mut self, context: &RunContext) -> Result<ContextUpdate> {
        let (network, report) = run_training(context, Regime::Standard, self.weighted_loss)?;
        self.network = Some(network.clone());
        Ok(ContextUpdate {
            network: Some(network),
            training_report: Some(report),
            ..ContextUpdate::none()
        })
    }

    fn transform(&self, context: TransformContext) -> Result<TransformContext> {
        predict_outputs(self.network.as_ref(), self.name(), context)
    }

    fn is_fitted(&self) -> bool {
        self.network.is_some()
    }
}

/// Mixup training: each batch is replaced by convex combinations of row
/// pairs, with the mixing weight drawn from Beta(alpha, alpha)
#[derive(Debug, Clone)]
pub struct MixUpTrainer {
    alpha: f64,
    weighted_loss: bool,
    network: Option<Network>,
}

impl Default for MixUpTrainer {
    fn default() -> Self {
        Self::new()
    }
}

impl MixUpTrainer {
    pub fn new() -> Self {
        Self {
            alpha: 0.2,
            weighted_loss: false,
            network: None,
        }
    }

    pub fn network(&self) -> Option<&Network> {
        self.network.as_ref()
    }
}

impl Component for MixUpTrainer {
    fn name(&self) -> &'static str {
        "MixUpTrainer"
    }

    fn category(&self) -> ComponentCategory {
        ComponentCategory::Trainer
    }

    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("MixUpTrainer", "MixUp Regularized Trainer")
    }

    fn get_hyperparameter_search_space(
        &self,
        dataset_properties: &DatasetProperties,
        updates: &ComponentUpdates,
    ) -> Result<ConfigurationSpace> {
        let mut space = weighted_loss_space(dataset_properties, updates)?;
        space.add_hyperparameter(updates.hyperparameter(HyperparameterSearchSpace::float("alpha", 0.0, 1.0, 0.2, false))?)?;
        Ok(space)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        self.weighted_loss = weighted_loss_from(configuration)?;
        self.alpha = configuration.float("alpha")?;
        Ok(())
    }

    fn fit(&mut self, context: &RunContext) -> Result<ContextUpdate> {
        let (network, report) = run_training(context, Regime::MixUp { alpha: self.alpha }, self.weighted_loss)?;
        self.network = Some(network.clone());
        Ok(ContextUpdate {
            network: Some(network),
            training_report: Some(report),
            ..ContextUpdate::none()
        })
    }

    fn transform(&self, context: TransformContext) -> Result<TransformContext> {
        predict_outputs(self.network.as_ref(), self.name(), context)
    }

    fn is_fitted(&self) -> bool {
        self.network.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::context::LoaderSpec;
    use crate::config::Budget;
    use crate::dataset::{TargetType, TaskType};
    use crate::nn::{Activation, BackboneSpec, HeadSpec, OptimizerSpec};
    use ndarray::array;

    fn context(epochs: usize) -> RunContext {
        let dp = DatasetProperties::new()
            .with_target_type(TargetType::TabularClassification)
            .with_task_type(TaskType::BinaryClassification)
            .with_output_shape(2)
            .with_columns(vec![], vec![0, 1]);
        let x = array![[0.0, 0.0], [0.1, 0.2], [1.0, 1.0], [0.9, 1.1], [0.05, 0.1], [1.05, 0.95]];
        let y = array![0.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let mut ctx = RunContext::new(dp, &x, y, None, Budget::epochs(epochs), 3).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let network = Network::build(
            2,
            None,
            &BackboneSpec {
                hidden: vec![8],
                activation: Activation::Tanh,
                dropout: vec![],
            },
            &HeadSpec {
                hidden: vec![],
                activation: Activation::ReLU,
                output_dim: 2,
            },
            OutputKind::Softmax,
            &mut rng,
        )
        .unwrap();
        ctx.apply(ContextUpdate {
            train_matrix: Some(x),
            network: Some(network),
            optimizer: Some(OptimizerSpec::Adam {
                lr: 0.05,
                beta1: 0.9,
                beta2: 0.999,
                weight_decay: 0.0,
            }),
            data_loader: Some(LoaderSpec { batch_size: 4 }),
            ..ContextUpdate::none()
        });
        ctx
    }

    #[test]
    fn test_standard_trainer_reduces_loss() {
        let ctx = context(60);
        let mut trainer = StandardTrainer::new();
        let update = trainer.fit(&ctx).unwrap();
        let report = update.training_report.unwrap();
        assert_eq!(report.epochs, 60);
        assert!(report.train_loss[59] < report.train_loss[0]);

        let out = trainer
            .transform(TransformContext {
                matrix: Some(array![[0.0, 0.1], [1.0, 1.0]]),
                ..TransformContext::default()
            })
            .unwrap();
        let probs = out.outputs.unwrap();
        assert!(probs[[0, 0]] > 0.5);
        assert!(probs[[1, 1]] > 0.5);
    }

    #[test]
    fn test_mixup_trainer_runs_budget() {
        let ctx = context(5);
        let mut trainer = MixUpTrainer::new();
        let report = trainer.fit(&ctx).unwrap().training_report.unwrap();
        assert_eq!(report.train_loss.len(), 5);
        assert!(report.train_loss.iter().all(|l| l.is_finite()));
    }

    #[test]
    fn test_labels_outside_classes_are_rejected() {
        let mut ctx = context(1);
        ctx.y_train = array![0.0, 0.0, 1.0, 1.0, 0.0, 2.0];
        assert!(matches!(
            StandardTrainer::new().fit(&ctx),
            Err(AutoNetError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_balanced_weights() {
        let targets = array![[1.0, 0.0], [1.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let w = balanced_sample_weights(&targets);
        assert!((w[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((w[3] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_loss_only_for_classification() {
        let regression = DatasetProperties::new().with_target_type(TargetType::TabularRegression);
        let space = StandardTrainer::new()
            .get_hyperparameter_search_space(&regression, &ComponentUpdates::new())
            .unwrap();
        assert!(space.is_empty());
    }
}
