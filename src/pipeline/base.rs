//! Pipeline: fixed sequence of steps sharing one joint search space

use super::step::PipelineStep;
use super::{classification, regression};
use crate::components::{ComponentCategory, ComponentRegistry, RunContext, TrainingReport, TransformContext};
use crate::config::{AutoNetConfig, Budget};
use crate::config_space::{
    Configuration, ConfigurationSpace, ForbiddenClause, HyperparameterSearchSpaceUpdates, HyperparameterValue,
    CHOICE_KEY,
};
use crate::dataset::{ColumnBlocks, DatasetProperties, TabularData, TargetType};
use crate::error::{AutoNetError, Result};
use crate::metrics::{argmax, Metric};
use crate::search::{BudgetScheduler, SuccessiveHalving, SuccessiveHalvingConfig, Trial, TrialStatus};
use ndarray::{concatenate, Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

const EMBEDDING_CHOICE: &str = "network_embedding:__choice__";
const ENCODER_CHOICE: &str = "encoder:__choice__";
const LEARNED_ENTITY_EMBEDDING: &str = "LearnedEntityEmbedding";
const ONE_HOT_ENCODER: &str = "OneHotEncoder";

/// Steps that only wire the network together; left out of the representation
const MECHANICAL_STEPS: &[&str] = &[
    "data_loader",
    "trainer",
    "lr_scheduler",
    "optimizer",
    "network_init",
    "preprocessing",
    "tabular_transformer",
];

/// Lifecycle of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Unconfigured,
    SpaceBuilt,
    Configured,
    Fitted,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Unconfigured => "unconfigured",
            PipelineState::SpaceBuilt => "space built",
            PipelineState::Configured => "configured",
            PipelineState::Fitted => "fitted",
        };
        f.write_str(s)
    }
}

/// Short summary of the selected components
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRepresentation {
    #[serde(rename = "Preprocessing")]
    pub preprocessing: String,
    #[serde(rename = "Estimator")]
    pub estimator: String,
}

/// Skip the search and fit once at a given configuration and budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefitRequest {
    pub hyperparameter_config: Configuration,
    pub budget: f64,
    /// Compute the loss of the refitted pipeline on the validation data
    pub rescore: bool,
}

/// Outcome of [`Pipeline::fit_pipeline`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub status: TrialStatus,
    /// Loss of the returned configuration; absent for a refit without rescore
    pub loss: Option<f64>,
    pub optimized_hyperparameter_config: Configuration,
    pub budget: f64,
    pub trials: Vec<Trial>,
    pub pipeline_representation: PipelineRepresentation,
}

/// Ordered list of named steps.
///
/// Moves through [`PipelineState`]: building the search space fixes the
/// dataset properties, a configuration selects one component per choice,
/// and fitting runs the steps strictly in order against one [`RunContext`].
#[derive(Debug)]
pub struct Pipeline {
    target_type: TargetType,
    registry: Arc<ComponentRegistry>,
    steps: Vec<PipelineStep>,
    include: BTreeMap<String, Vec<String>>,
    exclude: BTreeMap<String, Vec<String>>,
    search_space_updates: HyperparameterSearchSpaceUpdates,
    random_state: u64,
    state: PipelineState,
    dataset_properties: Option<DatasetProperties>,
    config_space: Option<ConfigurationSpace>,
    configuration: Option<Configuration>,
    training_report: Option<TrainingReport>,
}

fn build_steps(target_type: TargetType, registry: &Arc<ComponentRegistry>) -> Vec<PipelineStep> {
    match target_type {
        TargetType::TabularClassification => classification::pipeline_steps(registry),
        TargetType::TabularRegression => regression::pipeline_steps(registry),
    }
}

impl Pipeline {
    pub fn new(target_type: TargetType) -> Self {
        let registry = Arc::new(ComponentRegistry::new());
        Self {
            target_type,
            steps: build_steps(target_type, &registry),
            registry,
            include: BTreeMap::new(),
            exclude: BTreeMap::new(),
            search_space_updates: HyperparameterSearchSpaceUpdates::new(),
            random_state: 1,
            state: PipelineState::Unconfigured,
            dataset_properties: None,
            config_space: None,
            configuration: None,
            training_report: None,
        }
    }

    /// Use a registry holding runtime-registered components
    pub fn with_registry(mut self, registry: Arc<ComponentRegistry>) -> Self {
        self.steps = build_steps(self.target_type, &registry);
        self.registry = registry;
        self
    }

    /// Restrict the choice step `step` to the named components
    pub fn with_include(mut self, step: impl Into<String>, components: Vec<String>) -> Self {
        self.include.insert(step.into(), components);
        self
    }

    /// Remove the named components from the choice step `step`
    pub fn with_exclude(mut self, step: impl Into<String>, components: Vec<String>) -> Self {
        self.exclude.insert(step.into(), components);
        self
    }

    pub fn with_search_space_updates(mut self, updates: HyperparameterSearchSpaceUpdates) -> Self {
        self.search_space_updates = updates;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn target_type(&self) -> TargetType {
        self.target_type
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(PipelineStep::name).collect()
    }

    pub fn named_step(&self, name: &str) -> Option<&PipelineStep> {
        self.steps.iter().find(|s| s.name() == name)
    }

    pub fn dataset_properties(&self) -> Option<&DatasetProperties> {
        self.dataset_properties.as_ref()
    }

    pub fn config_space(&self) -> Option<&ConfigurationSpace> {
        self.config_space.as_ref()
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.as_ref()
    }

    pub fn training_report(&self) -> Option<&TrainingReport> {
        self.training_report.as_ref()
    }

    /// Fresh pipeline with the same settings and search space, ready to be
    /// configured independently of this one
    pub fn spawn(&self) -> Self {
        Self {
            target_type: self.target_type,
            registry: self.registry.clone(),
            steps: build_steps(self.target_type, &self.registry),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            search_space_updates: self.search_space_updates.clone(),
            random_state: self.random_state,
            state: if self.config_space.is_some() {
                PipelineState::SpaceBuilt
            } else {
                PipelineState::Unconfigured
            },
            dataset_properties: self.dataset_properties.clone(),
            config_space: self.config_space.clone(),
            configuration: None,
            training_report: None,
        }
    }

    fn normalize_dataset_properties(&self, dataset_properties: &DatasetProperties) -> DatasetProperties {
        let mut dp = dataset_properties.clone();
        match dp.target_type {
            None => dp.target_type = Some(self.target_type),
            Some(t) if t != self.target_type => {
                warn!(
                    given = t.as_str(),
                    pipeline = self.target_type.as_str(),
                    "dataset target_type does not match the pipeline; overriding it"
                );
                dp.target_type = Some(self.target_type);
            }
            Some(_) => {}
        }
        dp
    }

    fn validate_step_arguments(&self) -> Result<()> {
        for (kind, table) in [("include", &self.include), ("exclude", &self.exclude)] {
            for step in table.keys() {
                match self.named_step(step) {
                    Some(s) if s.is_choice() => {}
                    Some(_) => {
                        return Err(AutoNetError::configuration(format!(
                            "{} is only supported for choice steps, '{}' is a single component",
                            kind, step
                        )))
                    }
                    None => {
                        return Err(AutoNetError::configuration(format!(
                            "{} refers to '{}', which is not a step of this pipeline; steps are {:?}",
                            kind,
                            step,
                            self.step_names()
                        )))
                    }
                }
            }
        }
        if let Some(update) = self
            .search_space_updates
            .iter()
            .find(|u| self.named_step(&u.node_name).is_none())
        {
            return Err(AutoNetError::configuration(format!(
                "search space update for '{}' targets no step of this pipeline; steps are {:?}",
                update.node_name,
                self.step_names()
            )));
        }
        Ok(())
    }

    /// Compose every step's sub-space into the joint space, then add the
    /// cross-step constraints
    pub fn get_hyperparameter_search_space(&mut self, dataset_properties: &DatasetProperties) -> Result<ConfigurationSpace> {
        let dp = self.normalize_dataset_properties(dataset_properties);
        self.validate_step_arguments()?;
        self.steps = build_steps(self.target_type, &self.registry);

        let mut space = ConfigurationSpace::new();
        for step in self.steps.iter_mut() {
            let name = step.name();
            let updates = self.search_space_updates.for_node(name);
            let sub_space = step.get_hyperparameter_search_space(
                &dp,
                self.include.get(name).map(Vec::as_slice),
                self.exclude.get(name).map(Vec::as_slice),
                &updates,
            )?;
            if let Some(unknown) = updates.names().find(|n| *n != CHOICE_KEY && !sub_space.contains(n)) {
                return Err(AutoNetError::configuration(format!(
                    "search space update targets '{}:{}', which is not a hyperparameter of this pipeline; \
                     '{}' offers {:?}",
                    name,
                    unknown,
                    name,
                    sub_space.hyperparameter_names()
                )));
            }
            space.add_configuration_space(name, &sub_space, None)?;
        }
        forbid_embedding_without_one_hot(&mut space)?;

        info!(
            target_type = self.target_type.as_str(),
            n_hyperparameters = space.len(),
            n_forbidden = space.forbidden_clauses().len(),
            "built pipeline search space"
        );
        self.dataset_properties = Some(dp);
        self.config_space = Some(space.clone());
        self.configuration = None;
        self.training_report = None;
        self.state = PipelineState::SpaceBuilt;
        Ok(space)
    }

    fn require_state(&self, at_least: PipelineState, action: &str) -> Result<()> {
        if self.state >= at_least {
            return Ok(());
        }
        let msg = format!("cannot {} a pipeline that is {}", action, self.state);
        if at_least == PipelineState::Fitted {
            Err(AutoNetError::not_fitted(msg))
        } else {
            Err(AutoNetError::configuration(msg))
        }
    }

    fn require_dataset_properties(&self) -> Result<&DatasetProperties> {
        self.dataset_properties
            .as_ref()
            .ok_or_else(|| AutoNetError::configuration("the search space has not been built"))
    }

    /// Push each step's share of `configuration` down into it
    pub fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        self.require_state(PipelineState::SpaceBuilt, "configure")?;
        let space = self
            .config_space
            .as_ref()
            .ok_or_else(|| AutoNetError::configuration("the search space has not been built"))?;
        space.check_configuration(configuration)?;
        for step in self.steps.iter_mut() {
            step.set_hyperparameters(&configuration.sub_configuration(step.name()))?;
        }
        self.configuration = Some(configuration.clone());
        self.training_report = None;
        self.state = PipelineState::Configured;
        Ok(())
    }

    fn check_width(&self, x: &ArrayView2<f64>) -> Result<()> {
        if let Some(expected) = self.require_dataset_properties()?.input_shape {
            if x.ncols() != expected {
                return Err(AutoNetError::Shape {
                    expected: format!("{} feature columns", expected),
                    actual: x.ncols().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Run every step in order; each step sees only what earlier steps wrote.
    /// A failed fit leaves the pipeline configured but not fitted.
    pub fn fit(&mut self, data: &TabularData, budget: Budget) -> Result<()> {
        self.require_state(PipelineState::Configured, "fit")?;
        self.check_width(&data.x_train.view())?;
        match self.fit_steps(data, budget) {
            Ok(report) => {
                self.training_report = Some(report);
                self.state = PipelineState::Fitted;
                Ok(())
            }
            Err(e) => {
                self.training_report = None;
                self.state = PipelineState::Configured;
                Err(e)
            }
        }
    }

    fn fit_steps(&mut self, data: &TabularData, budget: Budget) -> Result<TrainingReport> {
        let dp = self.require_dataset_properties()?.clone();
        let valid = match (&data.x_valid, &data.y_valid) {
            (Some(x), Some(y)) => Some((x, y.clone())),
            _ => None,
        };
        let mut context = RunContext::new(dp, &data.x_train, data.y_train.clone(), valid, budget, self.random_state)?;

        for step in self.steps.iter_mut() {
            let update = step.fit(&context)?;
            context.apply(update);
            debug!(
                step = step.name(),
                component = step.selected().map(|c| c.name()).unwrap_or("-"),
                "fitted step"
            );
        }

        let report = context.training_report.take().unwrap_or_default();
        if let Some(loss) = report.final_train_loss().filter(|l| !l.is_finite()) {
            return Err(AutoNetError::Training(format!(
                "training loss became {} after {} epochs",
                loss, report.epochs
            )));
        }
        Ok(report)
    }

    fn transform_chunk(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let dp = self.require_dataset_properties()?;
        let blocks = ColumnBlocks::split(
            &x.to_owned(),
            dp.require_categorical_columns()?,
            dp.require_numerical_columns()?,
        )?;
        let mut context = TransformContext::new(blocks);
        for step in &self.steps {
            context = step.transform(context)?;
        }
        context
            .outputs
            .ok_or_else(|| AutoNetError::not_fitted("no step produced network outputs"))
    }

    /// Raw network outputs, optionally computed over contiguous row chunks
    fn outputs(&self, x: &Array2<f64>, batch_size: Option<usize>) -> Result<Array2<f64>> {
        self.require_state(PipelineState::Fitted, "predict with")?;
        self.check_width(&x.view())?;
        if x.nrows() == 0 {
            return Err(AutoNetError::invalid_input("cannot predict on an empty matrix"));
        }
        match batch_size {
            None => self.transform_chunk(x.view()),
            Some(0) => Err(AutoNetError::invalid_input("argument 'batch_size' must be positive, but is 0")),
            Some(k) => {
                let chunks = x
                    .axis_chunks_iter(Axis(0), k)
                    .map(|chunk| self.transform_chunk(chunk))
                    .collect::<Result<Vec<_>>>()?;
                let views: Vec<ArrayView2<f64>> = chunks.iter().map(|c| c.view()).collect();
                Ok(concatenate(Axis(0), &views)?)
            }
        }
    }

    /// Class probabilities, clipped to [0, 1] and L1-normalised per row
    pub fn predict_proba(&self, x: &Array2<f64>, batch_size: Option<usize>) -> Result<Array2<f64>> {
        if !self.target_type.is_classification() {
            return Err(AutoNetError::configuration(
                "predict_proba is only defined for classification pipelines",
            ));
        }
        let mut proba = self.outputs(x, batch_size)?.mapv(|p| if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) });
        for mut row in proba.axis_iter_mut(Axis(0)) {
            let sum = row.sum();
            let norm = if sum == 0.0 { 1.0 } else { sum };
            row.mapv_inplace(|p| p / norm);
        }
        Ok(proba)
    }

    /// Class indices for classification, predicted values for regression
    pub fn predict(&self, x: &Array2<f64>, batch_size: Option<usize>) -> Result<Array1<f64>> {
        if self.target_type.is_classification() {
            Ok(argmax(&self.predict_proba(x, batch_size)?))
        } else {
            Ok(self.outputs(x, batch_size)?.column(0).to_owned())
        }
    }

    /// Score on `(x, y)`; with `return_loss` the loss-equivalent value
    pub fn score(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        metric: Metric,
        return_loss: bool,
        batch_size: Option<usize>,
    ) -> Result<f64> {
        metric.check_target(self.target_type)?;
        let outputs = if self.target_type.is_classification() {
            self.predict_proba(x, batch_size)?
        } else {
            self.outputs(x, batch_size)?
        };
        let score = metric.score(y.view(), &outputs)?;
        Ok(if return_loss { metric.loss(score) } else { score })
    }

    /// Shortnames of the selected components, with mechanical steps left out
    pub fn get_pipeline_representation(&self) -> PipelineRepresentation {
        let mut preprocessing = Vec::new();
        let mut estimator = Vec::new();
        for step in &self.steps {
            let name = step.name();
            if MECHANICAL_STEPS.contains(&name) {
                continue;
            }
            if let Some(component) = step.selected() {
                let shortname = component.properties().shortname.to_string();
                if name.contains("network") {
                    estimator.push(shortname);
                } else {
                    preprocessing.push(shortname);
                }
            }
        }
        PipelineRepresentation {
            preprocessing: preprocessing.join(","),
            estimator: estimator.join(","),
        }
    }

    /// Loss of the fitted pipeline on the validation data, or on the
    /// training data when there is none
    fn evaluation_loss(&self, data: &TabularData, metric: Metric) -> Result<f64> {
        let (x, y) = match (&data.x_valid, &data.y_valid) {
            (Some(x), Some(y)) => (x, y),
            _ => (&data.x_train, &data.y_train),
        };
        self.score(x, y, metric, true, None)
    }

    /// Fit `configuration` at `budget` on a fresh copy and return its loss
    fn evaluate(&self, configuration: &Configuration, data: &TabularData, budget: Budget, metric: Metric) -> Result<f64> {
        let mut trial = self.spawn();
        trial.set_hyperparameters(configuration)?;
        trial.fit(data, budget)?;
        trial.evaluation_loss(data, metric)
    }

    /// Search the space with successive halving (or refit directly) and
    /// leave this pipeline fitted with the resulting configuration
    pub fn fit_pipeline(
        &mut self,
        config: &AutoNetConfig,
        data: &TabularData,
        refit: Option<RefitRequest>,
    ) -> Result<FitResult> {
        config.validate()?;
        self.require_state(PipelineState::SpaceBuilt, "search")?;
        let metric = Metric::from_name(&config.optimize_metric)?;
        metric.check_target(self.target_type)?;

        if let Some(refit) = refit {
            info!(budget = refit.budget, rescore = refit.rescore, "refitting without search");
            self.set_hyperparameters(&refit.hyperparameter_config)?;
            self.fit(data, config.budget(refit.budget))?;
            let loss = if refit.rescore {
                Some(self.evaluation_loss(data, metric)?)
            } else {
                None
            };
            return Ok(FitResult {
                status: TrialStatus::Success,
                loss,
                optimized_hyperparameter_config: refit.hyperparameter_config,
                budget: refit.budget,
                trials: Vec::new(),
                pipeline_representation: self.get_pipeline_representation(),
            });
        }

        let space = self
            .config_space
            .clone()
            .ok_or_else(|| AutoNetError::configuration("the search space has not been built"))?;
        let mut scheduler = SuccessiveHalving::new(SuccessiveHalvingConfig::from(config))?;
        self.fit_with_scheduler(config, data, &space, &mut scheduler, metric)
    }

    /// Run `scheduler` over `space` and fit the incumbent at its budget
    pub fn fit_with_scheduler(
        &mut self,
        config: &AutoNetConfig,
        data: &TabularData,
        space: &ConfigurationSpace,
        scheduler: &mut dyn BudgetScheduler,
        metric: Metric,
    ) -> Result<FitResult> {
        let result = {
            let template: &Pipeline = self;
            let evaluate = |configuration: &Configuration, budget: f64| {
                template.evaluate(configuration, data, config.budget(budget), metric)
            };
            scheduler.run(space, &evaluate)?
        };
        let incumbent = result.incumbent().cloned().ok_or_else(|| {
            AutoNetError::EmptySearchResult(format!(
                "none of the {} trials finished; retry with a larger budget",
                result.trials.len()
            ))
        })?;
        info!(
            n_trials = result.trials.len(),
            n_successful = result.successful().count(),
            incumbent = incumbent.id,
            loss = incumbent.loss.unwrap_or(f64::NAN),
            budget = incumbent.budget,
            "search finished"
        );

        self.set_hyperparameters(&incumbent.configuration)?;
        self.fit(data, config.budget(incumbent.budget))?;
        Ok(FitResult {
            status: TrialStatus::Success,
            loss: incumbent.loss,
            optimized_hyperparameter_config: incumbent.configuration,
            budget: incumbent.budget,
            trials: result.trials,
            pipeline_representation: self.get_pipeline_representation(),
        })
    }
}

/// Learned entity embeddings expect one-hot encoded input, so forbid them
/// together with any other encoder. When the current default hits the
/// clause, try the other embedding defaults and then the one-hot encoder
/// as default before giving up.
fn forbid_embedding_without_one_hot(space: &mut ConfigurationSpace) -> Result<()> {
    let embeddings = match space.get(EMBEDDING_CHOICE).and_then(|hp| hp.choices()) {
        Some(e) => e,
        None => return Ok(()),
    };
    let encoders = match space.get(ENCODER_CHOICE).and_then(|hp| hp.choices()) {
        Some(e) => e,
        None => return Ok(()),
    };
    let learned = HyperparameterValue::from(LEARNED_ENTITY_EMBEDDING);
    if !embeddings.contains(&learned) {
        return Ok(());
    }
    let other_encoders: Vec<HyperparameterValue> = encoders
        .iter()
        .filter(|e| e.as_str() != Some(ONE_HOT_ENCODER))
        .cloned()
        .collect();
    if other_encoders.is_empty() {
        return Ok(());
    }
    let clause = ForbiddenClause::and(vec![
        ForbiddenClause::equals(EMBEDDING_CHOICE, learned.clone()),
        ForbiddenClause::in_values(ENCODER_CHOICE, other_encoders),
    ]);

    let mut alternatives: Vec<(&str, HyperparameterValue)> = embeddings
        .into_iter()
        .filter(|e| *e != learned)
        .map(|e| (EMBEDDING_CHOICE, e))
        .collect();
    let one_hot = HyperparameterValue::from(ONE_HOT_ENCODER);
    if encoders.contains(&one_hot) {
        alternatives.push((ENCODER_CHOICE, one_hot));
    }
    let mut alternatives = alternatives.into_iter();

    loop {
        match space.add_forbidden_clause(clause.clone()) {
            Ok(()) => return Ok(()),
            Err(_) => {
                let (name, value) = alternatives
                    .next()
                    .ok_or_else(|| AutoNetError::configuration("Cannot find a legal default configuration"))?;
                debug!(hyperparameter = name, default = %value, "default conflicts with a forbidden clause, retrying");
                if let Err(e) = space.set_default_value(name, value) {
                    debug!(hyperparameter = name, error = %e, "alternative default rejected");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_space::ValueRange;
    use crate::dataset::TaskType;

    fn dp(categorical: Vec<usize>, numerical: Vec<usize>) -> DatasetProperties {
        DatasetProperties::new()
            .with_target_type(TargetType::TabularClassification)
            .with_task_type(TaskType::MulticlassClassification)
            .with_output_shape(3)
            .with_columns(categorical, numerical)
    }

    #[test]
    fn test_state_machine_order() {
        let mut pipeline = Pipeline::new(TargetType::TabularClassification);
        assert_eq!(pipeline.state(), PipelineState::Unconfigured);
        let err = pipeline.set_hyperparameters(&Configuration::new()).unwrap_err();
        assert!(matches!(err, AutoNetError::Configuration(_)));

        let space = pipeline.get_hyperparameter_search_space(&dp(vec![0], vec![1, 2])).unwrap();
        assert_eq!(pipeline.state(), PipelineState::SpaceBuilt);
        pipeline.set_hyperparameters(&space.get_default_configuration()).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Configured);

        let x = Array2::zeros((2, 3));
        let err = pipeline.predict(&x, None).unwrap_err();
        assert!(matches!(err, AutoNetError::NotFitted(_)));
    }

    #[test]
    fn test_default_avoids_forbidden_combination() {
        let mut updates = HyperparameterSearchSpaceUpdates::new();
        updates.append(
            "encoder",
            CHOICE_KEY,
            ValueRange::Choices(vec!["OrdinalEncoder".into(), "OneHotEncoder".into()]),
            "OrdinalEncoder",
            false,
        );
        let mut pipeline = Pipeline::new(TargetType::TabularClassification).with_search_space_updates(updates);
        let space = pipeline.get_hyperparameter_search_space(&dp(vec![0], vec![1])).unwrap();
        let default = space.get_default_configuration();
        assert_eq!(default.string(ENCODER_CHOICE).unwrap(), "OrdinalEncoder");
        assert_eq!(default.string(EMBEDDING_CHOICE).unwrap(), "NoEmbedding");
    }

    #[test]
    fn test_unsatisfiable_default_is_reported() {
        let mut updates = HyperparameterSearchSpaceUpdates::new();
        updates.append(
            "encoder",
            CHOICE_KEY,
            ValueRange::Choices(vec!["OrdinalEncoder".into()]),
            "OrdinalEncoder",
            false,
        );
        updates.append(
            "network_embedding",
            CHOICE_KEY,
            ValueRange::Choices(vec![LEARNED_ENTITY_EMBEDDING.into()]),
            LEARNED_ENTITY_EMBEDDING,
            false,
        );
        let mut pipeline = Pipeline::new(TargetType::TabularClassification).with_search_space_updates(updates);
        let err = pipeline.get_hyperparameter_search_space(&dp(vec![0], vec![1])).unwrap_err();
        assert!(err.to_string().contains("Cannot find a legal default configuration"));
    }

    #[test]
    fn test_unknown_update_targets_are_rejected() {
        let mut updates = HyperparameterSearchSpaceUpdates::new();
        updates.append("not_a_step", "x", ValueRange::Int { lower: 1, upper: 2 }, 1i64, false);
        let mut pipeline = Pipeline::new(TargetType::TabularClassification).with_search_space_updates(updates);
        assert!(pipeline.get_hyperparameter_search_space(&dp(vec![], vec![0])).is_err());

        let mut updates = HyperparameterSearchSpaceUpdates::new();
        updates.append("data_loader", "no_such_param", ValueRange::Int { lower: 1, upper: 2 }, 1i64, false);
        let mut pipeline = Pipeline::new(TargetType::TabularClassification).with_search_space_updates(updates);
        let err = pipeline.get_hyperparameter_search_space(&dp(vec![], vec![0])).unwrap_err();
        assert!(matches!(err, AutoNetError::Configuration(_)));
    }

    #[test]
    fn test_include_on_single_step_is_rejected() {
        let mut pipeline = Pipeline::new(TargetType::TabularClassification)
            .with_include("imputer", vec!["SimpleImputer".to_string()]);
        assert!(pipeline.get_hyperparameter_search_space(&dp(vec![], vec![0])).is_err());
    }

    #[test]
    fn test_mismatched_target_type_is_overridden() {
        let mut pipeline = Pipeline::new(TargetType::TabularClassification);
        let given = dp(vec![], vec![0]).with_target_type(TargetType::TabularRegression);
        pipeline.get_hyperparameter_search_space(&given).unwrap();
        assert_eq!(
            pipeline.dataset_properties().unwrap().target_type,
            Some(TargetType::TabularClassification)
        );
    }

    #[test]
    fn test_representation_skips_mechanical_steps() {
        let mut pipeline = Pipeline::new(TargetType::TabularClassification);
        let space = pipeline.get_hyperparameter_search_space(&dp(vec![], vec![0, 1])).unwrap();
        let mut config = space.get_default_configuration();
        config.insert("scaler:__choice__", "MinMaxScaler");
        pipeline.set_hyperparameters(&config).unwrap();
        let repr = pipeline.get_pipeline_representation();
        assert_eq!(repr.preprocessing, "SimpleImputer,NoCoalescer,NoEncoder,MinMaxScaler,NoFeaturePreprocessor");
        assert!(repr.estimator.contains("ShapedMLP") || repr.estimator.contains("MLP"));
        assert!(!repr.estimator.contains("Adam"));
    }
}
