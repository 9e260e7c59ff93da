//! A pipeline step: one fixed component or a choice over a category

use crate::components::{
    Component, ComponentCategory, ComponentChoice, ComponentRegistry, ContextUpdate, RunContext, TransformContext,
};
use crate::config_space::{ComponentUpdates, Configuration, ConfigurationSpace};
use crate::dataset::DatasetProperties;
use crate::error::{AutoNetError, Result};
use std::sync::Arc;

#[derive(Debug)]
pub enum PipelineStep {
    Component(Box<dyn Component>),
    Choice(ComponentChoice),
}

impl PipelineStep {
    pub fn component<C: Component + 'static>(component: C) -> Self {
        PipelineStep::Component(Box::new(component))
    }

    pub fn choice(category: ComponentCategory, registry: &Arc<ComponentRegistry>) -> Self {
        PipelineStep::Choice(ComponentChoice::new(category, registry.clone()))
    }

    pub fn category(&self) -> ComponentCategory {
        match self {
            PipelineStep::Component(c) => c.category(),
            PipelineStep::Choice(c) => c.category(),
        }
    }

    /// Step name used as the prefix of its hyperparameters
    pub fn name(&self) -> &'static str {
        self.category().as_str()
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, PipelineStep::Choice(_))
    }

    /// The component this step currently runs, if any
    pub fn selected(&self) -> Option<&dyn Component> {
        match self {
            PipelineStep::Component(c) => Some(c.as_ref()),
            PipelineStep::Choice(c) => c.choice(),
        }
    }

    pub(crate) fn get_hyperparameter_search_space(
        &mut self,
        dataset_properties: &DatasetProperties,
        include: Option<&[String]>,
        exclude: Option<&[String]>,
        updates: &ComponentUpdates,
    ) -> Result<ConfigurationSpace> {
        match self {
            PipelineStep::Component(c) => c.get_hyperparameter_search_space(dataset_properties, updates),
            PipelineStep::Choice(c) => {
                c.get_hyperparameter_search_space(dataset_properties, None, include, exclude, updates)
            }
        }
    }

    pub(crate) fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        match self {
            PipelineStep::Component(c) => c.set_hyperparameters(configuration),
            PipelineStep::Choice(c) => c.set_hyperparameters(configuration),
        }
    }

    pub(crate) fn fit(&mut self, context: &RunContext) -> Result<ContextUpdate> {
        match self {
            PipelineStep::Component(c) => c.fit(context),
            PipelineStep::Choice(c) => c.fit(context),
        }
    }

    pub(crate) fn transform(&self, context: TransformContext) -> Result<TransformContext> {
        match self {
            PipelineStep::Component(c) if !c.is_fitted() => Err(AutoNetError::not_fitted(c.name())),
            PipelineStep::Component(c) => c.transform(context),
            PipelineStep::Choice(c) => c.transform(context),
        }
    }
}
