//! Choice: a step that selects one component of a category

use super::base::{Component, ComponentCategory};
use super::context::{ContextUpdate, RunContext, TransformContext};
use super::registry::{ComponentFactory, ComponentRegistry};
use crate::config_space::{
    ComponentUpdates, Configuration, ConfigurationSpace, Hyperparameter, HyperparameterValue, ValueRange,
    CHOICE_KEY,
};
use crate::dataset::DatasetProperties;
use crate::error::{AutoNetError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Selector over the components of one category.
///
/// Only the selected component is ever instantiated.
#[derive(Debug)]
pub struct ComponentChoice {
    category: ComponentCategory,
    registry: Arc<ComponentRegistry>,
    choice: Option<Box<dyn Component>>,
    configuration_space: Option<ConfigurationSpace>,
    dataset_properties: Option<DatasetProperties>,
}

impl ComponentChoice {
    pub fn new(category: ComponentCategory, registry: Arc<ComponentRegistry>) -> Self {
        Self {
            category,
            registry,
            choice: None,
            configuration_space: None,
            dataset_properties: None,
        }
    }

    pub fn category(&self) -> ComponentCategory {
        self.category
    }

    pub fn get_components(&self) -> BTreeMap<String, ComponentFactory> {
        self.registry.components(self.category)
    }

    /// Components compatible with the dataset, filtered by `include`/`exclude`
    pub fn get_available_components(
        &self,
        dataset_properties: &DatasetProperties,
        include: Option<&[String]>,
        exclude: Option<&[String]>,
    ) -> Result<BTreeMap<String, ComponentFactory>> {
        if include.is_some() && exclude.is_some() {
            return Err(AutoNetError::configuration(
                "the argument include and exclude cannot be used together",
            ));
        }
        let components = self.get_components();
        if let Some(include) = include {
            if let Some(unknown) = include.iter().find(|name| !components.contains_key(*name)) {
                return Err(AutoNetError::configuration(format!(
                    "trying to include unknown {} component '{}'",
                    self.category, unknown
                )));
            }
        }

        let available: BTreeMap<String, ComponentFactory> = components
            .into_iter()
            .filter(|(name, _)| include.map(|inc| inc.contains(name)).unwrap_or(true))
            .filter(|(name, _)| !exclude.map(|exc| exc.contains(name)).unwrap_or(false))
            .filter(|(_, f)| f().is_compatible(dataset_properties))
            .collect();

        if available.is_empty() {
            return Err(AutoNetError::configuration(format!(
                "no {} component is available for this dataset",
                self.category
            )));
        }
        Ok(available)
    }

    fn resolve_default(
        &self,
        available: &BTreeMap<String, ComponentFactory>,
        default: Option<&str>,
    ) -> Option<String> {
        if let Some(d) = default.filter(|d| available.contains_key(*d)) {
            return Some(d.to_string());
        }
        self.category
            .default_priority()
            .iter()
            .find(|name| available.contains_key(**name))
            .map(|name| name.to_string())
            .or_else(|| available.keys().next().cloned())
    }

    /// Build the `__choice__` hyperparameter and the conditional sub-space
    /// of every candidate component
    pub fn get_hyperparameter_search_space(
        &mut self,
        dataset_properties: &DatasetProperties,
        default: Option<&str>,
        include: Option<&[String]>,
        exclude: Option<&[String]>,
        updates: &ComponentUpdates,
    ) -> Result<ConfigurationSpace> {
        dataset_properties.check_required(self.category.required_dataset_properties())?;

        let available = self.get_available_components(dataset_properties, include, exclude)?;
        let mut default = self.resolve_default(&available, default);
        let collapse = self.category.collapses_to_noop(dataset_properties);
        let noop = self.category.noop_component();

        let domain: Vec<String> = match updates.get(CHOICE_KEY) {
            Some(update) => {
                let requested = match &update.value_range {
                    ValueRange::Choices(choices) => choices
                        .iter()
                        .map(|c| {
                            c.as_str().map(str::to_string).ok_or_else(|| {
                                AutoNetError::configuration(format!(
                                    "{} choice update must list component names, got {}",
                                    self.category, c
                                ))
                            })
                        })
                        .collect::<Result<Vec<_>>>()?,
                    other => {
                        return Err(AutoNetError::configuration(format!(
                            "{} choice update must be a set of choices, got {:?}",
                            self.category, other
                        )))
                    }
                };
                if let Some(bad) = requested.iter().find(|c| !available.contains_key(*c)) {
                    return Err(AutoNetError::configuration(format!(
                        "expected given update for {} to have choices in {:?}, got '{}'",
                        self.category,
                        available.keys().collect::<Vec<_>>(),
                        bad
                    )));
                }
                if collapse {
                    let only_noop = noop.map(|n| requested.len() == 1 && requested[0] == n).unwrap_or(false);
                    if !only_noop {
                        return Err(AutoNetError::configuration(format!(
                            "the dataset leaves nothing for {} to act on, so the only legal choice is {:?}, got {:?}",
                            self.category, noop, requested
                        )));
                    }
                }
                default = update.default_value.as_str().map(str::to_string);
                requested
            }
            None if collapse => {
                let noop = noop
                    .filter(|n| available.contains_key(*n))
                    .ok_or_else(|| {
                        AutoNetError::configuration(format!(
                            "the dataset leaves nothing for {} to act on, but its no-op component is not available",
                            self.category
                        ))
                    })?;
                default = Some(noop.to_string());
                vec![noop.to_string()]
            }
            None => available.keys().cloned().collect(),
        };

        let default = default.ok_or_else(|| {
            AutoNetError::configuration(format!("no default {} component could be resolved", self.category))
        })?;
        let selector = Hyperparameter::categorical(CHOICE_KEY, domain.iter().map(String::as_str))?
            .with_default(default.as_str())?;

        let mut space = ConfigurationSpace::new();
        space.add_hyperparameter(selector)?;
        for name in &domain {
            let factory = available
                .get(name)
                .ok_or_else(|| AutoNetError::configuration(format!("unknown component '{}'", name)))?;
            let component = factory();
            let sub_space =
                component.get_hyperparameter_search_space(dataset_properties, &updates.with_prefix(name))?;
            space.add_configuration_space(
                name,
                &sub_space,
                Some((CHOICE_KEY, HyperparameterValue::from(name.as_str()))),
            )?;
        }

        debug!(
            category = %self.category,
            choices = ?domain,
            default = %default,
            n_hyperparameters = space.len(),
            "built choice search space"
        );
        self.configuration_space = Some(space.clone());
        self.dataset_properties = Some(dataset_properties.clone());
        Ok(space)
    }

    /// Instantiate the selected component with its hyperparameters
    pub fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        let name = configuration.string(CHOICE_KEY)?;
        let factory = self.get_components().get(name).cloned().ok_or_else(|| {
            AutoNetError::configuration(format!("unknown {} component '{}'", self.category, name))
        })?;
        let mut component = factory();
        component.set_hyperparameters(&configuration.sub_configuration(name))?;
        self.choice = Some(component);
        Ok(())
    }

    pub fn choice(&self) -> Option<&dyn Component> {
        self.choice.as_deref()
    }

    pub fn configuration_space(&self) -> Option<&ConfigurationSpace> {
        self.configuration_space.as_ref()
    }

    pub fn dataset_properties(&self) -> Option<&DatasetProperties> {
        self.dataset_properties.as_ref()
    }

    fn selected_mut(&mut self) -> Result<&mut Box<dyn Component>> {
        let category = self.category;
        self.choice.as_mut().ok_or_else(|| {
            AutoNetError::configuration(format!(
                "{} choice has no selected component; set hyperparameters first",
                category
            ))
        })
    }

    pub fn fit(&mut self, context: &RunContext) -> Result<ContextUpdate> {
        self.selected_mut()?.fit(context)
    }

    pub fn transform(&self, context: TransformContext) -> Result<TransformContext> {
        match &self.choice {
            Some(component) if component.is_fitted() => component.transform(context),
            Some(component) => Err(AutoNetError::not_fitted(format!(
                "{} choice selected {} but it has not been fitted",
                self.category,
                component.name()
            ))),
            None => Err(AutoNetError::not_fitted(format!("{} choice", self.category))),
        }
    }

    /// Fresh, unconfigured copy sharing the registry
    pub fn spawn(&self) -> Self {
        Self::new(self.category, self.registry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_space::HyperparameterSearchSpace;
    use crate::dataset::{ColumnBlocks, TargetType};

    fn encoder_choice() -> ComponentChoice {
        ComponentChoice::new(ComponentCategory::Encoder, Arc::new(ComponentRegistry::new()))
    }

    fn dp(categorical: Vec<usize>, numerical: Vec<usize>) -> DatasetProperties {
        DatasetProperties::new()
            .with_target_type(TargetType::TabularClassification)
            .with_columns(categorical, numerical)
    }

    fn domain(space: &ConfigurationSpace) -> Vec<HyperparameterValue> {
        space.get(CHOICE_KEY).unwrap().choices().unwrap()
    }

    #[test]
    fn test_empty_categorical_collapses_to_noop() {
        let mut choice = encoder_choice();
        let space = choice
            .get_hyperparameter_search_space(&dp(vec![], vec![0, 1, 2]), None, None, None, &ComponentUpdates::new())
            .unwrap();
        assert_eq!(domain(&space), vec![HyperparameterValue::from("NoEncoder")]);
        assert!(choice.configuration_space().is_some());
    }

    #[test]
    fn test_default_follows_priority() {
        let mut choice = encoder_choice();
        let space = choice
            .get_hyperparameter_search_space(&dp(vec![1], vec![0]), None, None, None, &ComponentUpdates::new())
            .unwrap();
        assert_eq!(domain(&space).len(), 3);
        assert_eq!(
            space.get(CHOICE_KEY).unwrap().default_value,
            HyperparameterValue::from("OneHotEncoder")
        );
    }

    #[test]
    fn test_include_without_noop_fails_on_empty_block() {
        let mut choice = encoder_choice();
        let include = vec!["OneHotEncoder".to_string()];
        let result = choice.get_hyperparameter_search_space(
            &dp(vec![], vec![0]),
            None,
            Some(&include),
            None,
            &ComponentUpdates::new(),
        );
        assert!(matches!(result, Err(AutoNetError::Configuration(_))));
    }

    #[test]
    fn test_choice_update_must_be_subset() {
        let mut choice = encoder_choice();
        let mut updates = ComponentUpdates::new();
        updates.insert(HyperparameterSearchSpace::choices(CHOICE_KEY, ["OneHotEncoder", "Bogus"], "OneHotEncoder"));
        let result =
            choice.get_hyperparameter_search_space(&dp(vec![0], vec![1]), None, None, None, &updates);
        assert!(matches!(result, Err(AutoNetError::Configuration(_))));
    }

    #[test]
    fn test_missing_property_is_assertion() {
        let mut choice = encoder_choice();
        let dp = DatasetProperties::new().with_target_type(TargetType::TabularClassification);
        let err = choice
            .get_hyperparameter_search_space(&dp, None, None, None, &ComponentUpdates::new())
            .unwrap_err();
        assert!(matches!(err, AutoNetError::MissingDatasetProperty(_)));
    }

    #[test]
    fn test_set_hyperparameters_instantiates_selected() {
        let mut choice = encoder_choice();
        let space = choice
            .get_hyperparameter_search_space(&dp(vec![0], vec![1]), None, None, None, &ComponentUpdates::new())
            .unwrap();
        let mut config = space.get_default_configuration();
        config.insert(CHOICE_KEY, "OrdinalEncoder");
        choice.set_hyperparameters(&config).unwrap();
        assert_eq!(choice.choice().unwrap().name(), "OrdinalEncoder");
    }

    #[test]
    fn test_transform_before_fit_is_not_fitted() {
        let mut choice = encoder_choice();
        let space = choice
            .get_hyperparameter_search_space(&dp(vec![0], vec![1]), None, None, None, &ComponentUpdates::new())
            .unwrap();
        choice.set_hyperparameters(&space.get_default_configuration()).unwrap();

        let x = ndarray::array![[0.0, 1.5], [1.0, 2.5]];
        let blocks = ColumnBlocks::split(&x, &[0], &[1]).unwrap();
        let err = choice.transform(TransformContext::new(blocks)).unwrap_err();
        assert!(matches!(err, AutoNetError::NotFitted(_)));
    }
}
