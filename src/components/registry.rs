//! Component registry: built-in table plus runtime-registered additions

use super::base::{Component, ComponentCategory};
use super::builtin_components;
use crate::error::{AutoNetError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Creates a fresh, unconfigured component instance
pub type ComponentFactory = Arc<dyn Fn() -> Box<dyn Component> + Send + Sync>;

/// Wrap a constructor as a [`ComponentFactory`]
pub fn factory<C, F>(make: F) -> ComponentFactory
where
    C: Component + 'static,
    F: Fn() -> C + Send + Sync + 'static,
{
    Arc::new(move || Box::new(make()) as Box<dyn Component>)
}

/// Built-in components of `category`, keyed by component name
pub fn find_components(category: ComponentCategory) -> BTreeMap<String, ComponentFactory> {
    builtin_components(category)
        .into_iter()
        .map(|f| (f().name().to_string(), f))
        .collect()
}

/// Extension registry for one category
#[derive(Clone)]
pub struct ThirdPartyComponents {
    category: ComponentCategory,
    components: BTreeMap<String, ComponentFactory>,
}

impl ThirdPartyComponents {
    pub fn new(category: ComponentCategory) -> Self {
        Self {
            category,
            components: BTreeMap::new(),
        }
    }

    pub fn category(&self) -> ComponentCategory {
        self.category
    }

    /// Register a component. The factory's product must belong to this
    /// registry's category; a name that is already registered is replaced.
    pub fn add_component(&mut self, factory: ComponentFactory) -> Result<()> {
        let probe = factory();
        if probe.category() != self.category {
            return Err(AutoNetError::TypeMismatch {
                expected: format!("a {} component", self.category),
                actual: format!("{} ({})", probe.name(), probe.category()),
            });
        }
        let name = probe.name().to_string();
        if self.components.insert(name.clone(), factory).is_some() {
            warn!(
                category = %self.category,
                component = %name,
                "replacing an already registered component"
            );
        } else {
            debug!(category = %self.category, component = %name, "registered component");
        }
        Ok(())
    }

    pub fn components(&self) -> &BTreeMap<String, ComponentFactory> {
        &self.components
    }
}

impl fmt::Debug for ThirdPartyComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThirdPartyComponents")
            .field("category", &self.category)
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Full registry: built-ins merged with runtime additions
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    additions: BTreeMap<ComponentCategory, ThirdPartyComponents>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_component(&mut self, category: ComponentCategory, factory: ComponentFactory) -> Result<()> {
        self.additions
            .entry(category)
            .or_insert_with(|| ThirdPartyComponents::new(category))
            .add_component(factory)
    }

    /// Every component of `category`; a registered addition shadows a
    /// built-in of the same name
    pub fn components(&self, category: ComponentCategory) -> BTreeMap<String, ComponentFactory> {
        let mut components = find_components(category);
        if let Some(additions) = self.additions.get(&category) {
            for (name, f) in additions.components() {
                components.insert(name.clone(), f.clone());
            }
        }
        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::preprocessing::{NoEncoder, StandardScaler};

    #[test]
    fn test_find_builtin_encoders() {
        let names: Vec<String> = find_components(ComponentCategory::Encoder).into_keys().collect();
        assert_eq!(names, vec!["NoEncoder", "OneHotEncoder", "OrdinalEncoder"]);
    }

    #[test]
    fn test_wrong_category_is_a_type_error() {
        let mut extra = ThirdPartyComponents::new(ComponentCategory::Encoder);
        let err = extra.add_component(factory(StandardScaler::new)).unwrap_err();
        assert!(matches!(err, AutoNetError::TypeMismatch { .. }));
        assert!(extra.components().is_empty());
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut registry = ComponentRegistry::new();
        registry.add_component(ComponentCategory::Encoder, factory(NoEncoder::new)).unwrap();
        registry.add_component(ComponentCategory::Encoder, factory(NoEncoder::new)).unwrap();
        assert_eq!(registry.components(ComponentCategory::Encoder).len(), 3);
    }
}
