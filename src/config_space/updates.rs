//! Search-space updates: external overrides applied while spaces are built

use super::hyperparameter::{Hyperparameter, HyperparameterValue};
use crate::error::{AutoNetError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Range of values an update (or a component default) allows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueRange {
    Choices(Vec<HyperparameterValue>),
    Float { lower: f64, upper: f64 },
    Int { lower: i64, upper: i64 },
}

/// Declarative description of one hyperparameter a component exposes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterSearchSpace {
    pub hyperparameter: String,
    pub value_range: ValueRange,
    pub default_value: HyperparameterValue,
    #[serde(default)]
    pub log: bool,
}

impl HyperparameterSearchSpace {
    pub fn choices<V: Into<HyperparameterValue>>(
        name: impl Into<String>,
        choices: impl IntoIterator<Item = V>,
        default_value: impl Into<HyperparameterValue>,
    ) -> Self {
        Self {
            hyperparameter: name.into(),
            value_range: ValueRange::Choices(choices.into_iter().map(Into::into).collect()),
            default_value: default_value.into(),
            log: false,
        }
    }

    pub fn float(name: impl Into<String>, lower: f64, upper: f64, default_value: f64, log: bool) -> Self {
        Self {
            hyperparameter: name.into(),
            value_range: ValueRange::Float { lower, upper },
            default_value: HyperparameterValue::Float(default_value),
            log,
        }
    }

    pub fn int(name: impl Into<String>, lower: i64, upper: i64, default_value: i64, log: bool) -> Self {
        Self {
            hyperparameter: name.into(),
            value_range: ValueRange::Int { lower, upper },
            default_value: HyperparameterValue::Int(default_value),
            log,
        }
    }

    /// Materialise as a hyperparameter. Single-valued ranges become constants.
    pub fn to_hyperparameter(&self) -> Result<Hyperparameter> {
        let name = self.hyperparameter.clone();
        let hp = match &self.value_range {
            ValueRange::Choices(choices) if choices.len() == 1 => {
                return Ok(Hyperparameter::constant(name, choices[0].clone()));
            }
            ValueRange::Choices(choices) => Hyperparameter::categorical(name, choices.iter().cloned())?,
            ValueRange::Float { lower, upper } if lower == upper => {
                return Ok(Hyperparameter::constant(name, *lower));
            }
            ValueRange::Float { lower, upper } => Hyperparameter::float(name, *lower, *upper, self.log)?,
            ValueRange::Int { lower, upper } if lower == upper => {
                return Ok(Hyperparameter::constant(name, *lower));
            }
            ValueRange::Int { lower, upper } => Hyperparameter::integer(name, *lower, *upper, self.log)?,
        };
        hp.with_default(self.default_value.clone())
    }

    /// Integer bounds of an `Int` range (or of an integral choice list)
    pub fn int_bounds(&self) -> Option<(i64, i64)> {
        match &self.value_range {
            ValueRange::Int { lower, upper } => Some((*lower, *upper)),
            ValueRange::Choices(choices) => {
                let ints: Vec<i64> = choices.iter().filter_map(|c| c.as_i64()).collect();
                if ints.len() != choices.len() {
                    return None;
                }
                Some((*ints.iter().min()?, *ints.iter().max()?))
            }
            ValueRange::Float { .. } => None,
        }
    }
}

/// Updates addressed to a single node (pipeline step or choice candidate),
/// keyed by hyperparameter name relative to that node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentUpdates {
    entries: BTreeMap<String, HyperparameterSearchSpace>,
}

impl ComponentUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, update: HyperparameterSearchSpace) {
        self.entries.insert(update.hyperparameter.clone(), update);
    }

    pub fn get(&self, name: &str) -> Option<&HyperparameterSearchSpace> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// The update for `default.hyperparameter`, or `default` itself
    pub fn resolve(&self, default: HyperparameterSearchSpace) -> HyperparameterSearchSpace {
        self.entries
            .get(&default.hyperparameter)
            .cloned()
            .unwrap_or(default)
    }

    /// Shorthand for `resolve(default).to_hyperparameter()`
    pub fn hyperparameter(&self, default: HyperparameterSearchSpace) -> Result<Hyperparameter> {
        self.resolve(default).to_hyperparameter()
    }

    /// Entries under `prefix:` with the prefix stripped
    pub fn with_prefix(&self, prefix: &str) -> ComponentUpdates {
        let lead = format!("{}:", prefix);
        let entries = self
            .entries
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(&lead).map(|rest| {
                    let mut v = v.clone();
                    v.hyperparameter = rest.to_string();
                    (rest.to_string(), v)
                })
            })
            .collect();
        ComponentUpdates { entries }
    }
}

/// One externally supplied override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterSearchSpaceUpdate {
    pub node_name: String,
    pub hyperparameter: String,
    pub value_range: ValueRange,
    pub default_value: HyperparameterValue,
    #[serde(default)]
    pub log: bool,
}

impl HyperparameterSearchSpaceUpdate {
    pub fn to_search_space(&self) -> HyperparameterSearchSpace {
        HyperparameterSearchSpace {
            hyperparameter: self.hyperparameter.clone(),
            value_range: self.value_range.clone(),
            default_value: self.default_value.clone(),
            log: self.log,
        }
    }
}

/// Ordered table of overrides keyed by pipeline node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterSearchSpaceUpdates {
    updates: Vec<HyperparameterSearchSpaceUpdate>,
}

impl HyperparameterSearchSpaceUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        node_name: impl Into<String>,
        hyperparameter: impl Into<String>,
        value_range: ValueRange,
        default_value: impl Into<HyperparameterValue>,
        log: bool,
    ) -> &mut Self {
        self.updates.push(HyperparameterSearchSpaceUpdate {
            node_name: node_name.into(),
            hyperparameter: hyperparameter.into(),
            value_range,
            default_value: default_value.into(),
            log,
        });
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &HyperparameterSearchSpaceUpdate> {
        self.updates.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Updates addressed to `node_name`; later entries override earlier ones
    pub fn for_node(&self, node_name: &str) -> ComponentUpdates {
        let mut out = ComponentUpdates::new();
        for update in self.updates.iter().filter(|u| u.node_name == node_name) {
            out.insert(update.to_search_space());
        }
        out
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(AutoNetError::from)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_space::Domain;

    #[test]
    fn test_single_choice_becomes_constant() {
        let hp = HyperparameterSearchSpace::choices("__choice__", ["NoEncoder"], "NoEncoder")
            .to_hyperparameter()
            .unwrap();
        assert!(matches!(hp.domain, Domain::Constant { .. }));
    }

    #[test]
    fn test_illegal_default_rejected() {
        let space = HyperparameterSearchSpace::int("num_groups", 1, 3, 5, false);
        assert!(space.to_hyperparameter().is_err());
    }

    #[test]
    fn test_resolve_and_prefix() {
        let mut updates = HyperparameterSearchSpaceUpdates::new();
        updates.append(
            "network_backbone",
            "MLPBackbone:num_groups",
            ValueRange::Int { lower: 1, upper: 2 },
            1i64,
            false,
        );
        let node = updates.for_node("network_backbone");
        let mlp = node.with_prefix("MLPBackbone");
        let resolved = mlp.resolve(HyperparameterSearchSpace::int("num_groups", 1, 8, 3, false));
        assert_eq!(resolved.int_bounds(), Some((1, 2)));
        assert!(node.with_prefix("ShapedMLPBackbone").is_empty());
    }

    #[test]
    fn test_updates_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updates.json");
        let mut updates = HyperparameterSearchSpaceUpdates::new();
        updates.append(
            "encoder",
            "__choice__",
            ValueRange::Choices(vec!["OneHotEncoder".into()]),
            "OneHotEncoder",
            false,
        );
        updates.save(&path).unwrap();
        assert_eq!(HyperparameterSearchSpaceUpdates::load(&path).unwrap(), updates);
    }
}
