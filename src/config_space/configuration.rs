//! A concrete assignment of values to the active hyperparameters of a space

use super::hyperparameter::HyperparameterValue;
use crate::error::{AutoNetError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Mapping from hyperparameter name to value; inactive hyperparameters are absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    values: BTreeMap<String, HyperparameterValue>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: BTreeMap<String, HyperparameterValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &BTreeMap<String, HyperparameterValue> {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&HyperparameterValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<HyperparameterValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<HyperparameterValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<HyperparameterValue> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HyperparameterValue)> {
        self.values.iter()
    }

    fn required(&self, name: &str) -> Result<&HyperparameterValue> {
        self.values
            .get(name)
            .ok_or_else(|| AutoNetError::MissingHyperparameter(name.to_string()))
    }

    fn mismatch(name: &str, expected: &str, value: &HyperparameterValue) -> AutoNetError {
        AutoNetError::TypeMismatch {
            expected: format!("{} for '{}'", expected, name),
            actual: format!("{:?}", value),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        let v = self.required(name)?;
        v.as_f64().ok_or_else(|| Self::mismatch(name, "float", v))
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        let v = self.required(name)?;
        v.as_i64().ok_or_else(|| Self::mismatch(name, "int", v))
    }

    pub fn string(&self, name: &str) -> Result<&str> {
        let v = self.required(name)?;
        v.as_str().ok_or_else(|| Self::mismatch(name, "string", v))
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        let v = self.required(name)?;
        v.as_bool().ok_or_else(|| Self::mismatch(name, "bool", v))
    }

    /// Values under `prefix:` with the prefix stripped
    pub fn sub_configuration(&self, prefix: &str) -> Configuration {
        let lead = format!("{}:", prefix);
        let values = self
            .values
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&lead).map(|rest| (rest.to_string(), v.clone())))
            .collect();
        Configuration { values }
    }

    /// Inverse of [`sub_configuration`](Self::sub_configuration)
    pub fn prefixed(&self, prefix: &str) -> Configuration {
        let values = self
            .values
            .iter()
            .map(|(k, v)| (format!("{}:{}", prefix, k), v.clone()))
            .collect();
        Configuration { values }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration(values={{")?;
        for (k, v) in &self.values {
            writeln!(f, "  '{}': {},", k, v)?;
        }
        write!(f, "}})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let config = Configuration::new()
            .with("lr", 0.01)
            .with("num_groups", 3i64)
            .with("activation", "relu")
            .with("use_dropout", false);
        assert_eq!(config.float("lr").unwrap(), 0.01);
        assert_eq!(config.int("num_groups").unwrap(), 3);
        assert_eq!(config.float("num_groups").unwrap(), 3.0);
        assert_eq!(config.string("activation").unwrap(), "relu");
        assert!(!config.bool("use_dropout").unwrap());
        assert!(matches!(config.int("missing"), Err(AutoNetError::MissingHyperparameter(_))));
        assert!(matches!(config.int("activation"), Err(AutoNetError::TypeMismatch { .. })));
    }

    #[test]
    fn test_sub_configuration_strips_prefix() {
        let config = Configuration::new()
            .with("encoder:__choice__", "OneHotEncoder")
            .with("scaler:__choice__", "StandardScaler")
            .with("encoderx:foo", 1i64);
        let sub = config.sub_configuration("encoder");
        assert_eq!(sub.len(), 1);
        assert_eq!(sub.string("__choice__").unwrap(), "OneHotEncoder");
        assert_eq!(sub.prefixed("encoder").get("encoder:__choice__"), config.get("encoder:__choice__"));
    }
}
