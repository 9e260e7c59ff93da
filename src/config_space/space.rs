//! Configuration space: hyperparameters plus conditions and forbidden clauses

use super::conditions::{Condition, ForbiddenClause};
use super::configuration::Configuration;
use super::hyperparameter::{Hyperparameter, HyperparameterValue};
use crate::error::{AutoNetError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MAX_SAMPLING_ATTEMPTS: usize = 1000;

/// Joint search space.
///
/// Hyperparameters are kept in insertion order and a condition's parent must
/// be declared before its child, so a single forward pass over the list
/// resolves activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSpace {
    hyperparameters: Vec<Hyperparameter>,
    conditions: Vec<Condition>,
    forbidden_clauses: Vec<ForbiddenClause>,
}

impl ConfigurationSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hyperparameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hyperparameters.is_empty()
    }

    pub fn hyperparameters(&self) -> &[Hyperparameter] {
        &self.hyperparameters
    }

    pub fn hyperparameter_names(&self) -> Vec<&str> {
        self.hyperparameters.iter().map(|hp| hp.name.as_str()).collect()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn forbidden_clauses(&self) -> &[ForbiddenClause] {
        &self.forbidden_clauses
    }

    pub fn get(&self, name: &str) -> Option<&Hyperparameter> {
        self.hyperparameters.iter().find(|hp| hp.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.hyperparameters.iter().position(|hp| hp.name == name)
    }

    fn require(&self, name: &str) -> Result<&Hyperparameter> {
        self.get(name).ok_or_else(|| {
            AutoNetError::configuration(format!("hyperparameter '{}' is not part of the space", name))
        })
    }

    pub fn add_hyperparameter(&mut self, hp: Hyperparameter) -> Result<()> {
        if self.contains(&hp.name) {
            return Err(AutoNetError::configuration(format!(
                "hyperparameter '{}' is already in the configuration space",
                hp.name
            )));
        }
        self.hyperparameters.push(hp);
        Ok(())
    }

    pub fn add_hyperparameters(&mut self, hps: impl IntoIterator<Item = Hyperparameter>) -> Result<()> {
        for hp in hps {
            self.add_hyperparameter(hp)?;
        }
        Ok(())
    }

    pub fn add_condition(&mut self, condition: Condition) -> Result<()> {
        let child = self.position(&condition.child).ok_or_else(|| {
            AutoNetError::configuration(format!("condition child '{}' is not in the space", condition.child))
        })?;
        let parent = self.position(&condition.parent).ok_or_else(|| {
            AutoNetError::configuration(format!("condition parent '{}' is not in the space", condition.parent))
        })?;
        if parent >= child {
            return Err(AutoNetError::configuration(format!(
                "condition parent '{}' must be declared before its child '{}'",
                condition.parent, condition.child
            )));
        }
        let parent_hp = &self.hyperparameters[parent];
        if condition.values.is_empty() {
            return Err(AutoNetError::configuration(format!(
                "condition on '{}' allows no parent value",
                condition.child
            )));
        }
        if let Some(bad) = condition.values.iter().find(|v| !parent_hp.contains(v)) {
            return Err(AutoNetError::configuration(format!(
                "condition value {} is not legal for parent '{}'",
                bad, condition.parent
            )));
        }
        self.conditions.push(condition);
        Ok(())
    }

    /// Add a forbidden clause. Fails, leaving the space unchanged, if the
    /// current default configuration violates it.
    pub fn add_forbidden_clause(&mut self, clause: ForbiddenClause) -> Result<()> {
        for (name, values) in clause.references() {
            let hp = self.require(name)?;
            if let Some(bad) = values.iter().find(|v| !hp.contains(v)) {
                return Err(AutoNetError::configuration(format!(
                    "forbidden value {} is not legal for '{}'",
                    bad, name
                )));
            }
        }
        let default = self.default_assignment();
        if clause.is_forbidden(&default) {
            return Err(AutoNetError::configuration(format!(
                "the default configuration violates forbidden clause {:?}",
                clause
            )));
        }
        self.forbidden_clauses.push(clause);
        Ok(())
    }

    /// Nest `child` under `prefix:`. When `parent` is given, the child's root
    /// hyperparameters are only active while the parent takes that value.
    pub fn add_configuration_space(
        &mut self,
        prefix: &str,
        child: &ConfigurationSpace,
        parent: Option<(&str, HyperparameterValue)>,
    ) -> Result<()> {
        for hp in &child.hyperparameters {
            self.add_hyperparameter(hp.renamed(format!("{}:{}", prefix, hp.name)))?;
        }
        if let Some((parent_name, value)) = parent {
            for hp in &child.hyperparameters {
                let is_root = !child.conditions.iter().any(|c| c.child == hp.name);
                if is_root {
                    self.add_condition(Condition::equals(
                        format!("{}:{}", prefix, hp.name),
                        parent_name,
                        value.clone(),
                    ))?;
                }
            }
        }
        for condition in &child.conditions {
            self.add_condition(condition.prefixed(prefix))?;
        }
        // The child's default already satisfies its own clauses
        self.forbidden_clauses
            .extend(child.forbidden_clauses.iter().map(|c| c.prefixed(prefix)));
        Ok(())
    }

    fn is_active(&self, name: &str, assignment: &BTreeMap<String, HyperparameterValue>) -> bool {
        self.conditions
            .iter()
            .filter(|c| c.child == name)
            .all(|c| c.is_satisfied_by(assignment.get(&c.parent)))
    }

    fn default_assignment(&self) -> BTreeMap<String, HyperparameterValue> {
        let mut assignment = BTreeMap::new();
        for hp in &self.hyperparameters {
            if self.is_active(&hp.name, &assignment) {
                assignment.insert(hp.name.clone(), hp.default_value.clone());
            }
        }
        assignment
    }

    pub fn get_default_configuration(&self) -> Configuration {
        Configuration::from_values(self.default_assignment())
    }

    /// Names of hyperparameters active under `config`
    pub fn get_active_hyperparameters(&self, config: &Configuration) -> Vec<&str> {
        self.hyperparameters
            .iter()
            .filter(|hp| self.is_active(&hp.name, config.values()))
            .map(|hp| hp.name.as_str())
            .collect()
    }

    /// Rejection-sample a configuration that satisfies every forbidden clause
    pub fn sample_configuration<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Configuration> {
        for _ in 0..MAX_SAMPLING_ATTEMPTS {
            let mut assignment = BTreeMap::new();
            for hp in &self.hyperparameters {
                if self.is_active(&hp.name, &assignment) {
                    assignment.insert(hp.name.clone(), hp.sample(rng));
                }
            }
            if !self.forbidden_clauses.iter().any(|c| c.is_forbidden(&assignment)) {
                return Ok(Configuration::from_values(assignment));
            }
        }
        Err(AutoNetError::configuration(format!(
            "could not sample a legal configuration in {} attempts",
            MAX_SAMPLING_ATTEMPTS
        )))
    }

    pub fn sample_configurations<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Result<Vec<Configuration>> {
        (0..n).map(|_| self.sample_configuration(rng)).collect()
    }

    /// Validate domain membership, activity and forbidden clauses
    pub fn check_configuration(&self, config: &Configuration) -> Result<()> {
        if let Some(unknown) = config.values().keys().find(|k| !self.contains(k)) {
            return Err(AutoNetError::configuration(format!(
                "'{}' is not a hyperparameter of this space",
                unknown
            )));
        }
        for hp in &self.hyperparameters {
            let active = self.is_active(&hp.name, config.values());
            match (active, config.get(&hp.name)) {
                (true, None) => {
                    return Err(AutoNetError::configuration(format!(
                        "active hyperparameter '{}' has no value",
                        hp.name
                    )))
                }
                (false, Some(_)) => {
                    return Err(AutoNetError::configuration(format!(
                        "inactive hyperparameter '{}' must not carry a value",
                        hp.name
                    )))
                }
                (true, Some(value)) if !hp.contains(value) => {
                    return Err(AutoNetError::configuration(format!(
                        "value {} is not legal for '{}'",
                        value, hp.name
                    )))
                }
                _ => {}
            }
        }
        if let Some(clause) = self.forbidden_clauses.iter().find(|c| c.is_forbidden(config.values())) {
            return Err(AutoNetError::configuration(format!(
                "configuration violates forbidden clause {:?}",
                clause
            )));
        }
        Ok(())
    }

    /// Change a default value. Reverts and fails if the new default
    /// configuration would violate a forbidden clause.
    pub fn set_default_value(&mut self, name: &str, value: HyperparameterValue) -> Result<()> {
        let idx = self.position(name).ok_or_else(|| {
            AutoNetError::configuration(format!("hyperparameter '{}' is not part of the space", name))
        })?;
        if !self.hyperparameters[idx].contains(&value) {
            return Err(AutoNetError::configuration(format!(
                "default value {} is not legal for '{}'",
                value, name
            )));
        }
        let normalized = self.hyperparameters[idx].normalize(value);
        let previous = std::mem::replace(&mut self.hyperparameters[idx].default_value, normalized);
        let default = self.default_assignment();
        if let Some(clause) = self.forbidden_clauses.iter().find(|c| c.is_forbidden(&default)) {
            let clause = format!("{:?}", clause);
            self.hyperparameters[idx].default_value = previous;
            return Err(AutoNetError::configuration(format!(
                "new default for '{}' violates forbidden clause {}",
                name, clause
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn dropout_space() -> ConfigurationSpace {
        let mut space = ConfigurationSpace::new();
        space
            .add_hyperparameter(Hyperparameter::categorical("use_dropout", [true, false]).unwrap())
            .unwrap();
        space
            .add_hyperparameter(Hyperparameter::float("dropout", 0.0, 0.8, false).unwrap())
            .unwrap();
        space
            .add_condition(Condition::equals("dropout", "use_dropout", true))
            .unwrap();
        space
    }

    #[test]
    fn test_condition_parent_must_come_first() {
        let mut space = ConfigurationSpace::new();
        space.add_hyperparameter(Hyperparameter::float("b", 0.0, 1.0, false).unwrap()).unwrap();
        space.add_hyperparameter(Hyperparameter::categorical("a", [true, false]).unwrap()).unwrap();
        assert!(space.add_condition(Condition::equals("b", "a", true)).is_err());
    }

    #[test]
    fn test_inactive_children_have_no_value() {
        let space = dropout_space();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        for config in space.sample_configurations(&mut rng, 50).unwrap() {
            let use_dropout = config.bool("use_dropout").unwrap();
            assert_eq!(config.contains("dropout"), use_dropout);
            space.check_configuration(&config).unwrap();
        }
    }

    #[test]
    fn test_forbidden_clause_on_default_is_rejected() {
        let mut space = ConfigurationSpace::new();
        space.add_hyperparameter(Hyperparameter::categorical("a", ["x", "y"]).unwrap()).unwrap();
        assert!(space.add_forbidden_clause(ForbiddenClause::equals("a", "x")).is_err());
        assert!(space.forbidden_clauses().is_empty());
        space.add_forbidden_clause(ForbiddenClause::equals("a", "y")).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        for config in space.sample_configurations(&mut rng, 20).unwrap() {
            assert_eq!(config.string("a").unwrap(), "x");
        }
    }

    #[test]
    fn test_set_default_value_reverts_on_conflict() {
        let mut space = ConfigurationSpace::new();
        space.add_hyperparameter(Hyperparameter::categorical("a", ["x", "y"]).unwrap()).unwrap();
        space.add_forbidden_clause(ForbiddenClause::equals("a", "y")).unwrap();
        assert!(space.set_default_value("a", "y".into()).is_err());
        assert_eq!(space.get("a").unwrap().default_value, HyperparameterValue::from("x"));
    }

    #[test]
    fn test_nested_space_conditions() {
        let mut child = dropout_space();
        child.add_hyperparameter(Hyperparameter::constant("units", 64i64)).unwrap();

        let mut space = ConfigurationSpace::new();
        space
            .add_hyperparameter(Hyperparameter::categorical("__choice__", ["MLP", "Other"]).unwrap())
            .unwrap();
        space
            .add_configuration_space("MLP", &child, Some(("__choice__", "MLP".into())))
            .unwrap();

        let default = space.get_default_configuration();
        assert_eq!(default.bool("MLP:use_dropout").unwrap(), true);
        assert!(default.contains("MLP:dropout"));

        let other = Configuration::new().with("__choice__", "Other");
        space.check_configuration(&other).unwrap();
        let stray = other.clone().with("MLP:units", 64i64);
        assert!(space.check_configuration(&stray).is_err());
    }

    #[test]
    fn test_check_configuration_rejects_unknown_and_missing() {
        let space = dropout_space();
        let missing = Configuration::new().with("use_dropout", true);
        assert!(space.check_configuration(&missing).is_err());
        let unknown = Configuration::new().with("use_dropout", false).with("nope", 1i64);
        assert!(space.check_configuration(&unknown).is_err());
    }
}
