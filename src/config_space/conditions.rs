//! Conditional activation and forbidden combinations

use super::hyperparameter::HyperparameterValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `child` is active only while `parent` is active and takes one of `values`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub child: String,
    pub parent: String,
    pub values: Vec<HyperparameterValue>,
}

impl Condition {
    pub fn equals(
        child: impl Into<String>,
        parent: impl Into<String>,
        value: impl Into<HyperparameterValue>,
    ) -> Self {
        Self {
            child: child.into(),
            parent: parent.into(),
            values: vec![value.into()],
        }
    }

    pub fn in_values<V: Into<HyperparameterValue>>(
        child: impl Into<String>,
        parent: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            child: child.into(),
            parent: parent.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the parent's current value (None when inactive) enables the child
    pub fn is_satisfied_by(&self, parent_value: Option<&HyperparameterValue>) -> bool {
        parent_value
            .map(|v| self.values.iter().any(|allowed| allowed.loosely_eq(v)))
            .unwrap_or(false)
    }

    pub(crate) fn prefixed(&self, prefix: &str) -> Self {
        Self {
            child: format!("{}:{}", prefix, self.child),
            parent: format!("{}:{}", prefix, self.parent),
            values: self.values.clone(),
        }
    }
}

/// A combination of values that may never occur together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForbiddenClause {
    Equals { name: String, value: HyperparameterValue },
    In { name: String, values: Vec<HyperparameterValue> },
    And(Vec<ForbiddenClause>),
}

impl ForbiddenClause {
    pub fn equals(name: impl Into<String>, value: impl Into<HyperparameterValue>) -> Self {
        ForbiddenClause::Equals {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn in_values<V: Into<HyperparameterValue>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        ForbiddenClause::In {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and(clauses: Vec<ForbiddenClause>) -> Self {
        ForbiddenClause::And(clauses)
    }

    /// Fires only when every referenced hyperparameter is active with a matching value
    pub fn is_forbidden(&self, assignment: &BTreeMap<String, HyperparameterValue>) -> bool {
        match self {
            ForbiddenClause::Equals { name, value } => {
                assignment.get(name).map(|v| v.loosely_eq(value)).unwrap_or(false)
            }
            ForbiddenClause::In { name, values } => assignment
                .get(name)
                .map(|v| values.iter().any(|f| f.loosely_eq(v)))
                .unwrap_or(false),
            ForbiddenClause::And(clauses) => {
                !clauses.is_empty() && clauses.iter().all(|c| c.is_forbidden(assignment))
            }
        }
    }

    /// Every (name, values) pair the clause references
    pub fn references(&self) -> Vec<(&str, Vec<&HyperparameterValue>)> {
        match self {
            ForbiddenClause::Equals { name, value } => vec![(name.as_str(), vec![value])],
            ForbiddenClause::In { name, values } => vec![(name.as_str(), values.iter().collect())],
            ForbiddenClause::And(clauses) => clauses.iter().flat_map(|c| c.references()).collect(),
        }
    }

    pub(crate) fn prefixed(&self, prefix: &str) -> Self {
        match self {
            ForbiddenClause::Equals { name, value } => ForbiddenClause::Equals {
                name: format!("{}:{}", prefix, name),
                value: value.clone(),
            },
            ForbiddenClause::In { name, values } => ForbiddenClause::In {
                name: format!("{}:{}", prefix, name),
                values: values.clone(),
            },
            ForbiddenClause::And(clauses) => {
                ForbiddenClause::And(clauses.iter().map(|c| c.prefixed(prefix)).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(pairs: &[(&str, HyperparameterValue)]) -> BTreeMap<String, HyperparameterValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_condition_requires_active_parent() {
        let cond = Condition::equals("use_dropout:p", "use_dropout", true);
        assert!(cond.is_satisfied_by(Some(&HyperparameterValue::Bool(true))));
        assert!(!cond.is_satisfied_by(Some(&HyperparameterValue::Bool(false))));
        assert!(!cond.is_satisfied_by(None));
    }

    #[test]
    fn test_and_clause_needs_all_parts() {
        let clause = ForbiddenClause::and(vec![
            ForbiddenClause::equals("embedding", "LearnedEntityEmbedding"),
            ForbiddenClause::in_values("encoder", ["NoEncoder", "OrdinalEncoder"]),
        ]);
        let hit = assignment(&[
            ("embedding", "LearnedEntityEmbedding".into()),
            ("encoder", "OrdinalEncoder".into()),
        ]);
        let miss = assignment(&[
            ("embedding", "LearnedEntityEmbedding".into()),
            ("encoder", "OneHotEncoder".into()),
        ]);
        let inactive = assignment(&[("embedding", "LearnedEntityEmbedding".into())]);
        assert!(clause.is_forbidden(&hit));
        assert!(!clause.is_forbidden(&miss));
        assert!(!clause.is_forbidden(&inactive));
    }

    #[test]
    fn test_prefixed_clause() {
        let clause = ForbiddenClause::equals("__choice__", "A").prefixed("encoder");
        assert_eq!(clause.references()[0].0, "encoder:__choice__");
    }
}
