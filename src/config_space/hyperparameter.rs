//! Hyperparameter values and domains

use crate::error::{AutoNetError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HyperparameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl HyperparameterValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HyperparameterValue::Int(v) => Some(*v as f64),
            HyperparameterValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HyperparameterValue::Int(v) => Some(*v),
            HyperparameterValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HyperparameterValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HyperparameterValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Equality that treats `Int(2)` and `Float(2.0)` as the same value.
    /// Values coming back from JSON lose the int/float distinction.
    pub fn loosely_eq(&self, other: &HyperparameterValue) -> bool {
        match (self, other) {
            (HyperparameterValue::Int(_), HyperparameterValue::Float(_))
            | (HyperparameterValue::Float(_), HyperparameterValue::Int(_)) => {
                self.as_f64() == other.as_f64()
            }
            _ => self == other,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            HyperparameterValue::Bool(_) => "bool",
            HyperparameterValue::Int(_) => "int",
            HyperparameterValue::Float(_) => "float",
            HyperparameterValue::Str(_) => "string",
        }
    }
}

impl fmt::Display for HyperparameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HyperparameterValue::Bool(b) => write!(f, "{}", b),
            HyperparameterValue::Int(v) => write!(f, "{}", v),
            HyperparameterValue::Float(v) => write!(f, "{}", v),
            HyperparameterValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for HyperparameterValue {
    fn from(v: bool) -> Self {
        HyperparameterValue::Bool(v)
    }
}

impl From<i64> for HyperparameterValue {
    fn from(v: i64) -> Self {
        HyperparameterValue::Int(v)
    }
}

impl From<f64> for HyperparameterValue {
    fn from(v: f64) -> Self {
        HyperparameterValue::Float(v)
    }
}

impl From<&str> for HyperparameterValue {
    fn from(v: &str) -> Self {
        HyperparameterValue::Str(v.to_string())
    }
}

impl From<String> for HyperparameterValue {
    fn from(v: String) -> Self {
        HyperparameterValue::Str(v)
    }
}

/// Value domain of a hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Domain {
    /// Unordered set of choices
    Categorical { choices: Vec<HyperparameterValue> },
    /// Ordered sequence of choices
    Ordinal { sequence: Vec<HyperparameterValue> },
    /// Real interval `[lower, upper]`, optionally sampled on a log scale
    Float { lower: f64, upper: f64, log: bool },
    /// Integer interval `[lower, upper]`, optionally sampled on a log scale
    Integer { lower: i64, upper: i64, log: bool },
    /// A single fixed value
    Constant { value: HyperparameterValue },
}

/// A named hyperparameter with its domain and default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameter {
    pub name: String,
    pub domain: Domain,
    pub default_value: HyperparameterValue,
}

impl Hyperparameter {
    /// Categorical hyperparameter; the default is the first choice
    pub fn categorical<V: Into<HyperparameterValue>>(
        name: impl Into<String>,
        choices: impl IntoIterator<Item = V>,
    ) -> Result<Self> {
        let name = name.into();
        let choices: Vec<HyperparameterValue> = choices.into_iter().map(Into::into).collect();
        let default_value = first_unique(&name, &choices)?;
        Ok(Self {
            name,
            domain: Domain::Categorical { choices },
            default_value,
        })
    }

    /// Ordinal hyperparameter; the default is the first element
    pub fn ordinal<V: Into<HyperparameterValue>>(
        name: impl Into<String>,
        sequence: impl IntoIterator<Item = V>,
    ) -> Result<Self> {
        let name = name.into();
        let sequence: Vec<HyperparameterValue> = sequence.into_iter().map(Into::into).collect();
        let default_value = first_unique(&name, &sequence)?;
        Ok(Self {
            name,
            domain: Domain::Ordinal { sequence },
            default_value,
        })
    }

    /// Float hyperparameter; the default is the (log-)midpoint
    pub fn float(name: impl Into<String>, lower: f64, upper: f64, log: bool) -> Result<Self> {
        let name = name.into();
        if !lower.is_finite() || !upper.is_finite() || lower > upper {
            return Err(AutoNetError::configuration(format!(
                "hyperparameter '{}' has an invalid range [{}, {}]",
                name, lower, upper
            )));
        }
        if log && lower <= 0.0 {
            return Err(AutoNetError::configuration(format!(
                "hyperparameter '{}' is log-scaled and needs a positive lower bound, got {}",
                name, lower
            )));
        }
        let default = if log {
            ((lower.ln() + upper.ln()) / 2.0).exp()
        } else {
            (lower + upper) / 2.0
        };
        Ok(Self {
            name,
            domain: Domain::Float { lower, upper, log },
            default_value: HyperparameterValue::Float(default),
        })
    }

    /// Integer hyperparameter; the default is the rounded (log-)midpoint
    pub fn integer(name: impl Into<String>, lower: i64, upper: i64, log: bool) -> Result<Self> {
        let name = name.into();
        if lower > upper {
            return Err(AutoNetError::configuration(format!(
                "hyperparameter '{}' has an invalid range [{}, {}]",
                name, lower, upper
            )));
        }
        if log && lower <= 0 {
            return Err(AutoNetError::configuration(format!(
                "hyperparameter '{}' is log-scaled and needs a positive lower bound, got {}",
                name, lower
            )));
        }
        let default = if log {
            (((lower as f64).ln() + (upper as f64).ln()) / 2.0).exp().round() as i64
        } else {
            ((lower + upper) as f64 / 2.0).round() as i64
        };
        Ok(Self {
            name,
            domain: Domain::Integer { lower, upper, log },
            default_value: HyperparameterValue::Int(default.clamp(lower, upper)),
        })
    }

    pub fn constant(name: impl Into<String>, value: impl Into<HyperparameterValue>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            domain: Domain::Constant { value: value.clone() },
            default_value: value,
        }
    }

    /// Replace the default value, which must lie in the domain
    pub fn with_default(mut self, value: impl Into<HyperparameterValue>) -> Result<Self> {
        let value = value.into();
        if !self.contains(&value) {
            return Err(AutoNetError::configuration(format!(
                "default value {} is not legal for hyperparameter '{}'",
                value, self.name
            )));
        }
        self.default_value = self.normalize(value);
        Ok(self)
    }

    /// Whether `value` is a legal value of this hyperparameter
    pub fn contains(&self, value: &HyperparameterValue) -> bool {
        match &self.domain {
            Domain::Categorical { choices } => choices.iter().any(|c| c.loosely_eq(value)),
            Domain::Ordinal { sequence } => sequence.iter().any(|c| c.loosely_eq(value)),
            Domain::Float { lower, upper, .. } => value
                .as_f64()
                .map(|v| v >= *lower && v <= *upper)
                .unwrap_or(false),
            Domain::Integer { lower, upper, .. } => value
                .as_i64()
                .map(|v| v >= *lower && v <= *upper)
                .unwrap_or(false),
            Domain::Constant { value: c } => c.loosely_eq(value),
        }
    }

    /// Map a legal value onto the domain's canonical representation
    pub(crate) fn normalize(&self, value: HyperparameterValue) -> HyperparameterValue {
        match &self.domain {
            Domain::Float { .. } => value.as_f64().map(HyperparameterValue::Float).unwrap_or(value),
            Domain::Integer { .. } => value.as_i64().map(HyperparameterValue::Int).unwrap_or(value),
            Domain::Categorical { choices } | Domain::Ordinal { sequence: choices } => choices
                .iter()
                .find(|c| c.loosely_eq(&value))
                .cloned()
                .unwrap_or(value),
            Domain::Constant { value: c } => c.clone(),
        }
    }

    /// Draw a value uniformly from the domain (log-uniformly when `log` is set)
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> HyperparameterValue {
        match &self.domain {
            Domain::Categorical { choices } => choices[rng.gen_range(0..choices.len())].clone(),
            Domain::Ordinal { sequence } => sequence[rng.gen_range(0..sequence.len())].clone(),
            Domain::Float { lower, upper, log } => {
                if lower >= upper {
                    HyperparameterValue::Float(*lower)
                } else if *log {
                    HyperparameterValue::Float(rng.gen_range(lower.ln()..=upper.ln()).exp().clamp(*lower, *upper))
                } else {
                    HyperparameterValue::Float(rng.gen_range(*lower..=*upper))
                }
            }
            Domain::Integer { lower, upper, log } => {
                if lower >= upper {
                    HyperparameterValue::Int(*lower)
                } else if *log {
                    let lo = (*lower as f64).ln();
                    let hi = ((*upper + 1) as f64).ln();
                    let v = rng.gen_range(lo..hi).exp().floor() as i64;
                    HyperparameterValue::Int(v.clamp(*lower, *upper))
                } else {
                    HyperparameterValue::Int(rng.gen_range(*lower..=*upper))
                }
            }
            Domain::Constant { value } => value.clone(),
        }
    }

    /// Choices of a categorical/ordinal/constant hyperparameter
    pub fn choices(&self) -> Option<Vec<HyperparameterValue>> {
        match &self.domain {
            Domain::Categorical { choices } => Some(choices.clone()),
            Domain::Ordinal { sequence } => Some(sequence.clone()),
            Domain::Constant { value } => Some(vec![value.clone()]),
            _ => None,
        }
    }

    pub(crate) fn renamed(&self, name: String) -> Self {
        Self {
            name,
            domain: self.domain.clone(),
            default_value: self.default_value.clone(),
        }
    }
}

fn first_unique(name: &str, choices: &[HyperparameterValue]) -> Result<HyperparameterValue> {
    let first = choices.first().cloned().ok_or_else(|| {
        AutoNetError::configuration(format!("hyperparameter '{}' needs at least one choice", name))
    })?;
    for (i, a) in choices.iter().enumerate() {
        if choices[i + 1..].iter().any(|b| a.loosely_eq(b)) {
            return Err(AutoNetError::configuration(format!(
                "hyperparameter '{}' lists choice {} ({}) more than once",
                name,
                a,
                a.type_name()
            )));
        }
    }
    Ok(first)
}
