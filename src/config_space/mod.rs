//! Hyperparameter configuration spaces
//!
//! Provides:
//! - Typed hyperparameter domains (categorical, ordinal, float, integer, constant)
//! - Parent/child activation conditions and forbidden clauses
//! - Nested sub-spaces for pipeline steps and choices
//! - Search-space updates applied while spaces are built

mod conditions;
mod configuration;
mod hyperparameter;
mod space;
mod updates;

pub use conditions::{Condition, ForbiddenClause};
pub use configuration::Configuration;
pub use hyperparameter::{Domain, Hyperparameter, HyperparameterValue};
pub use space::ConfigurationSpace;
pub use updates::{
    ComponentUpdates, HyperparameterSearchSpace, HyperparameterSearchSpaceUpdate,
    HyperparameterSearchSpaceUpdates, ValueRange,
};

/// Name of the categorical hyperparameter a choice uses to select its component
pub const CHOICE_KEY: &str = "__choice__";
