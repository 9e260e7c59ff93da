//! AutoNet - multi-fidelity AutoML for tabular data
//!
//! This crate builds configurable neural-network pipelines whose
//! preprocessing, architecture and training steps are swappable
//! components, composes their hyperparameters into one joint search space,
//! and searches that space with budget-aware schedulers.
//!
//! # Modules
//!
//! ## Search space
//! - [`config_space`] - Hyperparameters, conditions, forbidden clauses, configurations
//! - [`components`] - Component contract, choices, registry and the built-in components
//! - [`pipeline`] - Classification and regression pipelines over the components
//!
//! ## Data
//! - [`dataset`] - Dataset properties and column blocks
//! - [`validation`] - Feature and target validation on polars frames
//! - [`metrics`] - Named metrics with score and loss semantics
//!
//! ## Search
//! - [`search`] - Budget scheduler seam and successive halving
//! - [`api`] - `AutoNet` front end: validate, search, refit, predict
//!
//! ## Infrastructure
//! - [`nn`] - Dense feed-forward network kernels
//! - [`config`] - Run configuration
//! - [`logging`] - Tracing subscriber setup

// Core error handling
pub mod error;

// Configuration & logging
pub mod config;
pub mod logging;

// Search space
pub mod config_space;
pub mod components;
pub mod pipeline;

// Data
pub mod dataset;
pub mod metrics;
pub mod validation;

// Network kernels
pub mod nn;

// Search
pub mod search;
pub mod api;

pub use error::{AutoNetError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{AutoNetError, ErrorKind, Result};

    // Configuration
    pub use crate::config::{AutoNetConfig, Budget, BudgetType};

    // Search space
    pub use crate::config_space::{
        Condition, Configuration, ConfigurationSpace, ForbiddenClause, Hyperparameter,
        HyperparameterSearchSpaceUpdates, HyperparameterValue, ValueRange,
    };

    // Components
    pub use crate::components::{
        factory, Component, ComponentCategory, ComponentChoice, ComponentRegistry, ThirdPartyComponents,
    };

    // Pipelines
    pub use crate::pipeline::{FitResult, Pipeline, PipelineRepresentation, PipelineState, RefitRequest};

    // Data
    pub use crate::dataset::{DatasetProperties, TabularData, TargetType, TaskType};
    pub use crate::metrics::Metric;
    pub use crate::validation::{FeatureInput, FeatureValidator, InputValidator, TargetInput, TargetValidator};

    // Search
    pub use crate::search::{BudgetScheduler, SearchResult, SuccessiveHalving, SuccessiveHalvingConfig, Trial};
    pub use crate::api::AutoNet;
}
