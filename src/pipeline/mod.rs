//! Configurable pipelines
//!
//! A [`Pipeline`] is a fixed sequence of named steps. Each step is either a
//! single component or a choice over the components of one category, and
//! contributes its hyperparameters to the joint search space under its step
//! name (`encoder:__choice__`, `network_backbone:MLPBackbone:num_groups`).

mod base;
mod classification;
mod regression;
mod step;

pub use base::{FitResult, Pipeline, PipelineRepresentation, PipelineState, RefitRequest};
pub use step::PipelineStep;
