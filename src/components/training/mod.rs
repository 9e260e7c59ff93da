//! Data loading and training components

mod data_loader;
mod trainer;

pub use data_loader::FeatureDataLoader;
pub use trainer::{MixUpTrainer, StandardTrainer};
