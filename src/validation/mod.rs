//! Input validation
//!
//! Turns user data (polars frames, dense arrays, or row lists) into the
//! dense `f64` matrices the pipeline works on, and derives the
//! [`DatasetProperties`](crate::dataset::DatasetProperties) that drive
//! search-space construction.

mod feature_validator;
mod input;
mod input_validator;
mod target_validator;

pub use feature_validator::{ColumnKind, FeatureValidator};
pub use input::{FeatureInput, InputKind, TargetInput};
pub use input_validator::InputValidator;
pub use target_validator::TargetValidator;
