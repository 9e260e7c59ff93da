//! Budget-based configuration search
//!
//! The pipeline only exposes its joint configuration space and a way to
//! evaluate one configuration at one budget. A [`BudgetScheduler`] decides
//! which configurations to try and how much budget each one gets.

mod scheduler;
mod successive_halving;

pub use scheduler::{BudgetScheduler, Evaluator, SearchResult, Trial, TrialStatus};
pub use successive_halving::{SuccessiveHalving, SuccessiveHalvingConfig};
