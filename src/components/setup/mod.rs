//! Network setup components
//!
//! These steps do not touch the data; each contributes one piece of the
//! model (embedding, backbone, head, initialisation, optimizer, schedule)
//! to the run context.

mod backbone;
mod embedding;
mod head;
mod initializer;
mod lr_scheduler;
mod network;
mod optimizer;

pub use backbone::{MLPBackbone, MlpShape, ShapedMLPBackbone};
pub use embedding::{LearnedEntityEmbedding, NoEmbedding};
pub use head::FullyConnectedHead;
pub use initializer::{KaimingInit, NoInit, XavierInit};
pub use lr_scheduler::{CosineAnnealingLR, ExponentialLR, NoScheduler, StepLR};
pub use network::NetworkComponent;
pub use optimizer::{AdamOptimizer, SGDOptimizer};

use crate::config_space::{
    ComponentUpdates, Condition, Domain, Hyperparameter, HyperparameterSearchSpace, HyperparameterValue,
};
use crate::error::{AutoNetError, Result};

/// Resolve a layer-count hyperparameter against the updates. Returns the
/// hyperparameter together with the largest count it allows.
pub(crate) fn resolve_count(
    updates: &ComponentUpdates,
    default: HyperparameterSearchSpace,
) -> Result<(Hyperparameter, i64)> {
    let resolved = updates.resolve(default);
    let (_, upper) = resolved.int_bounds().ok_or_else(|| {
        AutoNetError::configuration(format!("'{}' must be an integer range", resolved.hyperparameter))
    })?;
    Ok((resolved.to_hyperparameter()?, upper))
}

/// Condition activating the hyperparameter `child` of layer `layer`
/// (1-based) only while `count` is at least `layer`. None when every legal
/// count already includes the layer.
pub(crate) fn layer_condition(child: &str, count: &Hyperparameter, layer: i64) -> Option<Condition> {
    let (lower, upper) = match &count.domain {
        Domain::Integer { lower, upper, .. } => (*lower, *upper),
        Domain::Constant { value } => {
            let v = value.as_i64()?;
            (v, v)
        }
        Domain::Categorical { choices } | Domain::Ordinal { sequence: choices } => {
            let ints: Vec<i64> = choices.iter().filter_map(HyperparameterValue::as_i64).collect();
            (*ints.iter().min()?, *ints.iter().max()?)
        }
        Domain::Float { .. } => return None,
    };
    if layer <= lower {
        return None;
    }
    let enabling: Vec<HyperparameterValue> = (layer..=upper)
        .map(HyperparameterValue::Int)
        .filter(|v| count.contains(v))
        .collect();
    Some(Condition::in_values(child, count.name.as_str(), enabling))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_condition() {
        let count = Hyperparameter::integer("num_groups", 1, 4, false).unwrap();
        assert!(layer_condition("units_1", &count, 1).is_none());
        let c = layer_condition("units_3", &count, 3).unwrap();
        assert_eq!(c.values, vec![HyperparameterValue::Int(3), HyperparameterValue::Int(4)]);

        let fixed = Hyperparameter::constant("num_groups", 2i64);
        assert!(layer_condition("units_2", &fixed, 2).is_none());
    }
}
