//! Pipeline components
//!
//! A component is one swappable implementation of a pipeline step. Every
//! component declares its hyperparameter sub-space, binds a sampled
//! configuration, and fits against the shared [`RunContext`]. Components of
//! the same [`ComponentCategory`] are interchangeable behind a
//! [`ComponentChoice`].

pub mod base;
pub mod choice;
pub mod context;
pub mod preprocessing;
pub mod registry;
pub mod setup;
pub mod training;

pub use base::{Component, ComponentCategory, ComponentProperties};
pub use choice::ComponentChoice;
pub use context::{ContextUpdate, FeatureLayout, LoaderSpec, RunContext, TrainingReport, TransformContext};
pub use registry::{factory, find_components, ComponentFactory, ComponentRegistry, ThirdPartyComponents};

use preprocessing::*;
use setup::*;
use training::*;

/// Factories for every built-in component of `category`
pub(crate) fn builtin_components(category: ComponentCategory) -> Vec<ComponentFactory> {
    match category {
        ComponentCategory::Imputer => vec![factory(SimpleImputer::new)],
        ComponentCategory::Coalescer => vec![factory(NoCoalescer::new), factory(MinorityCoalescer::new)],
        ComponentCategory::Encoder => vec![
            factory(NoEncoder::new),
            factory(OneHotEncoder::new),
            factory(OrdinalEncoder::new),
        ],
        ComponentCategory::Scaler => vec![
            factory(NoScaler::new),
            factory(StandardScaler::new),
            factory(MinMaxScaler::new),
            factory(Normalizer::new),
        ],
        ComponentCategory::FeaturePreprocessor => {
            vec![factory(NoFeaturePreprocessor::new), factory(PolynomialFeatures::new)]
        }
        ComponentCategory::ColumnTransformer => vec![factory(TabularColumnTransformer::new)],
        ComponentCategory::EarlyPreprocessor => vec![factory(EarlyPreprocessing::new)],
        ComponentCategory::NetworkEmbedding => vec![factory(NoEmbedding::new), factory(LearnedEntityEmbedding::new)],
        ComponentCategory::NetworkBackbone => vec![factory(MLPBackbone::new), factory(ShapedMLPBackbone::new)],
        ComponentCategory::NetworkHead => vec![factory(FullyConnectedHead::new)],
        ComponentCategory::Network => vec![factory(NetworkComponent::new)],
        ComponentCategory::NetworkInitializer => {
            vec![factory(XavierInit::new), factory(KaimingInit::new), factory(NoInit::new)]
        }
        ComponentCategory::Optimizer => vec![factory(AdamOptimizer::new), factory(SGDOptimizer::new)],
        ComponentCategory::LrScheduler => vec![
            factory(NoScheduler::new),
            factory(StepLR::new),
            factory(CosineAnnealingLR::new),
            factory(ExponentialLR::new),
        ],
        ComponentCategory::DataLoader => vec![factory(FeatureDataLoader::new)],
        ComponentCategory::Trainer => vec![factory(StandardTrainer::new), factory(MixUpTrainer::new)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_match_their_category() {
        for category in [
            ComponentCategory::Imputer,
            ComponentCategory::Coalescer,
            ComponentCategory::Encoder,
            ComponentCategory::Scaler,
            ComponentCategory::FeaturePreprocessor,
            ComponentCategory::ColumnTransformer,
            ComponentCategory::EarlyPreprocessor,
            ComponentCategory::NetworkEmbedding,
            ComponentCategory::NetworkBackbone,
            ComponentCategory::NetworkHead,
            ComponentCategory::Network,
            ComponentCategory::NetworkInitializer,
            ComponentCategory::Optimizer,
            ComponentCategory::LrScheduler,
            ComponentCategory::DataLoader,
            ComponentCategory::Trainer,
        ] {
            let components = builtin_components(category);
            assert!(!components.is_empty());
            for f in components {
                let c = f();
                assert_eq!(c.category(), category, "{}", c.name());
                assert!(!c.is_fitted());
            }
            for name in category.default_priority() {
                assert!(find_components(category).contains_key(*name), "{}", name);
            }
        }
    }
}
