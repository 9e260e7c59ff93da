//! Dense feed-forward network kernels used by the network components

mod layer;
mod network;
mod optim;

pub use layer::{Activation, DenseLayer};
pub use network::{
    softmax, BackboneSpec, BiasInit, EmbeddingGroup, EmbeddingSpec, Gradients, HeadSpec, Network,
    OutputKind, WeightInit,
};
pub use optim::{LrSchedule, OptimizerSpec, OptimizerState};
