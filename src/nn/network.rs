//! Feed-forward network assembled from embedding, backbone and head

use super::layer::{Activation, DenseLayer};
use crate::error::{AutoNetError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// One categorical feature fed through an entity embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingGroup {
    /// Input columns the feature occupies (one-hot width)
    pub width: usize,
    /// Embedded dimension
    pub out_dim: usize,
}

/// Embedding over the leading (categorical) input columns; the remaining
/// `passthrough` columns are mapped one-to-one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSpec {
    pub groups: Vec<EmbeddingGroup>,
    pub passthrough: usize,
}

impl EmbeddingSpec {
    pub fn input_dim(&self) -> usize {
        self.groups.iter().map(|g| g.width).sum::<usize>() + self.passthrough
    }

    pub fn output_dim(&self) -> usize {
        self.groups.iter().map(|g| g.out_dim).sum::<usize>() + self.passthrough
    }

    /// Block-diagonal connectivity mask
    fn mask(&self) -> Array2<f64> {
        let mut mask = Array2::zeros((self.input_dim(), self.output_dim()));
        let (mut row, mut col) = (0, 0);
        for group in &self.groups {
            for r in row..row + group.width {
                for c in col..col + group.out_dim {
                    mask[[r, c]] = 1.0;
                }
            }
            row += group.width;
            col += group.out_dim;
        }
        for i in 0..self.passthrough {
            mask[[row + i, col + i]] = 1.0;
        }
        mask
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackboneSpec {
    pub hidden: Vec<usize>,
    pub activation: Activation,
    /// Dropout per hidden layer; shorter than `hidden` means no dropout for the rest
    pub dropout: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadSpec {
    pub hidden: Vec<usize>,
    pub activation: Activation,
    pub output_dim: usize,
}

/// How raw network outputs are turned into predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputKind {
    /// Softmax over classes, trained with cross-entropy
    Softmax,
    /// Raw values, trained with squared error
    Linear,
}

/// Weight initialisation scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightInit {
    XavierUniform,
    KaimingNormal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiasInit {
    Zero,
    Normal,
}

/// Gradients of the loss with respect to every layer's parameters
#[derive(Debug, Clone)]
pub struct Gradients {
    pub weights: Vec<Array2<f64>>,
    pub biases: Vec<Array1<f64>>,
}

struct ForwardCache {
    inputs: Vec<Array2<f64>>,
    pre_activations: Vec<Array2<f64>>,
    dropout_masks: Vec<Option<Array2<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    layers: Vec<DenseLayer>,
    output_kind: OutputKind,
}

impl Network {
    /// Assemble `[embedding] -> backbone -> head -> output` and give it a
    /// default Xavier initialisation
    pub fn build<R: Rng + ?Sized>(
        input_dim: usize,
        embedding: Option<&EmbeddingSpec>,
        backbone: &BackboneSpec,
        head: &HeadSpec,
        output_kind: OutputKind,
        rng: &mut R,
    ) -> Result<Self> {
        if input_dim == 0 {
            return Err(AutoNetError::configuration("network needs at least one input feature"));
        }
        if head.output_dim == 0 {
            return Err(AutoNetError::configuration("network needs at least one output"));
        }
        let mut layers = Vec::new();
        let mut width = input_dim;

        if let Some(spec) = embedding.filter(|s| !s.groups.is_empty()) {
            if spec.input_dim() != input_dim {
                return Err(AutoNetError::Shape {
                    expected: format!("embedding over {} inputs", input_dim),
                    actual: spec.input_dim().to_string(),
                });
            }
            let layer = DenseLayer::new(width, spec.output_dim(), Activation::Linear).with_mask(spec.mask())?;
            width = spec.output_dim();
            layers.push(layer);
        }

        for (i, &units) in backbone.hidden.iter().enumerate() {
            let dropout = backbone.dropout.get(i).copied().unwrap_or(0.0);
            layers.push(DenseLayer::new(width, units, backbone.activation).with_dropout(dropout));
            width = units;
        }
        for &units in &head.hidden {
            layers.push(DenseLayer::new(width, units, head.activation));
            width = units;
        }
        layers.push(DenseLayer::new(width, head.output_dim, Activation::Linear));

        let mut network = Self { layers, output_kind };
        network.initialize(WeightInit::XavierUniform, BiasInit::Zero, rng);
        Ok(network)
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [DenseLayer] {
        &mut self.layers
    }

    pub fn output_kind(&self) -> OutputKind {
        self.output_kind
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map(|l| l.n_in()).unwrap_or(0)
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(|l| l.n_out()).unwrap_or(0)
    }

    pub fn num_parameters(&self) -> usize {
        self.layers.iter().map(|l| l.weights.len() + l.bias.len()).sum()
    }

    /// Re-draw every weight and bias
    pub fn initialize<R: Rng + ?Sized>(&mut self, weights: WeightInit, bias: BiasInit, rng: &mut R) {
        for layer in &mut self.layers {
            let (n_in, n_out) = layer.weights.dim();
            match weights {
                WeightInit::XavierUniform => {
                    let limit = (6.0 / (n_in + n_out) as f64).sqrt();
                    layer.weights.mapv_inplace(|_| rng.gen_range(-limit..=limit));
                }
                WeightInit::KaimingNormal => {
                    let std = (2.0 / n_in.max(1) as f64).sqrt();
                    // std is finite and positive for n_in >= 1
                    if let Ok(normal) = Normal::new(0.0, std) {
                        layer.weights.mapv_inplace(|_| normal.sample(&mut *rng));
                    }
                }
            }
            match bias {
                BiasInit::Zero => layer.bias.fill(0.0),
                BiasInit::Normal => {
                    if let Ok(normal) = Normal::new(0.0, 0.01) {
                        layer.bias.mapv_inplace(|_| normal.sample(&mut *rng));
                    }
                }
            }
            layer.apply_mask();
        }
    }

    /// Raw outputs (logits for classification), no dropout
    pub fn forward(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_input(x)?;
        let mut a = x.clone();
        for layer in &self.layers {
            a = layer.activation.apply(&layer.linear(&a));
        }
        Ok(a)
    }

    /// Probabilities for softmax networks, raw values otherwise
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let out = self.forward(x)?;
        Ok(match self.output_kind {
            OutputKind::Softmax => softmax(&out),
            OutputKind::Linear => out,
        })
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.input_dim() {
            return Err(AutoNetError::Shape {
                expected: format!("{} input features", self.input_dim()),
                actual: x.ncols().to_string(),
            });
        }
        Ok(())
    }

    fn forward_train<R: Rng + ?Sized>(&self, x: &Array2<f64>, rng: &mut R) -> (Array2<f64>, ForwardCache) {
        let mut cache = ForwardCache {
            inputs: Vec::with_capacity(self.layers.len()),
            pre_activations: Vec::with_capacity(self.layers.len()),
            dropout_masks: Vec::with_capacity(self.layers.len()),
        };
        let mut a = x.clone();
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.linear(&a);
            let mut out = layer.activation.apply(&z);
            let mask = if i < last && layer.dropout > 0.0 {
                let keep = 1.0 - layer.dropout;
                let mask = out.mapv(|_| if rng.gen::<f64>() < keep { 1.0 / keep } else { 0.0 });
                out *= &mask;
                Some(mask)
            } else {
                None
            };
            cache.inputs.push(a);
            cache.pre_activations.push(z);
            cache.dropout_masks.push(mask);
            a = out;
        }
        (a, cache)
    }

    /// Loss and parameter gradients on one batch.
    ///
    /// `targets` holds (possibly soft) class distributions for softmax
    /// networks and target values for linear ones. `sample_weights`
    /// rescales each row's contribution.
    pub fn loss_and_gradients<R: Rng + ?Sized>(
        &self,
        x: &Array2<f64>,
        targets: &Array2<f64>,
        sample_weights: Option<&Array1<f64>>,
        rng: &mut R,
    ) -> Result<(f64, Gradients)> {
        self.check_input(x)?;
        if targets.dim() != (x.nrows(), self.output_dim()) {
            return Err(AutoNetError::Shape {
                expected: format!("targets of shape ({}, {})", x.nrows(), self.output_dim()),
                actual: format!("{:?}", targets.dim()),
            });
        }
        let n = x.nrows();
        let weights = sample_weights.cloned().unwrap_or_else(|| Array1::ones(n));
        let total_weight = weights.sum().max(f64::EPSILON);
        let (out, cache) = self.forward_train(x, rng);

        let (loss, mut delta) = match self.output_kind {
            OutputKind::Softmax => {
                let probs = softmax(&out);
                let row_loss = (&probs.mapv(|p| p.max(1e-12).ln()) * targets).sum_axis(Axis(1)) * -1.0;
                let loss = row_loss.dot(&weights) / total_weight;
                (loss, probs - targets)
            }
            OutputKind::Linear => {
                let diff = &out - targets;
                let row_loss = diff.mapv(|d| d * d).sum_axis(Axis(1));
                let loss = row_loss.dot(&weights) / total_weight;
                (loss, diff * 2.0)
            }
        };
        if !loss.is_finite() {
            return Err(AutoNetError::Training(format!("loss diverged to {}", loss)));
        }
        let scale = weights / total_weight;
        delta *= &scale.insert_axis(Axis(1));

        let mut grad_w = Vec::with_capacity(self.layers.len());
        let mut grad_b = Vec::with_capacity(self.layers.len());
        for i in (0..self.layers.len()).rev() {
            let layer = &self.layers[i];
            let mut gw = cache.inputs[i].t().dot(&delta);
            if let Some(mask) = &layer.mask {
                gw *= mask;
            }
            grad_w.push(gw);
            grad_b.push(delta.sum_axis(Axis(0)));
            if i > 0 {
                let prev = &self.layers[i - 1];
                delta = delta.dot(&layer.weights.t());
                if let Some(mask) = &cache.dropout_masks[i - 1] {
                    delta *= mask;
                }
                delta = delta * prev.activation.derivative(&cache.pre_activations[i - 1]);
            }
        }
        grad_w.reverse();
        grad_b.reverse();
        Ok((loss, Gradients { weights: grad_w, biases: grad_b }))
    }
}

/// Row-wise softmax
pub fn softmax(z: &Array2<f64>) -> Array2<f64> {
    let mut result = z.clone();
    for mut row in result.rows_mut() {
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exp_sum: f64 = row.iter().map(|&v| (v - max).exp()).sum();
        for v in row.iter_mut() {
            *v = (*v - max).exp() / exp_sum;
        }
    }
    result
}
