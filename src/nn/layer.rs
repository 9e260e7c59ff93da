//! Dense layers and activations

use crate::error::{AutoNetError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Activation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Activation {
    /// Rectified Linear Unit
    #[default]
    ReLU,
    /// Sigmoid
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
    /// Linear (identity)
    Linear,
}

impl Activation {
    /// Parse the name used in search spaces (`relu`, `sigmoid`, `tanh`)
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "relu" => Ok(Activation::ReLU),
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "linear" => Ok(Activation::Linear),
            other => Err(AutoNetError::configuration(format!("unknown activation '{}'", other))),
        }
    }

    pub fn apply(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::ReLU => z.mapv(|v| v.max(0.0)),
            Activation::Sigmoid => z.mapv(|v| 1.0 / (1.0 + (-v).exp())),
            Activation::Tanh => z.mapv(|v| v.tanh()),
            Activation::Linear => z.clone(),
        }
    }

    pub fn derivative(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::ReLU => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Sigmoid => z.mapv(|v| {
                let s = 1.0 / (1.0 + (-v).exp());
                s * (1.0 - s)
            }),
            Activation::Tanh => z.mapv(|v| 1.0 - v.tanh().powi(2)),
            Activation::Linear => Array2::ones(z.raw_dim()),
        }
    }
}

/// Fully connected layer computing `activation(x W + b)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Shape `(n_in, n_out)`
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
    pub activation: Activation,
    /// Inverted-dropout rate applied to this layer's output while training
    pub dropout: f64,
    /// Fixed connectivity; weights where the mask is zero stay zero
    pub mask: Option<Array2<f64>>,
}

impl DenseLayer {
    pub fn new(n_in: usize, n_out: usize, activation: Activation) -> Self {
        Self {
            weights: Array2::zeros((n_in, n_out)),
            bias: Array1::zeros(n_out),
            activation,
            dropout: 0.0,
            mask: None,
        }
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout.clamp(0.0, 0.99);
        self
    }

    pub fn with_mask(mut self, mask: Array2<f64>) -> Result<Self> {
        if mask.dim() != self.weights.dim() {
            return Err(AutoNetError::Shape {
                expected: format!("{:?}", self.weights.dim()),
                actual: format!("{:?}", mask.dim()),
            });
        }
        self.mask = Some(mask);
        self.apply_mask();
        Ok(self)
    }

    pub fn n_in(&self) -> usize {
        self.weights.nrows()
    }

    pub fn n_out(&self) -> usize {
        self.weights.ncols()
    }

    /// Pre-activation output
    pub fn linear(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weights) + &self.bias
    }

    pub fn apply_mask(&mut self) {
        if let Some(mask) = &self.mask {
            self.weights *= mask;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_activation_names() {
        assert_eq!(Activation::from_name("tanh").unwrap(), Activation::Tanh);
        assert!(Activation::from_name("gelu").is_err());
    }

    #[test]
    fn test_relu_derivative() {
        let z = array![[-1.0, 0.5]];
        assert_eq!(Activation::ReLU.derivative(&z), array![[0.0, 1.0]]);
    }

    #[test]
    fn test_mask_zeroes_weights() {
        let layer = DenseLayer::new(2, 2, Activation::Linear);
        let mut layer = DenseLayer {
            weights: array![[1.0, 2.0], [3.0, 4.0]],
            ..layer
        };
        layer.mask = Some(array![[1.0, 0.0], [0.0, 1.0]]);
        layer.apply_mask();
        assert_eq!(layer.weights, array![[1.0, 0.0], [0.0, 4.0]]);
        assert_eq!(layer.linear(&array![[1.0, 1.0]]), array![[1.0, 4.0]]);
    }
}
