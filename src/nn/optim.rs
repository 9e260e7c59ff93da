//! Gradient-descent optimizers and learning-rate schedules

use super::network::{Gradients, Network};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Optimizer settings chosen by the search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OptimizerSpec {
    Adam {
        lr: f64,
        beta1: f64,
        beta2: f64,
        weight_decay: f64,
    },
    Sgd {
        lr: f64,
        momentum: f64,
        weight_decay: f64,
    },
}

impl OptimizerSpec {
    pub fn learning_rate(&self) -> f64 {
        match self {
            OptimizerSpec::Adam { lr, .. } | OptimizerSpec::Sgd { lr, .. } => *lr,
        }
    }

    /// Fresh optimizer state sized for `network`
    pub fn build(&self, network: &Network) -> OptimizerState {
        let zeros_w: Vec<Array2<f64>> = network
            .layers()
            .iter()
            .map(|l| Array2::zeros(l.weights.raw_dim()))
            .collect();
        let zeros_b: Vec<Array1<f64>> = network.layers().iter().map(|l| Array1::zeros(l.bias.len())).collect();
        OptimizerState {
            spec: *self,
            first_w: zeros_w.clone(),
            first_b: zeros_b.clone(),
            second_w: zeros_w,
            second_b: zeros_b,
            step: 0,
        }
    }
}

/// Per-parameter moment buffers
#[derive(Debug, Clone)]
pub struct OptimizerState {
    spec: OptimizerSpec,
    /// Adam first moment / SGD velocity
    first_w: Vec<Array2<f64>>,
    first_b: Vec<Array1<f64>>,
    second_w: Vec<Array2<f64>>,
    second_b: Vec<Array1<f64>>,
    step: i32,
}

impl OptimizerState {
    pub fn spec(&self) -> &OptimizerSpec {
        &self.spec
    }

    /// Apply one update with learning rate `lr`
    pub fn step(&mut self, network: &mut Network, grads: &Gradients, lr: f64) {
        self.step += 1;
        let t = self.step;
        for (i, layer) in network.layers_mut().iter_mut().enumerate() {
            match self.spec {
                OptimizerSpec::Adam { beta1, beta2, weight_decay, .. } => {
                    const EPS: f64 = 1e-8;
                    let gw = &grads.weights[i] + &(&layer.weights * weight_decay);
                    let gb = &grads.biases[i];

                    self.first_w[i] = &self.first_w[i] * beta1 + &gw * (1.0 - beta1);
                    self.second_w[i] = &self.second_w[i] * beta2 + &gw.mapv(|g| g * g) * (1.0 - beta2);
                    self.first_b[i] = &self.first_b[i] * beta1 + gb * (1.0 - beta1);
                    self.second_b[i] = &self.second_b[i] * beta2 + &gb.mapv(|g| g * g) * (1.0 - beta2);

                    let c1 = 1.0 - beta1.powi(t);
                    let c2 = 1.0 - beta2.powi(t);
                    let update_w = (&self.first_w[i] / c1) / &((&self.second_w[i] / c2).mapv(f64::sqrt) + EPS);
                    let update_b = (&self.first_b[i] / c1) / &((&self.second_b[i] / c2).mapv(f64::sqrt) + EPS);
                    layer.weights -= &(update_w * lr);
                    layer.bias -= &(update_b * lr);
                }
                OptimizerSpec::Sgd { momentum, weight_decay, .. } => {
                    let gw = &grads.weights[i] + &(&layer.weights * weight_decay);
                    self.first_w[i] = &self.first_w[i] * momentum - &gw * lr;
                    self.first_b[i] = &self.first_b[i] * momentum - &grads.biases[i] * lr;
                    layer.weights += &self.first_w[i];
                    layer.bias += &self.first_b[i];
                }
            }
            layer.apply_mask();
        }
    }
}

/// Learning-rate schedule evaluated per epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LrSchedule {
    Constant,
    Step { step_size: usize, gamma: f64 },
    CosineAnnealing { t_max: usize, eta_min: f64 },
    Exponential { gamma: f64 },
}

impl LrSchedule {
    pub fn learning_rate(&self, base_lr: f64, epoch: usize) -> f64 {
        match *self {
            LrSchedule::Constant => base_lr,
            LrSchedule::Step { step_size, gamma } => {
                base_lr * gamma.powi((epoch / step_size.max(1)) as i32)
            }
            LrSchedule::CosineAnnealing { t_max, eta_min } => {
                let t_max = t_max.max(1);
                let phase = (epoch % (2 * t_max)) as f64 / t_max as f64;
                eta_min + (base_lr - eta_min) * (1.0 + (std::f64::consts::PI * phase).cos()) / 2.0
            }
            LrSchedule::Exponential { gamma } => base_lr * gamma.powi(epoch as i32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{Activation, BackboneSpec, HeadSpec, OutputKind};
    use ndarray::array;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_schedules() {
        assert_eq!(LrSchedule::Constant.learning_rate(0.1, 10), 0.1);
        let step = LrSchedule::Step { step_size: 2, gamma: 0.5 };
        assert!((step.learning_rate(0.1, 5) - 0.025).abs() < 1e-12);
        let cos = LrSchedule::CosineAnnealing { t_max: 10, eta_min: 0.0 };
        assert!((cos.learning_rate(0.1, 0) - 0.1).abs() < 1e-12);
        assert!(cos.learning_rate(0.1, 10).abs() < 1e-12);
    }

    #[test]
    fn test_optimizers_reduce_loss() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
        let y = array![[1.0], [1.0], [2.0], [0.0]];
        let specs = [
            OptimizerSpec::Adam { lr: 0.05, beta1: 0.9, beta2: 0.999, weight_decay: 0.0 },
            OptimizerSpec::Sgd { lr: 0.05, momentum: 0.9, weight_decay: 0.0 },
        ];
        for spec in specs {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
            let backbone = BackboneSpec { hidden: vec![8], activation: Activation::Tanh, dropout: vec![] };
            let head = HeadSpec { hidden: vec![], activation: Activation::ReLU, output_dim: 1 };
            let mut net = Network::build(2, None, &backbone, &head, OutputKind::Linear, &mut rng).unwrap();
            let mut state = spec.build(&net);
            let (initial, _) = net.loss_and_gradients(&x, &y, None, &mut rng).unwrap();
            for _ in 0..200 {
                let (_, grads) = net.loss_and_gradients(&x, &y, None, &mut rng).unwrap();
                state.step(&mut net, &grads, spec.learning_rate());
            }
            let (last, _) = net.loss_and_gradients(&x, &y, None, &mut rng).unwrap();
            assert!(last < initial * 0.5, "{:?}: {} -> {}", spec, initial, last);
        }
    }
}
