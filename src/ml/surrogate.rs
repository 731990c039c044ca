//! Surrogate Settings Regressor
//!
//! One-hidden-layer perceptron mapping raw scenario features
//! `[i_load, i_grid, i_ibr_potential, ibr_active]` straight to `[Is, TMS]`
//! (both standardized), bypassing the closed-form calculator.
//!
//! ```text
//! hidden = relu(x · W1 + b1)
//! output = hidden · W2 + b2
//! ```
//!
//! The output layer is linear: targets are unbounded before de-normalization.

use ndarray::{Array1, Array2, ArrayView2};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::scenario::{N_FEATURES, N_LABELS};

/// Default hidden layer width
pub const DEFAULT_HIDDEN_DIM: usize = 8;

/// Std-dev scale applied to N(0, 1) weight initialization
const INIT_SCALE: f64 = 0.1;

/// Two affine transforms of the surrogate network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    /// `4 x H`
    pub w1: Array2<f64>,
    /// `H`
    pub b1: Array1<f64>,
    /// `H x 2`
    pub w2: Array2<f64>,
    /// `2`
    pub b2: Array1<f64>,
}

impl ModelWeights {
    /// Gaussian weights scaled by 0.1, zero biases
    pub fn random<R: Rng>(hidden_dim: usize, rng: &mut R) -> Self {
        let mut sample = |shape: (usize, usize)| {
            Array2::from_shape_simple_fn(shape, || INIT_SCALE * rng.sample::<f64, _>(StandardNormal))
        };
        let w1 = sample((N_FEATURES, hidden_dim));
        let w2 = sample((hidden_dim, N_LABELS));

        Self {
            w1,
            b1: Array1::zeros(hidden_dim),
            w2,
            b2: Array1::zeros(N_LABELS),
        }
    }

    pub fn hidden_dim(&self) -> usize {
        self.b1.len()
    }

    /// Check the matrix shapes against the fixed 4 -> H -> 2 architecture
    pub fn is_consistent(&self) -> bool {
        let h = self.hidden_dim();
        self.w1.dim() == (N_FEATURES, h) && self.w2.dim() == (h, N_LABELS) && self.b2.len() == N_LABELS
    }

    /// Forward pass over an `n x 4` standardized batch, returning `n x 2`
    pub fn forward(&self, x: ArrayView2<f64>) -> Array2<f64> {
        self.forward_cached(x).z2
    }

    pub fn forward_cached(&self, x: ArrayView2<f64>) -> ForwardPass {
        let z1 = x.dot(&self.w1) + &self.b1;
        let a1 = z1.mapv(relu);
        let z2 = a1.dot(&self.w2) + &self.b2;
        ForwardPass { z1, a1, z2 }
    }
}

/// Intermediate activations kept for backpropagation
#[derive(Debug, Clone)]
pub struct ForwardPass {
    /// Hidden pre-activation
    pub z1: Array2<f64>,
    /// Hidden activation (ReLU of `z1`)
    pub a1: Array2<f64>,
    /// Network output
    pub z2: Array2<f64>,
}

/// Feed-forward regressor over standardized features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurrogateModel {
    weights: ModelWeights,
}

impl SurrogateModel {
    /// Fresh model with randomized weights drawn from `rng`
    pub fn new<R: Rng>(hidden_dim: usize, rng: &mut R) -> Self {
        Self {
            weights: ModelWeights::random(hidden_dim, rng),
        }
    }

    pub fn from_weights(weights: ModelWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ModelWeights {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut ModelWeights {
        &mut self.weights
    }

    pub fn into_weights(self) -> ModelWeights {
        self.weights
    }

    pub fn forward(&self, x: ArrayView2<f64>) -> Array2<f64> {
        self.weights.forward(x)
    }

    pub fn forward_cached(&self, x: ArrayView2<f64>) -> ForwardPass {
        self.weights.forward_cached(x)
    }
}

fn relu(v: f64) -> f64 {
    v.max(0.0)
}

/// ReLU derivative: 1 where the pre-activation is positive, else 0
pub(crate) fn relu_grad(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else {
        0.0
    }
}
