//! Surrogate Training Pipeline
//!
//! Standardizes a labelled dataset and fits [`SurrogateModel`] with
//! fixed-epoch, fixed-learning-rate full-batch gradient descent on the
//! mean-squared error. There is no early stopping and no convergence check:
//! training always runs the configured number of epochs.

use std::path::Path;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::bundle::ModelBundle;
use super::normalization::NormalizationStats;
use super::surrogate::{relu_grad, SurrogateModel, DEFAULT_HIDDEN_DIM};
use super::{ModelMetadata, TrainingError};
use crate::scenario::{Dataset, DatasetError, FEATURE_NAMES, LABEL_NAMES};

/// Training Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub hidden_dim: usize,
    pub learning_rate: f64,
    pub epochs: usize,
    /// Log the loss every N epochs (0 disables)
    pub log_every: usize,
    /// Seed for weight initialization
    pub random_seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hidden_dim: DEFAULT_HIDDEN_DIM,
            learning_rate: 0.01,
            epochs: 2000,
            log_every: 200,
            random_seed: Some(42),
        }
    }
}

/// Parameter gradients for one full-batch pass
#[derive(Debug, Clone)]
pub struct Gradients {
    pub w1: Array2<f64>,
    pub b1: Array1<f64>,
    pub w2: Array2<f64>,
    pub b2: Array1<f64>,
}

/// Mean-squared error over every element of the batch
pub fn mse(predicted: ArrayView2<f64>, target: ArrayView2<f64>) -> f64 {
    (&predicted - &target).mapv(|e| e * e).mean().unwrap_or(0.0)
}

/// Loss and backpropagated gradients for a standardized batch.
///
/// The output error is `2 * (z2 - y) / n` (n = rows), i.e. the gradient of
/// the per-sample squared error summed over both outputs and averaged over
/// samples. The hidden error is gated by the ReLU derivative of `z1`.
pub fn backpropagate(
    model: &SurrogateModel,
    x: ArrayView2<f64>,
    y: ArrayView2<f64>,
) -> (f64, Gradients) {
    let pass = model.forward_cached(x);
    let n = x.nrows() as f64;

    let loss = mse(pass.z2.view(), y);

    let dz2 = (&pass.z2 - &y) * (2.0 / n);
    let dw2 = pass.a1.t().dot(&dz2);
    let db2 = dz2.sum_axis(Axis(0));

    let da1 = dz2.dot(&model.weights().w2.t());
    let dz1 = da1 * pass.z1.mapv(relu_grad);
    let dw1 = x.t().dot(&dz1);
    let db1 = dz1.sum_axis(Axis(0));

    (
        loss,
        Gradients {
            w1: dw1,
            b1: db1,
            w2: dw2,
            b2: db2,
        },
    )
}

/// One synchronous update `W <- W - lr * dW` for every parameter tensor.
/// Returns the loss measured before the update.
pub fn gradient_step(
    model: &mut SurrogateModel,
    x: ArrayView2<f64>,
    y: ArrayView2<f64>,
    learning_rate: f64,
) -> f64 {
    let (loss, grads) = backpropagate(model, x, y);
    let w = model.weights_mut();
    w.w1.scaled_add(-learning_rate, &grads.w1);
    w.b1.scaled_add(-learning_rate, &grads.b1);
    w.w2.scaled_add(-learning_rate, &grads.w2);
    w.b2.scaled_add(-learning_rate, &grads.b2);
    loss
}

/// Loss trace of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Pre-update loss of every epoch
    pub loss_history: Vec<f64>,
    /// Loss of the trained model on the training set
    pub final_loss: f64,
    /// Final loss ended above the initial loss
    pub diverged: bool,
}

#[derive(Serialize)]
struct LossRecord {
    epoch: usize,
    loss: f64,
}

impl TrainingReport {
    /// Write the loss trace as `epoch,loss` CSV for external plotting
    pub fn write_loss_csv(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let mut wtr = csv::Writer::from_path(path.as_ref())?;
        for (epoch, loss) in self.loss_history.iter().enumerate() {
            wtr.serialize(LossRecord { epoch, loss: *loss })?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Trained bundle together with its loss trace
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub bundle: ModelBundle,
    pub report: TrainingReport,
}

/// Model Trainer
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fit normalization stats and a freshly initialized surrogate to `dataset`
    pub fn train(&self, dataset: &Dataset) -> Result<TrainingOutcome, TrainingError> {
        if dataset.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }

        let x_raw = dataset.feature_matrix();
        let y_raw = dataset.label_matrix();
        let stats = NormalizationStats::fit(x_raw.view(), y_raw.view())?;
        let x = stats.standardize_features(x_raw.view());
        let y = stats.standardize_labels(y_raw.view());

        let mut rng = match self.config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut model = SurrogateModel::new(self.config.hidden_dim, &mut rng);

        info!(
            samples = dataset.len(),
            hidden_dim = self.config.hidden_dim,
            epochs = self.config.epochs,
            learning_rate = self.config.learning_rate,
            "training relay settings surrogate"
        );

        let report = self.fit(&mut model, x.view(), y.view());

        let metadata = ModelMetadata {
            model_id: format!("relay_mlp_{}", uuid::Uuid::new_v4()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: chrono::Utc::now(),
            training_samples: dataset.len(),
            epochs: self.config.epochs,
            learning_rate: self.config.learning_rate,
            final_loss: report.final_loss,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            label_names: LABEL_NAMES.iter().map(|s| s.to_string()).collect(),
        };

        Ok(TrainingOutcome {
            bundle: ModelBundle::new(model.into_weights(), stats, metadata),
            report,
        })
    }

    /// Load a dataset CSV and train on it
    pub fn train_from_csv(&self, path: impl AsRef<Path>) -> Result<TrainingOutcome, TrainingError> {
        let dataset = Dataset::read_csv(path)?;
        self.train(&dataset)
    }

    /// Run the configured epochs of gradient descent on standardized data,
    /// mutating `model` in place.
    pub fn fit(&self, model: &mut SurrogateModel, x: ArrayView2<f64>, y: ArrayView2<f64>) -> TrainingReport {
        let lr = self.config.learning_rate;
        let mut loss_history = Vec::with_capacity(self.config.epochs);

        for epoch in 0..self.config.epochs {
            let loss = gradient_step(model, x, y, lr);
            loss_history.push(loss);

            if self.config.log_every > 0 && epoch % self.config.log_every == 0 {
                info!(epoch, loss, "training progress");
            }
        }

        let final_loss = mse(model.forward(x).view(), y);
        let initial_loss = loss_history.first().copied().unwrap_or(final_loss);
        let diverged = !final_loss.is_finite() || final_loss > initial_loss;
        if diverged {
            warn!(initial_loss, final_loss, "training loss increased over the run");
        }

        TrainingReport {
            loss_history,
            final_loss,
            diverged,
        }
    }
}
