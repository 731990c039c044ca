//! Machine Learning Module
//!
//! Learned surrogate for the analytical relay settings calculator:
//! - Feed-forward regressor (4 -> H -> 2, ReLU hidden layer)
//! - Z-score normalization of features and labels
//! - Full-batch gradient descent training pipeline
//! - Persisted weight + normalization bundles for inference
//!
//! # Architecture
//! The analytical calculator labels scenarios, the trainer fits
//! [`SurrogateModel`] to the standardized labels, and the resulting
//! [`ModelBundle`] carries the exact normalization stats used in training so
//! inference can reproduce predictions bit-for-bit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod bundle;
pub mod normalization;
pub mod surrogate;
pub mod training;

pub use bundle::*;
pub use normalization::*;
pub use surrogate::*;
pub use training::*;

use crate::scenario::DatasetError;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Cannot train on empty dataset")]
    EmptyDataset,
    #[error("Zero variance in {kind} column '{column}'")]
    DegenerateColumn { kind: &'static str, column: &'static str },
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

/// Surrogate model metadata persisted with the weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: String,
    pub version: String,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub training_samples: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub final_loss: f64,
    pub feature_names: Vec<String>,
    pub label_names: Vec<String>,
}

/// Regression accuracy for one output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub mae: f64,  // Mean Absolute Error
    pub rmse: f64, // Root Mean Square Error
    pub r2: f64,   // R-squared
}

impl ValidationMetrics {
    /// Compare predictions against targets. `None` when lengths differ or
    /// there is nothing to compare.
    pub fn calculate(predictions: &[f64], targets: &[f64]) -> Option<Self> {
        if predictions.len() != targets.len() || predictions.is_empty() {
            return None;
        }

        let n = predictions.len() as f64;

        let mae = predictions
            .iter()
            .zip(targets)
            .map(|(p, t)| (p - t).abs())
            .sum::<f64>()
            / n;

        let ss_res: f64 = predictions.iter().zip(targets).map(|(p, t)| (t - p).powi(2)).sum();
        let rmse = (ss_res / n).sqrt();

        let mean_target = targets.iter().sum::<f64>() / n;
        let ss_tot: f64 = targets.iter().map(|t| (t - mean_target).powi(2)).sum();
        let r2 = if ss_tot.abs() < 1e-10 {
            0.0
        } else {
            1.0 - ss_res / ss_tot
        };

        Some(Self { mae, rmse, r2 })
    }

    pub fn within(&self, max_mae: f64) -> bool {
        self.mae <= max_mae
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_metrics() {
        let predictions = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let targets = vec![1.1, 2.1, 2.9, 4.2, 4.8];

        let metrics = ValidationMetrics::calculate(&predictions, &targets).unwrap();

        assert!(metrics.mae < 0.3);
        assert!(metrics.rmse < 0.4);
        assert!(metrics.r2 > 0.9);
        assert!(metrics.within(0.3));
        assert!(!metrics.within(0.1));
    }

    #[test]
    fn test_validation_metrics_rejects_mismatch() {
        assert!(ValidationMetrics::calculate(&[1.0], &[1.0, 2.0]).is_none());
        assert!(ValidationMetrics::calculate(&[], &[]).is_none());
    }
}
