//! Persisted surrogate bundles and inference.
//!
//! Weights are never stored without the normalization stats they were trained
//! against; [`SurrogatePredictor`] is the only way to run raw scenarios
//! through a trained network.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::normalization::NormalizationStats;
use super::surrogate::ModelWeights;
use super::ModelMetadata;
use crate::scenario::{Scenario, N_FEATURES};

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed model bundle: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Inconsistent tensor shapes in model bundle")]
    Shape,
}

/// Trained weights plus the normalization stats used to train them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub metadata: ModelMetadata,
    pub weights: ModelWeights,
    pub stats: NormalizationStats,
}

impl ModelBundle {
    pub fn new(weights: ModelWeights, stats: NormalizationStats, metadata: ModelMetadata) -> Self {
        Self {
            metadata,
            weights,
            stats,
        }
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), BundleError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, BundleError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let bundle: Self = serde_json::from_reader(reader)?;
        bundle.check_shapes()?;
        Ok(bundle)
    }

    fn check_shapes(&self) -> Result<(), BundleError> {
        if self.weights.is_consistent() && self.stats.has_expected_shape() {
            Ok(())
        } else {
            Err(BundleError::Shape)
        }
    }

    pub fn predictor(&self) -> SurrogatePredictor<'_> {
        SurrogatePredictor::new(self)
    }
}

/// Surrogate output in physical units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictedSettings {
    pub pickup_a: f64,
    pub tms: f64,
}

/// Read-only inference handle over a trained bundle
pub struct SurrogatePredictor<'a> {
    weights: &'a ModelWeights,
    stats: &'a NormalizationStats,
}

impl<'a> SurrogatePredictor<'a> {
    pub fn new(bundle: &'a ModelBundle) -> Self {
        Self {
            weights: &bundle.weights,
            stats: &bundle.stats,
        }
    }

    /// Standardize, forward, de-standardize
    pub fn predict_batch(&self, scenarios: &[Scenario]) -> Vec<PredictedSettings> {
        let raw = Array2::from_shape_fn((scenarios.len(), N_FEATURES), |(i, j)| {
            scenarios[i].features()[j]
        });
        let x = self.stats.standardize_features(raw.view());
        let scaled = self.weights.forward(x.view());
        let out = self.stats.destandardize_labels(scaled.view());

        out.axis_iter(Axis(0))
            .map(|row| PredictedSettings {
                pickup_a: row[0],
                tms: row[1],
            })
            .collect()
    }

    pub fn predict(&self, scenario: &Scenario) -> PredictedSettings {
        self.predict_batch(std::slice::from_ref(scenario))[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn sample_bundle() -> ModelBundle {
        let weights = ModelWeights::random(8, &mut StdRng::seed_from_u64(21));
        let stats = NormalizationStats {
            feature_mean: array![700.0, 5000.0, 900.0, 0.5],
            feature_std: array![288.7, 1732.1, 346.4, 0.5],
            label_mean: array![890.0, 0.07],
            label_std: array![330.0, 0.02],
        };
        let metadata = ModelMetadata {
            model_id: "relay_mlp_test".to_string(),
            version: "0.2.0".to_string(),
            trained_at: chrono::Utc::now(),
            training_samples: 0,
            epochs: 0,
            learning_rate: 0.01,
            final_loss: 0.0,
            feature_names: vec![],
            label_names: vec![],
        };
        ModelBundle::new(weights, stats, metadata)
    }

    #[test]
    fn test_round_trip_predictions_bit_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relay_mlp_weights.json");
        let bundle = sample_bundle();
        bundle.save_json(&path).unwrap();

        let loaded = ModelBundle::load_json(&path).unwrap();
        assert_eq!(loaded.weights, bundle.weights);
        assert_eq!(loaded.stats, bundle.stats);

        let scenario = Scenario::new(1100.0, 2500.0, 500.0, true);
        let before = bundle.predictor().predict(&scenario);
        let after = loaded.predictor().predict(&scenario);
        assert_eq!(before.pickup_a.to_bits(), after.pickup_a.to_bits());
        assert_eq!(before.tms.to_bits(), after.tms.to_bits());
    }

    #[test]
    fn test_bundle_fields_addressable_by_name() {
        let value = serde_json::to_value(sample_bundle()).unwrap();
        for key in ["w1", "b1", "w2", "b2"] {
            assert!(value["weights"].get(key).is_some(), "missing {key}");
        }
        for key in ["feature_mean", "feature_std", "label_mean", "label_std"] {
            assert!(value["stats"].get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_batch_matches_single() {
        let bundle = sample_bundle();
        let predictor = bundle.predictor();
        let scenarios = [
            Scenario::new(400.0, 1500.0, 1200.0, true),
            Scenario::new(100.0, 7000.0, 100.0, false),
        ];
        let batch = predictor.predict_batch(&scenarios);
        assert_eq!(batch.len(), 2);
        let single = predictor.predict(&scenarios[1]);
        assert!((batch[1].pickup_a - single.pickup_a).abs() < 1e-9);
        assert!((batch[1].tms - single.tms).abs() < 1e-12);
    }

    #[test]
    fn test_missing_bundle_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = ModelBundle::load_json(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BundleError::Io(_)));
    }

    #[test]
    fn test_malformed_bundle_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"weights\": 3}").unwrap();
        assert!(matches!(ModelBundle::load_json(&path), Err(BundleError::Json(_))));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shape.json");
        let mut bundle = sample_bundle();
        bundle.stats.label_std = array![1.0];
        bundle.save_json(&path).unwrap();
        assert!(matches!(ModelBundle::load_json(&path), Err(BundleError::Shape)));
    }
}
