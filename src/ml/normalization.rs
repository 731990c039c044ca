//! Z-score normalization statistics for surrogate features and labels.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::TrainingError;
use crate::scenario::{FEATURE_NAMES, LABEL_NAMES, N_FEATURES, N_LABELS};

/// Per-column mean/std of the training set.
///
/// Computed once from the training data and reused unmodified at inference.
/// Standard deviations are population (ddof = 0) values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub feature_mean: Array1<f64>,
    pub feature_std: Array1<f64>,
    pub label_mean: Array1<f64>,
    pub label_std: Array1<f64>,
}

impl NormalizationStats {
    /// Fit statistics to an `n x 4` feature matrix and `n x 2` label matrix
    pub fn fit(features: ArrayView2<f64>, labels: ArrayView2<f64>) -> Result<Self, TrainingError> {
        let (feature_mean, feature_std) = column_stats(features).ok_or(TrainingError::EmptyDataset)?;
        let (label_mean, label_std) = column_stats(labels).ok_or(TrainingError::EmptyDataset)?;

        if let Some(j) = first_zero(&feature_std) {
            return Err(TrainingError::DegenerateColumn {
                kind: "feature",
                column: FEATURE_NAMES.get(j).copied().unwrap_or("?"),
            });
        }
        if let Some(j) = first_zero(&label_std) {
            return Err(TrainingError::DegenerateColumn {
                kind: "label",
                column: LABEL_NAMES.get(j).copied().unwrap_or("?"),
            });
        }

        Ok(Self {
            feature_mean,
            feature_std,
            label_mean,
            label_std,
        })
    }

    pub fn standardize_features(&self, features: ArrayView2<f64>) -> Array2<f64> {
        (&features - &self.feature_mean) / &self.feature_std
    }

    pub fn standardize_labels(&self, labels: ArrayView2<f64>) -> Array2<f64> {
        (&labels - &self.label_mean) / &self.label_std
    }

    /// Map standardized model output back to (Is, TMS) units
    pub fn destandardize_labels(&self, scaled: ArrayView2<f64>) -> Array2<f64> {
        &scaled * &self.label_std + &self.label_mean
    }

    pub fn has_expected_shape(&self) -> bool {
        self.feature_mean.len() == N_FEATURES
            && self.feature_std.len() == N_FEATURES
            && self.label_mean.len() == N_LABELS
            && self.label_std.len() == N_LABELS
    }
}

fn column_stats(m: ArrayView2<f64>) -> Option<(Array1<f64>, Array1<f64>)> {
    if m.nrows() == 0 {
        return None;
    }
    let mean = m.mean_axis(Axis(0))?;
    let std = m.std_axis(Axis(0), 0.0);
    Some((mean, std))
}

fn first_zero(std: &Array1<f64>) -> Option<usize> {
    std.iter().position(|s| *s == 0.0 || !s.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> (Array2<f64>, Array2<f64>) {
        let x = array![
            [200.0, 2000.0, 300.0, 0.0],
            [400.0, 4000.0, 500.0, 1.0],
            [600.0, 6000.0, 700.0, 1.0],
            [800.0, 8000.0, 900.0, 0.0],
        ];
        let y = array![[250.0, 0.05], [520.0, 0.06], [780.0, 0.08], [1000.0, 0.07]];
        (x, y)
    }

    #[test]
    fn test_fit_population_std() {
        let (x, y) = sample();
        let stats = NormalizationStats::fit(x.view(), y.view()).unwrap();
        assert_eq!(stats.feature_mean[0], 500.0);
        assert_eq!(stats.feature_mean[3], 0.5);
        // population std of {200,400,600,800}
        assert!((stats.feature_std[0] - 223.60679774997897).abs() < 1e-9);
        assert_eq!(stats.feature_std[3], 0.5);
        assert!(stats.has_expected_shape());
    }

    #[test]
    fn test_standardized_columns_have_zero_mean_unit_variance() {
        let (x, y) = sample();
        let stats = NormalizationStats::fit(x.view(), y.view()).unwrap();
        let xs = stats.standardize_features(x.view());
        for col in xs.columns() {
            assert!(col.mean().unwrap().abs() < 1e-9);
            assert!((col.std(0.0) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_label_destandardize_inverts() {
        let (x, y) = sample();
        let stats = NormalizationStats::fit(x.view(), y.view()).unwrap();
        let back = stats.destandardize_labels(stats.standardize_labels(y.view()).view());
        for (a, b) in back.iter().zip(y.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_degenerate_column_rejected() {
        let (mut x, y) = sample();
        x.column_mut(3).fill(1.0);
        let err = NormalizationStats::fit(x.view(), y.view()).unwrap_err();
        assert!(matches!(
            err,
            TrainingError::DegenerateColumn { kind: "feature", column: "ibr_active" }
        ));
    }

    #[test]
    fn test_empty_rejected() {
        let x = Array2::<f64>::zeros((0, 4));
        let y = Array2::<f64>::zeros((0, 2));
        assert!(matches!(
            NormalizationStats::fit(x.view(), y.view()),
            Err(TrainingError::EmptyDataset)
        ));
    }
}
