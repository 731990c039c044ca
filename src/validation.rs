//! Validation Harness
//!
//! Cross-checks the learned surrogate against the analytical calculator over a
//! fixed battery of corner-case feeder scenarios and reports per-scenario and
//! aggregate discrepancy.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::ml::{BundleError, ModelBundle, PredictedSettings};
use crate::protection::{IdmtCurve, RelaySettings, STANDARD_INVERSE};
use crate::scenario::{DatasetError, Scenario};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Model bundle error: {0}")]
    Bundle(#[from] BundleError),
    #[error("Report write error: {0}")]
    Report(#[from] DatasetError),
}

/// Named literal scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CornerCase {
    pub name: String,
    pub scenario: Scenario,
}

impl CornerCase {
    pub fn new(name: impl Into<String>, scenario: Scenario) -> Self {
        Self {
            name: name.into(),
            scenario,
        }
    }
}

/// The fixed corner-case battery: stressed load, islanding, light load,
/// heavy IBR contribution and overload without IBR.
pub fn corner_cases() -> Vec<CornerCase> {
    vec![
        CornerCase::new("Extreme Load + Weak Grid", Scenario::new(1100.0, 2500.0, 500.0, true)),
        CornerCase::new("Islanding (Low Grid Fault)", Scenario::new(400.0, 1500.0, 1200.0, true)),
        CornerCase::new("No Load + Strong Grid", Scenario::new(100.0, 7000.0, 100.0, false)),
        CornerCase::new("High IBR Contribution", Scenario::new(200.0, 3000.0, 1500.0, true)),
        CornerCase::new("Overload (No IBR)", Scenario::new(1200.0, 2000.0, 200.0, false)),
    ]
}

/// Both paths for one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioResult {
    pub case: CornerCase,
    pub analytical: RelaySettings,
    pub surrogate: PredictedSettings,
}

impl ScenarioResult {
    pub fn diff_is(&self) -> f64 {
        (self.analytical.pickup_a - self.surrogate.pickup_a).abs()
    }

    pub fn diff_tms(&self) -> f64 {
        (self.analytical.tms - self.surrogate.tms).abs()
    }

    pub fn row(&self) -> ReportRow {
        ReportRow {
            scenario: self.case.name.clone(),
            is_analytical: self.analytical.pickup_a,
            tms_analytical: self.analytical.tms,
            is_ml: self.surrogate.pickup_a,
            tms_ml: self.surrogate.tms,
            diff_is: self.diff_is(),
            diff_tms: self.diff_tms(),
        }
    }
}

/// One line of the report CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub scenario: String,
    pub is_analytical: f64,
    pub tms_analytical: f64,
    pub is_ml: f64,
    pub tms_ml: f64,
    pub diff_is: f64,
    pub diff_tms: f64,
}

/// Aggregate absolute discrepancy across all scenarios
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscrepancySummary {
    pub mean_diff_is: f64,
    pub max_diff_is: f64,
    pub mean_diff_tms: f64,
    pub max_diff_tms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub results: Vec<ScenarioResult>,
    pub summary: DiscrepancySummary,
}

impl ValidationReport {
    fn from_results(results: Vec<ScenarioResult>) -> Self {
        let n = results.len().max(1) as f64;
        let summary = DiscrepancySummary {
            mean_diff_is: results.iter().map(ScenarioResult::diff_is).sum::<f64>() / n,
            max_diff_is: results.iter().map(ScenarioResult::diff_is).fold(0.0, f64::max),
            mean_diff_tms: results.iter().map(ScenarioResult::diff_tms).sum::<f64>() / n,
            max_diff_tms: results.iter().map(ScenarioResult::diff_tms).fold(0.0, f64::max),
        };
        Self { results, summary }
    }

    pub fn rows(&self) -> Vec<ReportRow> {
        self.results.iter().map(ScenarioResult::row).collect()
    }

    /// Every scenario within the given absolute tolerances
    pub fn within_tolerance(&self, is_tol: f64, tms_tol: f64) -> bool {
        self.summary.max_diff_is <= is_tol && self.summary.max_diff_tms <= tms_tol
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let mut wtr = csv::Writer::from_path(path.as_ref())?;
        for row in self.rows() {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

pub struct ValidationHarness {
    curve: IdmtCurve,
    cases: Vec<CornerCase>,
}

impl Default for ValidationHarness {
    fn default() -> Self {
        Self::new(STANDARD_INVERSE)
    }
}

impl ValidationHarness {
    /// Harness over the built-in corner-case battery
    pub fn new(curve: IdmtCurve) -> Self {
        Self::with_cases(curve, corner_cases())
    }

    pub fn with_cases(curve: IdmtCurve, cases: Vec<CornerCase>) -> Self {
        Self { curve, cases }
    }

    pub fn cases(&self) -> &[CornerCase] {
        &self.cases
    }

    pub fn run(&self, bundle: &ModelBundle) -> ValidationReport {
        let scenarios: Vec<Scenario> = self.cases.iter().map(|c| c.scenario).collect();
        let predictions = bundle.predictor().predict_batch(&scenarios);

        let results: Vec<ScenarioResult> = self
            .cases
            .iter()
            .zip(predictions)
            .map(|(case, surrogate)| {
                let analytical = case.scenario.analytical_settings(&self.curve);
                let result = ScenarioResult {
                    case: case.clone(),
                    analytical,
                    surrogate,
                };
                info!(
                    scenario = %case.name,
                    is_analytical = analytical.pickup_a,
                    tms_analytical = analytical.tms,
                    is_ml = surrogate.pickup_a,
                    tms_ml = surrogate.tms,
                    "validated scenario"
                );
                result
            })
            .collect();

        let report = ValidationReport::from_results(results);
        info!(
            mean_diff_is = report.summary.mean_diff_is,
            mean_diff_tms = report.summary.mean_diff_tms,
            "validation complete"
        );
        report
    }

    /// Load a persisted bundle and validate it
    pub fn run_from_path(&self, bundle_path: impl AsRef<Path>) -> Result<ValidationReport, ValidationError> {
        let bundle = ModelBundle::load_json(bundle_path)?;
        Ok(self.run(&bundle))
    }
}
