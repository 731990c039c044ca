//! Fault Scenarios and Labelled Datasets
//!
//! A [`Scenario`] is one operating point of the feeder. The
//! [`DatasetGenerator`] samples scenarios from uniform ranges and labels each
//! one with the analytical settings, producing the surrogate's training set.

use std::path::Path;

use ndarray::Array2;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::protection::{calculate_adaptive_settings, IdmtCurve, RelaySettings};
use crate::system::target_time;

/// Number of raw features fed to the surrogate
pub const N_FEATURES: usize = 4;
/// Number of predicted settings
pub const N_LABELS: usize = 2;

pub const FEATURE_NAMES: [&str; N_FEATURES] = ["i_load", "i_grid", "i_ibr_potential", "ibr_active"];
pub const LABEL_NAMES: [&str; N_LABELS] = ["is_pickup_target", "tms_target"];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Dataset is empty")]
    Empty,
}

/// One feeder operating point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Max load current (A)
    pub i_load: f64,
    /// Grid fault contribution (A)
    pub i_grid: f64,
    /// IBR fault contribution when connected (A)
    pub i_ibr_potential: f64,
    pub ibr_active: bool,
}

impl Scenario {
    pub fn new(i_load: f64, i_grid: f64, i_ibr_potential: f64, ibr_active: bool) -> Self {
        Self {
            i_load,
            i_grid,
            i_ibr_potential,
            ibr_active,
        }
    }

    /// Fault current seen by the relay in this scenario
    pub fn fault_current(&self) -> f64 {
        if self.ibr_active {
            self.i_grid + self.i_ibr_potential
        } else {
            self.i_grid
        }
    }

    pub fn target_time(&self) -> f64 {
        target_time(self.ibr_active)
    }

    /// Raw surrogate input, flag cast to 0/1
    pub fn features(&self) -> [f64; N_FEATURES] {
        [
            self.i_load,
            self.i_grid,
            self.i_ibr_potential,
            if self.ibr_active { 1.0 } else { 0.0 },
        ]
    }

    /// Ground-truth settings from the closed-form calculator
    pub fn analytical_settings(&self, curve: &IdmtCurve) -> RelaySettings {
        calculate_adaptive_settings(
            self.ibr_active,
            self.i_load,
            self.fault_current(),
            curve,
            self.target_time(),
        )
    }
}

/// One row of the training CSV
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub i_load: f64,
    pub i_grid: f64,
    pub i_ibr_potential: f64,
    pub ibr_active: u8,
    pub i_fault: f64,
    pub is_pickup_target: f64,
    pub tms_target: f64,
}

impl DatasetRow {
    pub fn labelled(scenario: &Scenario, curve: &IdmtCurve) -> Self {
        let settings = scenario.analytical_settings(curve);
        Self {
            i_load: scenario.i_load,
            i_grid: scenario.i_grid,
            i_ibr_potential: scenario.i_ibr_potential,
            ibr_active: u8::from(scenario.ibr_active),
            i_fault: scenario.fault_current(),
            is_pickup_target: settings.pickup_a,
            tms_target: settings.tms,
        }
    }

    pub fn scenario(&self) -> Scenario {
        Scenario::new(self.i_load, self.i_grid, self.i_ibr_potential, self.ibr_active != 0)
    }
}

/// Labelled training set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub rows: Vec<DatasetRow>,
}

impl Dataset {
    pub fn new(rows: Vec<DatasetRow>) -> Self {
        Self { rows }
    }

    pub fn from_scenarios(scenarios: &[Scenario], curve: &IdmtCurve) -> Self {
        Self::new(scenarios.iter().map(|s| DatasetRow::labelled(s, curve)).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `n x 4` matrix of raw features
    pub fn feature_matrix(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.len(), N_FEATURES), |(i, j)| {
            self.rows[i].scenario().features()[j]
        })
    }

    /// `n x 2` matrix of (Is, TMS) labels
    pub fn label_matrix(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.len(), N_LABELS), |(i, j)| {
            let row = &self.rows[i];
            if j == 0 {
                row.is_pickup_target
            } else {
                row.tms_target
            }
        })
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let mut wtr = csv::Writer::from_path(path.as_ref())?;
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let mut rdr = csv::Reader::from_path(path.as_ref())?;
        let rows = rdr
            .deserialize()
            .collect::<Result<Vec<DatasetRow>, csv::Error>>()?;
        if rows.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(Self { rows })
    }
}

/// Sampling ranges and size of a synthetic dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub samples: usize,
    pub i_load_range: (f64, f64),
    pub i_grid_range: (f64, f64),
    pub i_ibr_range: (f64, f64),
    /// Probability that the IBR is connected
    pub ibr_active_probability: f64,
    /// Random seed for reproducible datasets
    pub random_seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            samples: 2000,
            i_load_range: (200.0, 1200.0),
            i_grid_range: (2000.0, 8000.0),
            i_ibr_range: (300.0, 1500.0),
            ibr_active_probability: 0.5,
            random_seed: Some(42),
        }
    }
}

/// Random scenario source
pub struct DatasetGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl DatasetGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    /// Build with an explicitly supplied RNG
    pub fn with_rng(config: GeneratorConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }

    pub fn sample_scenario(&mut self) -> Scenario {
        let load = Uniform::new(self.config.i_load_range.0, self.config.i_load_range.1);
        let grid = Uniform::new(self.config.i_grid_range.0, self.config.i_grid_range.1);
        let ibr = Uniform::new(self.config.i_ibr_range.0, self.config.i_ibr_range.1);

        Scenario {
            i_load: load.sample(&mut self.rng),
            i_grid: grid.sample(&mut self.rng),
            i_ibr_potential: ibr.sample(&mut self.rng),
            ibr_active: self.rng.gen_bool(self.config.ibr_active_probability),
        }
    }

    pub fn sample_scenarios(&mut self, n: usize) -> Vec<Scenario> {
        (0..n).map(|_| self.sample_scenario()).collect()
    }

    /// Sample `config.samples` scenarios and label them
    pub fn generate(&mut self, curve: &IdmtCurve) -> Dataset {
        let scenarios = self.sample_scenarios(self.config.samples);
        let dataset = Dataset::from_scenarios(&scenarios, curve);
        info!(samples = dataset.len(), "generated labelled dataset");
        dataset
    }
}
