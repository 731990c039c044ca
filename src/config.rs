use anyhow::{Context, Result};
use figment::{providers::{Env, Format, Serialized, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ml::TrainingConfig;
use crate::protection::CurveKind;
use crate::scenario::GeneratorConfig;
use crate::system::FeederParameters;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub curve: CurveKind,
    pub feeder: FeederParameters,
    pub dataset: GeneratorConfig,
    pub training: TrainingConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub dataset: PathBuf,
    pub bundle: PathBuf,
    pub loss_trace: PathBuf,
    pub report: PathBuf,
    pub tcc: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset: "relay_training_data.csv".into(),
            bundle: "relay_mlp_weights.json".into(),
            loss_trace: "ml_training_loss.csv".into(),
            report: "test_results.csv".into(),
            tcc: "relay_tcc_comparison.csv".into(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::figment("config/default.toml")
            .extract()
            .context("loading configuration")
    }

    /// Defaults, then the TOML file, then `RELAY__`-prefixed environment
    pub fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("RELAY__").split("__"))
    }
}
