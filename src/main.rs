use anyhow::{Context, Result};
use adaptive_relay_settings::{config, ml, scenario, study, system, telemetry, validation};
use config::Config;
use ml::Trainer;
use scenario::DatasetGenerator;
use study::ProtectionStudy;
use system::FeederFaultModel;
use telemetry::init_tracing;
use tracing::{info, warn};
use validation::ValidationHarness;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    let curve = cfg.curve.curve();
    let paths = &cfg.paths;

    info!(curve = %cfg.curve, k = curve.k, alpha = curve.alpha, "starting adaptive relay study");

    let feeder = FeederFaultModel::new(cfg.feeder);
    let study = ProtectionStudy::run(&feeder, &curve);
    study
        .write_tcc_csv(&paths.tcc)
        .with_context(|| format!("writing {}", paths.tcc.display()))?;

    let dataset = DatasetGenerator::new(cfg.dataset.clone()).generate(&curve);
    dataset
        .write_csv(&paths.dataset)
        .with_context(|| format!("writing {}", paths.dataset.display()))?;

    let outcome = Trainer::new(cfg.training.clone())
        .train(&dataset)
        .context("training surrogate")?;
    if outcome.report.diverged {
        warn!("surrogate training diverged; validation results will be unreliable");
    }
    outcome
        .bundle
        .save_json(&paths.bundle)
        .with_context(|| format!("writing {}", paths.bundle.display()))?;
    outcome
        .report
        .write_loss_csv(&paths.loss_trace)
        .with_context(|| format!("writing {}", paths.loss_trace.display()))?;

    let report = ValidationHarness::new(curve)
        .run_from_path(&paths.bundle)
        .context("validating surrogate")?;
    report
        .write_csv(&paths.report)
        .with_context(|| format!("writing {}", paths.report.display()))?;

    info!(
        max_diff_is = report.summary.max_diff_is,
        max_diff_tms = report.summary.max_diff_tms,
        report = %paths.report.display(),
        "study complete"
    );
    Ok(())
}
