//! # Protection Study
//!
//! Compares fixed settings (computed for the grid-only fault level) against
//! adaptive settings recalculated for the IBR-connected feeder, and samples
//! both time-current characteristics for external plotting.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::protection::{IdmtCurve, RelaySettings};
use crate::scenario::DatasetError;
use crate::system::FeederFaultModel;

/// Upper end of the sampled current range (A)
pub const TCC_MAX_CURRENT_A: f64 = 6000.0;
/// Points per sampled curve
pub const TCC_POINTS: usize = 200;

/// One sample of both characteristics. Times are `None` where the current
/// does not exceed that relay's pickup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TccPoint {
    pub current_a: f64,
    pub t_fixed_s: Option<f64>,
    pub t_adaptive_s: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtectionStudy {
    /// Settings for IBR off, reused unchanged when the IBR connects
    pub fixed: RelaySettings,
    /// Settings recalculated for IBR on
    pub adaptive: RelaySettings,
    pub grid_fault_a: f64,
    pub total_fault_a: f64,
    pub tcc: Vec<TccPoint>,
}

impl ProtectionStudy {
    pub fn run(feeder: &FeederFaultModel, curve: &IdmtCurve) -> Self {
        let fixed = feeder.adaptive_settings(false, curve);
        let adaptive = feeder.adaptive_settings(true, curve);

        info!(
            is_fixed = fixed.pickup_a,
            tms_fixed = fixed.tms,
            is_adaptive = adaptive.pickup_a,
            tms_adaptive = adaptive.tms,
            "relay settings comparison"
        );

        let start = 1.1 * fixed.pickup_a.min(adaptive.pickup_a);
        let tcc = linspace(start, TCC_MAX_CURRENT_A, TCC_POINTS)
            .map(|current_a| TccPoint {
                current_a,
                t_fixed_s: curve.operating_time(current_a, fixed.pickup_a, fixed.tms),
                t_adaptive_s: curve.operating_time(current_a, adaptive.pickup_a, adaptive.tms),
            })
            .collect();

        Self {
            fixed,
            adaptive,
            grid_fault_a: feeder.fault_current(false),
            total_fault_a: feeder.fault_current(true),
            tcc,
        }
    }

    /// Operating times of (fixed, adaptive) at the IBR-connected fault level
    pub fn times_at_total_fault(&self, curve: &IdmtCurve) -> (Option<f64>, Option<f64>) {
        (
            curve.operating_time(self.total_fault_a, self.fixed.pickup_a, self.fixed.tms),
            curve.operating_time(self.total_fault_a, self.adaptive.pickup_a, self.adaptive.tms),
        )
    }

    pub fn write_tcc_csv(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let mut wtr = csv::Writer::from_path(path.as_ref())?;
        for point in &self.tcc {
            wtr.serialize(point)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 { (end - start) / (n - 1) as f64 } else { 0.0 };
    (0..n).map(move |i| if i + 1 == n { end } else { start + step * i as f64 })
}
