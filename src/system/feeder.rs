//! # Feeder Fault Model
//!
//! Two-source fault level at the protected bus: the upstream grid and an
//! inverter-based resource (IBR) that only contributes while connected.

use serde::{Deserialize, Serialize};

use crate::protection::{calculate_adaptive_settings, IdmtCurve, RelaySettings};

/// Target operating time with the IBR connected (s)
pub const TARGET_TIME_IBR_ACTIVE: f64 = 0.25;
/// Target operating time on grid supply alone (s)
pub const TARGET_TIME_IBR_INACTIVE: f64 = 0.3;

/// Target operating time for the given IBR state.
///
/// Adaptive protection trips faster once the IBR reduces available fault current.
pub fn target_time(ibr_active: bool) -> f64 {
    if ibr_active {
        TARGET_TIME_IBR_ACTIVE
    } else {
        TARGET_TIME_IBR_INACTIVE
    }
}

/// Fixed feeder parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeederParameters {
    /// Nominal voltage (V)
    pub v_nom_v: f64,
    /// Max fault current from the grid (A)
    pub i_grid_fault_a: f64,
    /// Max fault contribution from the IBR (A)
    pub i_ibr_fault_a: f64,
    /// Max load current (A)
    pub i_load_max_a: f64,
}

impl Default for FeederParameters {
    /// 11 kV feeder from the reference four-bus microgrid
    fn default() -> Self {
        Self {
            v_nom_v: 11_000.0,
            i_grid_fault_a: 5_000.0,
            i_ibr_fault_a: 500.0,
            i_load_max_a: 800.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeederFaultModel {
    params: FeederParameters,
}

impl FeederFaultModel {
    pub fn new(params: FeederParameters) -> Self {
        Self { params }
    }

    /// Total fault current at the protected bus
    pub fn fault_current(&self, ibr_active: bool) -> f64 {
        if ibr_active {
            self.params.i_grid_fault_a + self.params.i_ibr_fault_a
        } else {
            self.params.i_grid_fault_a
        }
    }

    pub fn parameters(&self) -> FeederParameters {
        self.params
    }

    /// Analytical settings for this feeder at max load
    pub fn adaptive_settings(&self, ibr_active: bool, curve: &IdmtCurve) -> RelaySettings {
        calculate_adaptive_settings(
            ibr_active,
            self.params.i_load_max_a,
            self.fault_current(ibr_active),
            curve,
            target_time(ibr_active),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protection::{PickupBasis, STANDARD_INVERSE};

    #[test]
    fn test_fault_current_by_ibr_state() {
        let feeder = FeederFaultModel::default();
        assert_eq!(feeder.fault_current(false), 5_000.0);
        assert_eq!(feeder.fault_current(true), 5_500.0);
    }

    #[test]
    fn test_parameters_snapshot() {
        let params = FeederParameters {
            v_nom_v: 400.0,
            i_grid_fault_a: 2_000.0,
            i_ibr_fault_a: 150.0,
            i_load_max_a: 90.0,
        };
        let feeder = FeederFaultModel::new(params);
        assert_eq!(feeder.parameters(), params);
        assert_eq!(feeder.fault_current(true), 2_150.0);
    }

    #[test]
    fn test_target_time() {
        assert_eq!(target_time(true), 0.25);
        assert_eq!(target_time(false), 0.3);
    }

    #[test]
    fn test_adaptive_settings_fixed_vs_adaptive() {
        let feeder = FeederFaultModel::default();

        let fixed = feeder.adaptive_settings(false, &STANDARD_INVERSE);
        assert_eq!(fixed.pickup_a, 1_000.0);
        assert_eq!(fixed.pickup_basis, PickupBasis::LoadMargin);

        let adaptive = feeder.adaptive_settings(true, &STANDARD_INVERSE);
        assert_eq!(adaptive.pickup_a, 1.3 * 800.0);
        assert!(adaptive.tms < fixed.tms);
    }
}
