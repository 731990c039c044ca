//! Adaptive Relay Settings Calculator
//!
//! Closed-form pickup current (Is) and time multiplier (TMS) for a feeder relay
//! whose minimum fault current depends on whether the IBR is contributing.
//!
//! # Algorithm
//! 1. `Is = 1.3 * I_load` with IBR active, `1.25 * I_load` otherwise
//! 2. If `Is > 0.8 * I_fault`, fall back to `Is = 0.5 * I_fault`
//! 3. `PSM = I_fault / Is`
//! 4. If `PSM <= 1`, `TMS = 0.1` (sensitivity lost)
//! 5. Otherwise `TMS = t_target / (k / (PSM^alpha - 1))`
//! 6. Saturate TMS into the relay dial range `[0.05, 1.1]`

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::curve::{IdmtCurve, FAULT_SENSITIVITY_FACTOR, PICKUP_SAFETY_FACTOR};

/// Pickup margin over max load when the IBR is connected
pub const PICKUP_FACTOR_IBR_ACTIVE: f64 = 1.3;
/// Pickup margin over max load on grid supply alone
pub const PICKUP_FACTOR_IBR_INACTIVE: f64 = PICKUP_SAFETY_FACTOR;
/// Pickup above this fraction of min fault current is considered insensitive
pub const SENSITIVITY_LIMIT: f64 = 0.8;
/// TMS used when the fault current no longer exceeds pickup
pub const FALLBACK_TMS: f64 = 0.1;
pub const TMS_MIN: f64 = 0.05;
pub const TMS_MAX: f64 = 1.1;

/// How the pickup current was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupBasis {
    /// Load current times the safety margin
    LoadMargin,
    /// Overridden to `0.5 * I_fault` to keep the relay sensitive
    SensitivityClamp,
}

/// How the time multiplier was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TmsBasis {
    /// Solved from the curve and inside the dial range
    Curve,
    /// Solved from the curve, then saturated at a dial limit
    Saturated,
    /// `PSM <= 1`; fixed fallback TMS
    SensitivityLost,
}

/// Relay settings pair. Always `pickup_a > 0` and `tms` in `[0.05, 1.1]`
/// for positive inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelaySettings {
    pub pickup_a: f64,
    pub tms: f64,
    pub pickup_basis: PickupBasis,
    pub tms_basis: TmsBasis,
}

impl RelaySettings {
    /// Plug setting multiplier at a given fault current
    pub fn psm(&self, i_fault: f64) -> f64 {
        i_fault / self.pickup_a
    }
}

/// Compute adaptive (Is, TMS) for a feeder relay.
///
/// # Arguments
/// * `ibr_active` - whether the IBR contributes fault current
/// * `i_load` - maximum expected load current (A)
/// * `i_fault` - minimum expected fault current (A)
/// * `curve` - IDMT curve of the relay
/// * `target_time` - desired operating time at `i_fault` (s)
pub fn calculate_adaptive_settings(
    ibr_active: bool,
    i_load: f64,
    i_fault: f64,
    curve: &IdmtCurve,
    target_time: f64,
) -> RelaySettings {
    let margin = if ibr_active {
        PICKUP_FACTOR_IBR_ACTIVE
    } else {
        PICKUP_FACTOR_IBR_INACTIVE
    };

    let mut pickup_a = margin * i_load;
    let mut pickup_basis = PickupBasis::LoadMargin;

    if pickup_a > SENSITIVITY_LIMIT * i_fault {
        pickup_a = FAULT_SENSITIVITY_FACTOR * i_fault;
        pickup_basis = PickupBasis::SensitivityClamp;
    }

    let (tms, tms_basis) = solve_tms(i_fault, pickup_a, curve, target_time);

    RelaySettings {
        pickup_a,
        tms,
        pickup_basis,
        tms_basis,
    }
}

/// Solve the curve for TMS given an already chosen pickup, then saturate.
pub fn solve_tms(
    i_fault: f64,
    pickup_a: f64,
    curve: &IdmtCurve,
    target_time: f64,
) -> (f64, TmsBasis) {
    let psm = i_fault / pickup_a;

    let Some(base_time) = curve.base_time(psm) else {
        debug!(psm, i_fault, pickup_a, "fault current at or below pickup, using fallback TMS");
        return (FALLBACK_TMS, TmsBasis::SensitivityLost);
    };

    let raw = target_time / base_time;
    let tms = raw.clamp(TMS_MIN, TMS_MAX);
    let basis = if tms == raw {
        TmsBasis::Curve
    } else {
        TmsBasis::Saturated
    };

    (tms, basis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protection::curve::{EXTREMELY_INVERSE, STANDARD_INVERSE, VERY_INVERSE};
    use proptest::prelude::*;

    fn expected_tms(i_fault: f64, pickup: f64, curve: &IdmtCurve, t: f64) -> f64 {
        let psm = i_fault / pickup;
        (t / (curve.k / (psm.powf(curve.alpha) - 1.0))).clamp(TMS_MIN, TMS_MAX)
    }

    #[test]
    fn test_grid_only_feeder() {
        // 1.25 * 800 = 1000 <= 0.8 * 5000, no clamp
        let s = calculate_adaptive_settings(false, 800.0, 5000.0, &STANDARD_INVERSE, 0.3);
        assert_eq!(s.pickup_a, 1000.0);
        assert_eq!(s.pickup_basis, PickupBasis::LoadMargin);
        assert_eq!(s.psm(5000.0), 5.0);
        assert_eq!(s.tms_basis, TmsBasis::Curve);
        assert_eq!(s.tms, expected_tms(5000.0, 1000.0, &STANDARD_INVERSE, 0.3));
        assert!((s.tms - 0.0701).abs() < 1e-4);
    }

    #[test]
    fn test_ibr_active_weak_fault() {
        // 1.3 * 400 = 520 <= 0.8 * 1700 = 1360
        let s = calculate_adaptive_settings(true, 400.0, 1700.0, &STANDARD_INVERSE, 0.25);
        assert_eq!(s.pickup_a, 1.3 * 400.0);
        assert_eq!(s.pickup_basis, PickupBasis::LoadMargin);
        let psm = s.psm(1700.0);
        assert!((psm - 3.269).abs() < 1e-3);
        assert!(psm > 1.0);
        assert_ne!(s.tms_basis, TmsBasis::SensitivityLost);
        // raw curve result (~0.043) saturates at the lower dial limit
        assert_eq!(s.tms, TMS_MIN);
        assert_eq!(s.tms_basis, TmsBasis::Saturated);
    }

    #[test]
    fn test_sensitivity_clamp() {
        // 1.25 * 1000 = 1250 > 0.8 * 1000
        let s = calculate_adaptive_settings(false, 1000.0, 1000.0, &STANDARD_INVERSE, 0.3);
        assert_eq!(s.pickup_basis, PickupBasis::SensitivityClamp);
        assert_eq!(s.pickup_a, 0.5 * 1000.0);
        assert_eq!(s.psm(1000.0), 2.0);
    }

    #[test]
    fn test_degenerate_psm_fallback() {
        let (tms, basis) = solve_tms(1000.0, 1000.0, &STANDARD_INVERSE, 0.3);
        assert_eq!(tms, FALLBACK_TMS);
        assert_eq!(basis, TmsBasis::SensitivityLost);

        let (tms, basis) = solve_tms(500.0, 1000.0, &VERY_INVERSE, 0.3);
        assert_eq!(tms, 0.1);
        assert_eq!(basis, TmsBasis::SensitivityLost);
    }

    #[test]
    fn test_upper_dial_saturation() {
        // Very slow target on a steep curve forces TMS above 1.1
        let s = calculate_adaptive_settings(false, 100.0, 10_000.0, &EXTREMELY_INVERSE, 60.0);
        assert_eq!(s.tms, TMS_MAX);
        assert_eq!(s.tms_basis, TmsBasis::Saturated);
    }

    fn any_curve() -> impl Strategy<Value = IdmtCurve> {
        prop_oneof![
            Just(STANDARD_INVERSE),
            Just(VERY_INVERSE),
            Just(EXTREMELY_INVERSE),
            (0.01f64..100.0, 0.01f64..3.0).prop_map(|(k, a)| IdmtCurve::new(k, a)),
        ]
    }

    proptest! {
        #[test]
        fn prop_settings_within_invariants(
            ibr_active in any::<bool>(),
            i_load in 1.0f64..5_000.0,
            i_fault in 1.0f64..50_000.0,
            target in 0.01f64..5.0,
            curve in any_curve(),
        ) {
            let s = calculate_adaptive_settings(ibr_active, i_load, i_fault, &curve, target);
            prop_assert!(s.pickup_a > 0.0);
            prop_assert!((TMS_MIN..=TMS_MAX).contains(&s.tms));

            let base = if ibr_active { 1.3 * i_load } else { 1.25 * i_load };
            if base > 0.8 * i_fault {
                prop_assert_eq!(s.pickup_a, 0.5 * i_fault);
                prop_assert_eq!(s.pickup_basis, PickupBasis::SensitivityClamp);
            } else {
                prop_assert_eq!(s.pickup_a, base);
                prop_assert_eq!(s.pickup_basis, PickupBasis::LoadMargin);
            }
            // Both pickup branches keep PSM >= 1.25, so the fallback never fires here
            prop_assert_ne!(s.tms_basis, TmsBasis::SensitivityLost);
        }
    }
}
