//! Adaptive overcurrent relay settings for microgrid feeders with an
//! inverter-based resource (IBR).
//!
//! Two paths produce the same (pickup current, time multiplier) pair:
//! the closed-form [`protection::calculate_adaptive_settings`] oracle and a
//! learned [`ml::SurrogateModel`] trained to approximate it. The
//! [`validation::ValidationHarness`] cross-checks both over literal
//! corner-case scenarios.

pub mod config;
pub mod ml;
pub mod protection;
pub mod scenario;
pub mod study;
pub mod system;
pub mod telemetry;
pub mod validation;
