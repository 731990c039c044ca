//! Overcurrent protection primitives
//!
//! IDMT curve catalogue and the analytical adaptive settings calculator used as
//! ground truth for the learned surrogate.

pub mod curve;
pub mod settings;

pub use curve::*;
pub use settings::*;
