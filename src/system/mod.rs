pub mod feeder;

pub use feeder::*;
