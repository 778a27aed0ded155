//! Domain value objects and accumulators for hypervisor network state.

pub mod tables;
pub mod types;

pub use tables::*;
pub use types::*;
