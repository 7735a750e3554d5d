//! Spectral calibration core for limb-sounding radiometer telemetry.
//!
//! The modules follow the level-1 calibration chain: window selection,
//! frequency calibration, reference interpolation, system temperature,
//! intensity calibration and band splitting, with idempotent persistence
//! of the resulting spectra.

pub mod engine;
#[cfg(test)]
mod fixtures;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod records;
pub mod source;
pub mod store;
pub mod telemetry;

pub use engine::{
    calibrate_file, CalibrationRequest, InvocationSummary, ScanCalibrator, ScanOutcome,
};
pub use prelude::{CalibrationError, CalibrationResult, CalibrationSettings};
