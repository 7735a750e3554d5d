use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::records::{Frontend, Stw};
use crate::source::SourceError;
use crate::store::StoreError;

/// How reference spectra are estimated at signal and calibration times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    /// Linear between the bracketing references, clamped at the ends.
    #[default]
    Linear,
    /// Weighted quadratic least squares over the references of one scan.
    WeightedQuadratic,
}

/// Which CAL sample survives when a scan holds more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateCalPolicy {
    #[default]
    KeepSecond,
    KeepFirst,
}

/// Settings shared by every stage of one calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    /// Calibration software version stamped on every record.
    pub version: u16,
    pub window_half_width_s: f64,
    pub scan_duration_s: f64,
    pub interpolation: InterpolationMethod,
    /// Decay rate of the quadratic interpolator's time weights.
    pub decay_rate: f64,
    pub duplicate_cal: DuplicateCalPolicy,
    /// Calibrate contaminated references as signal instead of dropping them.
    pub recalibrate_rejected_refs: bool,
    pub mode_block_threshold_hz: f64,
    pub high_altitude_band_m: f64,
    /// Main-beam efficiency per receiver, replacing `1 - spillover / 300 K`.
    pub beam_efficiency: BTreeMap<Frontend, f64>,
    pub max_efftime_s: f64,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            version: 8,
            window_half_width_s: 180.0,
            scan_duration_s: 86.0,
            interpolation: InterpolationMethod::Linear,
            decay_rate: 1.0,
            duplicate_cal: DuplicateCalPolicy::KeepSecond,
            recalibrate_rejected_refs: false,
            mode_block_threshold_hz: 1.0e6,
            high_altitude_band_m: 10_000.0,
            beam_efficiency: BTreeMap::new(),
            max_efftime_s: 1.0e6,
        }
    }
}

/// A configurable step of the per-window sample chain. `I` is what the
/// stage consumes.
pub trait ProcessingStage<I> {
    type Output;
    /// Applies `settings` before the next execution.
    fn initialize(&mut self, settings: &CalibrationSettings);
    fn execute(&mut self, input: I) -> Self::Output;
}

/// Common error type for calibration.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("invalid sample at stw {stw}: {reason}")]
    InvalidSample { stw: Stw, reason: String },
    #[error("channel count mismatch at stw {stw}: expected {expected}, found {found}")]
    ChannelMismatch {
        stw: Stw,
        expected: usize,
        found: usize,
    },
    #[error("telemetry source failure: {0}")]
    Source(#[from] SourceError),
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),
}

pub type CalibrationResult<T> = Result<T, CalibrationError>;
