use serde::{Deserialize, Serialize};
use std::fmt;

use crate::prelude::{CalibrationError, CalibrationResult};

/// The onboard clock is a 32-bit counter and wraps at this modulus.
pub const STW_MODULUS: u64 = 1 << 32;

/// Clock ticks per second.
pub const STW_TICKS_PER_SECOND: f64 = 16.0;

/// Acquisition-mode bit set when an autocorrelator runs in split mode.
pub const INTMODE_SPLIT: u32 = 1 << 8;

/// Acquisition-mode bit selecting the upper half-band in split mode.
pub const INTMODE_UPPER: u32 = 1 << 9;

/// Onboard clock value (satellite time word).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stw(pub u32);

impl Stw {
    /// Signed tick difference `self - earlier`, taking the short way round
    /// the wrap.
    pub fn ticks_since(self, earlier: Stw) -> i64 {
        self.0.wrapping_sub(earlier.0) as i32 as i64
    }

    pub fn seconds_since(self, earlier: Stw) -> f64 {
        self.ticks_since(earlier) as f64 / STW_TICKS_PER_SECOND
    }

    pub fn offset(self, ticks: i64) -> Stw {
        Stw((self.0 as i64 + ticks).rem_euclid(STW_MODULUS as i64) as u32)
    }

    pub fn ticks_for_seconds(seconds: f64) -> i64 {
        (seconds * STW_TICKS_PER_SECOND).round() as i64
    }
}

impl fmt::Display for Stw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiver (frequency band) on the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Frontend {
    #[serde(rename = "REC_495")]
    Rec495,
    #[serde(rename = "REC_549")]
    Rec549,
    #[serde(rename = "REC_555")]
    Rec555,
    #[serde(rename = "REC_572")]
    Rec572,
    #[serde(rename = "REC_119")]
    Rec119,
}

impl Frontend {
    pub fn name(&self) -> &'static str {
        match self {
            Frontend::Rec495 => "REC_495",
            Frontend::Rec549 => "REC_549",
            Frontend::Rec555 => "REC_555",
            Frontend::Rec572 => "REC_572",
            Frontend::Rec119 => "REC_119",
        }
    }

    /// Acceptable band-mean system temperature range in kelvin.
    pub fn tsys_range(&self) -> (f64, f64) {
        match self {
            Frontend::Rec119 => (400.0, 1500.0),
            _ => (2000.0, 7000.0),
        }
    }
}

impl fmt::Display for Frontend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Spectrometer digitising a frontend's signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Backend {
    #[serde(rename = "AC1")]
    Ac1,
    #[serde(rename = "AC2")]
    Ac2,
    #[serde(rename = "AOS")]
    Aos,
    #[serde(rename = "FBA")]
    Fba,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Ac1 => "AC1",
            Backend::Ac2 => "AC2",
            Backend::Aos => "AOS",
            Backend::Fba => "FBA",
        }
    }

    /// Number of sub-bands a spectrum is made of.
    pub fn bands(&self) -> usize {
        match self {
            Backend::Ac1 | Backend::Ac2 => 8,
            Backend::Aos | Backend::Fba => 1,
        }
    }

    pub fn channel_width_hz(&self) -> f64 {
        match self {
            Backend::Ac1 | Backend::Ac2 => 1.0e6,
            Backend::Aos => 0.62e6,
            Backend::Fba => 100.0e6,
        }
    }

    /// Autocorrelators deliver lag buffers rather than spectra.
    pub fn is_autocorrelator(&self) -> bool {
        matches!(self, Backend::Ac1 | Backend::Ac2)
    }

    /// Bands excluded from the integration-efficiency estimate.
    pub fn defective_bands(&self) -> &'static [usize] {
        match self {
            Backend::Ac1 => &[2, 3],
            _ => &[],
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sky beam used by the reference mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkyBeam {
    #[serde(rename = "SK1")]
    Sk1,
    #[serde(rename = "SK2")]
    Sk2,
}

impl SkyBeam {
    /// Quality bit raised when this beam saw a bright body.
    pub fn contamination_mask(&self) -> u32 {
        match self {
            SkyBeam::Sk1 => 1 << 10,
            SkyBeam::Sk2 => 1 << 11,
        }
    }
}

/// Sample classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SampleKind {
    Sig,
    Ref { beam: SkyBeam },
    Cal,
}

impl SampleKind {
    pub fn is_sig(&self) -> bool {
        matches!(self, SampleKind::Sig)
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, SampleKind::Ref { .. })
    }

    pub fn is_cal(&self) -> bool {
        matches!(self, SampleKind::Cal)
    }
}

/// Housekeeping readings joined onto a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Housekeeping {
    /// Commanded local oscillator frequency in Hz.
    pub lo_hz: f64,
    /// Sideband mechanism position, 0..=4095 counts.
    pub sideband_position: u16,
    pub mixer_current: f64,
    pub hot_load_k: f64,
    /// Oscillator box temperature in degrees Celsius.
    pub box_temp_c: f64,
}

/// Second receiver carried in the upper half of a dual-receiver buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitPartner {
    pub frontend: Frontend,
    pub lo_hz: f64,
    pub sideband_position: u16,
}

/// Geolocation and attitude at the sample midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub tangent_altitude_m: f64,
    /// Line-of-sight geocentric velocity, positive when receding.
    pub geocentric_velocity_ms: f64,
}

/// Frontend-split grouping; samples of different groups are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrontendGroup {
    pub primary: Frontend,
    pub partner: Option<Frontend>,
}

impl fmt::Display for FrontendGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.partner {
            Some(partner) => write!(f, "{}+{}", self.primary, partner),
            None => write!(f, "{}", self.primary),
        }
    }
}

/// One telemetry record for one acquisition instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub stw: Stw,
    /// Clock value of the scan this sample belongs to.
    pub scan_stw: Stw,
    pub backend: Backend,
    pub frontend: Frontend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner: Option<SplitPartner>,
    pub intmode: u32,
    pub kind: SampleKind,
    /// Lags for autocorrelators, channel powers otherwise.
    pub counts: Vec<f64>,
    pub integration_s: f64,
    pub attenuation: u16,
    pub housekeeping: Housekeeping,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attitude: Option<Attitude>,
    #[serde(default)]
    pub quality: u32,
}

impl RawSample {
    pub fn group(&self) -> FrontendGroup {
        FrontendGroup {
            primary: self.frontend,
            partner: self.partner.map(|p| p.frontend),
        }
    }

    pub fn is_split_mode(&self) -> bool {
        self.intmode & INTMODE_SPLIT != 0
    }

    pub fn is_upper_band(&self) -> bool {
        self.intmode & INTMODE_UPPER != 0
    }

    /// Checks the invariants every decoded sample must hold.
    pub fn validate(&self) -> CalibrationResult<()> {
        if self.counts.is_empty() {
            return Err(CalibrationError::InvalidSample {
                stw: self.stw,
                reason: "empty correlation buffer".into(),
            });
        }
        if !(self.integration_s > 0.0) {
            return Err(CalibrationError::InvalidSample {
                stw: self.stw,
                reason: format!("integration time {} s", self.integration_s),
            });
        }
        if self.counts.iter().any(|v| !v.is_finite()) {
            return Err(CalibrationError::InvalidSample {
                stw: self.stw,
                reason: "non-finite counts".into(),
            });
        }
        if self.housekeeping.sideband_position > 4095 {
            return Err(CalibrationError::InvalidSample {
                stw: self.stw,
                reason: format!(
                    "sideband position {} out of range",
                    self.housekeeping.sideband_position
                ),
            });
        }
        if self.partner.is_some() && self.counts.len() % 2 != 0 {
            return Err(CalibrationError::InvalidSample {
                stw: self.stw,
                reason: "dual-receiver buffer has odd length".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_since_handles_wrap() {
        let before = Stw(u32::MAX - 15);
        let after = Stw(16);
        assert_eq!(after.ticks_since(before), 32);
        assert_eq!(before.ticks_since(after), -32);
        assert_eq!(after.seconds_since(before), 2.0);
    }

    #[test]
    fn offset_wraps_both_ways() {
        assert_eq!(Stw(10).offset(-20), Stw(u32::MAX - 9));
        assert_eq!(Stw(u32::MAX).offset(1), Stw(0));
    }

    #[test]
    fn sample_kind_uses_tagged_json() {
        let kind: SampleKind = serde_json::from_str(r#"{"REF":{"beam":"SK2"}}"#).unwrap();
        assert_eq!(kind, SampleKind::Ref { beam: SkyBeam::Sk2 });
        let sig: SampleKind = serde_json::from_str(r#""SIG""#).unwrap();
        assert!(sig.is_sig());
    }
}
