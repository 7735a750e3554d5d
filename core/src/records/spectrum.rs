use serde::{Deserialize, Serialize};
use std::fmt;

use crate::records::sample::{Backend, Frontend, Stw};

/// What a calibrated record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpectrumKind {
    /// Calibrated target spectrum.
    Spe,
    /// Gain (system temperature) curve of a mode block.
    Cal,
    /// Sideband-rejection curve of a mode block.
    Ssb,
}

impl fmt::Display for SpectrumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpectrumKind::Spe => "SPE",
            SpectrumKind::Cal => "CAL",
            SpectrumKind::Ssb => "SSB",
        };
        f.write_str(name)
    }
}

/// Natural key of a persisted record; replaying a scan writes the same keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpectrumKey {
    pub stw: Stw,
    pub backend: Backend,
    pub frontend: Frontend,
    pub version: u16,
    pub intmode: u32,
    pub calibration_set: u16,
    pub source: String,
    pub freqmode: u16,
    pub kind: SpectrumKind,
}

/// Calibrated, frequency-tagged brightness-temperature record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedSpectrum {
    pub stw: Stw,
    pub backend: Backend,
    pub frontend: Frontend,
    pub intmode: u32,
    pub version: u16,
    pub calibration_set: u16,
    pub freqmode: u16,
    pub source: String,
    pub kind: SpectrumKind,
    pub skyfreq_hz: f64,
    pub lofreq_hz: f64,
    pub restfreq_hz: f64,
    pub sideband_path_m: f64,
    pub tsys: f64,
    pub integration_s: f64,
    pub efftime_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tangent_altitude_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude_deg: Option<f64>,
    /// Scan this record was calibrated for.
    pub scan: Stw,
    pub spectrum: Vec<f64>,
}

impl CalibratedSpectrum {
    pub fn key(&self) -> SpectrumKey {
        SpectrumKey {
            stw: self.stw,
            backend: self.backend,
            frontend: self.frontend,
            version: self.version,
            intmode: self.intmode,
            calibration_set: self.calibration_set,
            source: self.source.clone(),
            freqmode: self.freqmode,
            kind: self.kind,
        }
    }

    /// Rebuilds the source label after the frontend or mode changed.
    pub fn relabel(&mut self) {
        self.source = source_label(self.backend, self.frontend, self.freqmode, self.kind);
    }
}

pub fn source_label(
    backend: Backend,
    frontend: Frontend,
    freqmode: u16,
    kind: SpectrumKind,
) -> String {
    format!("{}/{}/FM{}/{}", backend, frontend, freqmode, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_label_is_stable() {
        assert_eq!(
            source_label(Backend::Ac2, Frontend::Rec549, 1, SpectrumKind::Ssb),
            "AC2/REC_549/FM1/SSB"
        );
    }
}
