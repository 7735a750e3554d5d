use std::collections::HashMap;

use crate::math::fft::FftHelper;
use crate::prelude::{CalibrationSettings, ProcessingStage};
use crate::records::RawSample;
use crate::telemetry::log::LogManager;

/// A sample together with its power spectrum.
#[derive(Debug, Clone)]
pub struct SpectralSample {
    pub sample: RawSample,
    pub spectrum: Vec<f64>,
}

/// Converts autocorrelator lag buffers into power spectra, band by band.
/// Spectrometers that already deliver spectra pass through unchanged.
pub struct CorrelatorStage {
    helpers: HashMap<usize, FftHelper>,
    logger: LogManager,
}

impl CorrelatorStage {
    pub fn new() -> Self {
        Self {
            helpers: HashMap::new(),
            logger: LogManager::new("correlator"),
        }
    }

    /// `None` when the buffer cannot be divided into the backend's bands.
    pub fn spectrum(&mut self, sample: &RawSample) -> Option<Vec<f64>> {
        if !sample.backend.is_autocorrelator() {
            return Some(sample.counts.clone());
        }
        let bands = sample.backend.bands();
        if sample.counts.is_empty() || sample.counts.len() % bands != 0 {
            self.logger.skip(&format!(
                "stw {}: {} lags do not split into {} bands",
                sample.stw,
                sample.counts.len(),
                bands
            ));
            return None;
        }
        let lags = sample.counts.len() / bands;
        let helper = self
            .helpers
            .entry(lags)
            .or_insert_with(|| FftHelper::new(lags));
        Some(
            sample
                .counts
                .chunks(lags)
                .flat_map(|band| helper.spectrum_from_lags(band))
                .collect(),
        )
    }

    pub fn synthesize(&mut self, samples: Vec<RawSample>) -> Vec<SpectralSample> {
        let total = samples.len();
        let spectral: Vec<SpectralSample> = samples
            .into_iter()
            .filter_map(|sample| {
                let spectrum = self.spectrum(&sample)?;
                Some(SpectralSample { sample, spectrum })
            })
            .collect();
        self.logger.detail(&format!(
            "synthesised {} of {} spectra",
            spectral.len(),
            total
        ));
        spectral
    }
}

impl ProcessingStage<Vec<RawSample>> for CorrelatorStage {
    type Output = Vec<SpectralSample>;

    /// Cached FFT plans are dropped and rebuilt on demand.
    fn initialize(&mut self, _settings: &CalibrationSettings) {
        self.helpers.clear();
    }

    fn execute(&mut self, samples: Vec<RawSample>) -> Vec<SpectralSample> {
        self.synthesize(samples)
    }
}

impl Default for CorrelatorStage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::records::{Backend, SampleKind};
    use approx::assert_abs_diff_eq;

    #[test]
    fn autocorrelator_lags_become_band_spectra() {
        let mut stage = CorrelatorStage::new();
        let sample = fixtures::sample(0, SampleKind::Sig, 105.0);
        let spectrum = stage.spectrum(&sample).unwrap();
        assert_eq!(spectrum.len(), fixtures::CHANNELS);
        for value in spectrum {
            assert_abs_diff_eq!(value, 105.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn spectrometer_counts_pass_through() {
        let mut stage = CorrelatorStage::new();
        let mut sample = fixtures::sample(0, SampleKind::Sig, 1.0);
        sample.backend = Backend::Aos;
        sample.counts = vec![1.0, 2.0, 3.0];
        assert_eq!(stage.spectrum(&sample).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn ragged_lag_buffer_is_excluded() {
        let mut stage = CorrelatorStage::new();
        let mut sample = fixtures::sample(0, SampleKind::Sig, 1.0);
        sample.counts.push(0.0);
        assert!(stage.spectrum(&sample).is_none());
        assert!(stage.synthesize(vec![sample]).is_empty());
    }
}
