use crate::math::planck::SPEED_OF_LIGHT;
use crate::prelude::{CalibrationSettings, ProcessingStage};
use crate::processing::correlator::SpectralSample;
use crate::processing::freqmode;
use crate::processing::sideband::{self, FIXED_LO_119_HZ};
use crate::records::{Backend, Frontend, RawSample, Stw};
use crate::telemetry::log::LogManager;

/// Frequency calibration of one receiver in one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyStamp {
    pub frontend: Frontend,
    pub lo_hz: f64,
    pub if_hz: f64,
    pub sky_hz: f64,
    pub rest_hz: f64,
    pub sideband_path_m: f64,
    pub freqmode: u16,
}

/// A frequency-calibrated sample, ready for intensity calibration.
#[derive(Debug, Clone)]
pub struct StampedSample {
    pub sample: RawSample,
    pub spectrum: Vec<f64>,
    pub freq: FrequencyStamp,
    /// Stamp of the receiver in the upper half of a dual-receiver buffer.
    pub partner_freq: Option<FrequencyStamp>,
}

impl StampedSample {
    pub fn seconds_since(&self, calstw: Stw) -> f64 {
        self.sample.stw.seconds_since(calstw)
    }

    /// Sky frequency of every channel; the halves of a dual-receiver
    /// spectrum follow their own receivers.
    pub fn channel_frequencies(&self) -> Vec<f64> {
        let width = self.sample.backend.channel_width_hz();
        let n = self.spectrum.len();
        match self.partner_freq {
            Some(partner) => {
                let half = n / 2;
                let mut freqs = channel_grid(self.freq.sky_hz, half, width);
                freqs.extend(channel_grid(partner.sky_hz, n - half, width));
                freqs
            }
            None => channel_grid(self.freq.sky_hz, n, width),
        }
    }
}

/// Channel centres of an `n`-channel spectrum centred on `sky_hz`.
pub fn channel_grid(sky_hz: f64, n: usize, width_hz: f64) -> Vec<f64> {
    let centre = n as f64 / 2.0;
    (0..n)
        .map(|c| sky_hz + (c as f64 - centre) * width_hz)
        .collect()
}

/// Oscillator frequency corrected for the thermal drift of its box.
pub fn corrected_lo(frontend: Frontend, lo_hz: f64, box_temp_c: f64) -> f64 {
    let (intercept, slope) = match frontend {
        Frontend::Rec119 => return FIXED_LO_119_HZ,
        Frontend::Rec495 | Frontend::Rec549 => (29.23, -0.138),
        Frontend::Rec555 | Frontend::Rec572 => (24.69, -0.109),
    };
    lo_hz * (1.0 + (intercept + slope * box_temp_c) * 1.0e-6)
}

/// IF scale of an autocorrelator half-band in split mode.
pub fn split_scale(backend: Backend, split: bool, upper: bool) -> f64 {
    if !split || !backend.is_autocorrelator() {
        1.0
    } else if upper {
        4.1 / 3.9
    } else {
        3.7 / 3.9
    }
}

/// First-order Doppler correction from the observed sky frequency.
pub fn rest_frequency(sky_hz: f64, velocity_ms: f64) -> f64 {
    sky_hz * (1.0 + velocity_ms / SPEED_OF_LIGHT)
}

/// Stamps sky, oscillator and rest frequency on every sample.
pub struct FrequencyCalibrator {
    logger: LogManager,
}

impl FrequencyCalibrator {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("frequency"),
        }
    }

    /// Stamps of the primary and (for dual-receiver samples) the partner
    /// receiver. `None` when either oscillator cannot be resolved.
    pub fn stamp(
        &self,
        sample: &RawSample,
    ) -> Option<(FrequencyStamp, Option<FrequencyStamp>)> {
        let hk = &sample.housekeeping;
        let velocity = match sample.attitude {
            Some(attitude) => attitude.geocentric_velocity_ms,
            None => {
                self.logger.detail(&format!(
                    "stw {}: no attitude, rest frequency left at sky frequency",
                    sample.stw
                ));
                0.0
            }
        };
        match sample.partner {
            Some(partner) => {
                let lower = stamp_receiver(
                    sample.backend,
                    sample.frontend,
                    hk.lo_hz,
                    hk.sideband_position,
                    hk.box_temp_c,
                    split_scale(sample.backend, true, false),
                    velocity,
                )?;
                let upper = stamp_receiver(
                    sample.backend,
                    partner.frontend,
                    partner.lo_hz,
                    partner.sideband_position,
                    hk.box_temp_c,
                    split_scale(sample.backend, true, true),
                    velocity,
                )?;
                Some((lower, Some(upper)))
            }
            None => {
                let scale = split_scale(
                    sample.backend,
                    sample.is_split_mode(),
                    sample.is_upper_band(),
                );
                let stamp = stamp_receiver(
                    sample.backend,
                    sample.frontend,
                    hk.lo_hz,
                    hk.sideband_position,
                    hk.box_temp_c,
                    scale,
                    velocity,
                )?;
                Some((stamp, None))
            }
        }
    }

    /// Samples with an unresolved oscillator are dropped, not failed.
    pub fn calibrate(&self, samples: Vec<SpectralSample>) -> Vec<StampedSample> {
        let total = samples.len();
        let stamped: Vec<StampedSample> = samples
            .into_iter()
            .filter_map(|SpectralSample { sample, spectrum }| {
                let Some((freq, partner_freq)) = self.stamp(&sample) else {
                    self.logger.detail(&format!(
                        "stw {}: unresolved LO {:.0} Hz",
                        sample.stw, sample.housekeeping.lo_hz
                    ));
                    return None;
                };
                Some(StampedSample {
                    sample,
                    spectrum,
                    freq,
                    partner_freq,
                })
            })
            .collect();
        if stamped.len() < total {
            self.logger.skip(&format!(
                "{} of {} samples without a resolvable LO",
                total - stamped.len(),
                total
            ));
        }
        stamped
    }
}

impl ProcessingStage<Vec<SpectralSample>> for FrequencyCalibrator {
    type Output = Vec<StampedSample>;

    fn initialize(&mut self, _settings: &CalibrationSettings) {}

    fn execute(&mut self, samples: Vec<SpectralSample>) -> Vec<StampedSample> {
        self.calibrate(samples)
    }
}

impl Default for FrequencyCalibrator {
    fn default() -> Self {
        Self::new()
    }
}

fn stamp_receiver(
    backend: Backend,
    frontend: Frontend,
    lo_hz: f64,
    position: u16,
    box_temp_c: f64,
    if_scale: f64,
    velocity_ms: f64,
) -> Option<FrequencyStamp> {
    let resolution = sideband::resolve(frontend, lo_hz, position)?;
    let lo_hz = corrected_lo(frontend, lo_hz, box_temp_c);
    let if_hz = resolution.if_hz * if_scale;
    let sky_hz = lo_hz + if_hz;
    Some(FrequencyStamp {
        frontend,
        lo_hz,
        if_hz,
        sky_hz,
        rest_hz: rest_frequency(sky_hz, velocity_ms),
        sideband_path_m: resolution.sideband_path_m,
        freqmode: freqmode::lookup(backend, frontend, sky_hz),
    })
}
