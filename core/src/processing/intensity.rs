use ndarray::Array2;
use std::collections::BTreeMap;

use crate::math::stats::StatsHelper;
use crate::prelude::{CalibrationError, CalibrationResult, CalibrationSettings};
use crate::processing::frequency::{FrequencyStamp, StampedSample};
use crate::processing::tsys::{band_count, band_slices, TsysEstimate};
use crate::records::spectrum::source_label;
use crate::records::{Backend, CalibratedSpectrum, Frontend, SpectrumKind, Stw};
use crate::telemetry::log::LogManager;

/// Spillover temperature at which the main-beam efficiency reaches zero.
pub const SPILLOVER_REFERENCE_K: f64 = 300.0;

/// A signal sample with the reference interpolated at its time.
#[derive(Debug, Clone)]
pub struct SignalInput<'a> {
    pub sample: &'a StampedSample,
    pub reference: Vec<f64>,
}

/// What a mode block is calibrated against.
#[derive(Debug, Clone, Copy)]
pub struct BlockContext<'a> {
    pub calstw: Stw,
    pub calibration_set: u16,
    /// CAL sample describing the block's gain record.
    pub cal: &'a StampedSample,
}

/// A record not yet split into its receivers.
#[derive(Debug, Clone)]
pub struct PendingRecord {
    pub record: CalibratedSpectrum,
    /// Receiver carried in the upper half of the spectrum, if any.
    pub partner: Option<FrequencyStamp>,
}

#[derive(Debug, Clone)]
pub struct IntensityProducts {
    pub spectra: Vec<PendingRecord>,
    pub gain: PendingRecord,
    /// Spillover per band, in kelvin.
    pub spillover: Vec<f64>,
    pub efficiency: f64,
}

/// Receiver feeding band `band` of `bands`; dual-receiver spectra carry
/// the partner in their upper half.
pub fn band_frontend(
    band: usize,
    bands: usize,
    primary: Frontend,
    partner: Option<Frontend>,
) -> Frontend {
    match partner {
        Some(partner) if bands > 1 && band >= bands / 2 => partner,
        _ => primary,
    }
}

/// Converts signal spectra to antenna temperature.
pub struct IntensityCalibrator {
    version: u16,
    high_altitude_band_m: f64,
    beam_efficiency: BTreeMap<Frontend, f64>,
    max_efftime_s: f64,
    logger: LogManager,
}

impl IntensityCalibrator {
    pub fn new(settings: &CalibrationSettings) -> Self {
        Self {
            version: settings.version,
            high_altitude_band_m: settings.high_altitude_band_m,
            beam_efficiency: settings.beam_efficiency.clone(),
            max_efftime_s: settings.max_efftime_s,
            logger: LogManager::new("intensity"),
        }
    }

    /// Calibrates every signal of a block in two passes: provisional
    /// antenna temperatures first, then spillover and integration efficiency
    /// measured on the spectra near the top of the scan are applied.
    pub fn calibrate(
        &self,
        signals: &[SignalInput],
        tsys: &TsysEstimate,
        ctx: &BlockContext,
    ) -> CalibrationResult<IntensityProducts> {
        let n = tsys.channels.len();
        for signal in signals {
            for found in [signal.sample.spectrum.len(), signal.reference.len()] {
                if found != n {
                    return Err(CalibrationError::ChannelMismatch {
                        stw: signal.sample.sample.stw,
                        expected: n,
                        found,
                    });
                }
            }
        }

        let backend = ctx.cal.sample.backend;
        let bands = band_count(n, backend.bands());
        let primary = ctx.cal.sample.frontend;
        let partner = ctx.cal.partner_freq.map(|p| p.frontend);

        let provisional = Array2::from_shape_fn((signals.len(), n), |(i, c)| {
            let reference = signals[i].reference[c];
            let t = tsys.channels[c];
            if reference > 0.0 && t > 0.0 {
                (signals[i].sample.spectrum[c] - reference) / reference * t
            } else {
                0.0
            }
        });

        let high = self.high_altitude_rows(signals);
        let spillover = spillover_per_band(&provisional, &high, &tsys.channels, bands);
        let eta: Vec<f64> = spillover
            .iter()
            .enumerate()
            .map(|(b, &spill)| {
                let frontend = band_frontend(b, bands, primary, partner);
                self.beam_efficiency
                    .get(&frontend)
                    .copied()
                    .unwrap_or(1.0 - spill / SPILLOVER_REFERENCE_K)
            })
            .collect();

        let mut calibrated = provisional.clone();
        for (b, band) in band_slices(n, bands).enumerate() {
            for c in band {
                let active = tsys.channels[c] > 0.0;
                calibrated.column_mut(c).mapv_inplace(|ta| {
                    if active {
                        (ta - spillover[b]) / eta[b]
                    } else {
                        0.0
                    }
                });
            }
        }

        let efficiency =
            integration_efficiency(&provisional, &high, signals, &tsys.channels, backend, bands);
        let tsys_mean = tsys.mean();
        let spectra = signals
            .iter()
            .zip(calibrated.rows())
            .map(|(signal, row)| {
                let stamped = signal.sample;
                let efftime = self.efftime(stamped.sample.integration_s * efficiency);
                PendingRecord {
                    record: self.record(
                        stamped,
                        stamped.sample.stw,
                        SpectrumKind::Spe,
                        ctx,
                        tsys_mean,
                        efftime,
                        row.to_vec(),
                    ),
                    partner: stamped.partner_freq,
                }
            })
            .collect::<Vec<_>>();

        let gain = PendingRecord {
            record: self.record(
                ctx.cal,
                ctx.calstw,
                SpectrumKind::Cal,
                ctx,
                tsys_mean,
                self.efftime(ctx.cal.sample.integration_s),
                tsys.channels.clone(),
            ),
            partner: ctx.cal.partner_freq,
        };

        self.logger.record(&format!(
            "scan {}: {} spectra, Tsys {:.1} K, efficiency {:.3}, {} high-altitude",
            ctx.calstw,
            spectra.len(),
            tsys_mean,
            efficiency,
            high.len()
        ));

        Ok(IntensityProducts {
            spectra,
            gain,
            spillover,
            efficiency,
        })
    }

    /// Rows of the signals within the high-altitude band below the
    /// highest tangent point.
    fn high_altitude_rows(&self, signals: &[SignalInput]) -> Vec<usize> {
        let altitudes: Vec<Option<f64>> = signals
            .iter()
            .map(|s| s.sample.sample.attitude.map(|a| a.tangent_altitude_m))
            .collect();
        let Some(top) = altitudes
            .iter()
            .flatten()
            .copied()
            .filter(|a| a.is_finite())
            .reduce(f64::max)
        else {
            return Vec::new();
        };
        altitudes
            .iter()
            .enumerate()
            .filter(|(_, alt)| alt.map_or(false, |a| a >= top - self.high_altitude_band_m))
            .map(|(i, _)| i)
            .collect()
    }

    /// Integration-time products overflow the archive beyond the cap.
    fn efftime(&self, seconds: f64) -> f64 {
        if seconds.is_finite() {
            seconds.min(self.max_efftime_s)
        } else {
            self.max_efftime_s
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        stamped: &StampedSample,
        stw: Stw,
        kind: SpectrumKind,
        ctx: &BlockContext,
        tsys: f64,
        efftime_s: f64,
        spectrum: Vec<f64>,
    ) -> CalibratedSpectrum {
        let sample = &stamped.sample;
        let freq = &stamped.freq;
        CalibratedSpectrum {
            stw,
            backend: sample.backend,
            frontend: sample.frontend,
            intmode: sample.intmode,
            version: self.version,
            calibration_set: ctx.calibration_set,
            freqmode: freq.freqmode,
            source: source_label(sample.backend, sample.frontend, freq.freqmode, kind),
            kind,
            skyfreq_hz: freq.sky_hz,
            lofreq_hz: freq.lo_hz,
            restfreq_hz: freq.rest_hz,
            sideband_path_m: freq.sideband_path_m,
            tsys,
            integration_s: sample.integration_s,
            efftime_s,
            tangent_altitude_m: sample.attitude.map(|a| a.tangent_altitude_m),
            latitude_deg: sample.attitude.map(|a| a.latitude_deg),
            longitude_deg: sample.attitude.map(|a| a.longitude_deg),
            scan: ctx.calstw,
            spectrum,
        }
    }
}

/// Median provisional temperature of the high-altitude spectra, per band.
/// Values outside `[0, 300) K` are not physical spillover and count as zero.
fn spillover_per_band(
    provisional: &Array2<f64>,
    high: &[usize],
    tsys: &[f64],
    bands: usize,
) -> Vec<f64> {
    band_slices(tsys.len(), bands)
        .map(|band| {
            let mut values = Vec::new();
            for &row in high {
                for c in band.clone().filter(|&c| tsys[c] > 0.0) {
                    values.push(provisional[[row, c]]);
                }
            }
            let spill = StatsHelper::median(&values).unwrap_or(0.0);
            if (0.0..SPILLOVER_REFERENCE_K).contains(&spill) {
                spill
            } else {
                0.0
            }
        })
        .collect()
}

/// Ratio of the noise-equivalent bandwidth-time product, `Tsys^2 / var`,
/// to the nominal one of the high-altitude spectra. Defaults to one when no
/// band shows measurable noise.
fn integration_efficiency(
    provisional: &Array2<f64>,
    high: &[usize],
    signals: &[SignalInput],
    tsys: &[f64],
    backend: Backend,
    bands: usize,
) -> f64 {
    let width = backend.channel_width_hz();
    let defective = backend.defective_bands();
    let mut ratios = Vec::new();
    for &row in high {
        let tau = signals[row].sample.sample.integration_s;
        for (b, band) in band_slices(tsys.len(), bands).enumerate() {
            if bands > 1 && defective.contains(&b) {
                continue;
            }
            let used: Vec<usize> = band.filter(|&c| tsys[c] > 0.0).collect();
            if used.len() < 2 {
                continue;
            }
            let values: Vec<f64> = used.iter().map(|&c| provisional[[row, c]]).collect();
            let temperatures: Vec<f64> = used.iter().map(|&c| tsys[c]).collect();
            let (Some(variance), Some(t)) = (
                StatsHelper::variance(&values),
                StatsHelper::mean(&temperatures),
            ) else {
                continue;
            };
            if variance > 0.0 {
                ratios.push(t * t / variance / (width * tau));
            }
        }
    }
    StatsHelper::mean(&ratios).unwrap_or(1.0)
}
