use anyhow::{ensure, Context};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smrcore::processing::sideband::tuned_lo_hz;
use smrcore::records::sample::{INTMODE_SPLIT, STW_TICKS_PER_SECOND};
use smrcore::records::{
    Attitude, Backend, Frontend, Housekeeping, RawSample, SampleKind, SkyBeam, SplitPartner, Stw,
};

/// Correlator level of the cold-sky reference view.
const REF_LEVEL: f64 = 100.0;
/// Correlator level of the ambient hot-load view.
const CAL_LEVEL: f64 = 110.0;
const HOT_LOAD_K: f64 = 290.0;
const BOX_TEMP_C: f64 = 20.0;
const INTEGRATION_S: f64 = 0.875;
/// Fraction of the reference level seen as stray radiation at every altitude.
const SPILLOVER_FRACTION: f64 = 0.004;
const ATMOSPHERE_SCALE_HEIGHT_M: f64 = 15_000.0;

/// Configuration for generating synthetic limb scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub backend: Backend,
    pub frontend: Frontend,
    /// Second receiver sharing the correlator in split mode.
    pub partner: Option<Frontend>,
    /// Channels per receiver.
    pub channels: usize,
    pub scans: usize,
    pub first_scan: Stw,
    pub signals_per_scan: usize,
    /// Signals between two reference views.
    pub run_length: usize,
    pub top_altitude_m: f64,
    pub bottom_altitude_m: f64,
    pub sideband_position: u16,
    /// Relative amplitude of the uniform counting noise.
    pub noise: f64,
    /// Relative strength of the emission line in signal spectra.
    pub line_strength: f64,
    pub seed: u64,
    pub description: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Ac2,
            frontend: Frontend::Rec549,
            partner: None,
            channels: 112,
            scans: 3,
            first_scan: Stw(1_000_000),
            signals_per_scan: 12,
            run_length: 4,
            top_altitude_m: 100_000.0,
            bottom_altitude_m: 15_000.0,
            sideband_position: 2000,
            noise: 0.0005,
            line_strength: 0.5,
            seed: 0,
            description: None,
        }
    }
}

/// Generated telemetry and the scans it contains.
#[derive(Debug, Clone)]
pub struct SyntheticTelemetry {
    pub samples: Vec<RawSample>,
    pub scan_starts: Vec<Stw>,
}

impl GeneratorConfig {
    fn total_channels(&self) -> usize {
        if self.partner.is_some() {
            2 * self.channels
        } else {
            self.channels
        }
    }

    fn runs(&self) -> usize {
        self.signals_per_scan.div_ceil(self.run_length.max(1))
    }

    /// Samples per scan: signals, one reference per run plus a closing
    /// reference, and the hot-load view.
    fn samples_per_scan(&self) -> usize {
        self.signals_per_scan + self.runs() + 2
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.scans > 0, "generator needs at least one scan");
        ensure!(self.signals_per_scan > 0, "generator needs signals in a scan");
        ensure!(
            self.channels > 0 && self.channels % self.backend.bands() == 0,
            "{} channels do not divide into the {} bands of {}",
            self.channels,
            self.backend.bands(),
            self.backend
        );
        ensure!(
            self.partner.is_none() || self.backend.is_autocorrelator(),
            "split mode needs an autocorrelator, not {}",
            self.backend
        );
        ensure!(
            self.top_altitude_m >= self.bottom_altitude_m,
            "altitude sweep runs from top to bottom"
        );
        Ok(())
    }
}

fn jitter(rng: &mut StdRng, amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        rng.gen_range(-amplitude..amplitude)
    } else {
        0.0
    }
}

struct ScanBuilder<'a> {
    config: &'a GeneratorConfig,
    rng: StdRng,
    lo_hz: f64,
    partner: Option<SplitPartner>,
}

impl<'a> ScanBuilder<'a> {
    fn new(config: &'a GeneratorConfig) -> Self {
        let position = config.sideband_position;
        Self {
            config,
            rng: StdRng::seed_from_u64(config.seed),
            lo_hz: tuned_lo_hz(config.frontend, position),
            partner: config.partner.map(|frontend| SplitPartner {
                frontend,
                lo_hz: tuned_lo_hz(frontend, position),
                sideband_position: position,
            }),
        }
    }

    /// Signal level seen through an exponential atmosphere at `altitude_m`.
    fn signal_level(&self, altitude_m: f64) -> f64 {
        let depth =
            (-(altitude_m - self.config.bottom_altitude_m) / ATMOSPHERE_SCALE_HEIGHT_M).exp();
        REF_LEVEL * (1.0 + SPILLOVER_FRACTION + 0.05 * depth)
    }

    /// Lags for autocorrelators, channel powers for the other backends. The
    /// line sits at the start of each correlator band and in the middle of
    /// a spectrometer's range.
    fn counts(&mut self, level: f64, line: f64) -> Vec<f64> {
        let total = self.config.total_channels();
        let noise = self.config.noise;
        if self.config.backend.is_autocorrelator() {
            let lags = total / self.config.backend.bands();
            (0..total)
                .map(|i| match i % lags {
                    0 => level * (1.0 + jitter(&mut self.rng, noise)),
                    1 => 0.5 * line + level * jitter(&mut self.rng, noise),
                    _ => level * jitter(&mut self.rng, noise),
                })
                .collect()
        } else {
            let centre = total as f64 / 2.0;
            let width = (total as f64 / 16.0).max(1.0);
            (0..total)
                .map(|c| {
                    let x = (c as f64 - centre) / width;
                    level * (1.0 + jitter(&mut self.rng, noise)) + line * (-x * x).exp()
                })
                .collect()
        }
    }

    fn sample(&mut self, stw: Stw, scan: Stw, kind: SampleKind, altitude_m: f64) -> RawSample {
        let (level, line) = match kind {
            SampleKind::Sig => {
                let level = self.signal_level(altitude_m);
                (level, self.config.line_strength * (level - REF_LEVEL))
            }
            SampleKind::Ref { .. } => (REF_LEVEL, 0.0),
            SampleKind::Cal => (CAL_LEVEL, 0.0),
        };
        let seconds = stw.seconds_since(self.config.first_scan);
        let latitude = 80.0 * (seconds / 5_900.0 * std::f64::consts::TAU).sin();
        RawSample {
            stw,
            scan_stw: scan,
            backend: self.config.backend,
            frontend: self.config.frontend,
            partner: self.partner,
            intmode: if self.partner.is_some() { INTMODE_SPLIT } else { 0 },
            kind,
            counts: self.counts(level, line),
            integration_s: INTEGRATION_S,
            attenuation: 0,
            housekeeping: Housekeeping {
                lo_hz: self.lo_hz,
                sideband_position: self.config.sideband_position,
                mixer_current: 0.5,
                hot_load_k: HOT_LOAD_K,
                box_temp_c: BOX_TEMP_C,
            },
            attitude: Some(Attitude {
                latitude_deg: latitude,
                longitude_deg: (seconds * 0.06).rem_euclid(360.0),
                tangent_altitude_m: altitude_m,
                geocentric_velocity_ms: 350.0 * latitude.to_radians().cos(),
            }),
            quality: 0,
        }
    }

    fn scan(&mut self, scan: Stw) -> Vec<RawSample> {
        let config = self.config;
        let step = STW_TICKS_PER_SECOND as i64;
        let sweep = (config.top_altitude_m - config.bottom_altitude_m)
            / (config.signals_per_scan.max(2) - 1) as f64;
        let reference = SampleKind::Ref { beam: SkyBeam::Sk1 };

        let mut samples = Vec::with_capacity(config.samples_per_scan());
        let mut tick = 0;
        let next = |tick: &mut i64| {
            let stw = scan.offset(*tick);
            *tick += step;
            stw
        };
        for signal in 0..config.signals_per_scan {
            if signal % config.run_length.max(1) == 0 {
                let stw = next(&mut tick);
                samples.push(self.sample(stw, scan, reference, config.top_altitude_m));
            }
            let altitude = config.top_altitude_m - sweep * signal as f64;
            let stw = next(&mut tick);
            samples.push(self.sample(stw, scan, SampleKind::Sig, altitude));
        }
        let stw = next(&mut tick);
        samples.push(self.sample(stw, scan, reference, config.top_altitude_m));
        let stw = next(&mut tick);
        samples.push(self.sample(stw, scan, SampleKind::Cal, config.top_altitude_m));
        samples
    }
}

/// Builds `config.scans` consecutive scans, each starting where the
/// previous one ended.
pub fn build_telemetry(config: &GeneratorConfig) -> anyhow::Result<SyntheticTelemetry> {
    config.validate()?;
    let scan_ticks = i64::try_from(config.samples_per_scan())
        .context("scan length overflows the clock")?
        * STW_TICKS_PER_SECOND as i64;

    let mut builder = ScanBuilder::new(config);
    let mut samples = Vec::with_capacity(config.scans * config.samples_per_scan());
    let mut scan_starts = Vec::with_capacity(config.scans);
    for index in 0..config.scans {
        let scan = config.first_scan.offset(index as i64 * scan_ticks);
        samples.extend(builder.scan(scan));
        scan_starts.push(scan);
    }
    Ok(SyntheticTelemetry {
        samples,
        scan_starts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_builds_expected_sample_count() {
        let config = GeneratorConfig::default();
        let telemetry = build_telemetry(&config).unwrap();
        // 12 signals, 3 runs: 4 references and one CAL per scan.
        assert_eq!(telemetry.samples.len(), 3 * 17);
        assert_eq!(telemetry.scan_starts.len(), 3);
        assert_eq!(telemetry.scan_starts[1].ticks_since(telemetry.scan_starts[0]), 17 * 16);
        for sample in &telemetry.samples {
            sample.validate().unwrap();
            assert_eq!(sample.counts.len(), 112);
        }
    }

    #[test]
    fn generator_is_deterministic_per_seed() {
        let config = GeneratorConfig {
            seed: 13,
            ..Default::default()
        };
        let a = build_telemetry(&config).unwrap();
        let b = build_telemetry(&config).unwrap();
        assert_eq!(a.samples, b.samples);
        let other = build_telemetry(&GeneratorConfig {
            seed: 14,
            ..config
        })
        .unwrap();
        assert_ne!(a.samples, other.samples);
    }

    #[test]
    fn split_mode_doubles_the_buffer() {
        let config = GeneratorConfig {
            partner: Some(Frontend::Rec495),
            noise: 0.0,
            ..Default::default()
        };
        let telemetry = build_telemetry(&config).unwrap();
        let sample = &telemetry.samples[0];
        assert_eq!(sample.counts.len(), 224);
        assert!(sample.is_split_mode());
        assert_eq!(sample.partner.map(|p| p.frontend), Some(Frontend::Rec495));
    }

    #[test]
    fn altitude_sweeps_down_within_each_scan() {
        let telemetry = build_telemetry(&GeneratorConfig::default()).unwrap();
        let scan = telemetry.scan_starts[0];
        let altitudes: Vec<f64> = telemetry
            .samples
            .iter()
            .filter(|s| s.kind.is_sig() && s.scan_stw == scan)
            .filter_map(|s| s.attitude.map(|a| a.tangent_altitude_m))
            .collect();
        assert_eq!(altitudes.len(), 12);
        assert_eq!(altitudes[0], 100_000.0);
        assert!((altitudes[11] - 15_000.0).abs() < 1e-6);
        assert!(altitudes.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn spectrometer_with_partner_is_rejected() {
        let config = GeneratorConfig {
            backend: Backend::Aos,
            channels: 64,
            partner: Some(Frontend::Rec495),
            ..Default::default()
        };
        assert!(build_telemetry(&config).is_err());
    }

    #[test]
    fn uneven_channel_count_is_rejected() {
        let config = GeneratorConfig {
            channels: 100,
            ..Default::default()
        };
        assert!(build_telemetry(&config).is_err());
    }
}
