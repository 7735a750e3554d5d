//! Scan-level orchestration of the calibration stages and the invocation
//! entry point used by the workflow driver.

use serde::{Deserialize, Serialize};

use crate::prelude::{CalibrationError, CalibrationResult, CalibrationSettings, ProcessingStage};
use crate::processing::correlator::CorrelatorStage;
use crate::processing::frequency::{FrequencyCalibrator, StampedSample};
use crate::processing::intensity::{band_frontend, BlockContext, IntensityCalibrator, SignalInput};
use crate::processing::reference::{ReferenceInterpolator, ReferencePoint};
use crate::processing::selection::{split_mode_blocks, target_windows, ModeBlock, WindowSelector};
use crate::processing::split::split;
use crate::processing::ssb::ssb_record;
use crate::processing::tsys::{band_count, gain_spectrum, TsysEstimator};
use crate::records::{Backend, CalibratedSpectrum, RawSample, SpectrumKind, Stw};
use crate::source::TelemetrySource;
use crate::store::SpectrumStore;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::{MetricsRecorder, MetricsSnapshot};


/// Why a mode block produced no records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The block lacks one of the three sample kinds.
    MissingSamples {
        signals: usize,
        references: usize,
        calibrations: usize,
    },
    /// Every CAL band fell outside the acceptable system temperature.
    NoUsableTsys,
    /// A channel-count or similar contract violation inside the block.
    Contract { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSkip {
    pub first_stw: Option<Stw>,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Everything calibrated for one scan, not yet persisted.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub spectra: Vec<CalibratedSpectrum>,
    pub skipped: Vec<BlockSkip>,
}

impl ScanReport {
    pub fn count(&self, kind: SpectrumKind) -> usize {
        self.spectra.iter().filter(|s| s.kind == kind).count()
    }
}

/// Runs the calibration chain over the samples of one scan window.
pub struct ScanCalibrator {
    settings: CalibrationSettings,
    selector: WindowSelector,
    correlator: CorrelatorStage,
    frequency: FrequencyCalibrator,
    interpolator: ReferenceInterpolator,
    estimator: TsysEstimator,
    intensity: IntensityCalibrator,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl ScanCalibrator {
    pub fn new(settings: CalibrationSettings) -> Self {
        Self {
            selector: WindowSelector::new(&settings),
            correlator: CorrelatorStage::new(),
            frequency: FrequencyCalibrator::new(),
            interpolator: ReferenceInterpolator::new(&settings),
            estimator: TsysEstimator::new(),
            intensity: IntensityCalibrator::new(&settings),
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("engine"),
            settings,
        }
    }

    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    /// Switches every stage to `settings`; counters keep running.
    pub fn reconfigure(&mut self, settings: CalibrationSettings) {
        self.selector.initialize(&settings);
        self.correlator.initialize(&settings);
        self.frequency.initialize(&settings);
        self.interpolator = ReferenceInterpolator::new(&settings);
        self.intensity = IntensityCalibrator::new(&settings);
        self.settings = settings;
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Clock range of telemetry that may support the scan at `calstw`.
    pub fn window_bounds(&self, calstw: Stw) -> (Stw, Stw) {
        let ticks = Stw::ticks_for_seconds(self.settings.window_half_width_s).abs();
        (calstw.offset(-ticks), calstw.offset(ticks))
    }

    /// Calibrates every mode block of the scan at `calstw`. Blocks that
    /// cannot be calibrated are reported in the returned skips; nothing here
    /// fails the scan.
    pub fn calibrate_scan(
        &mut self,
        samples: &[RawSample],
        calstw: Stw,
        calibration_set: u16,
    ) -> ScanReport {
        let mut report = ScanReport::default();
        for window in target_windows(samples, calstw, self.settings.window_half_width_s) {
            let selected = self.selector.execute((samples, &window));
            let spectral = self.correlator.execute(selected);
            let stamped = self.frequency.execute(spectral);
            for block in split_mode_blocks(stamped, self.settings.mode_block_threshold_hz) {
                match self.calibrate_block(&block, calstw, calibration_set) {
                    Ok(records) => {
                        self.metrics.record_block(records.len());
                        report.spectra.extend(records);
                    }
                    Err(reason) => {
                        self.metrics.record_skip();
                        self.logger.skip(&format!(
                            "block of {} samples in scan {}: {:?}",
                            block.len(),
                            calstw,
                            reason
                        ));
                        report.skipped.push(BlockSkip {
                            first_stw: block.first_stw(),
                            reason,
                        });
                    }
                }
            }
        }
        report
    }

    fn calibrate_block(
        &self,
        block: &ModeBlock,
        calstw: Stw,
        calibration_set: u16,
    ) -> Result<Vec<CalibratedSpectrum>, SkipReason> {
        let missing = || SkipReason::MissingSamples {
            signals: block.signals().count(),
            references: block.references().count(),
            calibrations: block.calibrations().count(),
        };
        if !block.is_calibratable() {
            return Err(missing());
        }

        let refs: Vec<ReferencePoint> = block
            .references()
            .map(|r| ReferencePoint::from_sample(r, calstw))
            .collect();
        let reference_at = |sample: &StampedSample| -> Result<Vec<f64>, SkipReason> {
            let reference = self
                .interpolator
                .interpolate(&refs, sample.seconds_since(calstw))
                .ok_or_else(missing)?;
            if reference.len() != sample.spectrum.len() {
                return Err(contract(CalibrationError::ChannelMismatch {
                    stw: sample.sample.stw,
                    expected: sample.spectrum.len(),
                    found: reference.len(),
                }));
            }
            Ok(reference)
        };

        let mut gains = Vec::new();
        for cal in block.calibrations() {
            let reference = reference_at(cal)?;
            gains.push(gain_spectrum(
                &cal.spectrum,
                &reference,
                &cal.channel_frequencies(),
                cal.sample.housekeeping.hot_load_k,
            ));
        }

        // The CAL closest to the scan describes the block's gain record.
        let cal = block
            .calibrations()
            .min_by_key(|c| c.sample.stw.ticks_since(calstw).abs())
            .ok_or_else(missing)?;
        let channels = cal.spectrum.len();
        let bands = band_count(channels, cal.sample.backend.bands());
        let partner = cal.partner_freq.map(|p| p.frontend);
        let ranges: Vec<(f64, f64)> = (0..bands)
            .map(|b| band_frontend(b, bands, cal.sample.frontend, partner).tsys_range())
            .collect();
        let tsys = self.estimator.estimate(&gains, &ranges);
        if tsys.is_unusable() {
            return Err(SkipReason::NoUsableTsys);
        }

        let signals = block
            .signals()
            .map(|sample| -> Result<SignalInput, SkipReason> {
                Ok(SignalInput {
                    sample,
                    reference: reference_at(sample)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let ctx = BlockContext {
            calstw,
            calibration_set,
            cal,
        };
        let products = self
            .intensity
            .calibrate(&signals, &tsys, &ctx)
            .map_err(contract)?;

        let mut records = Vec::new();
        for pending in products.spectra {
            records.extend(split(pending, &tsys.channels).map_err(contract)?);
        }
        let gain_records = split(products.gain, &tsys.channels).map_err(contract)?;
        let ssb_records: Vec<CalibratedSpectrum> = gain_records.iter().map(ssb_record).collect();
        records.extend(gain_records);
        records.extend(ssb_records);
        Ok(records)
    }
}

fn contract(err: CalibrationError) -> SkipReason {
    SkipReason::Contract {
        message: err.to_string(),
    }
}

/// One orchestrator request: calibrate the listed scans of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRequest {
    pub file_id: String,
    pub backend: Backend,
    pub scan_starts: Vec<Stw>,
    pub calibration_set: u16,
}

/// Reported result of one scan. Only `Calibrated` scans were persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    Calibrated { records: usize, skipped_blocks: usize },
    NoData,
    NoAttitude,
    NoCalibrationData,
    InsufficientData { skipped_blocks: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub scan: Stw,
    #[serde(flatten)]
    pub outcome: ScanOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationSummary {
    pub file_id: String,
    /// Scans whose records were persisted, in request order.
    pub processed: Vec<Stw>,
    pub outcomes: Vec<ScanResult>,
    pub metrics: MetricsSnapshot,
}

impl InvocationSummary {
    pub fn outcome(&self, scan: Stw) -> Option<&ScanOutcome> {
        self.outcomes
            .iter()
            .find(|r| r.scan == scan)
            .map(|r| &r.outcome)
    }
}

/// Calibrates every scan of `request`, persisting each scan's records only
/// once the whole scan has been calibrated. Data absence is reported per
/// scan; telemetry and persistence failures abort the invocation.
pub fn calibrate_file<S, P>(
    request: &CalibrationRequest,
    source: &S,
    store: &mut P,
    calibrator: &mut ScanCalibrator,
) -> CalibrationResult<InvocationSummary>
where
    S: TelemetrySource + ?Sized,
    P: SpectrumStore + ?Sized,
{
    let mut processed = Vec::new();
    let mut outcomes = Vec::with_capacity(request.scan_starts.len());
    for &scan in &request.scan_starts {
        let (start, end) = calibrator.window_bounds(scan);
        let samples = source.load(request.backend, start, end)?;
        let outcome = match precheck(&samples, scan) {
            Some(outcome) => outcome,
            None => {
                let report = calibrator.calibrate_scan(&samples, scan, request.calibration_set);
                if report.spectra.is_empty() {
                    classify_empty(&report)
                } else {
                    let written = store.replace(&report.spectra)?;
                    calibrator.metrics.record_persisted(written);
                    processed.push(scan);
                    ScanOutcome::Calibrated {
                        records: written,
                        skipped_blocks: report.skipped.len(),
                    }
                }
            }
        };
        calibrator.logger.record(&format!(
            "{} scan {}: {:?}",
            request.file_id, scan, outcome
        ));
        outcomes.push(ScanResult { scan, outcome });
    }
    Ok(InvocationSummary {
        file_id: request.file_id.clone(),
        processed,
        outcomes,
        metrics: calibrator.metrics(),
    })
}

/// Outcomes decided before any calibration work.
fn precheck(samples: &[RawSample], scan: Stw) -> Option<ScanOutcome> {
    if samples.is_empty() {
        return Some(ScanOutcome::NoData);
    }
    let targets: Vec<&RawSample> = samples
        .iter()
        .filter(|s| s.kind.is_sig() && s.scan_stw == scan)
        .collect();
    if targets.is_empty() {
        return Some(ScanOutcome::InsufficientData { skipped_blocks: 0 });
    }
    if targets.iter().all(|s| s.attitude.is_none()) {
        return Some(ScanOutcome::NoAttitude);
    }
    if !samples.iter().any(|s| s.kind.is_cal()) {
        return Some(ScanOutcome::NoCalibrationData);
    }
    None
}

fn classify_empty(report: &ScanReport) -> ScanOutcome {
    let no_tsys = !report.skipped.is_empty()
        && report
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::NoUsableTsys);
    if no_tsys {
        ScanOutcome::NoCalibrationData
    } else {
        ScanOutcome::InsufficientData {
            skipped_blocks: report.skipped.len(),
        }
    }
}
