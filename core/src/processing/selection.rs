use std::collections::{BTreeSet, HashMap};

use crate::prelude::{CalibrationSettings, DuplicateCalPolicy, ProcessingStage};
use crate::processing::frequency::StampedSample;
use crate::records::{RawSample, SampleKind, ScanWindow, Stw};
use crate::telemetry::log::LogManager;

/// Contiguous, frequency-stable run of samples.
#[derive(Debug, Clone, Default)]
pub struct ModeBlock {
    pub samples: Vec<StampedSample>,
}

impl ModeBlock {
    pub fn signals(&self) -> impl Iterator<Item = &StampedSample> {
        self.samples.iter().filter(|s| s.sample.kind.is_sig())
    }

    pub fn references(&self) -> impl Iterator<Item = &StampedSample> {
        self.samples.iter().filter(|s| s.sample.kind.is_ref())
    }

    pub fn calibrations(&self) -> impl Iterator<Item = &StampedSample> {
        self.samples.iter().filter(|s| s.sample.kind.is_cal())
    }

    /// A block needs at least one SIG, REF and CAL sample.
    pub fn is_calibratable(&self) -> bool {
        self.signals().next().is_some()
            && self.references().next().is_some()
            && self.calibrations().next().is_some()
    }

    pub fn first_stw(&self) -> Option<Stw> {
        self.samples.first().map(|s| s.sample.stw)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One window per group and attenuation among the target scan's signals.
pub fn target_windows(samples: &[RawSample], calstw: Stw, half_width_s: f64) -> Vec<ScanWindow> {
    let keys: BTreeSet<_> = samples
        .iter()
        .filter(|s| s.kind.is_sig() && s.scan_stw == calstw)
        .map(|s| (s.group(), s.attenuation))
        .collect();
    keys.into_iter()
        .map(|(group, attenuation)| ScanWindow::new(calstw, half_width_s, group, attenuation))
        .filter(|window| samples.iter().any(|s| window.contains(s.stw)))
        .collect()
}

/// Splits ordered samples wherever consecutive sky frequencies jump by more
/// than `threshold_hz`.
pub fn split_mode_blocks(samples: Vec<StampedSample>, threshold_hz: f64) -> Vec<ModeBlock> {
    let mut blocks: Vec<ModeBlock> = Vec::new();
    let mut previous: Option<f64> = None;
    for sample in samples {
        let sky = sample.freq.sky_hz;
        let jump = previous.map_or(true, |p| (sky - p).abs() > threshold_hz);
        previous = Some(sky);
        match blocks.last_mut() {
            Some(block) if !jump => block.samples.push(sample),
            _ => blocks.push(ModeBlock {
                samples: vec![sample],
            }),
        }
    }
    blocks
}

/// Picks and cleans the samples of one window.
pub struct WindowSelector {
    duplicate_cal: DuplicateCalPolicy,
    recalibrate_rejected_refs: bool,
    logger: LogManager,
}

impl WindowSelector {
    pub fn new(settings: &CalibrationSettings) -> Self {
        Self {
            duplicate_cal: settings.duplicate_cal,
            recalibrate_rejected_refs: settings.recalibrate_rejected_refs,
            logger: LogManager::new("selection"),
        }
    }

    /// Applies the selection rules in order and returns the survivors
    /// sorted by clock value:
    ///
    /// 1. same group and attenuation as the window; signals only from the
    ///    target scan,
    /// 2. references whose sky beam was contaminated are dropped,
    /// 3. the first reference after any CAL is dropped while the load settles,
    /// 4. of several CAL samples in one scan only one survives.
    pub fn select(&self, samples: &[RawSample], window: &ScanWindow) -> Vec<RawSample> {
        let mut eligible: Vec<RawSample> = samples
            .iter()
            .filter(|s| {
                window.contains(s.stw)
                    && s.group() == window.group
                    && s.attenuation == window.attenuation
                    && (!s.kind.is_sig() || s.scan_stw == window.calstw)
            })
            .cloned()
            .collect();
        eligible.sort_by_key(|s| s.stw.ticks_since(window.calstw));

        let total = eligible.len();
        let mut settling = false;
        let mut settled = 0;
        let mut contaminated = 0;
        let mut kept = Vec::with_capacity(total);
        for mut sample in eligible {
            match sample.kind {
                SampleKind::Cal => {
                    settling = true;
                    kept.push(sample);
                }
                SampleKind::Ref { beam } => {
                    if sample.quality & beam.contamination_mask() != 0 {
                        contaminated += 1;
                        if self.recalibrate_rejected_refs && sample.scan_stw == window.calstw {
                            sample.kind = SampleKind::Sig;
                            kept.push(sample);
                        }
                        continue;
                    }
                    // Only a clean reference ends the settling period.
                    if settling {
                        settling = false;
                        settled += 1;
                        continue;
                    }
                    kept.push(sample);
                }
                SampleKind::Sig => kept.push(sample),
            }
        }

        let selected = self.drop_duplicate_cals(kept);
        self.logger.detail(&format!(
            "window {} {}: kept {} of {} ({} contaminated, {} settling)",
            window.calstw,
            window.group,
            selected.len(),
            total,
            contaminated,
            settled
        ));
        selected
    }

    fn drop_duplicate_cals(&self, samples: Vec<RawSample>) -> Vec<RawSample> {
        let mut per_scan: HashMap<Stw, usize> = HashMap::new();
        for sample in samples.iter().filter(|s| s.kind.is_cal()) {
            *per_scan.entry(sample.scan_stw).or_default() += 1;
        }
        let keep = match self.duplicate_cal {
            DuplicateCalPolicy::KeepSecond => 1,
            DuplicateCalPolicy::KeepFirst => 0,
        };
        let mut seen: HashMap<Stw, usize> = HashMap::new();
        samples
            .into_iter()
            .filter(|sample| {
                if !sample.kind.is_cal() {
                    return true;
                }
                let index = seen.entry(sample.scan_stw).or_default();
                let this = *index;
                *index += 1;
                per_scan[&sample.scan_stw] == 1 || this == keep
            })
            .collect()
    }
}

impl<'a> ProcessingStage<(&'a [RawSample], &'a ScanWindow)> for WindowSelector {
    type Output = Vec<RawSample>;

    fn initialize(&mut self, settings: &CalibrationSettings) {
        self.duplicate_cal = settings.duplicate_cal;
        self.recalibrate_rejected_refs = settings.recalibrate_rejected_refs;
    }

    fn execute(
        &mut self,
        (samples, window): (&'a [RawSample], &'a ScanWindow),
    ) -> Vec<RawSample> {
        self.select(samples, window)
    }
}
