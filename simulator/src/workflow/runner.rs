use crate::generator::profile::build_telemetry;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use smrcore::records::CalibratedSpectrum;
use smrcore::source::{JsonLinesSource, MemorySource, TelemetrySource};
use smrcore::store::{JsonLinesStore, SpectrumStore};
use smrcore::{calibrate_file, CalibrationRequest, InvocationSummary, ScanCalibrator};
use std::sync::{Arc, Mutex};

/// Runs calibration requests against the configured telemetry and store.
#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    /// Serialises writers of the store file.
    store_lock: Arc<Mutex<()>>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            store_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Telemetry from the configured file, or generated from the generator
    /// settings when no file exists yet.
    fn telemetry(&self) -> anyhow::Result<Box<dyn TelemetrySource>> {
        match &self.config.telemetry_path {
            Some(path) if path.exists() => Ok(Box::new(JsonLinesSource::new(path))),
            _ => {
                let telemetry = build_telemetry(&self.config.generator)
                    .context("generating synthetic telemetry")?;
                let source = MemorySource::new(telemetry.samples)
                    .context("admitting synthetic telemetry")?;
                Ok(Box::new(source))
            }
        }
    }

    pub fn execute(&self, request: &CalibrationRequest) -> anyhow::Result<InvocationSummary> {
        let source = self.telemetry()?;
        self.calibrate(request, source.as_ref())
    }

    /// Generates telemetry, keeps a copy when a telemetry path is configured
    /// and calibrates every generated scan.
    pub fn offline(&self) -> anyhow::Result<InvocationSummary> {
        let telemetry = build_telemetry(&self.config.generator)
            .context("generating synthetic telemetry")?;
        if let Some(path) = &self.config.telemetry_path {
            JsonLinesSource::write(path, &telemetry.samples)
                .with_context(|| format!("writing telemetry {}", path.display()))?;
        }
        let request = self.config.to_request(telemetry.scan_starts.clone());
        let source =
            MemorySource::new(telemetry.samples).context("admitting synthetic telemetry")?;
        self.calibrate(&request, &source)
    }

    fn calibrate(
        &self,
        request: &CalibrationRequest,
        source: &dyn TelemetrySource,
    ) -> anyhow::Result<InvocationSummary> {
        let _guard = self
            .store_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        let mut store = JsonLinesStore::new(&self.config.store_path);
        let mut calibrator = ScanCalibrator::new(self.config.calibration.clone());
        calibrate_file(request, source, &mut store, &mut calibrator)
            .with_context(|| format!("calibrating {}", request.file_id))
    }

    pub fn stored_spectra(&self) -> anyhow::Result<Vec<CalibratedSpectrum>> {
        JsonLinesStore::new(&self.config.store_path)
            .records()
            .with_context(|| format!("reading {}", self.config.store_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smrcore::records::{Frontend, SpectrumKind};
    use smrcore::ScanOutcome;
    use tempfile::tempdir;

    #[test]
    fn runner_calibrates_every_generated_scan() {
        let dir = tempdir().unwrap();
        let cfg = WorkflowConfig::from_args(2, 3, None, dir.path().join("spectra.jsonl"));
        let runner = Runner::new(cfg);
        let summary = runner.offline().unwrap();
        assert_eq!(summary.processed.len(), 2);
        for result in &summary.outcomes {
            assert!(matches!(result.outcome, ScanOutcome::Calibrated { .. }));
        }

        let spectra = runner.stored_spectra().unwrap();
        let signals = spectra.iter().filter(|s| s.kind == SpectrumKind::Spe).count();
        assert_eq!(signals, 2 * 12);
        assert!(spectra.iter().any(|s| s.kind == SpectrumKind::Ssb));
    }

    #[test]
    fn split_mode_records_carry_both_receivers() {
        let dir = tempdir().unwrap();
        let cfg = WorkflowConfig::from_args(
            1,
            0,
            Some(Frontend::Rec495),
            dir.path().join("spectra.jsonl"),
        );
        let runner = Runner::new(cfg);
        runner.offline().unwrap();
        let spectra = runner.stored_spectra().unwrap();
        let upper = spectra
            .iter()
            .filter(|s| s.kind == SpectrumKind::Spe && s.frontend == Frontend::Rec495)
            .count();
        assert_eq!(upper, 12);
    }

    #[test]
    fn requests_replay_against_saved_telemetry() {
        let dir = tempdir().unwrap();
        let mut cfg = WorkflowConfig::from_args(1, 0, None, dir.path().join("spectra.jsonl"));
        cfg.telemetry_path = Some(dir.path().join("telemetry.jsonl"));
        let runner = Runner::new(cfg);
        let first = runner.offline().unwrap();
        assert!(runner.config().telemetry_path.as_ref().unwrap().exists());
        let stored = runner.stored_spectra().unwrap().len();

        let request = runner.config().to_request(first.processed.clone());
        let replay = runner.execute(&request).unwrap();
        assert_eq!(replay.processed, first.processed);
        assert_eq!(runner.stored_spectra().unwrap().len(), stored);
    }
}
