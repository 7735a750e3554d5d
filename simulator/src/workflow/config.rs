use anyhow::Context;
use serde::{Deserialize, Serialize};
use smrcore::records::{Backend, Frontend, Stw};
use smrcore::{CalibrationRequest, CalibrationSettings};
use std::fs;
use std::path::{Path, PathBuf};

use crate::generator::profile::GeneratorConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Identifier of the telemetry file the scans belong to.
    pub file_id: String,
    pub calibration_set: u16,
    pub calibration: CalibrationSettings,
    pub generator: GeneratorConfig,
    /// JSON-lines file receiving calibrated spectra.
    pub store_path: PathBuf,
    /// Decoded telemetry to calibrate; generated when absent.
    pub telemetry_path: Option<PathBuf>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            file_id: "synthetic".into(),
            calibration_set: 1,
            calibration: CalibrationSettings::default(),
            generator: GeneratorConfig::default(),
            store_path: PathBuf::from("tools/data/spectra.jsonl"),
            telemetry_path: None,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        scans: usize,
        seed: u64,
        partner: Option<Frontend>,
        store_path: PathBuf,
    ) -> Self {
        Self {
            generator: GeneratorConfig {
                scans,
                seed,
                partner,
                ..Default::default()
            },
            store_path,
            ..Default::default()
        }
    }

    pub fn backend(&self) -> Backend {
        self.generator.backend
    }

    pub fn to_request(&self, scan_starts: Vec<Stw>) -> CalibrationRequest {
        CalibrationRequest {
            file_id: self.file_id.clone(),
            backend: self.backend(),
            scan_starts,
            calibration_set: self.calibration_set,
        }
    }
}
