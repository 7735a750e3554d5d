use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::records::{Backend, RawSample, Stw};
use crate::source::{admit, in_range, SourceError, TelemetrySource};

/// Decoded telemetry stored as one JSON sample per line.
pub struct JsonLinesSource {
    path: PathBuf,
}

impl JsonLinesSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Writes `samples` in the format this source reads.
    pub fn write<P: AsRef<Path>>(path: P, samples: &[RawSample]) -> Result<(), SourceError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        for sample in samples {
            serde_json::to_writer(&mut writer, sample)
                .map_err(|err| SourceError::Invalid(err.to_string()))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<RawSample>, SourceError> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut samples = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let sample: RawSample =
                serde_json::from_str(&line).map_err(|source| SourceError::Decode {
                    line: index + 1,
                    source,
                })?;
            admit(&sample)?;
            samples.push(sample);
        }
        Ok(samples)
    }
}

impl TelemetrySource for JsonLinesSource {
    fn load(&self, backend: Backend, start: Stw, end: Stw) -> Result<Vec<RawSample>, SourceError> {
        let samples = self.read_all()?;
        Ok(in_range(&samples, backend, start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, CALSTW};
    use tempfile::tempdir;

    #[test]
    fn written_scan_loads_back_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("telemetry.jsonl");
        let mut scan = fixtures::scan(true);
        scan.reverse();
        JsonLinesSource::write(&path, &scan).unwrap();

        let loaded = JsonLinesSource::new(&path)
            .load(Backend::Ac2, CALSTW.offset(-10), CALSTW.offset(200))
            .unwrap();
        assert_eq!(loaded.len(), scan.len());
        assert_eq!(loaded[0].stw, CALSTW);
        assert_eq!(loaded[0].partner, scan[scan.len() - 1].partner);
    }

    #[test]
    fn undecodable_line_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("telemetry.jsonl");
        fs::write(&path, "\n[1, 2]\n").unwrap();
        let result = JsonLinesSource::new(&path).load(Backend::Ac2, Stw(0), Stw(10));
        assert!(matches!(result, Err(SourceError::Decode { line: 2, .. })));
    }
}
