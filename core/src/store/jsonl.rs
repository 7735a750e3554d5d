use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::records::{CalibratedSpectrum, SpectrumKey};
use crate::store::{SpectrumStore, StoreError};
use crate::telemetry::log::LogManager;

/// Records kept as one JSON document per line, ordered by natural key.
///
/// Each write rewrites the whole file into a temporary sibling and renames
/// it over the original, so a reader sees either the old or the new file.
pub struct JsonLinesStore {
    path: PathBuf,
    logger: LogManager,
}

impl JsonLinesStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            logger: LogManager::new("store"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<SpectrumKey, CalibratedSpectrum>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        let mut records = BTreeMap::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: CalibratedSpectrum =
                serde_json::from_str(&line).map_err(|source| StoreError::Decode {
                    line: index + 1,
                    source,
                })?;
            records.insert(record.key(), record);
        }
        Ok(records)
    }

    fn write(&self, records: &BTreeMap<SpectrumKey, CalibratedSpectrum>) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            for record in records.values() {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

impl SpectrumStore for JsonLinesStore {
    fn replace(&mut self, records: &[CalibratedSpectrum]) -> Result<usize, StoreError> {
        let mut stored = self.load()?;
        let mut replaced = 0;
        for record in records {
            if stored.insert(record.key(), record.clone()).is_some() {
                replaced += 1;
            }
        }
        self.write(&stored)?;
        self.logger.detail(&format!(
            "{}: wrote {} records ({} replaced), {} total",
            self.path.display(),
            records.len(),
            replaced,
            stored.len()
        ));
        Ok(records.len())
    }

    fn records(&self) -> Result<Vec<CalibratedSpectrum>, StoreError> {
        Ok(self.load()?.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::records::SpectrumKind;
    use tempfile::tempdir;

    #[test]
    fn replay_leaves_the_file_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spectra.jsonl");
        let mut store = JsonLinesStore::new(&path);
        let records = [
            fixtures::record(SpectrumKind::Ssb, vec![-26.0, 0.0]),
            fixtures::record(SpectrumKind::Spe, vec![1.5, 2.5]),
        ];
        store.replace(&records).unwrap();
        let first = fs::read(&path).unwrap();
        store.replace(&records).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);

        let stored = store.records().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].kind, SpectrumKind::Spe);
    }

    #[test]
    fn missing_file_is_an_empty_store() {
        let dir = tempdir().unwrap();
        let store = JsonLinesStore::new(dir.path().join("absent.jsonl"));
        assert!(store.records().unwrap().is_empty());
    }

    #[test]
    fn corrupt_line_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spectra.jsonl");
        fs::write(&path, "{not json}\n").unwrap();
        let err = JsonLinesStore::new(&path).records().unwrap_err();
        assert!(matches!(err, StoreError::Decode { line: 1, .. }));
    }
}
