use std::collections::BTreeMap;

use crate::records::{CalibratedSpectrum, SpectrumKey};
use crate::store::{SpectrumStore, StoreError};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: BTreeMap<SpectrumKey, CalibratedSpectrum>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &SpectrumKey) -> Option<&CalibratedSpectrum> {
        self.records.get(key)
    }

    /// Records written over the store's lifetime, replacements included.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl SpectrumStore for MemoryStore {
    fn replace(&mut self, records: &[CalibratedSpectrum]) -> Result<usize, StoreError> {
        for record in records {
            self.records.insert(record.key(), record.clone());
        }
        self.writes += records.len();
        Ok(records.len())
    }

    fn records(&self) -> Result<Vec<CalibratedSpectrum>, StoreError> {
        Ok(self.records.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::records::SpectrumKind;

    #[test]
    fn same_key_is_replaced_not_duplicated() {
        let mut store = MemoryStore::new();
        let first = fixtures::record(SpectrumKind::Spe, vec![1.0]);
        let second = fixtures::record(SpectrumKind::Spe, vec![2.0]);
        store.replace(&[first]).unwrap();
        store.replace(&[second.clone()]).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.writes(), 2);
        assert_eq!(store.get(&second.key()), Some(&second));
    }

    #[test]
    fn kinds_do_not_collide() {
        let mut store = MemoryStore::new();
        let records = [
            fixtures::record(SpectrumKind::Spe, vec![1.0]),
            fixtures::record(SpectrumKind::Cal, vec![1.0]),
            fixtures::record(SpectrumKind::Ssb, vec![1.0]),
        ];
        assert_eq!(store.replace(&records).unwrap(), 3);
        assert_eq!(store.len(), 3);
    }
}
