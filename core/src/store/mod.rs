//! Idempotent persistence of calibrated spectra.
//!
//! Every record is addressed by its natural key; writing a record removes
//! whatever was stored under the same key first, so replaying a scan leaves
//! the store unchanged.

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonLinesStore;
pub use memory::MemoryStore;

use crate::records::CalibratedSpectrum;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("corrupt record on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Keyed delete-then-insert sink for calibrated records.
pub trait SpectrumStore {
    /// Replaces the records stored under the keys of `records` and returns
    /// the number written. Either all records are written or none.
    fn replace(&mut self, records: &[CalibratedSpectrum]) -> Result<usize, StoreError>;

    /// All stored records, ordered by natural key.
    fn records(&self) -> Result<Vec<CalibratedSpectrum>, StoreError>;
}
