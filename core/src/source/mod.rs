//! Telemetry collaborators: decoded samples joined with housekeeping and
//! attitude, validated as they enter the engine.

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonLinesSource;
pub use memory::MemorySource;

use crate::records::{Backend, RawSample, Stw};

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("telemetry I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("undecodable sample on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("rejected sample: {0}")]
    Invalid(String),
}

/// Ordered samples of one backend within a clock range.
pub trait TelemetrySource {
    /// Samples with `start <= stw <= end` (wrapped), ordered by clock. An
    /// empty result means no data, not a failure.
    fn load(&self, backend: Backend, start: Stw, end: Stw) -> Result<Vec<RawSample>, SourceError>;
}

/// Validates a decoded sample at the source boundary.
pub(crate) fn admit(sample: &RawSample) -> Result<(), SourceError> {
    sample
        .validate()
        .map_err(|err| SourceError::Invalid(err.to_string()))
}

/// Samples of `backend` inside `[start, end]`, sorted by clock.
pub(crate) fn in_range<'a, I>(samples: I, backend: Backend, start: Stw, end: Stw) -> Vec<RawSample>
where
    I: IntoIterator<Item = &'a RawSample>,
{
    let span = end.ticks_since(start);
    let mut selected: Vec<RawSample> = samples
        .into_iter()
        .filter(|s| {
            let offset = s.stw.ticks_since(start);
            s.backend == backend && offset >= 0 && offset <= span
        })
        .cloned()
        .collect();
    selected.sort_by_key(|s| s.stw.ticks_since(start));
    selected
}
