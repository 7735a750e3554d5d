use crate::records::{Backend, RawSample, Stw};
use crate::source::{admit, in_range, SourceError, TelemetrySource};

/// Samples held in memory, validated on insertion.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    samples: Vec<RawSample>,
}

impl MemorySource {
    pub fn new(samples: Vec<RawSample>) -> Result<Self, SourceError> {
        let mut source = Self::default();
        source.extend(samples)?;
        Ok(source)
    }

    pub fn extend(&mut self, samples: Vec<RawSample>) -> Result<(), SourceError> {
        for sample in &samples {
            admit(sample)?;
        }
        self.samples.extend(samples);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[RawSample] {
        &self.samples
    }
}

impl TelemetrySource for MemorySource {
    fn load(&self, backend: Backend, start: Stw, end: Stw) -> Result<Vec<RawSample>, SourceError> {
        Ok(in_range(&self.samples, backend, start, end))
    }
}
