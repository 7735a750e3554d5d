use serde::Serialize;
use smrcore::InvocationSummary;

/// State served on `GET /status`.
#[derive(Debug, Clone, Serialize, Default)]
pub struct BridgeModel {
    pub status: String,
    pub invocations: usize,
    pub last_summary: Option<InvocationSummary>,
}

impl BridgeModel {
    pub fn record(&mut self, summary: InvocationSummary) {
        self.invocations += 1;
        self.status = format!(
            "{}: {} of {} scans calibrated",
            summary.file_id,
            summary.processed.len(),
            summary.outcomes.len()
        );
        self.last_summary = Some(summary);
    }
}
