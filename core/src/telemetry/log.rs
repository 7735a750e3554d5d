use log::{debug, info, warn};

/// Stage-scoped log sink; every line is prefixed with the stage name.
pub struct LogManager {
    stage: &'static str,
}

impl LogManager {
    pub fn new(stage: &'static str) -> Self {
        Self { stage }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.stage, message);
    }

    pub fn detail(&self, message: &str) {
        debug!("[{}] {}", self.stage, message);
    }

    /// Non-fatal data absence; processing continues.
    pub fn skip(&self, message: &str) {
        warn!("[{}] skipped: {}", self.stage, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("smrcore")
    }
}
