use serde::{Deserialize, Serialize};

use crate::records::sample::{FrontendGroup, Stw};

/// Time window of telemetry eligible for calibrating one scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanWindow {
    pub calstw: Stw,
    pub half_width_ticks: i64,
    pub group: FrontendGroup,
    pub attenuation: u16,
}

impl ScanWindow {
    pub fn new(calstw: Stw, half_width_s: f64, group: FrontendGroup, attenuation: u16) -> Self {
        Self {
            calstw,
            half_width_ticks: Stw::ticks_for_seconds(half_width_s).abs(),
            group,
            attenuation,
        }
    }

    pub fn start(&self) -> Stw {
        self.calstw.offset(-self.half_width_ticks)
    }

    pub fn end(&self) -> Stw {
        self.calstw.offset(self.half_width_ticks)
    }

    pub fn contains(&self, stw: Stw) -> bool {
        stw.ticks_since(self.calstw).abs() <= self.half_width_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::sample::Frontend;

    #[test]
    fn window_contains_across_wrap() {
        let group = FrontendGroup {
            primary: Frontend::Rec549,
            partner: None,
        };
        let window = ScanWindow::new(Stw(8), 2.0, group, 0);
        assert_eq!(window.start(), Stw(u32::MAX - 23));
        assert!(window.contains(Stw(u32::MAX)));
        assert!(window.contains(Stw(40)));
        assert!(!window.contains(Stw(41)));
    }
}
