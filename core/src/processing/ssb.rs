use std::f64::consts::PI;

use crate::math::planck::SPEED_OF_LIGHT;
use crate::processing::frequency::channel_grid;
use crate::records::spectrum::source_label;
use crate::records::{CalibratedSpectrum, Frontend, SpectrumKind};

/// Best image-band rejection reached by the sideband filter, in dB.
pub fn peak_rejection_db(frontend: Frontend) -> f64 {
    match frontend {
        Frontend::Rec495 => 27.0,
        Frontend::Rec549 => 26.0,
        Frontend::Rec555 => 25.0,
        Frontend::Rec572 => 24.0,
        Frontend::Rec119 => 20.0,
    }
}

/// Image-band leakage, in dB, of a channel `offset_hz` away from the
/// oscillator seen through a Martin-Puplett filter tuned to
/// `sideband_path_m`.
pub fn leakage_db(frontend: Frontend, offset_hz: f64, sideband_path_m: f64) -> f64 {
    let phase = PI * 2.0 * offset_hz * sideband_path_m.abs() / SPEED_OF_LIGHT;
    let floor = 10f64.powf(-peak_rejection_db(frontend) / 10.0);
    10.0 * (phase.sin().powi(2) + floor).log10()
}

/// Derives the sideband-leakage curve of a CAL record, one value per
/// channel at that channel's own IF offset. Channels without a system
/// temperature carry zero.
pub fn ssb_record(cal: &CalibratedSpectrum) -> CalibratedSpectrum {
    let freqs = channel_grid(
        cal.skyfreq_hz,
        cal.spectrum.len(),
        cal.backend.channel_width_hz(),
    );
    let spectrum = cal
        .spectrum
        .iter()
        .zip(freqs)
        .map(|(&gain, freq)| {
            if gain > 0.0 {
                let offset_hz = (freq - cal.lofreq_hz).abs();
                leakage_db(cal.frontend, offset_hz, cal.sideband_path_m)
            } else {
                0.0
            }
        })
        .collect();
    CalibratedSpectrum {
        kind: SpectrumKind::Ssb,
        source: source_label(cal.backend, cal.frontend, cal.freqmode, SpectrumKind::Ssb),
        spectrum,
        ..cal.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use approx::assert_abs_diff_eq;

    #[test]
    fn tuned_filter_leaks_at_the_peak_rejection() {
        // A phase of pi leaves only the floor.
        let path = SPEED_OF_LIGHT / (2.0 * 3.9e9);
        let db = leakage_db(Frontend::Rec549, 3.9e9, path);
        assert_abs_diff_eq!(db, -26.0, epsilon = 1e-6);
    }

    #[test]
    fn untuned_filter_leaks_fully() {
        let path = SPEED_OF_LIGHT / (4.0 * 3.9e9);
        let db = leakage_db(Frontend::Rec495, 3.9e9, path);
        assert_abs_diff_eq!(db, 10.0 * (1.0 + 10f64.powf(-2.7)).log10(), epsilon = 1e-9);
    }

    #[test]
    fn ssb_record_follows_cal_record() {
        let cal = fixtures::record(SpectrumKind::Cal, vec![3000.0, 0.0]);
        let ssb = ssb_record(&cal);
        assert_eq!(ssb.kind, SpectrumKind::Ssb);
        assert_eq!(ssb.stw, cal.stw);
        assert!(ssb.source.ends_with("/SSB"));
        assert_abs_diff_eq!(ssb.spectrum[0], -26.0, epsilon = 1e-9);
        assert_eq!(ssb.spectrum[1], 0.0);
    }

    #[test]
    fn leakage_varies_across_channels() {
        let mut cal = fixtures::record(SpectrumKind::Cal, vec![3000.0; 16]);
        cal.sideband_path_m = 0.0123;
        let ssb = ssb_record(&cal);

        let width = cal.backend.channel_width_hz();
        let offset = cal.skyfreq_hz - cal.lofreq_hz;
        let first = leakage_db(cal.frontend, offset - 8.0 * width, 0.0123);
        let last = leakage_db(cal.frontend, offset + 7.0 * width, 0.0123);
        assert_abs_diff_eq!(ssb.spectrum[0], first, epsilon = 1e-9);
        assert_abs_diff_eq!(ssb.spectrum[15], last, epsilon = 1e-9);
        assert!((ssb.spectrum[0] - ssb.spectrum[15]).abs() > 1e-6);
    }
}
