use crate::math::planck::{brightness, COSMIC_BACKGROUND_K};
use crate::math::stats::StatsHelper;
use crate::telemetry::log::LogManager;

/// Per-channel gain (system temperature) from one hot-load view and the
/// reference interpolated at the same instant. Channels where the load is
/// not brighter than the reference are zero.
pub fn gain_spectrum(
    calibration: &[f64],
    reference: &[f64],
    freqs_hz: &[f64],
    hot_load_k: f64,
) -> Vec<f64> {
    calibration
        .iter()
        .zip(reference)
        .zip(freqs_hz)
        .map(|((&cal, &r), &freq)| {
            if cal <= r || r <= 0.0 {
                return 0.0;
            }
            let load = brightness(hot_load_k, freq) - brightness(COSMIC_BACKGROUND_K, freq);
            r / (cal - r) * load
        })
        .collect()
}

/// Mean of the channels that received a system temperature.
pub fn mean_tsys(channels: &[f64]) -> f64 {
    let used: Vec<f64> = channels.iter().copied().filter(|&t| t > 0.0).collect();
    StatsHelper::mean(&used).unwrap_or(0.0)
}

/// Aggregate system temperature of a mode block.
#[derive(Debug, Clone, PartialEq)]
pub struct TsysEstimate {
    pub channels: Vec<f64>,
    /// Number of CAL samples contributing to each channel.
    pub contributions: Vec<usize>,
    pub accepted_bands: usize,
    pub rejected_bands: usize,
}

impl TsysEstimate {
    /// No channel received any contribution.
    pub fn is_unusable(&self) -> bool {
        self.contributions.iter().all(|&n| n == 0)
    }

    /// Some, but not all, channels received a contribution.
    pub fn is_partial(&self) -> bool {
        !self.is_unusable() && self.contributions.iter().any(|&n| n == 0)
    }

    pub fn mean(&self) -> f64 {
        mean_tsys(&self.channels)
    }
}

/// Averages CAL gain spectra band by band, rejecting band means outside the
/// acceptable range of the receiver feeding that band.
pub struct TsysEstimator {
    logger: LogManager,
}

impl TsysEstimator {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("tsys"),
        }
    }

    /// `ranges` holds one acceptable `(min, max)` per band; the spectrum is
    /// cut into that many equal bands.
    pub fn estimate(&self, gains: &[Vec<f64>], ranges: &[(f64, f64)]) -> TsysEstimate {
        let channels = gains.first().map_or(0, Vec::len);
        let mut sums = vec![0.0; channels];
        let mut contributions = vec![0; channels];
        let mut accepted_bands = 0;
        let mut rejected_bands = 0;

        let bands = band_count(channels, ranges.len());
        for gain in gains.iter().filter(|g| g.len() == channels) {
            for (band, range) in band_slices(channels, bands).zip(ranges) {
                let Some(band_mean) = StatsHelper::mean(&gain[band.clone()]) else {
                    continue;
                };
                if band_mean < range.0 || band_mean > range.1 {
                    rejected_bands += 1;
                    self.logger.detail(&format!(
                        "band mean {:.1} K outside [{:.0}, {:.0}] K",
                        band_mean, range.0, range.1
                    ));
                    continue;
                }
                accepted_bands += 1;
                for c in band {
                    sums[c] += gain[c];
                    contributions[c] += 1;
                }
            }
        }

        let channels = sums
            .iter()
            .zip(&contributions)
            .map(|(&sum, &n)| if n > 0 { sum / n as f64 } else { 0.0 })
            .collect();
        let estimate = TsysEstimate {
            channels,
            contributions,
            accepted_bands,
            rejected_bands,
        };
        if estimate.is_partial() {
            self.logger.detail(&format!(
                "partial system temperature: {} bands rejected",
                rejected_bands
            ));
        }
        estimate
    }
}

impl Default for TsysEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Bands actually used for `channels`; falls back to a single band when the
/// spectrum does not divide evenly.
pub fn band_count(channels: usize, bands: usize) -> usize {
    if bands == 0 || channels % bands != 0 {
        1
    } else {
        bands
    }
}

/// Channel ranges of `bands` equal bands.
pub fn band_slices(
    channels: usize,
    bands: usize,
) -> impl Iterator<Item = std::ops::Range<usize>> {
    let width = channels / bands.max(1);
    (0..bands).map(move |b| b * width..(b + 1) * width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const WIDE: (f64, f64) = (2000.0, 7000.0);

    #[test]
    fn out_of_range_calibrations_are_rejected() {
        let gains: Vec<Vec<f64>> = [1000.0, 3500.0, 3500.0, 9000.0]
            .iter()
            .map(|&t| vec![t; 4])
            .collect();
        let estimate = TsysEstimator::new().estimate(&gains, &[WIDE]);
        assert_eq!(estimate.accepted_bands, 2);
        assert_eq!(estimate.rejected_bands, 2);
        for t in &estimate.channels {
            assert_abs_diff_eq!(*t, 3500.0, epsilon = 1e-9);
        }
        assert!(!estimate.is_partial());
    }

    #[test]
    fn rejected_bands_leave_channels_zero() {
        let gain = vec![1000.0, 1000.0, 3500.0, 3500.0, 3500.0, 3500.0, 9000.0, 9000.0];
        let estimate = TsysEstimator::new().estimate(&[gain], &[WIDE; 4]);
        assert_eq!(
            estimate.channels,
            vec![0.0, 0.0, 3500.0, 3500.0, 3500.0, 3500.0, 0.0, 0.0]
        );
        assert!(estimate.is_partial());
        assert_abs_diff_eq!(estimate.mean(), 3500.0);
    }

    #[test]
    fn no_accepted_band_is_unusable() {
        let estimate = TsysEstimator::new().estimate(&[vec![9000.0; 4]], &[WIDE]);
        assert!(estimate.is_unusable());
        assert!(!estimate.is_partial());
        assert_eq!(estimate.mean(), 0.0);
        assert!(TsysEstimator::new().estimate(&[], &[WIDE]).is_unusable());
    }

    #[test]
    fn gain_is_zero_where_load_is_not_brighter() {
        let gain = gain_spectrum(&[110.0, 90.0], &[100.0, 100.0], &[549.0e9; 2], 290.0);
        let load = brightness(290.0, 549.0e9) - brightness(2.7, 549.0e9);
        assert_abs_diff_eq!(gain[0], 10.0 * load, epsilon = 1e-9);
        assert_eq!(gain[1], 0.0);
    }

    #[test]
    fn uneven_spectra_use_one_band() {
        assert_eq!(band_count(10, 8), 1);
        assert_eq!(band_count(16, 8), 8);
        let slices: Vec<_> = band_slices(8, 4).collect();
        assert_eq!(slices, vec![0..2, 2..4, 4..6, 6..8]);
    }
}
