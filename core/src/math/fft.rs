use num_complex::Complex64;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// Helper that turns autocorrelation lags of one band into a power spectrum.
///
/// The `n` lags are mirrored into a real even sequence of length `2n`; its
/// transform is real and the first `n` bins are the band's channels.
pub struct FftHelper {
    fft: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex64>,
    lags: usize,
}

impl FftHelper {
    pub fn new(lags: usize) -> Self {
        let lags = lags.max(1);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(2 * lags);
        let buffer = vec![Complex64::zero(); 2 * lags];
        Self { fft, buffer, lags }
    }

    pub fn spectrum_from_lags(&mut self, lags: &[f64]) -> Vec<f64> {
        let n = self.lags;
        self.buffer.fill(Complex64::zero());
        for (j, &lag) in lags.iter().take(n).enumerate() {
            self.buffer[j] = Complex64::new(lag, 0.0);
            if j > 0 {
                self.buffer[2 * n - j] = Complex64::new(lag, 0.0);
            }
        }
        self.fft.process(&mut self.buffer);
        self.buffer[..n].iter().map(|c| c.re).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn delta_lags_give_flat_spectrum() {
        let mut helper = FftHelper::new(4);
        let spectrum = helper.spectrum_from_lags(&[3.0, 0.0, 0.0, 0.0]);
        assert_eq!(spectrum.len(), 4);
        for value in spectrum {
            assert_abs_diff_eq!(value, 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn first_lag_adds_cosine_ripple() {
        let mut helper = FftHelper::new(4);
        let spectrum = helper.spectrum_from_lags(&[1.0, 0.5, 0.0, 0.0]);
        // 1 + 2 * 0.5 * cos(pi * k / 4)
        assert_abs_diff_eq!(spectrum[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(spectrum[2], 1.0, epsilon = 1e-12);
    }
}
