use ndarray::{Array1, Array2};

use crate::math::matrix::MatrixHelper;
use crate::prelude::{CalibrationSettings, InterpolationMethod};
use crate::processing::frequency::StampedSample;
use crate::records::Stw;

/// A reference spectrum placed in time relative to the scan.
#[derive(Debug, Clone, Copy)]
pub struct ReferencePoint<'a> {
    pub time_s: f64,
    pub integration_s: f64,
    pub spectrum: &'a [f64],
}

impl<'a> ReferencePoint<'a> {
    pub fn from_sample(sample: &'a StampedSample, calstw: Stw) -> Self {
        Self {
            time_s: sample.seconds_since(calstw),
            integration_s: sample.sample.integration_s,
            spectrum: &sample.spectrum,
        }
    }
}

/// Estimates the reference spectrum at arbitrary times.
pub struct ReferenceInterpolator {
    method: InterpolationMethod,
    scan_duration_s: f64,
    decay_rate: f64,
}

impl ReferenceInterpolator {
    pub fn new(settings: &CalibrationSettings) -> Self {
        Self {
            method: settings.interpolation,
            scan_duration_s: settings.scan_duration_s,
            decay_rate: settings.decay_rate,
        }
    }

    pub fn method(&self) -> InterpolationMethod {
        self.method
    }

    /// Reference estimate at `time_s`; `refs` must be ordered in time.
    /// Outside the covered range the boundary reference is returned as is.
    pub fn interpolate(&self, refs: &[ReferencePoint], time_s: f64) -> Option<Vec<f64>> {
        let (first, last) = (refs.first()?, refs.last()?);
        if time_s <= first.time_s {
            return Some(first.spectrum.to_vec());
        }
        if time_s >= last.time_s {
            return Some(last.spectrum.to_vec());
        }
        match self.method {
            InterpolationMethod::Linear => linear(refs, time_s),
            InterpolationMethod::WeightedQuadratic => self
                .weighted_quadratic(refs, time_s)
                .or_else(|| linear(refs, time_s)),
        }
    }

    /// Weighted least-squares parabola through the references within one
    /// scan duration, evaluated at `time_s`. `None` when the fit is singular.
    fn weighted_quadratic(&self, refs: &[ReferencePoint], time_s: f64) -> Option<Vec<f64>> {
        let nearby: Vec<&ReferencePoint> = refs
            .iter()
            .filter(|r| (r.time_s - time_s).abs() <= self.scan_duration_s)
            .collect();
        match nearby.as_slice() {
            [] => return None,
            [only] => return Some(only.spectrum.to_vec()),
            _ => {}
        }

        let channels = nearby[0].spectrum.len();
        let mut normal = Array2::<f64>::zeros((3, 3));
        let mut moments = Array2::<f64>::zeros((3, channels));
        // Offsets in scan durations keep the normal matrix well scaled.
        let unit = self.scan_duration_s.abs().max(f64::MIN_POSITIVE);
        for point in &nearby {
            let u = (point.time_s - time_s) / unit;
            let weight = (-u.abs() * self.decay_rate).exp()
                / point.integration_s.max(f64::MIN_POSITIVE);
            let basis = [1.0, u, u * u];
            for i in 0..3 {
                for j in 0..3 {
                    normal[[i, j]] += weight * basis[i] * basis[j];
                }
                for (c, &value) in point.spectrum.iter().take(channels).enumerate() {
                    moments[[i, c]] += weight * basis[i] * value;
                }
            }
        }

        let mut estimate = Vec::with_capacity(channels);
        for c in 0..channels {
            let rhs: Array1<f64> = moments.column(c).to_owned();
            let coefficients = MatrixHelper::solve3(normal.view(), rhs.view())?;
            estimate.push(coefficients[0]);
        }
        Some(estimate)
    }
}

fn linear(refs: &[ReferencePoint], time_s: f64) -> Option<Vec<f64>> {
    let upper = refs.iter().position(|r| r.time_s > time_s)?;
    let after = refs[upper];
    let before = refs[upper.checked_sub(1)?];
    let span = after.time_s - before.time_s;
    if span <= 0.0 {
        return Some(before.spectrum.to_vec());
    }
    let w = (time_s - before.time_s) / span;
    Some(
        before
            .spectrum
            .iter()
            .zip(after.spectrum)
            .map(|(b, a)| b + w * (a - b))
            .collect(),
    )
}
