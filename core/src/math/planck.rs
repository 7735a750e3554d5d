//! Radiometric constants and the Planck brightness function.

pub const PLANCK_H: f64 = 6.626_070_15e-34;
pub const BOLTZMANN_K: f64 = 1.380_649e-23;
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Cold-sky temperature seen by the reference beams.
pub const COSMIC_BACKGROUND_K: f64 = 2.7;

/// Rayleigh-Jeans equivalent brightness temperature of a blackbody at
/// `temperature_k`, observed at `freq_hz`.
pub fn brightness(temperature_k: f64, freq_hz: f64) -> f64 {
    if temperature_k <= 0.0 || freq_hz <= 0.0 {
        return 0.0;
    }
    let x = PLANCK_H * freq_hz / BOLTZMANN_K;
    x / (x / temperature_k).exp_m1()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn brightness_approaches_rayleigh_jeans_at_low_frequency() {
        assert_relative_eq!(brightness(300.0, 1.0e6), 300.0, max_relative = 1e-6);
    }

    #[test]
    fn brightness_is_below_physical_temperature_at_submm() {
        let j = brightness(290.0, 549.0e9);
        assert!(j < 290.0 && j > 270.0);
        assert_eq!(brightness(0.0, 549.0e9), 0.0);
    }
}
