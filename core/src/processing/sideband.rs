use crate::records::Frontend;

/// Nominal intermediate frequency of every receiver.
pub const NOMINAL_IF_HZ: f64 = 3.9e9;

/// The 119 GHz receiver runs from a fixed oscillator.
pub const FIXED_LO_119_HZ: f64 = 114.849_86e9;

/// Largest distance from the nominal IF a resolved candidate may have.
const MAX_IF_DEVIATION_GHZ: f64 = 1.0;

/// Full scale of the sideband mechanism encoder.
const MECHANISM_FULL_SCALE: f64 = 4095.0;

/// Geometry of one receiver's sideband mechanism.
struct SidebandConstants {
    c1: f64,
    c2: f64,
    harmonic_scale: f64,
    half_path_mm: f64,
}

fn constants(frontend: Frontend) -> Option<SidebandConstants> {
    let (c1, c2, harmonic_scale, half_path_mm) = match frontend {
        Frontend::Rec495 => (61600.36, 104188.89, 0.000_297_786_2, 313.0),
        Frontend::Rec549 => (57901.86, 109682.58, 0.000_311_712_8, 313.0),
        Frontend::Rec555 => (60475.43, 116543.50, 0.000_302_134_1, 308.0),
        Frontend::Rec572 => (58120.92, 115256.73, 0.000_312_860_5, 314.0),
        Frontend::Rec119 => return None,
    };
    Some(SidebandConstants {
        c1,
        c2,
        harmonic_scale,
        half_path_mm,
    })
}

/// Signed IF and sideband path length of one receiver setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SidebandResolution {
    pub if_hz: f64,
    pub sideband_path_m: f64,
}

impl SidebandResolution {
    pub fn is_upper_sideband(&self) -> bool {
        self.if_hz > 0.0
    }
}

/// Resolves the signal sideband from the oscillator and mechanism setting.
///
/// Five harmonic candidates of the mechanism are evaluated; the one whose
/// offset from the LO lies closest to the nominal IF wins and its sign picks
/// the sideband. `None` means the setting cannot be calibrated.
pub fn resolve(frontend: Frontend, lo_hz: f64, position: u16) -> Option<SidebandResolution> {
    // The fixed-oscillator receiver ignores the commanded LO.
    let Some(k) = constants(frontend) else {
        return Some(SidebandResolution {
            if_hz: NOMINAL_IF_HZ,
            sideband_path_m: 0.0,
        });
    };
    if !(lo_hz > 0.0) {
        return None;
    }

    let nominal_ghz = NOMINAL_IF_HZ / 1.0e9;
    let position = f64::from(position);
    let lo_ghz = lo_hz / 1.0e9;
    let best = (-2..=2)
        .map(|i| {
            let harmonic = k.c2 + f64::from(i) / k.harmonic_scale;
            299.79 / (position + k.c1) * harmonic - lo_ghz
        })
        .min_by(|a, b| {
            (a.abs() - nominal_ghz)
                .abs()
                .total_cmp(&(b.abs() - nominal_ghz).abs())
        })?;
    if (best.abs() - nominal_ghz).abs() > MAX_IF_DEVIATION_GHZ {
        return None;
    }

    let path_mm =
        (-k.half_path_mm + 2.0 * k.half_path_mm * position / MECHANISM_FULL_SCALE) * 2.0;
    Some(SidebandResolution {
        if_hz: NOMINAL_IF_HZ.copysign(best),
        sideband_path_m: path_mm / 1000.0,
    })
}

/// Oscillator setting that places the central harmonic of the mechanism at
/// `position` one nominal IF above the LO.
pub fn tuned_lo_hz(frontend: Frontend, position: u16) -> f64 {
    match constants(frontend) {
        Some(k) => 299.79 / (f64::from(position) + k.c1) * k.c2 * 1.0e9 - NOMINAL_IF_HZ,
        None => FIXED_LO_119_HZ,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // Central harmonic of each mechanism at position 2000, in GHz.
    const CENTRAL_HARMONIC: [(Frontend, f64); 4] = [
        (Frontend::Rec495, 491.110_228_512_857_5),
        (Frontend::Rec549, 548.926_872_357_552_8),
        (Frontend::Rec555, 559.237_061_113_465),
        (Frontend::Rec572, 574.721_995_050_974),
    ];

    #[test]
    fn resolves_upper_sideband_for_every_frontend() {
        for (frontend, harmonic) in CENTRAL_HARMONIC {
            let lo_hz = (harmonic - 3.9) * 1.0e9;
            let resolution = resolve(frontend, lo_hz, 2000).unwrap();
            assert!(resolution.is_upper_sideband(), "{frontend}");
            assert!((resolution.if_hz.abs() - 3.9e9).abs() < 0.1e6);
        }
    }

    #[test]
    fn resolves_lower_sideband_for_every_frontend() {
        for (frontend, harmonic) in CENTRAL_HARMONIC {
            let lo_hz = (harmonic + 3.9) * 1.0e9;
            let resolution = resolve(frontend, lo_hz, 2000).unwrap();
            assert!(!resolution.is_upper_sideband(), "{frontend}");
            assert!((resolution.if_hz.abs() - 3.9e9).abs() < 0.1e6);
        }
    }

    #[test]
    fn path_length_follows_mechanism_position() {
        let lo_hz = (491.110_228_512_857_5 - 3.9) * 1.0e9;
        let path = resolve(Frontend::Rec495, lo_hz, 2000).unwrap().sideband_path_m;
        assert_abs_diff_eq!(path, (-313.0 + 626.0 * 2000.0 / 4095.0) * 2.0 / 1000.0);
        // A neighbouring harmonic takes over at full scale.
        let full = resolve(Frontend::Rec495, lo_hz, 4095).unwrap();
        assert_abs_diff_eq!(full.sideband_path_m, 0.626, epsilon = 1e-12);
    }

    #[test]
    fn zero_or_unmatched_lo_is_unresolved() {
        assert!(resolve(Frontend::Rec549, 0.0, 2000).is_none());
        assert!(resolve(Frontend::Rec549, 510.0e9, 2000).is_none());
    }

    #[test]
    fn fixed_frequency_receiver_is_always_upper() {
        let resolution = resolve(Frontend::Rec119, FIXED_LO_119_HZ, 0).unwrap();
        assert_eq!(resolution.if_hz, NOMINAL_IF_HZ);
        assert_eq!(resolution.sideband_path_m, 0.0);
        // A missing commanded LO does not matter for the fixed oscillator.
        assert_eq!(resolve(Frontend::Rec119, 0.0, 0), Some(resolution));
    }

    #[test]
    fn tuned_lo_resolves_to_upper_sideband() {
        for (frontend, harmonic) in CENTRAL_HARMONIC {
            let lo_hz = tuned_lo_hz(frontend, 2000);
            assert_abs_diff_eq!(lo_hz, (harmonic - 3.9) * 1.0e9, epsilon = 1.0);
            assert!(resolve(frontend, lo_hz, 2000).unwrap().is_upper_sideband());
        }
        assert_eq!(tuned_lo_hz(Frontend::Rec119, 0), FIXED_LO_119_HZ);
    }
}
