use crate::records::{Backend, Frontend};

/// Frequency mode of records whose setting matches no table entry.
pub const UNKNOWN_FREQMODE: u16 = 0;

/// Half-width of a table entry's sky-frequency match, in GHz.
const MATCH_HALF_WIDTH_GHZ: f64 = 0.5;

/// (backend, frontend, sky-frequency centre in GHz, frequency mode)
const FREQMODE_TABLE: &[(Backend, Frontend, f64, u16)] = &[
    (Backend::Ac2, Frontend::Rec495, 501.18, 1),
    (Backend::Ac2, Frontend::Rec549, 544.60, 1),
    (Backend::Ac1, Frontend::Rec495, 501.58, 2),
    (Backend::Ac1, Frontend::Rec549, 544.86, 2),
    (Backend::Ac2, Frontend::Rec495, 488.95, 8),
    (Backend::Ac1, Frontend::Rec572, 556.55, 13),
    (Backend::Aos, Frontend::Rec555, 556.95, 14),
    (Backend::Ac2, Frontend::Rec549, 548.50, 17),
    (Backend::Ac2, Frontend::Rec555, 556.95, 19),
    (Backend::Ac1, Frontend::Rec555, 556.95, 21),
    (Backend::Fba, Frontend::Rec119, 118.75, 22),
    (Backend::Ac2, Frontend::Rec572, 556.55, 24),
];

/// Looks up the acquisition frequency mode of a calibrated setting.
pub fn lookup(backend: Backend, frontend: Frontend, sky_hz: f64) -> u16 {
    let sky_ghz = sky_hz / 1.0e9;
    FREQMODE_TABLE
        .iter()
        .find(|(b, f, centre, _)| {
            *b == backend && *f == frontend && (sky_ghz - centre).abs() <= MATCH_HALF_WIDTH_GHZ
        })
        .map(|&(_, _, _, mode)| mode)
        .unwrap_or(UNKNOWN_FREQMODE)
}
