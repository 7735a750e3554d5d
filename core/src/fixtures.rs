//! Synthetic telemetry shared by the unit tests.

use crate::processing::frequency::{FrequencyStamp, StampedSample};
use crate::records::sample::INTMODE_SPLIT;
use crate::records::spectrum::source_label;
use crate::records::{
    Attitude, Backend, CalibratedSpectrum, Frontend, Housekeeping, RawSample, SampleKind, SkyBeam,
    SpectrumKind, SplitPartner, Stw,
};

pub(crate) const CALSTW: Stw = Stw(1_000_000);
/// Channels per receiver.
pub(crate) const CHANNELS: usize = 16;
pub(crate) const LO_549_HZ: f64 = (548.926_872_357_552_8 - 3.9) * 1.0e9;
pub(crate) const LO_495_HZ: f64 = (491.110_228_512_857_5 - 3.9) * 1.0e9;
pub(crate) const INTEGRATION_S: f64 = 0.875;
pub(crate) const HOT_LOAD_K: f64 = 290.0;
pub(crate) const BOX_TEMP_C: f64 = 20.0;

pub(crate) const REF_LEVEL: f64 = 100.0;
pub(crate) const CAL_LEVEL: f64 = 110.0;
pub(crate) const SIG_LEVEL: f64 = 105.0;
pub(crate) const HIGH_SIG_LEVEL: f64 = 100.5;

pub(crate) const REF: SampleKind = SampleKind::Ref { beam: SkyBeam::Sk1 };

/// Lags whose spectrum is `level` in every channel of all eight bands.
pub(crate) fn lags(level: f64, channels: usize) -> Vec<f64> {
    let per_band = channels / 8;
    (0..channels)
        .map(|i| if i % per_band == 0 { level } else { 0.0 })
        .collect()
}

pub(crate) fn sample(offset_ticks: i64, kind: SampleKind, level: f64) -> RawSample {
    RawSample {
        stw: CALSTW.offset(offset_ticks),
        scan_stw: CALSTW,
        backend: Backend::Ac2,
        frontend: Frontend::Rec549,
        partner: None,
        intmode: 0,
        kind,
        counts: lags(level, CHANNELS),
        integration_s: INTEGRATION_S,
        attenuation: 0,
        housekeeping: Housekeeping {
            lo_hz: LO_549_HZ,
            sideband_position: 2000,
            mixer_current: 0.5,
            hot_load_k: HOT_LOAD_K,
            box_temp_c: BOX_TEMP_C,
        },
        attitude: Some(Attitude {
            latitude_deg: 10.0,
            longitude_deg: 20.0,
            tangent_altitude_m: 20_000.0,
            geocentric_velocity_ms: 0.0,
        }),
        quality: 0,
    }
}

pub(crate) fn dual_sample(offset_ticks: i64, kind: SampleKind, level: f64) -> RawSample {
    RawSample {
        partner: Some(SplitPartner {
            frontend: Frontend::Rec495,
            lo_hz: LO_495_HZ,
            sideband_position: 2000,
        }),
        intmode: INTMODE_SPLIT,
        counts: lags(level, 2 * CHANNELS),
        ..sample(offset_ticks, kind, level)
    }
}

pub(crate) fn at_altitude(mut sample: RawSample, altitude_m: f64) -> RawSample {
    if let Some(attitude) = sample.attitude.as_mut() {
        attitude.tangent_altitude_m = altitude_m;
    }
    sample
}

/// One scan: three references bracketing five signals, then a CAL.
/// The fifth signal looks at empty sky from 100 km.
pub(crate) fn scan(dual: bool) -> Vec<RawSample> {
    let make = if dual { dual_sample } else { sample };
    vec![
        make(0, REF, REF_LEVEL),
        at_altitude(make(16, SampleKind::Sig, SIG_LEVEL), 20_000.0),
        at_altitude(make(32, SampleKind::Sig, SIG_LEVEL), 30_000.0),
        make(48, REF, REF_LEVEL),
        at_altitude(make(64, SampleKind::Sig, SIG_LEVEL), 40_000.0),
        at_altitude(make(80, SampleKind::Sig, SIG_LEVEL), 50_000.0),
        at_altitude(make(96, SampleKind::Sig, HIGH_SIG_LEVEL), 100_000.0),
        make(112, REF, REF_LEVEL),
        make(128, SampleKind::Cal, CAL_LEVEL),
    ]
}

/// A stamped sample with a flat spectrum at the given sky frequency.
pub(crate) fn stamped(offset_ticks: i64, kind: SampleKind, sky_hz: f64) -> StampedSample {
    StampedSample {
        sample: sample(offset_ticks, kind, 1.0),
        spectrum: vec![1.0; CHANNELS],
        freq: FrequencyStamp {
            frontend: Frontend::Rec549,
            lo_hz: sky_hz - 3.9e9,
            if_hz: 3.9e9,
            sky_hz,
            rest_hz: sky_hz,
            sideband_path_m: 0.0,
            freqmode: 0,
        },
        partner_freq: None,
    }
}

/// A calibrated record of `kind` with the given spectrum.
pub(crate) fn record(kind: SpectrumKind, spectrum: Vec<f64>) -> CalibratedSpectrum {
    CalibratedSpectrum {
        stw: CALSTW,
        backend: Backend::Ac2,
        frontend: Frontend::Rec549,
        intmode: 0,
        version: 8,
        calibration_set: 1,
        freqmode: 17,
        source: source_label(Backend::Ac2, Frontend::Rec549, 17, kind),
        kind,
        skyfreq_hz: 548.5e9,
        lofreq_hz: 544.6e9,
        restfreq_hz: 548.5e9,
        sideband_path_m: 0.0,
        tsys: 3000.0,
        integration_s: INTEGRATION_S,
        efftime_s: INTEGRATION_S,
        tangent_altitude_m: Some(20_000.0),
        latitude_deg: Some(10.0),
        longitude_deg: Some(20.0),
        scan: CALSTW,
        spectrum,
    }
}
