use crate::prelude::{CalibrationError, CalibrationResult};
use crate::processing::intensity::PendingRecord;
use crate::processing::tsys::mean_tsys;
use crate::records::CalibratedSpectrum;

/// Splits a dual-receiver record into one record per receiver: the lower
/// half keeps the primary receiver, the upper half takes the partner's
/// frequencies and mode. `tsys` is the per-channel system temperature the
/// record was calibrated with.
pub fn split(pending: PendingRecord, tsys: &[f64]) -> CalibrationResult<Vec<CalibratedSpectrum>> {
    let PendingRecord { mut record, partner } = pending;
    let Some(partner) = partner else {
        return Ok(vec![record]);
    };

    let n = record.spectrum.len();
    if tsys.len() != n {
        return Err(CalibrationError::ChannelMismatch {
            stw: record.stw,
            expected: tsys.len(),
            found: n,
        });
    }
    if n % 2 != 0 {
        return Err(CalibrationError::ChannelMismatch {
            stw: record.stw,
            expected: n + 1,
            found: n,
        });
    }

    let half = n / 2;
    let upper_spectrum = record.spectrum.split_off(half);
    record.tsys = mean_tsys(&tsys[..half]);

    let mut upper = record.clone();
    upper.frontend = partner.frontend;
    upper.skyfreq_hz = partner.sky_hz;
    upper.lofreq_hz = partner.lo_hz;
    upper.restfreq_hz = partner.rest_hz;
    upper.sideband_path_m = partner.sideband_path_m;
    upper.freqmode = partner.freqmode;
    upper.tsys = mean_tsys(&tsys[half..]);
    upper.spectrum = upper_spectrum;

    record.relabel();
    upper.relabel();
    Ok(vec![record, upper])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::processing::frequency::FrequencyStamp;
    use crate::records::{Frontend, SpectrumKind};

    fn partner() -> FrequencyStamp {
        FrequencyStamp {
            frontend: Frontend::Rec495,
            lo_hz: 497.0e9,
            if_hz: 4.1e9,
            sky_hz: 501.1e9,
            rest_hz: 501.1e9,
            sideband_path_m: 0.001,
            freqmode: 1,
        }
    }

    #[test]
    fn single_receiver_records_pass_through() {
        let record = fixtures::record(SpectrumKind::Spe, vec![1.0, 2.0, 3.0]);
        let pending = PendingRecord {
            record: record.clone(),
            partner: None,
        };
        assert_eq!(split(pending, &[3000.0; 3]).unwrap(), vec![record]);
    }

    #[test]
    fn halves_follow_their_receivers() {
        let pending = PendingRecord {
            record: fixtures::record(SpectrumKind::Spe, vec![1.0, 2.0, 3.0, 4.0]),
            partner: Some(partner()),
        };
        let records = split(pending, &[3000.0, 0.0, 4000.0, 5000.0]).unwrap();
        let (lower, upper) = (&records[0], &records[1]);
        assert_eq!(lower.spectrum, vec![1.0, 2.0]);
        assert_eq!(lower.frontend, Frontend::Rec549);
        assert_eq!(lower.tsys, 3000.0);
        assert_eq!(upper.spectrum, vec![3.0, 4.0]);
        assert_eq!(upper.frontend, Frontend::Rec495);
        assert_eq!(upper.skyfreq_hz, 501.1e9);
        assert_eq!(upper.tsys, 4500.0);
        assert_eq!(upper.source, "AC2/REC_495/FM1/SPE");
        assert_eq!(upper.stw, lower.stw);
        assert_ne!(upper.key(), lower.key());
    }

    #[test]
    fn odd_spectra_cannot_be_split() {
        let pending = PendingRecord {
            record: fixtures::record(SpectrumKind::Cal, vec![1.0; 5]),
            partner: Some(partner()),
        };
        assert!(matches!(
            split(pending, &[3000.0; 5]),
            Err(CalibrationError::ChannelMismatch { found: 5, .. })
        ));
    }
}
