pub mod sample;
pub mod spectrum;
pub mod window;

pub use sample::{
    Attitude, Backend, Frontend, FrontendGroup, Housekeeping, RawSample, SampleKind, SkyBeam,
    SplitPartner, Stw,
};
pub use spectrum::{CalibratedSpectrum, SpectrumKey, SpectrumKind};
pub use window::ScanWindow;
