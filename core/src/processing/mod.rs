pub mod correlator;
pub mod freqmode;
pub mod frequency;
pub mod intensity;
pub mod reference;
pub mod selection;
pub mod sideband;
pub mod split;
pub mod ssb;
pub mod tsys;

pub use correlator::{CorrelatorStage, SpectralSample};
pub use frequency::{FrequencyCalibrator, FrequencyStamp, StampedSample};
pub use intensity::{BlockContext, IntensityCalibrator, IntensityProducts, PendingRecord, SignalInput};
pub use reference::{ReferenceInterpolator, ReferencePoint};
pub use selection::{ModeBlock, WindowSelector};
pub use tsys::{TsysEstimate, TsysEstimator};
