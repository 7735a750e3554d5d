pub mod fft;
pub mod matrix;
pub mod planck;
pub mod stats;

pub use fft::FftHelper;
pub use matrix::MatrixHelper;
pub use stats::StatsHelper;
