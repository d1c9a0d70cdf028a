pub mod calibrate;
pub mod history;
pub mod phase;
pub mod pyramid;
pub mod regularize;
pub mod riesz;
pub mod temporal;
pub mod utils;

/// One scalar field at a pyramid level's resolution.
pub type Plane = ndarray::Array2<f32>;

pub use calibrate::AmplitudeCalibrator;
pub use history::LevelHistory;
pub use pyramid::LaplacianPyramid;
pub use regularize::GaussianKernel;
pub use temporal::BandpassCoeffs;
