pub(crate) mod config;
mod error;
#[cfg(feature="opencv")]
mod opencv;

pub use config::{DetectorConfig, CameraConfig, TagFamily};
pub use error::{DetectError, DetectorBuildError, ImageDimensionError};
#[cfg(feature="opencv")]
pub use self::opencv::{OpenCvDetector, OpenCvCamera};

use crate::{util::ImageY8, detection::RawDetection};

/// Finds fiducial markers in a grayscale frame.
///
/// Detections are returned in the detector's order; duplicate IDs are
/// passed through unchanged.
pub trait TagDetector {
	fn detect(&mut self, image: &ImageY8) -> Result<Vec<RawDetection>, DetectError>;
}

impl<F> TagDetector for F where F: FnMut(&ImageY8) -> Result<Vec<RawDetection>, DetectError> {
	fn detect(&mut self, image: &ImageY8) -> Result<Vec<RawDetection>, DetectError> {
		self(image)
	}
}
