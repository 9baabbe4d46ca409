use std::{fmt::Display, str::FromStr};

use super::{DetectorBuildError, ImageDimensionError};

/// AprilTag families understood by the detector adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagFamily {
	Tag16h5,
	Tag25h9,
	Tag36h10,
	Tag36h11,
}

impl TagFamily {
	pub const fn values() -> [TagFamily; 4] {
		[Self::Tag16h5, Self::Tag25h9, Self::Tag36h10, Self::Tag36h11]
	}

	pub fn for_name(name: &str) -> Option<TagFamily> {
		Self::values()
			.into_iter()
			.find(|family| family.name() == name)
	}

	pub fn names() -> impl Iterator<Item = &'static str> {
		Self::values().into_iter().map(|family| family.name())
	}

	/// A human-readable name, e.g., "tag36h11"
	pub const fn name(&self) -> &'static str {
		match self {
			Self::Tag16h5 => "tag16h5",
			Self::Tag25h9 => "tag25h9",
			Self::Tag36h10 => "tag36h10",
			Self::Tag36h11 => "tag36h11",
		}
	}
}

impl Display for TagFamily {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for TagFamily {
	type Err = DetectorBuildError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::for_name(s).ok_or_else(|| DetectorBuildError::UnknownFamily(s.to_owned()))
	}
}

/// Detector parameters
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
	/// Family of tags to detect
	pub family: TagFamily,
	/// Detect tags with up to this many bit errors.
	///
	/// Note: accepting large numbers of corrected errors leads to greatly
	/// increased false positive rates.
	pub bits_corrected: usize,
}

impl Default for DetectorConfig {
	fn default() -> Self {
		Self {
			family: TagFamily::Tag36h11,
			bits_corrected: 1,
		}
	}
}

/// Camera and physical tag parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
	/// Frame width, in pixels
	pub width: usize,
	/// Frame height, in pixels
	pub height: usize,
	/// Brightness, in percent
	pub brightness: u8,
	/// Horizontal focal length, in pixels
	pub fx: f64,
	/// Vertical focal length, in pixels
	pub fy: f64,
	/// Side length of a tag's black square, in meters
	pub tag_size: f64,
}

impl Default for CameraConfig {
	fn default() -> Self {
		Self {
			width: 640,
			height: 480,
			brightness: 50,
			fx: 600.,
			fy: 600.,
			// 6.5in FRC tags
			tag_size: 0.1651,
		}
	}
}

impl CameraConfig {
	/// Check that a frame has the configured size
	pub fn check_dimensions(&self, width: usize, height: usize) -> Result<(), ImageDimensionError> {
		if width == 0 || height == 0 {
			return Err(ImageDimensionError::Empty { width, height });
		}
		if (width, height) != (self.width, self.height) {
			return Err(ImageDimensionError::Mismatch {
				actual: (width, height),
				expected: (self.width, self.height),
			});
		}
		Ok(())
	}
}
