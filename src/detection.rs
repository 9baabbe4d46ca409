use nalgebra::Matrix3;

use crate::{util::geom::{Point2D, Quadrilateral}, pose::{Pose3D, PoseError, homography_from_corners}};

/// A tag as reported by a detector, before pose estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
	/// The decoded ID of the tag
	pub id: usize,

	/// The center of the detection in image pixel coordinates.
	pub center: Point2D,

	/// The corners of the tag in image pixel coordinates, ordered
	/// bottom-left, bottom-right, top-right, top-left.
	pub corners: Quadrilateral,

	/// The 3x3 homography matrix describing the projection from an
	/// "ideal" tag (with corners at (-1,-1), (1,-1), (1,1), and (-1,
	/// 1)) to pixels in the image.
	pub homography: Matrix3<f64>,
}

impl RawDetection {
	/// Build a detection for detectors that only report corners.
	///
	/// The center is the image of the ideal tag's origin.
	pub fn from_corners(id: usize, corners: Quadrilateral) -> Result<Self, PoseError> {
		let homography = homography_from_corners(&corners)?;
		let center = Point2D::of(homography[(0, 2)], homography[(1, 2)]);
		Ok(Self {
			id,
			center,
			corners,
			homography,
		})
	}

	/// Homography coefficients, row-major
	pub fn homography_coefficients(&self) -> [f64; 9] {
		let h = &self.homography;
		[
			h[(0, 0)], h[(0, 1)], h[(0, 2)],
			h[(1, 0)], h[(1, 1)], h[(1, 2)],
			h[(2, 0)], h[(2, 1)], h[(2, 2)],
		]
	}
}

/// One tag detected in the current frame, with its estimated pose
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedTag {
	pub id: usize,
	pub center: Point2D,
	pub corners: Quadrilateral,
	pub homography: Matrix3<f64>,
	/// Pose of the physical tag relative to the camera
	pub pose: Pose3D,
}

impl DetectedTag {
	pub fn new(detection: RawDetection, pose: Pose3D) -> Self {
		let RawDetection { id, center, corners, homography } = detection;
		Self {
			id,
			center,
			corners,
			homography,
			pose,
		}
	}
}
