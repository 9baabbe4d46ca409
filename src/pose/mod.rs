mod homography;

use nalgebra::{Matrix3, Rotation3, Vector3};
use thiserror::Error;

use crate::{detection::RawDetection, detector::CameraConfig};

pub use homography::{homography_from_corners, homography_to_pose, homography_project, IDEAL_CORNERS};

/// Error generated when a pose can't be recovered from a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PoseError {
	#[error("Tag corners don't form a quadrilateral")]
	DegenerateCorners,
	#[error("Homography does not describe a plane in front of the camera")]
	DegenerateHomography,
}

/// Pinhole camera parameters, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
	/// Focal length in x
	pub fx: f64,
	/// Focal length in y
	pub fy: f64,
	/// Principal point x
	pub cx: f64,
	/// Principal point y
	pub cy: f64,
}

impl CameraIntrinsics {
	pub const fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
		Self { fx, fy, cx, cy }
	}

	/// Intrinsics with the principal point at the image center
	pub fn for_camera(camera: &CameraConfig) -> Self {
		Self {
			fx: camera.fx,
			fy: camera.fy,
			cx: camera.width as f64 / 2.,
			cy: camera.height as f64 / 2.,
		}
	}

	pub fn as_matrix(&self) -> Matrix3<f64> {
		Matrix3::new(
			self.fx, 0., self.cx,
			0., self.fy, self.cy,
			0., 0., 1.,
		)
	}

	pub fn inv_matrix(&self) -> Matrix3<f64> {
		Matrix3::new(
			self.fx.recip(), 0., -self.cx / self.fx,
			0., self.fy.recip(), -self.cy / self.fy,
			0., 0., 1.,
		)
	}
}

/// Conversion factor for the `_feet` accessors
pub const METERS_PER_FOOT: f64 = 0.3048;

/// Rigid transform of a tag relative to the camera.
///
/// Translation is in meters; rotation angles are in radians, as extrinsic
/// rotations about the camera's x (roll), y (pitch) and z (yaw) axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose3D {
	pub translation: Vector3<f64>,
	pub rotation: Rotation3<f64>,
}

impl Default for Pose3D {
	fn default() -> Self {
		Self {
			translation: Vector3::zeros(),
			rotation: Rotation3::identity(),
		}
	}
}

impl Pose3D {
	pub const fn new(translation: Vector3<f64>, rotation: Rotation3<f64>) -> Self {
		Self { translation, rotation }
	}

	pub fn from_xyz_rpy(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
		Self {
			translation: Vector3::new(x, y, z),
			rotation: Rotation3::from_euler_angles(roll, pitch, yaw),
		}
	}

	#[inline]
	pub fn x(&self) -> f64 {
		self.translation.x
	}
	#[inline]
	pub fn y(&self) -> f64 {
		self.translation.y
	}
	#[inline]
	pub fn z(&self) -> f64 {
		self.translation.z
	}

	pub fn x_feet(&self) -> f64 {
		self.x() / METERS_PER_FOOT
	}
	pub fn y_feet(&self) -> f64 {
		self.y() / METERS_PER_FOOT
	}
	pub fn z_feet(&self) -> f64 {
		self.z() / METERS_PER_FOOT
	}

	/// `(roll, pitch, yaw)`
	pub fn euler_angles(&self) -> (f64, f64, f64) {
		self.rotation.euler_angles()
	}

	pub fn roll(&self) -> f64 {
		self.euler_angles().0
	}
	pub fn pitch(&self) -> f64 {
		self.euler_angles().1
	}
	pub fn yaw(&self) -> f64 {
		self.euler_angles().2
	}
}

/// Estimates the 3D pose of a detected tag
pub trait PoseEstimator {
	fn estimate(&self, detection: &RawDetection) -> Result<Pose3D, PoseError>;
}

/// Estimate pose of the tag using the homography method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomographyPoseEstimator {
	pub intrinsics: CameraIntrinsics,
	/// Side length of the tag's black square, in meters
	pub tag_size: f64,
}

impl HomographyPoseEstimator {
	pub const fn new(intrinsics: CameraIntrinsics, tag_size: f64) -> Self {
		Self { intrinsics, tag_size }
	}

	pub fn for_camera(camera: &CameraConfig) -> Self {
		Self::new(CameraIntrinsics::for_camera(camera), camera.tag_size)
	}
}

impl PoseEstimator for HomographyPoseEstimator {
	fn estimate(&self, detection: &RawDetection) -> Result<Pose3D, PoseError> {
		homography_to_pose(&detection.homography, &self.intrinsics, self.tag_size)
	}
}
