#![allow(non_snake_case)]

use nalgebra::{Matrix3, SMatrix, SVector, Rotation3, Vector3};

use crate::util::geom::Quadrilateral;

use super::{CameraIntrinsics, Pose3D, PoseError};

/// Corners of the "ideal" tag, in the same order as [Quadrilateral]'s corners.
pub const IDEAL_CORNERS: [[f64; 2]; 4] = [
	[-1., -1.],
	[ 1., -1.],
	[ 1.,  1.],
	[-1.,  1.],
];

/// Quads smaller than this (in square pixels) have no meaningful homography
const MIN_QUAD_AREA: f64 = 1e-6;

/// Project `(x, y)` through `H`
#[inline]
pub fn homography_project(H: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
	let v = H * Vector3::new(x, y, 1.);
	[v.x / v.z, v.y / v.z]
}

/// Compute the homography mapping the ideal tag (corners at (-1,-1), (1,-1),
/// (1,1), (-1,1)) onto `corners`, normalized so that `H[(2, 2)] == 1`.
pub fn homography_from_corners(corners: &Quadrilateral) -> Result<Matrix3<f64>, PoseError> {
	if !(corners.area() > MIN_QUAD_AREA) {
		return Err(PoseError::DegenerateCorners);
	}

	let mut A = SMatrix::<f64, 8, 8>::zeros();
	let mut b = SVector::<f64, 8>::zeros();

	for (i, [x, y]) in IDEAL_CORNERS.into_iter().enumerate() {
		let u = corners[i].x();
		let v = corners[i].y();
		let r = 2 * i;

		A[(r, 0)] = x;
		A[(r, 1)] = y;
		A[(r, 2)] = 1.;
		A[(r, 6)] = -u * x;
		A[(r, 7)] = -u * y;
		b[r] = u;

		A[(r + 1, 3)] = x;
		A[(r + 1, 4)] = y;
		A[(r + 1, 5)] = 1.;
		A[(r + 1, 6)] = -v * x;
		A[(r + 1, 7)] = -v * y;
		b[r + 1] = v;
	}

	let h = A.lu()
		.solve(&b)
		.ok_or(PoseError::DegenerateCorners)?;

	let H = Matrix3::new(
		h[0], h[1], h[2],
		h[3], h[4], h[5],
		h[6], h[7], 1.,
	);
	if H.iter().all(|v| v.is_finite()) {
		Ok(H)
	} else {
		Err(PoseError::DegenerateCorners)
	}
}

/// Recover the tag pose from its homography.
///
/// Assuming the projection
/// ```text
/// [u v 1]' ~ K [R | t] [s*x s*y 0 1]'
/// ```
/// where `s` is half the tag's side length, `K⁻¹H` is proportional to
/// `[s*r0 s*r1 t]`. The scale is recovered by requiring the rotation columns
/// to be unit length (geometric mean of both), and its sign by requiring the
/// tag to be in front of the camera (`t.z > 0`).
pub fn homography_to_pose(H: &Matrix3<f64>, intrinsics: &CameraIntrinsics, tag_size: f64) -> Result<Pose3D, PoseError> {
	let M = intrinsics.inv_matrix() * H;

	let m0 = M.column(0).into_owned();
	let m1 = M.column(1).into_owned();
	let m2 = M.column(2).into_owned();

	let length0 = m0.norm();
	let length1 = m1.norm();
	if !(length0 > 0. && length1 > 0.) || !length0.is_finite() || !length1.is_finite() {
		return Err(PoseError::DegenerateHomography);
	}

	let k = {
		let k = (length0 * length1).sqrt().recip();
		if m2.z < 0. { -k } else { k }
	};

	let r0 = m0 * k;
	let r1 = m1 * k;
	// Third column is the cross product of the other two
	let r2 = r0.cross(&r1);
	let t = m2 * (k * tag_size / 2.);

	let R = Matrix3::from_columns(&[r0, r1, r2]);

	// Polar decomposition makes the rotation matrix proper
	let svd = R.svd(true, true);
	let (Some(mut u), Some(v_t)) = (svd.u, svd.v_t) else {
		return Err(PoseError::DegenerateHomography);
	};
	let mut R = u * v_t;
	if R.determinant() < 0. {
		u.column_mut(2).neg_mut();
		R = u * v_t;
	}

	Ok(Pose3D::new(t, Rotation3::from_matrix_unchecked(R)))
}
