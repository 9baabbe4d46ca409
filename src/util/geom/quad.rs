use std::ops::{Index, IndexMut};

use arrayvec::ArrayVec;

use super::Point2D;

/// Named corner positions of a detected tag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
	BottomLeft = 0,
	BottomRight = 1,
	TopRight = 2,
	TopLeft = 3,
}

impl Corner {
	pub const fn values() -> [Corner; 4] {
		[Self::BottomLeft, Self::BottomRight, Self::TopRight, Self::TopLeft]
	}

	/// Next corner when walking the outline
	pub const fn next(&self) -> Corner {
		match self {
			Self::BottomLeft => Self::BottomRight,
			Self::BottomRight => Self::TopRight,
			Self::TopRight => Self::TopLeft,
			Self::TopLeft => Self::BottomLeft,
		}
	}
}

/// Four corners of a tag, in the order bottom-left, bottom-right, top-right, top-left.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Quadrilateral([Point2D; 4]);

impl Quadrilateral {
	pub const fn from_points(corners: [Point2D; 4]) -> Self {
		Self(corners)
	}

	pub fn from_array<T: Into<f64> + Copy>(arr: &[[T; 2]; 4]) -> Self {
		Self([
			Point2D::of(arr[0][0].into(), arr[0][1].into()),
			Point2D::of(arr[1][0].into(), arr[1][1].into()),
			Point2D::of(arr[2][0].into(), arr[2][1].into()),
			Point2D::of(arr[3][0].into(), arr[3][1].into()),
		])
	}

	/// Collect exactly four points; `None` for any other count
	pub fn try_from_iter(points: impl IntoIterator<Item = Point2D>) -> Option<Self> {
		let mut corners = ArrayVec::<Point2D, 4>::new();
		for point in points {
			corners.try_push(point).ok()?;
		}
		corners.into_inner().ok().map(Self)
	}

	pub fn as_array(&self) -> [[f64; 2]; 4] {
		[
			self.0[0].as_array(),
			self.0[1].as_array(),
			self.0[2].as_array(),
			self.0[3].as_array(),
		]
	}

	/// Mean of the four corners
	pub fn centroid(&self) -> Point2D {
		let (sx, sy) = self.0.iter()
			.fold((0., 0.), |(sx, sy), p| (sx + p.x(), sy + p.y()));
		Point2D::of(sx / 4., sy / 4.)
	}

	/// Unsigned area (shoelace formula)
	pub fn area(&self) -> f64 {
		let mut acc = 0.;
		for i in 0..4 {
			let p = self.0[i];
			let q = self.0[(i + 1) % 4];
			acc += p.x() * q.y() - q.x() * p.y();
		}
		(acc / 2.).abs()
	}

	/// Outline segments, starting at the bottom-left corner
	pub fn edges(&self) -> impl Iterator<Item = (Corner, Point2D, Point2D)> + '_ {
		Corner::values()
			.into_iter()
			.map(|c| (c, self[c], self[c.next()]))
	}
}

impl Index<usize> for Quadrilateral {
	type Output = Point2D;

	fn index(&self, index: usize) -> &Self::Output {
		&self.0[index]
	}
}

impl IndexMut<usize> for Quadrilateral {
	fn index_mut(&mut self, index: usize) -> &mut Self::Output {
		&mut self.0[index]
	}
}

impl Index<Corner> for Quadrilateral {
	type Output = Point2D;

	fn index(&self, index: Corner) -> &Self::Output {
		&self.0[index as usize]
	}
}
