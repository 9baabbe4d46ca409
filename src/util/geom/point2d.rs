use std::{ops::{Add, Sub, Mul}, fmt::Debug};

use nalgebra::Vector2;

/// Pixel coordinate in an image
#[derive(Copy, Clone, PartialEq)]
pub struct Point2D(Vector2<f64>);

impl Debug for Point2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Point2D")
            .field(&self.x())
            .field(&self.y())
            .finish()
    }
}

impl Default for Point2D {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add<Vector2<f64>> for &Point2D {
    type Output = Point2D;

    fn add(self, rhs: Vector2<f64>) -> Self::Output {
        Point2D(self.0 + rhs)
    }
}

impl Sub<&Point2D> for &Point2D {
    type Output = Vector2<f64>;

    fn sub(self, rhs: &Point2D) -> Self::Output {
        self.0 - rhs.0
    }
}

impl Mul<f64> for Point2D {
    type Output = Point2D;

    fn mul(self, rhs: f64) -> Self::Output {
        Point2D(self.0 * rhs)
    }
}

impl Point2D {
    #[inline(always)]
    pub fn zero() -> Self {
        Self(Vector2::zeros())
    }

    #[inline]
    pub fn of(x: f64, y: f64) -> Self {
        Self(Vector2::new(x, y))
    }

    #[inline(always)]
    pub fn x(&self) -> f64 {
        self.0.x
    }

    #[inline(always)]
    pub fn y(&self) -> f64 {
        self.0.y
    }

    #[inline(always)]
    pub const fn vec(&self) -> &Vector2<f64> {
        &self.0
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        (self - other).norm()
    }

    /// Point a fraction `t` of the way from `self` to `other`
    #[inline]
    pub fn lerp(&self, other: &Point2D, t: f64) -> Point2D {
        self + (other - self) * t
    }

    pub fn as_array(&self) -> [f64; 2] {
        [self.x(), self.y()]
    }
}

impl From<Point2D> for [f64; 2] {
    fn from(value: Point2D) -> Self {
        value.as_array()
    }
}

impl From<[f64; 2]> for Point2D {
    fn from(value: [f64; 2]) -> Self {
        Self::of(value[0], value[1])
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self::of(x, y)
    }
}
