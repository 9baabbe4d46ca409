mod rgb;
mod convert;

use std::ops::{Index, IndexMut};

use super::geom::Point2D;

pub use rgb::Rgb;

/// Row-major image buffer
#[derive(Clone, PartialEq, Eq)]
pub struct Image<T = u8> {
    width: usize,
    height: usize,
    buf: Box<[T]>,
}

pub type ImageY8 = Image<u8>;
pub type ImageRGB8 = Image<Rgb>;

impl<T> std::fmt::Debug for Image<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl<T: Copy + Default> Image<T> {
    /// Allocate an image filled with the default pixel
    pub fn zeroed(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            buf: vec![T::default(); width * height].into_boxed_slice(),
        }
    }

    /// Resize in place, keeping the allocation if the pixel count is unchanged
    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width == width && self.height == height {
            return;
        }
        if self.buf.len() != width * height {
            self.buf = vec![T::default(); width * height].into_boxed_slice();
        }
        self.width = width;
        self.height = height;
    }
}

impl<T> Image<T> {
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut buf = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                buf.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            buf: buf.into_boxed_slice(),
        }
    }

    #[inline(always)]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[T] {
        &self.buf
    }

    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.buf
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if x < self.width && y < self.height {
            Some(&self.buf[x + y * self.width])
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        if x < self.width && y < self.height {
            Some(&mut self.buf[x + y * self.width])
        } else {
            None
        }
    }

    /// Iterate rows as slices
    pub fn rows(&self) -> impl Iterator<Item = (usize, &[T])> {
        self.buf.chunks_exact(self.width.max(1)).enumerate()
    }

    pub fn enumerate_pixels(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        let width = self.width.max(1);
        self.buf.iter()
            .enumerate()
            .map(move |(i, v)| ((i % width, i / width), v))
    }
}

impl<T: Copy> Image<T> {
    /// Set a pixel, ignoring coordinates outside the image
    #[inline]
    pub fn put(&mut self, x: isize, y: isize, color: T) {
        if x < 0 || y < 0 {
            return;
        }
        if let Some(px) = self.get_mut(x as usize, y as usize) {
            *px = color;
        }
    }

    /// Fill a square of side `thickness` centered at `(cx, cy)`
    fn stamp(&mut self, cx: isize, cy: isize, color: T, thickness: usize) {
        let lo = (thickness.max(1) as isize - 1) / 2;
        let hi = thickness.max(1) as isize / 2;
        for y in (cy - lo)..=(cy + hi) {
            for x in (cx - lo)..=(cx + hi) {
                self.put(x, y, color);
            }
        }
    }

    /// Draw a line segment `thickness` pixels wide.
    ///
    /// Parts of the line outside the image are clipped.
    pub fn draw_line(&mut self, p0: Point2D, p1: Point2D, color: T, thickness: usize) {
        let dist = p0.distance_to(&p1);
        // Sample twice per pixel of length
        let num_steps = f64::ceil(dist * 2.) as usize;

        if num_steps == 0 {
            self.stamp(p0.x().round() as isize, p0.y().round() as isize, color, thickness);
            return;
        }

        for i in 0..=num_steps {
            let c = p0.lerp(&p1, (i as f64) / (num_steps as f64));
            self.stamp(c.x().round() as isize, c.y().round() as isize, color, thickness);
        }
    }
}

impl<T> Index<(usize, usize)> for Image<T> {
    type Output = T;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        let (x, y) = index;

        assert!(x < self.width);
        assert!(y < self.height);

        &self.buf[x + (y * self.width)]
    }
}

impl<T> IndexMut<(usize, usize)> for Image<T> {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        let (x, y) = index;

        assert!(x < self.width);
        assert!(y < self.height);

        &mut self.buf[x + (y * self.width)]
    }
}

impl ImageRGB8 {
    /// Convert to grayscale, reusing `dst`'s allocation
    pub fn to_gray_into(&self, dst: &mut ImageY8) {
        dst.resize(self.width, self.height);
        for (src, dst) in self.buf.iter().zip(dst.buf.iter_mut()) {
            *dst = src.luma();
        }
    }

    pub fn to_gray(&self) -> ImageY8 {
        let mut dst = ImageY8::zeroed(self.width, self.height);
        self.to_gray_into(&mut dst);
        dst
    }
}
