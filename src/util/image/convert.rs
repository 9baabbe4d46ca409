//! Conversions to and from the `image` crate's buffers
use ::image::{GrayImage, RgbImage};

use super::{ImageRGB8, ImageY8, Rgb};

impl ImageRGB8 {
    /// Copy from an `image` buffer, reusing this allocation when the size matches
    pub fn copy_from_rgb_image(&mut self, src: &RgbImage) {
        self.resize(src.width() as usize, src.height() as usize);
        for (dst, px) in self.as_slice_mut().iter_mut().zip(src.pixels()) {
            *dst = Rgb(px.0);
        }
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        let mut buf = RgbImage::new(self.width() as u32, self.height() as u32);
        for (dst, src) in buf.pixels_mut().zip(self.as_slice().iter()) {
            dst.0 = src.0;
        }
        buf
    }
}

impl ImageY8 {
    pub fn to_gray_image(&self) -> GrayImage {
        let mut buf = GrayImage::new(self.width() as u32, self.height() as u32);
        for (dst, src) in buf.pixels_mut().zip(self.as_slice().iter()) {
            dst.0 = [*src];
        }
        buf
    }
}
