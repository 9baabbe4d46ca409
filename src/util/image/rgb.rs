/// 8-bit RGB pixel
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Hash)]
#[repr(transparent)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const BLACK: Rgb = Rgb([0, 0, 0]);
    pub const WHITE: Rgb = Rgb([255, 255, 255]);
    pub const YELLOW: Rgb = Rgb([255, 255, 0]);
    pub const MAGENTA: Rgb = Rgb([255, 0, 255]);
    pub const CYAN: Rgb = Rgb([0, 255, 255]);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    /// Build from OpenCV-style BGR channel order
    #[inline]
    pub const fn from_bgr(bgr: [u8; 3]) -> Self {
        Self([bgr[2], bgr[1], bgr[0]])
    }

    #[inline]
    pub const fn to_bgr(self) -> [u8; 3] {
        [self.0[2], self.0[1], self.0[0]]
    }

    /// ITU-R BT.601 luma, fixed point (Y = 0.299 R + 0.587 G + 0.114 B)
    #[inline]
    pub fn luma(&self) -> u8 {
        const R: u32 = 4899;
        const G: u32 = 9617;
        const B: u32 = 1868;
        let [r, g, b] = self.0;
        let y = (r as u32 * R + g as u32 * G + b as u32 * B + (1 << 13)) >> 14;
        y.min(255) as u8
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(value: [u8; 3]) -> Self {
        Self(value)
    }
}

impl From<u8> for Rgb {
    fn from(value: u8) -> Self {
        Self([value; 3])
    }
}

#[cfg(test)]
mod test {
    use super::Rgb;

    #[test]
    fn luma_extremes() {
        assert_eq!(Rgb::BLACK.luma(), 0);
        assert_eq!(Rgb::WHITE.luma(), 255);
        assert_eq!(Rgb::from(128).luma(), 128);
    }

    #[test]
    fn luma_weights_green_most() {
        let r = Rgb::new(255, 0, 0).luma();
        let g = Rgb::new(0, 255, 0).luma();
        let b = Rgb::new(0, 0, 255).luma();
        assert!(g > r && r > b);
        assert_eq!(r, 76);
        assert_eq!(g, 150);
        assert_eq!(b, 29);
    }

    #[test]
    fn bgr_order() {
        let px = Rgb::from_bgr([1, 2, 3]);
        assert_eq!(px, Rgb::new(3, 2, 1));
        assert_eq!(px.to_bgr(), [1, 2, 3]);
    }
}
