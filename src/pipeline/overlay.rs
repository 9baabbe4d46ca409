use crate::util::{geom::{Quadrilateral, Corner}, ImageRGB8, Rgb};

/// How detected tags are outlined on the output frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
	/// Line width, in pixels
	pub thickness: usize,
	/// Color of the edge starting at each corner, indexed by [Corner]
	pub edge_colors: [Rgb; 4],
}

impl Default for OverlayConfig {
	fn default() -> Self {
		Self {
			thickness: 5,
			edge_colors: [
				Rgb::BLACK,   // bottom-left -> bottom-right
				Rgb::YELLOW,  // bottom-right -> top-right
				Rgb::MAGENTA, // top-right -> top-left
				Rgb::CYAN,    // top-left -> bottom-left
			],
		}
	}
}

impl OverlayConfig {
	pub fn edge_color(&self, start: Corner) -> Rgb {
		self.edge_colors[start as usize]
	}
}

/// Draw a tag's outline, one color per edge
pub fn draw_tag_outline(frame: &mut ImageRGB8, corners: &Quadrilateral, config: &OverlayConfig) {
	for (start, p0, p1) in corners.edges() {
		frame.draw_line(p0, p1, config.edge_color(start), config.thickness);
	}
}

#[cfg(test)]
mod test {
	use crate::util::{geom::Quadrilateral, ImageRGB8, Rgb};

	use super::{draw_tag_outline, OverlayConfig};

	#[test]
	fn edge_colors() {
		let mut frame = ImageRGB8::from_fn(64, 64, |_, _| Rgb::WHITE);
		// Image y grows downwards, so the bottom edge has the larger y
		let corners = Quadrilateral::from_array(&[[10., 50.], [50., 50.], [50., 10.], [10., 10.]]);
		let config = OverlayConfig { thickness: 1, ..Default::default() };
		draw_tag_outline(&mut frame, &corners, &config);

		assert_eq!(frame[(30, 50)], Rgb::BLACK);
		assert_eq!(frame[(50, 30)], Rgb::YELLOW);
		assert_eq!(frame[(30, 10)], Rgb::MAGENTA);
		assert_eq!(frame[(10, 30)], Rgb::CYAN);
		// Interior untouched
		assert_eq!(frame[(30, 30)], Rgb::WHITE);
	}

	#[test]
	fn default_thickness() {
		let mut frame = ImageRGB8::from_fn(64, 64, |_, _| Rgb::WHITE);
		let corners = Quadrilateral::from_array(&[[10., 50.], [50., 50.], [50., 10.], [10., 10.]]);
		draw_tag_outline(&mut frame, &corners, &OverlayConfig::default());
		assert_eq!(frame[(30, 48)], Rgb::BLACK);
		assert_eq!(frame[(30, 52)], Rgb::BLACK);
		assert_eq!(frame[(30, 53)], Rgb::WHITE);
	}
}
