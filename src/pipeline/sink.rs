use std::path::{Path, PathBuf};

use crate::util::{Image, ImageRGB8, ImageY8, Rgb};

/// Receives processed frames, e.g., a video stream
pub trait VideoSink<T> {
	fn put_frame(&mut self, frame: &Image<T>);

	/// Report that no frame could be produced
	fn notify_error(&mut self, message: &str);
}

impl<T, S: VideoSink<T> + ?Sized> VideoSink<T> for Box<S> {
	fn put_frame(&mut self, frame: &Image<T>) {
		(**self).put_frame(frame)
	}

	fn notify_error(&mut self, message: &str) {
		(**self).notify_error(message)
	}
}

/// Discards frames
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl<T> VideoSink<T> for NullSink {
	fn put_frame(&mut self, _frame: &Image<T>) {}

	fn notify_error(&mut self, _message: &str) {}
}

/// Writes the latest frame of a named stream to `<dir>/<name>.png`
#[derive(Debug, Clone)]
pub struct PngSink {
	name: String,
	path: PathBuf,
	frames: usize,
	last_error: Option<String>,
}

impl PngSink {
	pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
		Self {
			name: name.to_owned(),
			path: dir.as_ref().join(format!("{name}.png")),
			frames: 0,
			last_error: None,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Frames written successfully
	pub fn frames(&self) -> usize {
		self.frames
	}

	pub fn last_error(&self) -> Option<&str> {
		self.last_error.as_deref()
	}

	fn save(&mut self, result: ::image::ImageResult<()>) {
		match result {
			Ok(()) => self.frames += 1,
			Err(e) => log::error!("Unable to write {}: {e}", self.path.display()),
		}
	}
}

impl VideoSink<Rgb> for PngSink {
	fn put_frame(&mut self, frame: &ImageRGB8) {
		let result = frame.to_rgb_image().save(&self.path);
		self.save(result);
	}

	fn notify_error(&mut self, message: &str) {
		log::warn!("{}: {message}", self.name);
		self.last_error = Some(message.to_owned());
	}
}

impl VideoSink<u8> for PngSink {
	fn put_frame(&mut self, frame: &ImageY8) {
		let result = frame.to_gray_image().save(&self.path);
		self.save(result);
	}

	fn notify_error(&mut self, message: &str) {
		log::warn!("{}: {message}", self.name);
		self.last_error = Some(message.to_owned());
	}
}
