use std::{path::{Path, PathBuf}, io, time::Instant};

use thiserror::Error;

use crate::util::ImageRGB8;

/// A camera, or anything else that produces color frames.
pub trait FrameSource {
	/// Capture the next frame into `frame`.
	///
	/// Returns the capture timestamp in microseconds, or 0 if the capture
	/// failed. On failure, [FrameSource::error] describes what went wrong.
	fn grab_frame(&mut self, frame: &mut ImageRGB8) -> u64;

	/// Description of the most recent failure
	fn error(&self) -> &str;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
	fn grab_frame(&mut self, frame: &mut ImageRGB8) -> u64 {
		(**self).grab_frame(frame)
	}

	fn error(&self) -> &str {
		(**self).error()
	}
}

#[derive(Debug, Error)]
pub enum SourceError {
	#[error("Unable to list {path}")]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("No images in {0}")]
	Empty(PathBuf),
}

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "pnm", "pgm", "ppm"];

/// Replays image files, in name order
pub struct ImageSequenceSource {
	paths: Vec<PathBuf>,
	next: usize,
	/// Start over after the last image
	pub looping: bool,
	start: Instant,
	error: String,
}

impl ImageSequenceSource {
	pub fn from_paths(paths: Vec<PathBuf>) -> Self {
		Self {
			paths,
			next: 0,
			looping: false,
			start: Instant::now(),
			error: String::new(),
		}
	}

	/// Every image file directly inside `dir`
	pub fn open_dir(dir: impl AsRef<Path>) -> Result<Self, SourceError> {
		let dir = dir.as_ref();
		let io_err = |source| SourceError::Io { path: dir.to_owned(), source };

		let mut paths = Vec::new();
		for entry in std::fs::read_dir(dir).map_err(io_err)? {
			let path = entry.map_err(io_err)?.path();
			let is_image = path.extension()
				.and_then(|ext| ext.to_str())
				.map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
				.unwrap_or(false);
			if is_image {
				paths.push(path);
			}
		}
		if paths.is_empty() {
			return Err(SourceError::Empty(dir.to_owned()));
		}
		paths.sort();
		log::info!("Replaying {} images from {}", paths.len(), dir.display());
		Ok(Self::from_paths(paths))
	}

	pub fn len(&self) -> usize {
		self.paths.len()
	}

	pub fn is_empty(&self) -> bool {
		self.paths.is_empty()
	}

	fn fail(&mut self, message: String) -> u64 {
		self.error = message;
		0
	}
}

impl FrameSource for ImageSequenceSource {
	fn grab_frame(&mut self, frame: &mut ImageRGB8) -> u64 {
		if self.next >= self.paths.len() {
			if !self.looping || self.paths.is_empty() {
				return self.fail("end of image sequence".into());
			}
			self.next = 0;
		}
		let path = &self.paths[self.next];
		self.next += 1;

		match ::image::open(path) {
			Ok(img) => {
				frame.copy_from_rgb_image(&img.to_rgb8());
				(self.start.elapsed().as_micros() as u64).max(1)
			},
			Err(e) => {
				let message = format!("{}: {e}", path.display());
				self.fail(message)
			}
		}
	}

	fn error(&self) -> &str {
		&self.error
	}
}
