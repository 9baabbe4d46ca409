//! The per-frame detect, estimate and publish loop.
mod overlay;
mod sink;
mod source;

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use thiserror::Error;

use crate::{
	bus::Bus,
	detection::{DetectedTag, RawDetection},
	detector::{DetectError, TagDetector},
	packager::{PublishError, TagPackager},
	pose::PoseEstimator,
	util::{ImageRGB8, ImageY8, Rgb, TimeProfile},
};

pub use overlay::{OverlayConfig, draw_tag_outline};
pub use sink::{VideoSink, NullSink, PngSink};
pub use source::{FrameSource, ImageSequenceSource, SourceError};

/// Name of the annotated color stream
pub const COLOR_STREAM: &str = "Rectangle";
/// Name of the grayscale stream
pub const GRAY_STREAM: &str = "GreyScale";

/// Error processing a single frame
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
	#[error("Detection failed")]
	Detect(#[from] #[source] DetectError),
	#[error("Unable to publish tags")]
	Publish(#[from] #[source] PublishError),
}

/// What happened to one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
	/// The source didn't produce a frame. Nothing was published.
	CaptureFailed,
	/// Tags were published
	Published {
		timestamp: u64,
		/// Tags seen by the detector
		detected: usize,
		/// Tags with a pose, i.e., those published
		published: usize,
	},
}

/// Estimate a pose for each detection.
///
/// Output order matches input order. Detections whose pose can't be
/// recovered are dropped.
pub fn estimate_tags<E: PoseEstimator + Sync + ?Sized>(detections: Vec<RawDetection>, estimator: &E) -> Vec<DetectedTag> {
	detections.into_par_iter()
		.filter_map(|detection| match estimator.estimate(&detection) {
			Ok(pose) => Some(DetectedTag::new(detection, pose)),
			Err(e) => {
				log::warn!("Dropping tag {}: {e}", detection.id);
				None
			}
		})
		.collect()
}

/// Frame loop tying a camera, detector and pose estimator to the bus.
pub struct Pipeline<B: Bus> {
	source: Box<dyn FrameSource + Send>,
	detector: Box<dyn TagDetector + Send>,
	estimator: Box<dyn PoseEstimator + Send + Sync>,
	packager: TagPackager<B>,
	color_sink: Box<dyn VideoSink<Rgb> + Send>,
	gray_sink: Box<dyn VideoSink<u8> + Send>,
	pub overlay: OverlayConfig,
	frame: ImageRGB8,
	gray: ImageY8,
	profile: TimeProfile,
}

impl<B: Bus> Pipeline<B> {
	pub fn new(
		source: impl FrameSource + Send + 'static,
		detector: impl TagDetector + Send + 'static,
		estimator: impl PoseEstimator + Send + Sync + 'static,
		packager: TagPackager<B>,
	) -> Self {
		Self {
			source: Box::new(source),
			detector: Box::new(detector),
			estimator: Box::new(estimator),
			packager,
			color_sink: Box::new(NullSink),
			gray_sink: Box::new(NullSink),
			overlay: OverlayConfig::default(),
			frame: ImageRGB8::zeroed(0, 0),
			gray: ImageY8::zeroed(0, 0),
			profile: TimeProfile::default(),
		}
	}

	/// Set where annotated color frames go
	pub fn with_color_sink(mut self, sink: impl VideoSink<Rgb> + Send + 'static) -> Self {
		self.color_sink = Box::new(sink);
		self
	}

	/// Set where grayscale frames go
	pub fn with_gray_sink(mut self, sink: impl VideoSink<u8> + Send + 'static) -> Self {
		self.gray_sink = Box::new(sink);
		self
	}

	pub fn with_overlay(mut self, overlay: OverlayConfig) -> Self {
		self.overlay = overlay;
		self
	}

	pub fn packager(&self) -> &TagPackager<B> {
		&self.packager
	}

	/// Timing of the last frame
	pub fn profile(&self) -> &TimeProfile {
		&self.profile
	}

	/// Process one frame
	pub fn run_once(&mut self) -> Result<FrameOutcome, PipelineError> {
		self.profile.clear();

		let timestamp = self.source.grab_frame(&mut self.frame);
		if timestamp == 0 {
			let message = self.source.error();
			log::warn!("Frame capture failed: {message}");
			self.color_sink.notify_error(message);
			return Ok(FrameOutcome::CaptureFailed);
		}
		self.profile.stamp("capture");

		self.frame.to_gray_into(&mut self.gray);
		self.profile.stamp("grayscale");

		let detections = self.detector.detect(&self.gray)?;
		let detected = detections.len();
		let outlines = detections.iter()
			.map(|detection| detection.corners)
			.collect::<Vec<_>>();
		self.profile.stamp("detect");

		let tags = estimate_tags(detections, self.estimator.as_ref());
		self.profile.stamp("estimate");

		let mut batch = self.packager.begin_frame()?;
		for tag in tags.iter() {
			batch.add_tag(tag);
		}
		batch.publish_all_tags()?;
		self.profile.stamp("publish");

		// Every detection is outlined, including those without a pose
		for corners in outlines.iter() {
			draw_tag_outline(&mut self.frame, corners, &self.overlay);
		}
		self.profile.stamp("draw");

		self.color_sink.put_frame(&self.frame);
		self.gray_sink.put_frame(&self.gray);
		self.profile.stamp("output");

		log::debug!("Frame {timestamp}: {} tags\n{}", tags.len(), self.profile);
		Ok(FrameOutcome::Published {
			timestamp,
			detected,
			published: tags.len(),
		})
	}

	/// Process frames until `shutdown` is set.
	///
	/// Errors in a frame are logged and the frame is skipped. Returns the
	/// number of frames whose tags were published.
	pub fn run(&mut self, shutdown: &AtomicBool) -> usize {
		self.run_for(shutdown, None)
	}

	/// Like [Pipeline::run], stopping after at most `max_frames` iterations
	pub fn run_for(&mut self, shutdown: &AtomicBool, max_frames: Option<usize>) -> usize {
		let mut published = 0;
		let mut iterations = 0;
		while !shutdown.load(Ordering::Acquire) {
			if max_frames.is_some_and(|max| iterations >= max) {
				break;
			}
			iterations += 1;
			match self.run_once() {
				Ok(FrameOutcome::Published { .. }) => published += 1,
				Ok(FrameOutcome::CaptureFailed) => {},
				Err(e) => log::error!("Frame skipped: {e}"),
			}
		}
		log::info!("Pipeline stopped after {published} frames");
		published
	}
}
