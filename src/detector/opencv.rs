//! Camera capture and tag detection backed by OpenCV
use std::time::Instant;

use opencv::{
	core::{Mat, Point2f, Vector},
	objdetect::{
		get_predefined_dictionary,
		ArucoDetector,
		DetectorParameters,
		PredefinedDictionaryType,
		RefineParameters,
		CORNER_REFINE_APRILTAG,
	},
	prelude::*,
	videoio::{VideoCapture, VideoCaptureAPIs, VideoCaptureProperties},
};

use crate::{
	detection::RawDetection,
	pipeline::FrameSource,
	util::{geom::{Point2D, Quadrilateral}, ImageRGB8, ImageY8, Rgb},
};

use super::{CameraConfig, DetectorConfig, DetectError, DetectorBuildError, ImageDimensionError, TagDetector, TagFamily};

/// Tag detector using OpenCV's ArUco module
pub struct OpenCvDetector {
	detector: ArucoDetector,
	config: DetectorConfig,
}

impl OpenCvDetector {
	pub fn new(config: DetectorConfig) -> Result<Self, DetectorBuildError> {
		let dictionary_type = match config.family {
			TagFamily::Tag16h5 => PredefinedDictionaryType::DICT_APRILTAG_16h5,
			TagFamily::Tag25h9 => PredefinedDictionaryType::DICT_APRILTAG_25h9,
			TagFamily::Tag36h10 => PredefinedDictionaryType::DICT_APRILTAG_36h10,
			TagFamily::Tag36h11 => PredefinedDictionaryType::DICT_APRILTAG_36h11,
		};
		let dictionary = get_predefined_dictionary(dictionary_type)?;

		let mut params = DetectorParameters::default()?;
		params.set_corner_refinement_method(CORNER_REFINE_APRILTAG as i32);
		let max_correction = dictionary.max_correction_bits();
		if max_correction > 0 {
			let rate = (config.bits_corrected as f64 / max_correction as f64).min(1.);
			params.set_error_correction_rate(rate);
		}

		let detector = ArucoDetector::new(&dictionary, &params, RefineParameters::new(10., 3., true)?)?;
		log::info!("OpenCV detector ready: {} ({} bits corrected)", config.family, config.bits_corrected);
		Ok(Self { detector, config })
	}

	pub fn config(&self) -> &DetectorConfig {
		&self.config
	}
}

/// OpenCV reports corners clockwise from the top-left
fn corners_from_cv(points: &Vector<Point2f>) -> Option<Quadrilateral> {
	let quad = Quadrilateral::try_from_iter(points.iter().map(|p| Point2D::of(p.x as f64, p.y as f64)))?;
	Some(Quadrilateral::from_points([quad[3], quad[2], quad[1], quad[0]]))
}

impl TagDetector for OpenCvDetector {
	fn detect(&mut self, image: &ImageY8) -> Result<Vec<RawDetection>, DetectError> {
		if image.is_empty() {
			return Err(ImageDimensionError::Empty { width: image.width(), height: image.height() }.into());
		}
		let mat = Mat::from_slice(image.as_slice())?;
		let mat = mat.reshape(1, image.height() as i32)?;

		let mut corners = Vector::<Vector<Point2f>>::new();
		let mut ids = Vector::<i32>::new();
		let mut rejected = Vector::<Vector<Point2f>>::new();
		self.detector.detect_markers(&mat, &mut corners, &mut ids, &mut rejected)?;

		let mut detections = Vec::with_capacity(ids.len());
		for (points, id) in corners.iter().zip(ids.iter()) {
			let Some(quad) = corners_from_cv(&points) else {
				log::warn!("Tag {id} has {} corners", points.len());
				continue;
			};
			let Ok(id) = usize::try_from(id) else {
				continue;
			};
			match RawDetection::from_corners(id, quad) {
				Ok(detection) => detections.push(detection),
				Err(e) => log::debug!("Skipping tag {id}: {e}"),
			}
		}
		Ok(detections)
	}
}

/// Video capture device
pub struct OpenCvCamera {
	capture: VideoCapture,
	config: CameraConfig,
	mat: Mat,
	start: Instant,
	error: String,
}

impl OpenCvCamera {
	pub fn open(index: i32, config: CameraConfig) -> Result<Self, DetectorBuildError> {
		let mut capture = VideoCapture::new(index, VideoCaptureAPIs::CAP_ANY as i32)?;
		if !capture.is_opened()? {
			return Err(DetectorBuildError::Backend(format!("Unable to open camera {index}")));
		}
		capture.set(VideoCaptureProperties::CAP_PROP_FRAME_WIDTH as i32, config.width as f64)?;
		capture.set(VideoCaptureProperties::CAP_PROP_FRAME_HEIGHT as i32, config.height as f64)?;
		capture.set(VideoCaptureProperties::CAP_PROP_BRIGHTNESS as i32, config.brightness as f64)?;
		log::info!("Camera {index}: {}x{}, brightness {}", config.width, config.height, config.brightness);

		Ok(Self {
			capture,
			config,
			mat: Mat::default(),
			start: Instant::now(),
			error: String::new(),
		})
	}

	fn read(&mut self, frame: &mut ImageRGB8) -> Result<(), String> {
		match self.capture.read(&mut self.mat) {
			Ok(true) => {},
			Ok(false) => return Err("no frame available".into()),
			Err(e) => return Err(e.to_string()),
		}
		let width = self.mat.cols().max(0) as usize;
		let height = self.mat.rows().max(0) as usize;
		self.config.check_dimensions(width, height)
			.map_err(|e| e.to_string())?;

		let data = self.mat.data_bytes().map_err(|e| e.to_string())?;
		frame.resize(width, height);
		for (dst, bgr) in frame.as_slice_mut().iter_mut().zip(data.chunks_exact(3)) {
			*dst = Rgb::from_bgr([bgr[0], bgr[1], bgr[2]]);
		}
		Ok(())
	}
}

impl FrameSource for OpenCvCamera {
	fn grab_frame(&mut self, frame: &mut ImageRGB8) -> u64 {
		match self.read(frame) {
			Ok(()) => (self.start.elapsed().as_micros() as u64).max(1),
			Err(e) => {
				self.error = e;
				0
			}
		}
	}

	fn error(&self) -> &str {
		&self.error
	}
}
