use std::{
	io::BufRead,
	path::PathBuf,
	sync::{Arc, atomic::{AtomicBool, Ordering}},
	thread,
	time::Duration,
};

use apriltag_nt::{
	bus::MemoryBus,
	detector::{CameraConfig, DetectorConfig, OpenCvCamera, OpenCvDetector, TagFamily},
	packager::{PackagerConfig, TagPackager},
	pipeline::{OverlayConfig, Pipeline, PngSink, COLOR_STREAM, GRAY_STREAM},
	pose::HomographyPoseEstimator,
	unpacker::{TagSource, TagUnpacker, UnpackerConfig},
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
	/// Camera ID
	#[arg(short, long, default_value_t=0)]
	camera: i32,
	/// Frame width, in pixels
	#[arg(long, default_value_t=640)]
	width: usize,
	/// Frame height, in pixels
	#[arg(long, default_value_t=480)]
	height: usize,
	/// Camera brightness, in percent
	#[arg(long, default_value_t=50)]
	brightness: u8,
	/// Tag family to use
	#[arg(short, long, default_value_t=TagFamily::Tag36h11)]
	family: TagFamily,
	/// Detect tags with up to this many bit errors.
	#[arg(short='a', long, default_value_t=1)]
	hamming: usize,
	/// Side length of a tag's black square, in meters
	#[arg(long, default_value_t=0.1651)]
	tag_size: f64,
	/// Horizontal focal length, in pixels
	#[arg(long, default_value_t=600.)]
	fx: f64,
	/// Vertical focal length, in pixels
	#[arg(long, default_value_t=600.)]
	fy: f64,
	/// Write the latest annotated and grayscale frames here
	#[arg(long)]
	output_dir: Option<PathBuf>,
	/// Width of tag outlines, in pixels
	#[arg(long, default_value_t=5)]
	line_thickness: usize,
	/// Publish the packed `Tags` record, and read it back instead of the columns
	#[arg(long, default_value_t=false)]
	composite: bool,
	/// How often the consumer polls the bus
	#[arg(long, default_value_t=10.)]
	poll_hz: f64,
	#[arg(long)]
	max_frames: Option<usize>,
}

fn consume(bus: MemoryBus, config: UnpackerConfig, period: Duration, shutdown: Arc<AtomicBool>) {
	let unpacker = TagUnpacker::with_config(bus, config);
	while !shutdown.load(Ordering::Acquire) {
		match unpacker.get_tags() {
			Ok(tags) => {
				for tag in tags.iter() {
					let id = tag.id.map_or_else(|| "?".to_owned(), |id| id.to_string());
					log::info!(
						"tag {id}: x={:.2}ft y={:.2}ft z={:.2}ft roll={:.3} pitch={:.3} yaw={:.3}",
						tag.x_feet(), tag.y_feet(), tag.z_feet(), tag.roll, tag.pitch, tag.yaw,
					);
				}
			},
			Err(e) => log::warn!("Unable to read tags: {e}"),
		}
		thread::sleep(period);
	}
}

fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	let camera_config = CameraConfig {
		width: args.width,
		height: args.height,
		brightness: args.brightness,
		fx: args.fx,
		fy: args.fy,
		tag_size: args.tag_size,
	};
	let detector_config = DetectorConfig {
		family: args.family,
		bits_corrected: args.hamming,
	};

	let camera = match OpenCvCamera::open(args.camera, camera_config.clone()) {
		Ok(camera) => camera,
		Err(e) => {
			log::error!("{e}");
			std::process::exit(1);
		}
	};
	let detector = match OpenCvDetector::new(detector_config) {
		Ok(detector) => detector,
		Err(e) => {
			log::error!("{e}");
			std::process::exit(1);
		}
	};

	let bus = MemoryBus::new();
	let packager = TagPackager::with_config(bus.clone(), PackagerConfig {
		publish_composite: args.composite,
		..Default::default()
	});
	let mut pipeline = Pipeline::new(camera, detector, HomographyPoseEstimator::for_camera(&camera_config), packager)
		.with_overlay(OverlayConfig { thickness: args.line_thickness, ..Default::default() });
	if let Some(dir) = &args.output_dir {
		if let Err(e) = std::fs::create_dir_all(dir) {
			log::error!("Unable to create {}: {e}", dir.display());
			std::process::exit(1);
		}
		pipeline = pipeline
			.with_color_sink(PngSink::new(dir, COLOR_STREAM))
			.with_gray_sink(PngSink::new(dir, GRAY_STREAM));
	}

	let shutdown = Arc::new(AtomicBool::new(false));

	// Stop when stdin closes or a line is entered
	{
		let shutdown = shutdown.clone();
		thread::spawn(move || {
			let mut line = String::new();
			let _ = std::io::stdin().lock().read_line(&mut line);
			log::info!("Shutting down");
			shutdown.store(true, Ordering::Release);
		});
	}

	let consumer = {
		let bus = bus.clone();
		let shutdown = shutdown.clone();
		let config = UnpackerConfig {
			source: if args.composite { TagSource::Composite } else { TagSource::Columns },
			..Default::default()
		};
		let period = Duration::from_secs_f64(1. / args.poll_hz.max(0.1));
		thread::spawn(move || consume(bus, config, period, shutdown))
	};

	let published = pipeline.run_for(&shutdown, args.max_frames);
	shutdown.store(true, Ordering::Release);
	if consumer.join().is_err() {
		log::error!("Consumer thread panicked");
	}
	log::info!("Published {published} frames ({} bus updates)", bus.updates());
}
