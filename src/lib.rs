//! AprilTag detections, published as parallel columns on a key-value bus.
//!
//! The producer side runs a [pipeline::Pipeline] that detects tags in camera
//! frames, estimates their pose and hands them to a [packager::TagPackager].
//! Consumers read them back with an [unpacker::TagUnpacker].

pub mod bus;
pub mod columns;
pub mod detection;
pub mod detector;
pub mod packager;
pub mod pipeline;
pub mod pose;
pub mod unpacker;
pub mod util;

pub use bus::{Bus, MemoryBus, Value};
pub use detection::{DetectedTag, RawDetection};
pub use detector::{TagDetector, DetectError, DetectorBuildError, DetectorConfig, CameraConfig, TagFamily};
pub use packager::{TagPackager, FrameBatch, PackagerConfig, PublishError};
pub use pipeline::{Pipeline, PipelineError, FrameSource, VideoSink};
pub use pose::{Pose3D, PoseEstimator, PoseError, HomographyPoseEstimator, CameraIntrinsics};
pub use unpacker::{AprilTag, TagUnpacker, UnpackerConfig, UnpackError};
pub use util::TimeProfile;
