//! Reads tags back off the bus.
use nalgebra::Vector3;
use thiserror::Error;

use crate::{
	bus::{Bus, BusError, Table, StructArray},
	columns::{TagColumns, TagRow, DecodeError, COLUMN_NAMES, TABLE_NAME, IDS, GENERATION, TAGS, TAGS_GENERATION},
	pose::{Pose3D, METERS_PER_FOOT},
	util::geom::Point2D,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum UnpackError {
	/// The producer kept rewriting the table while we were reading it
	#[error("No consistent snapshot after {attempts} attempts")]
	TornSnapshot {
		attempts: usize,
	},
	/// The producer didn't write the packed `Tags` record for its latest frame
	#[error("No Tags record for generation {generation}")]
	MissingComposite {
		generation: i64,
	},
	#[error(transparent)]
	Bus(#[from] BusError),
	#[error("Malformed tag data")]
	Decode(#[from] #[source] DecodeError),
}

/// Where to read tags from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagSource {
	/// The parallel float columns
	#[default]
	Columns,
	/// The packed `Tags` record
	Composite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackerConfig {
	pub table: String,
	/// Number of reads before giving up on a consistent snapshot
	pub max_attempts: usize,
	pub source: TagSource,
}

impl Default for UnpackerConfig {
	fn default() -> Self {
		Self {
			table: TABLE_NAME.to_owned(),
			max_attempts: 16,
			source: TagSource::Columns,
		}
	}
}

/// A tag as seen by a consumer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AprilTag {
	/// Absent when the producer doesn't publish ids
	pub id: Option<usize>,
	/// Center, in image pixels
	pub center: Point2D,
	/// Position relative to the camera, in meters
	pub position: Vector3<f64>,
	pub roll: f64,
	pub pitch: f64,
	pub yaw: f64,
}

impl AprilTag {
	fn from_row(row: &TagRow, has_id: bool) -> Result<Self, DecodeError> {
		let id = if has_id {
			Some(usize::try_from(row.id).map_err(|_| DecodeError::NegativeId(row.id))?)
		} else {
			None
		};
		Ok(Self {
			id,
			center: Point2D::of(row.center_x, row.center_y),
			position: Vector3::new(row.x, row.y, row.z),
			roll: row.roll,
			pitch: row.pitch,
			yaw: row.yaw,
		})
	}

	pub fn x(&self) -> f64 {
		self.position.x
	}
	pub fn y(&self) -> f64 {
		self.position.y
	}
	pub fn z(&self) -> f64 {
		self.position.z
	}

	pub fn x_feet(&self) -> f64 {
		self.x() / METERS_PER_FOOT
	}
	pub fn y_feet(&self) -> f64 {
		self.y() / METERS_PER_FOOT
	}
	pub fn z_feet(&self) -> f64 {
		self.z() / METERS_PER_FOOT
	}

	pub fn pose(&self) -> Pose3D {
		Pose3D::from_xyz_rpy(self.x(), self.y(), self.z(), self.roll, self.pitch, self.yaw)
	}
}

/// Reads the tags of one published frame.
pub struct TagUnpacker<B> {
	table: Table<B>,
	config: UnpackerConfig,
}

impl<B: Bus> TagUnpacker<B> {
	pub fn new(bus: B) -> Self {
		Self::with_config(bus, UnpackerConfig::default())
	}

	pub fn with_config(bus: B, config: UnpackerConfig) -> Self {
		Self {
			table: Table::new(bus, config.table.clone()),
			config,
		}
	}

	pub fn config(&self) -> &UnpackerConfig {
		&self.config
	}

	/// Tags from the most recent complete frame, in detector order.
	///
	/// Returns an empty list if nothing has been published yet.
	pub fn get_tags(&self) -> Result<Vec<AprilTag>, UnpackError> {
		let attempts = self.config.max_attempts.max(1);
		for attempt in 1..=attempts {
			if let Some(tags) = self.try_snapshot()? {
				if attempt > 1 {
					log::debug!("Consistent snapshot after {attempt} attempts");
				}
				return Ok(tags);
			}
			std::thread::yield_now();
		}
		log::warn!("Gave up reading {} after {attempts} attempts", self.table.name());
		Err(UnpackError::TornSnapshot { attempts })
	}

	/// One read of the table. `None` if the read wasn't consistent.
	fn try_snapshot(&self) -> Result<Option<Vec<AprilTag>>, UnpackError> {
		// Without a generation key the producer gives no ordering guarantees,
		// and only the length check applies.
		let before = self.table.get_as::<i64>(GENERATION)?;
		if before.is_some_and(|g| g % 2 != 0) {
			return Ok(None);
		}

		match self.config.source {
			TagSource::Columns => {
				let tags = self.read_columns()?;
				Ok(if self.unchanged(before)? { tags } else { None })
			},
			TagSource::Composite => {
				let (written, tags) = self.read_composite()?;
				if !self.unchanged(before)? {
					return Ok(None);
				}
				match (before, written, tags) {
					(None, _, tags) => Ok(Some(tags.unwrap_or_default())),
					(Some(generation), Some(written), Some(tags)) if written == generation => Ok(Some(tags)),
					(Some(generation), _, _) => Err(UnpackError::MissingComposite { generation }),
				}
			},
		}
	}

	/// Whether `Generation` still reads `before`
	fn unchanged(&self, before: Option<i64>) -> Result<bool, UnpackError> {
		Ok(self.table.get_as::<i64>(GENERATION)? == before)
	}

	fn read_columns(&self) -> Result<Option<Vec<AprilTag>>, UnpackError> {
		let ids = self.table.get_as::<Vec<i64>>(IDS)?;
		let mut columns: [Vec<f64>; 8] = Default::default();
		for (key, column) in COLUMN_NAMES.iter().zip(columns.iter_mut()) {
			*column = self.table.get_as::<Vec<f64>>(key)?.unwrap_or_default();
		}

		let has_ids = ids.is_some();
		let columns = match TagColumns::from_columns(ids, columns) {
			Ok(columns) => columns,
			Err(DecodeError::ColumnLength { key, actual, expected }) => {
				log::trace!("Column {key} has {actual} entries, expected {expected}");
				return Ok(None);
			},
			Err(e) => return Err(e.into()),
		};

		let tags = columns.rows()
			.map(|row| AprilTag::from_row(&row, has_ids))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Some(tags))
	}

	/// The `Tags` record and the generation it was written for
	fn read_composite(&self) -> Result<(Option<i64>, Option<Vec<AprilTag>>), UnpackError> {
		let written = self.table.get_as::<i64>(TAGS_GENERATION)?;
		let Some(array) = self.table.get_as::<StructArray>(TAGS)? else {
			return Ok((written, None));
		};
		let tags = TagRow::decode(&array)?
			.iter()
			.map(|row| AprilTag::from_row(row, true))
			.collect::<Result<Vec<_>, _>>()?;
		Ok((written, Some(tags)))
	}
}

#[cfg(test)]
mod test {
	use std::sync::{Arc, atomic::{AtomicBool, AtomicUsize, Ordering}};
	use std::thread;

	use float_cmp::assert_approx_eq;
	use proptest::prelude::*;

	use crate::{
		bus::{Bus, BusError, MemoryBus, Value},
		columns::{TABLE_NAME, GENERATION, IDS, DecodeError},
		detection::RawDetection,
		packager::{TagPackager, PackagerConfig},
		pose::Pose3D,
		util::geom::Quadrilateral,
	};

	use super::{TagUnpacker, UnpackerConfig, UnpackError, TagSource};

	fn detection(id: usize, cx: f64, cy: f64) -> RawDetection {
		let corners = Quadrilateral::from_array(&[
			[cx - 8., cy + 8.],
			[cx + 8., cy + 8.],
			[cx + 8., cy - 8.],
			[cx - 8., cy - 8.],
		]);
		RawDetection::from_corners(id, corners).unwrap()
	}

	#[test]
	fn nothing_published() {
		let unpacker = TagUnpacker::new(MemoryBus::new());
		assert_eq!(unpacker.get_tags(), Ok(vec![]));
	}

	#[test]
	fn single_tag() {
		let bus = MemoryBus::new();
		let mut packager = TagPackager::new(bus.clone());
		let mut batch = packager.begin_frame().unwrap();
		batch.add_detected_tag(&detection(7, 320., 240.), &Pose3D::from_xyz_rpy(1.0, 0.2, 0.5, 0., 0., 1.57));
		batch.publish_all_tags().unwrap();

		let tags = TagUnpacker::new(bus).get_tags().unwrap();
		assert_eq!(tags.len(), 1);
		let tag = &tags[0];
		assert_eq!(tag.id, Some(7));
		assert_eq!(tag.x(), 1.0);
		assert_eq!(tag.y(), 0.2);
		assert_eq!(tag.z(), 0.5);
		assert_approx_eq!(f64, tag.yaw, 1.57, epsilon = 1e-9);
		assert_approx_eq!(f64, tag.roll, 0., epsilon = 1e-9);
		assert_approx_eq!(f64, tag.x_feet(), 1.0 / 0.3048);
		assert_approx_eq!(f64, tag.center.x(), 320., epsilon = 1e-9);
		assert_approx_eq!(f64, tag.center.y(), 240., epsilon = 1e-9);
	}

	#[test]
	fn empty_after_clear() {
		let bus = MemoryBus::new();
		let mut packager = TagPackager::new(bus.clone());
		let mut batch = packager.begin_frame().unwrap();
		batch.add_detected_tag(&detection(1, 100., 100.), &Pose3D::default());
		batch.add_detected_tag(&detection(2, 200., 100.), &Pose3D::default());
		batch.add_detected_tag(&detection(3, 300., 100.), &Pose3D::default());
		batch.publish_all_tags().unwrap();
		let unpacker = TagUnpacker::new(bus.clone());
		assert_eq!(unpacker.get_tags().unwrap().len(), 3);

		packager.begin_frame().unwrap().publish_all_tags().unwrap();
		assert_eq!(unpacker.get_tags(), Ok(vec![]));
	}

	#[test]
	fn legacy_columns_without_ids() {
		let bus = MemoryBus::new();
		for (key, value) in [
			("Centers_x", 1.), ("Centers_y", 2.),
			("Positions_x", 3.), ("Positions_y", 4.), ("Positions_z", 5.),
			("Roll", 0.), ("Pitch", 0.), ("Yaw", 0.25),
		] {
			bus.publish(TABLE_NAME, key, Value::FloatArray(vec![value])).unwrap();
		}
		let tags = TagUnpacker::new(bus).get_tags().unwrap();
		assert_eq!(tags.len(), 1);
		assert_eq!(tags[0].id, None);
		assert_eq!(tags[0].z(), 5.);
		assert_eq!(tags[0].yaw, 0.25);
	}

	#[test]
	fn mismatched_columns_are_never_truncated() {
		let bus = MemoryBus::new();
		let mut packager = TagPackager::new(bus.clone());
		let mut batch = packager.begin_frame().unwrap();
		batch.add_detected_tag(&detection(1, 100., 100.), &Pose3D::default());
		batch.publish_all_tags().unwrap();
		// A stray writer appends to one column without bumping the generation
		bus.publish(TABLE_NAME, "Yaw", Value::FloatArray(vec![0., 1.])).unwrap();

		let unpacker = TagUnpacker::with_config(bus, UnpackerConfig { max_attempts: 3, ..Default::default() });
		assert_eq!(unpacker.get_tags(), Err(UnpackError::TornSnapshot { attempts: 3 }));
	}

	#[test]
	fn write_in_progress_is_not_read() {
		let bus = MemoryBus::new();
		bus.publish(TABLE_NAME, GENERATION, Value::Integer(5)).unwrap();
		let unpacker = TagUnpacker::with_config(bus, UnpackerConfig { max_attempts: 2, ..Default::default() });
		assert_eq!(unpacker.get_tags(), Err(UnpackError::TornSnapshot { attempts: 2 }));
	}

	#[test]
	fn wrong_value_kind() {
		let bus = MemoryBus::new();
		bus.publish(TABLE_NAME, IDS, Value::FloatArray(vec![1.])).unwrap();
		let err = TagUnpacker::new(bus).get_tags().unwrap_err();
		assert!(matches!(err, UnpackError::Bus(BusError::WrongType { .. })), "{err:?}");
	}

	#[test]
	fn negative_id() {
		let bus = MemoryBus::new();
		bus.publish(TABLE_NAME, IDS, Value::IntegerArray(vec![-3])).unwrap();
		for key in crate::columns::COLUMN_NAMES {
			bus.publish(TABLE_NAME, key, Value::FloatArray(vec![0.])).unwrap();
		}
		assert_eq!(TagUnpacker::new(bus).get_tags(), Err(UnpackError::Decode(DecodeError::NegativeId(-3))));
	}

	#[test]
	fn composite_source() {
		let bus = MemoryBus::new();
		let mut packager = TagPackager::with_config(bus.clone(), PackagerConfig { publish_composite: true, ..Default::default() });
		let mut batch = packager.begin_frame().unwrap();
		batch.add_detected_tag(&detection(11, 50., 60.), &Pose3D::from_xyz_rpy(0.5, -0.5, 2., 0., 0., 0.));
		batch.add_detected_tag(&detection(12, 150., 60.), &Pose3D::from_xyz_rpy(1.5, -0.5, 3., 0., 0., 0.));
		batch.publish_all_tags().unwrap();

		let unpacker = TagUnpacker::with_config(bus.clone(), UnpackerConfig { source: TagSource::Composite, ..Default::default() });
		let composite = unpacker.get_tags().unwrap();
		let columns = TagUnpacker::new(bus).get_tags().unwrap();
		assert_eq!(composite, columns);
		assert_eq!(composite.iter().map(|t| t.id).collect::<Vec<_>>(), [Some(11), Some(12)]);
	}

	#[test]
	fn composite_source_without_record() {
		let bus = MemoryBus::new();
		let mut packager = TagPackager::new(bus.clone());
		let mut batch = packager.begin_frame().unwrap();
		batch.add_detected_tag(&detection(3, 50., 60.), &Pose3D::default());
		batch.publish_all_tags().unwrap();

		let unpacker = TagUnpacker::with_config(bus, UnpackerConfig { source: TagSource::Composite, ..Default::default() });
		assert_eq!(unpacker.get_tags(), Err(UnpackError::MissingComposite { generation: 4 }));
	}

	#[test]
	fn stale_composite_record() {
		let bus = MemoryBus::new();
		let mut packager = TagPackager::with_config(bus.clone(), PackagerConfig { publish_composite: true, ..Default::default() });
		let mut batch = packager.begin_frame().unwrap();
		batch.add_detected_tag(&detection(3, 50., 60.), &Pose3D::default());
		batch.publish_all_tags().unwrap();
		let unpacker = TagUnpacker::with_config(bus.clone(), UnpackerConfig { source: TagSource::Composite, ..Default::default() });
		assert_eq!(unpacker.get_tags().unwrap().len(), 1);

		// Restarted without the record; the old one is still on the bus
		let mut packager = TagPackager::new(bus.clone());
		let mut batch = packager.begin_frame().unwrap();
		batch.add_detected_tag(&detection(4, 50., 60.), &Pose3D::default());
		batch.add_detected_tag(&detection(5, 90., 60.), &Pose3D::default());
		batch.publish_all_tags().unwrap();
		assert_eq!(unpacker.get_tags(), Err(UnpackError::MissingComposite { generation: 8 }));
		assert_eq!(TagUnpacker::new(bus).get_tags().unwrap().len(), 2);
	}

	#[test]
	fn producer_restart_with_other_config() {
		let bus = MemoryBus::new();
		let mut packager = TagPackager::with_config(bus.clone(), PackagerConfig { publish_composite: true, ..Default::default() });
		let mut batch = packager.begin_frame().unwrap();
		batch.add_detected_tag(&detection(1, 50., 60.), &Pose3D::default());
		batch.publish_all_tags().unwrap();

		let mut packager = TagPackager::new(bus.clone());
		let mut batch = packager.begin_frame().unwrap();
		batch.add_detected_tag(&detection(2, 50., 60.), &Pose3D::default());
		batch.add_detected_tag(&detection(3, 90., 60.), &Pose3D::default());
		batch.publish_all_tags().unwrap();

		let tags = TagUnpacker::new(bus).get_tags().unwrap();
		assert_eq!(tags.iter().map(|t| t.id).collect::<Vec<_>>(), [Some(2), Some(3)]);
	}

	/// Bus where a second writer rewrites the table between two of the
	/// reader's key reads, a bounded number of times.
	struct InterleavingBus {
		inner: MemoryBus,
		interruptions: AtomicUsize,
		reads: AtomicUsize,
	}

	impl Bus for InterleavingBus {
		fn publish(&self, table: &str, key: &str, value: Value) -> Result<(), BusError> {
			self.inner.publish(table, key, value)
		}

		fn get(&self, table: &str, key: &str) -> Result<Option<Value>, BusError> {
			let read = self.reads.fetch_add(1, Ordering::SeqCst);
			// Interrupt right after the reader's first column read
			if key == "Centers_y" && self.interruptions.load(Ordering::SeqCst) > 0 {
				self.interruptions.fetch_sub(1, Ordering::SeqCst);
				let mut packager = TagPackager::new(&self.inner);
				let mut batch = packager.begin_frame()
					.map_err(|_| BusError::Unavailable("interleaved write".into()))?;
				for i in 0..(read % 3 + 2) {
					batch.add_detected_tag(&detection(i, 10. * i as f64, 10.), &Pose3D::default());
				}
				batch.publish_all_tags()
					.map_err(|_| BusError::Unavailable("interleaved write".into()))?;
			}
			self.inner.get(table, key)
		}
	}

	#[test]
	fn retries_interleaved_frames() {
		let inner = MemoryBus::new();
		let mut packager = TagPackager::new(inner.clone());
		let mut batch = packager.begin_frame().unwrap();
		batch.add_detected_tag(&detection(1, 100., 100.), &Pose3D::default());
		batch.publish_all_tags().unwrap();

		let bus = InterleavingBus { inner, interruptions: AtomicUsize::new(2), reads: AtomicUsize::new(0) };
		let unpacker = TagUnpacker::new(&bus);
		let tags = unpacker.get_tags().unwrap();
		// The result is the last frame written, never a mix of frames
		let ids = tags.iter().map(|t| t.id.unwrap()).collect::<Vec<_>>();
		assert_eq!(ids, (0..ids.len()).collect::<Vec<_>>());
		assert!(ids.len() >= 2);

		bus.interruptions.store(10, Ordering::SeqCst);
		let unpacker = TagUnpacker::with_config(&bus, UnpackerConfig { max_attempts: 4, ..Default::default() });
		assert_eq!(unpacker.get_tags(), Err(UnpackError::TornSnapshot { attempts: 4 }));
	}

	#[test]
	fn concurrent_reader_sees_whole_frames() {
		let bus = MemoryBus::new();
		let done = Arc::new(AtomicBool::new(false));
		let writer = {
			let bus = bus.clone();
			let done = done.clone();
			thread::spawn(move || {
				let mut packager = TagPackager::new(bus);
				for frame in 0..300usize {
					let n = frame % 4;
					let mut batch = packager.begin_frame().unwrap();
					for i in 0..n {
						// Every tag in a frame carries the frame's size
						batch.add_detected_tag(&detection(i, 100., 100.), &Pose3D::from_xyz_rpy(0., 0., n as f64, 0., 0., 0.));
					}
					batch.publish_all_tags().unwrap();
				}
				done.store(true, Ordering::Release);
			})
		};

		let unpacker = TagUnpacker::with_config(bus, UnpackerConfig { max_attempts: 1000, ..Default::default() });
		while !done.load(Ordering::Acquire) {
			match unpacker.get_tags() {
				Ok(tags) => {
					for (i, tag) in tags.iter().enumerate() {
						assert_eq!(tag.id, Some(i));
						assert_eq!(tag.z(), tags.len() as f64);
					}
				},
				Err(UnpackError::TornSnapshot { .. }) => {},
				Err(e) => panic!("{e}"),
			}
		}
		writer.join().unwrap();
	}

	proptest! {
		#[test]
		fn prop_round_trip(
			rows in prop::collection::vec(
				(0..600usize, 0.0..640.0f64, 0.0..480.0f64, -2.0..2.0f64, -2.0..2.0f64, 0.2..6.0f64, -1.2..1.2f64, -1.2..1.2f64, -3.0..3.0f64),
				0..8,
			)
		) {
			let bus = MemoryBus::new();
			let mut packager = TagPackager::new(bus.clone());
			let mut batch = packager.begin_frame().unwrap();
			for &(id, cx, cy, x, y, z, roll, pitch, yaw) in &rows {
				batch.add_detected_tag(&detection(id, cx, cy), &Pose3D::from_xyz_rpy(x, y, z, roll, pitch, yaw));
			}
			batch.publish_all_tags().unwrap();

			let tags = TagUnpacker::new(bus).get_tags().unwrap();
			prop_assert_eq!(tags.len(), rows.len());
			for (tag, &(id, cx, cy, x, y, z, roll, pitch, yaw)) in tags.iter().zip(&rows) {
				prop_assert_eq!(tag.id, Some(id));
				prop_assert!((tag.center.x() - cx).abs() < 1e-6);
				prop_assert!((tag.center.y() - cy).abs() < 1e-6);
				prop_assert_eq!(tag.position, nalgebra::Vector3::new(x, y, z));
				let expected_rpy = Pose3D::from_xyz_rpy(x, y, z, roll, pitch, yaw).euler_angles();
				prop_assert!((tag.roll - expected_rpy.0).abs() < 1e-12);
				prop_assert!((tag.pitch - expected_rpy.1).abs() < 1e-12);
				prop_assert!((tag.yaw - expected_rpy.2).abs() < 1e-12);
				let expected = Pose3D::from_xyz_rpy(x, y, z, roll, pitch, yaw);
				prop_assert!((tag.pose().rotation.matrix() - expected.rotation.matrix()).norm() < 1e-9);
			}
		}
	}
}
