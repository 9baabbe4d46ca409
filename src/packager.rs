//! Publishes one frame's tags to the bus.
use thiserror::Error;

use crate::{
	bus::{Bus, BusError, Table},
	columns::{TagColumns, TABLE_NAME, IDS, GENERATION, TAGS, TAGS_GENERATION},
	detection::{RawDetection, DetectedTag},
	pose::Pose3D,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PublishError {
	#[error("Unable to publish {key}")]
	Publish {
		key: &'static str,
		#[source]
		source: BusError,
	},
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagerConfig {
	/// Table to publish under
	pub table: String,
	/// Also publish every row packed into the single `Tags` value
	pub publish_composite: bool,
}

impl Default for PackagerConfig {
	fn default() -> Self {
		Self {
			table: TABLE_NAME.to_owned(),
			publish_composite: false,
		}
	}
}

/// Accumulates detections for a frame and publishes them as parallel columns.
///
/// Each publish is bracketed by the `Generation` key: it is set to an odd
/// value before the first column is written and to the next even value after
/// the last, so readers can detect a snapshot that spans two frames.
pub struct TagPackager<B> {
	table: Table<B>,
	config: PackagerConfig,
	columns: TagColumns,
	/// Last even generation published
	generation: i64,
}

impl<B: Bus> TagPackager<B> {
	pub fn new(bus: B) -> Self {
		Self::with_config(bus, PackagerConfig::default())
	}

	pub fn with_config(bus: B, config: PackagerConfig) -> Self {
		let table = Table::new(bus, config.table.clone());
		// Continue from whatever a previous producer left, so readers never see
		// a generation repeat.
		let generation = match table.get_as::<i64>(GENERATION) {
			Ok(Some(generation)) => generation.max(0) + (generation.max(0) & 1),
			Ok(None) => 0,
			Err(e) => {
				log::warn!("Unable to read {GENERATION} from {}: {e}", table.name());
				0
			}
		};
		Self {
			table,
			config,
			columns: TagColumns::new(),
			generation,
		}
	}

	pub fn config(&self) -> &PackagerConfig {
		&self.config
	}

	pub fn generation(&self) -> i64 {
		self.generation
	}

	/// Tags added since the last clear
	pub fn columns(&self) -> &TagColumns {
		&self.columns
	}

	/// Empty all columns and publish the empty state.
	pub fn clear(&mut self) -> Result<(), PublishError> {
		self.columns.clear();
		self.publish()
	}

	/// Start a new frame. Clears the previous frame's tags.
	pub fn begin_frame(&mut self) -> Result<FrameBatch<'_, B>, PublishError> {
		self.clear()?;
		Ok(FrameBatch { packager: self })
	}

	fn publish_key(&self, key: &'static str, value: impl Into<crate::bus::Value>) -> Result<(), PublishError> {
		self.table.publish(key, value)
			.map_err(|source| PublishError::Publish { key, source })
	}

	fn publish(&mut self) -> Result<(), PublishError> {
		let next = self.generation + 2;
		self.publish_key(GENERATION, next - 1)?;

		self.publish_key(IDS, self.columns.ids())?;
		for (key, values) in self.columns.columns() {
			self.publish_key(key, values)?;
		}
		if self.config.publish_composite {
			self.publish_key(TAGS, self.columns.to_struct_array())?;
			self.publish_key(TAGS_GENERATION, next)?;
		}

		self.publish_key(GENERATION, next)?;
		self.generation = next;
		log::trace!("Published {} tags to {} (generation {next})", self.columns.len(), self.table.name());
		Ok(())
	}
}

/// Tags for a single frame.
///
/// Holds the packager until [FrameBatch::publish_all_tags] is called.
/// Dropping a batch without publishing leaves the cleared state on the bus.
pub struct FrameBatch<'a, B: Bus> {
	packager: &'a mut TagPackager<B>,
}

impl<'a, B: Bus> FrameBatch<'a, B> {
	/// Append a tag. Duplicate ids are kept.
	pub fn add_detected_tag(&mut self, detection: &RawDetection, pose: &Pose3D) {
		self.packager.columns.push(detection.id, detection.center, pose);
	}

	pub fn add_tag(&mut self, tag: &DetectedTag) {
		self.packager.columns.push(tag.id, tag.center, &tag.pose);
	}

	pub fn len(&self) -> usize {
		self.packager.columns.len()
	}

	pub fn is_empty(&self) -> bool {
		self.packager.columns.is_empty()
	}

	/// Publish every column for this frame
	pub fn publish_all_tags(self) -> Result<(), PublishError> {
		self.packager.publish()
	}
}
