//! Wire layout of the `AprilTag` table.
//!
//! Tags are published as parallel arrays, one float array per field, all of
//! the same length. Row `i` of every column belongs to the same tag.
use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::{
	bus::StructArray,
	pose::Pose3D,
	util::geom::Point2D,
};

/// Table that tag data is published to
pub const TABLE_NAME: &str = "AprilTag";

pub const CENTERS_X: &str = "Centers_x";
pub const CENTERS_Y: &str = "Centers_y";
pub const POSITIONS_X: &str = "Positions_x";
pub const POSITIONS_Y: &str = "Positions_y";
pub const POSITIONS_Z: &str = "Positions_z";
pub const ROLL: &str = "Roll";
pub const PITCH: &str = "Pitch";
pub const YAW: &str = "Yaw";

/// Integer array of tag ids, parallel to the float columns
pub const IDS: &str = "IDs";
/// Sequence counter bracketing each publish. Odd while a write is in progress.
pub const GENERATION: &str = "Generation";
/// All rows packed in a single value
pub const TAGS: &str = "Tags";
/// Generation the `Tags` record was written for
pub const TAGS_GENERATION: &str = "TagsGeneration";

/// The float columns, in publish order
pub const COLUMN_NAMES: [&str; 8] = [
	CENTERS_X,
	CENTERS_Y,
	POSITIONS_X,
	POSITIONS_Y,
	POSITIONS_Z,
	ROLL,
	PITCH,
	YAW,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DecodeError {
	#[error("Column {key} has {actual} entries, expected {expected}")]
	ColumnLength {
		key: &'static str,
		actual: usize,
		expected: usize,
	},
	#[error("Negative tag id: {0}")]
	NegativeId(i64),
	#[error("Record size mismatch (actual: {actual}, expected: {expected})")]
	RecordSize {
		actual: usize,
		expected: usize,
	},
	#[error("Record data is not a whole number of records ({0} bytes)")]
	RecordData(usize),
}

/// One tag, packed for the composite `Tags` record
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TagRow {
	pub id: i64,
	pub center_x: f64,
	pub center_y: f64,
	pub x: f64,
	pub y: f64,
	pub z: f64,
	pub roll: f64,
	pub pitch: f64,
	pub yaw: f64,
}

impl TagRow {
	pub const TYPE_NAME: &'static str = "TagRow";

	pub fn new(id: usize, center: Point2D, pose: &Pose3D) -> Self {
		let (roll, pitch, yaw) = pose.euler_angles();
		Self {
			id: id as i64,
			center_x: center.x(),
			center_y: center.y(),
			x: pose.x(),
			y: pose.y(),
			z: pose.z(),
			roll,
			pitch,
			yaw,
		}
	}

	fn values(&self) -> [f64; 8] {
		[self.center_x, self.center_y, self.x, self.y, self.z, self.roll, self.pitch, self.yaw]
	}

	/// Pack rows into a [StructArray]
	pub fn encode(rows: &[TagRow]) -> StructArray {
		StructArray {
			type_name: Self::TYPE_NAME.into(),
			record_size: size_of::<TagRow>(),
			data: bytemuck::cast_slice(rows).to_vec(),
		}
	}

	/// Unpack rows from a [StructArray] written by [TagRow::encode]
	pub fn decode(array: &StructArray) -> Result<Vec<TagRow>, DecodeError> {
		let record_size = size_of::<TagRow>();
		if array.record_size != record_size {
			return Err(DecodeError::RecordSize { actual: array.record_size, expected: record_size });
		}
		if array.data.len() % record_size != 0 {
			return Err(DecodeError::RecordData(array.data.len()));
		}
		// Bus buffers carry no alignment guarantee
		Ok(array.data
			.chunks_exact(record_size)
			.map(bytemuck::pod_read_unaligned::<TagRow>)
			.collect())
	}
}

/// Struct-of-arrays accumulator for one frame's tags.
///
/// Every mutator touches all columns, so they always have the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagColumns {
	ids: Vec<i64>,
	centers_x: Vec<f64>,
	centers_y: Vec<f64>,
	positions_x: Vec<f64>,
	positions_y: Vec<f64>,
	positions_z: Vec<f64>,
	roll: Vec<f64>,
	pitch: Vec<f64>,
	yaw: Vec<f64>,
}

impl TagColumns {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	pub fn clear(&mut self) {
		self.ids.clear();
		for column in self.columns_mut() {
			column.clear();
		}
	}

	/// Append one tag. Roll, pitch and yaw are the rotations about the
	/// camera's x, y and z axes.
	pub fn push(&mut self, id: usize, center: Point2D, pose: &Pose3D) {
		self.push_row(&TagRow::new(id, center, pose));
	}

	pub fn push_row(&mut self, row: &TagRow) {
		self.ids.push(row.id);
		for (column, value) in self.columns_mut().into_iter().zip(row.values()) {
			column.push(value);
		}
	}

	pub fn ids(&self) -> &[i64] {
		&self.ids
	}

	/// `(key, values)` for each float column, in publish order
	pub fn columns(&self) -> [(&'static str, &[f64]); 8] {
		[
			(CENTERS_X, &self.centers_x),
			(CENTERS_Y, &self.centers_y),
			(POSITIONS_X, &self.positions_x),
			(POSITIONS_Y, &self.positions_y),
			(POSITIONS_Z, &self.positions_z),
			(ROLL, &self.roll),
			(PITCH, &self.pitch),
			(YAW, &self.yaw),
		]
	}

	fn columns_mut(&mut self) -> [&mut Vec<f64>; 8] {
		[
			&mut self.centers_x,
			&mut self.centers_y,
			&mut self.positions_x,
			&mut self.positions_y,
			&mut self.positions_z,
			&mut self.roll,
			&mut self.pitch,
			&mut self.yaw,
		]
	}

	/// Build from columns read back off the bus, in [COLUMN_NAMES] order.
	///
	/// When `ids` is `None`, every row gets id `-1`.
	pub fn from_columns(ids: Option<Vec<i64>>, columns: [Vec<f64>; 8]) -> Result<Self, DecodeError> {
		let expected = columns[0].len();
		for (&key, column) in COLUMN_NAMES.iter().zip(columns.iter()) {
			if column.len() != expected {
				return Err(DecodeError::ColumnLength { key, actual: column.len(), expected });
			}
		}
		let ids = match ids {
			Some(ids) if ids.len() != expected => return Err(DecodeError::ColumnLength { key: IDS, actual: ids.len(), expected }),
			Some(ids) => ids,
			None => vec![-1; expected],
		};

		let [centers_x, centers_y, positions_x, positions_y, positions_z, roll, pitch, yaw] = columns;
		Ok(Self {
			ids,
			centers_x,
			centers_y,
			positions_x,
			positions_y,
			positions_z,
			roll,
			pitch,
			yaw,
		})
	}

	pub fn row(&self, index: usize) -> Option<TagRow> {
		if index >= self.len() {
			return None;
		}
		Some(self.row_unchecked(index))
	}

	fn row_unchecked(&self, index: usize) -> TagRow {
		TagRow {
			id: self.ids[index],
			center_x: self.centers_x[index],
			center_y: self.centers_y[index],
			x: self.positions_x[index],
			y: self.positions_y[index],
			z: self.positions_z[index],
			roll: self.roll[index],
			pitch: self.pitch[index],
			yaw: self.yaw[index],
		}
	}

	pub fn rows(&self) -> impl ExactSizeIterator<Item = TagRow> + '_ {
		(0..self.len()).map(|i| self.row_unchecked(i))
	}

	pub fn to_struct_array(&self) -> StructArray {
		TagRow::encode(&self.rows().collect::<Vec<_>>())
	}
}

impl FromIterator<TagRow> for TagColumns {
	fn from_iter<T: IntoIterator<Item = TagRow>>(iter: T) -> Self {
		let mut columns = Self::new();
		for row in iter {
			columns.push_row(&row);
		}
		columns
	}
}

#[cfg(test)]
mod test {
	use std::mem::size_of;

	use crate::{pose::Pose3D, util::geom::Point2D, bus::StructArray};

	use super::{TagColumns, TagRow, DecodeError, COLUMN_NAMES, IDS};

	fn sample() -> TagColumns {
		let mut columns = TagColumns::new();
		columns.push(3, Point2D::of(10., 20.), &Pose3D::from_xyz_rpy(0.1, 0.2, 1.5, 0., 0., 0.5));
		columns.push(8, Point2D::of(30., 40.), &Pose3D::from_xyz_rpy(-0.3, 0.0, 2.5, 0.1, 0., 0.));
		columns
	}

	#[test]
	fn columns_stay_parallel() {
		let mut columns = sample();
		assert_eq!(columns.len(), 2);
		assert_eq!(columns.ids(), &[3, 8]);
		for (key, values) in columns.columns() {
			assert_eq!(values.len(), 2, "{key}");
		}
		columns.clear();
		assert!(columns.is_empty());
		for (_, values) in columns.columns() {
			assert!(values.is_empty());
		}
	}

	#[test]
	fn column_order() {
		let columns = sample();
		let names = columns.columns().map(|(k, _)| k);
		assert_eq!(names, COLUMN_NAMES);
		assert_eq!(columns.columns()[0].1, &[10., 30.]);
		assert_eq!(columns.columns()[4].1, &[1.5, 2.5]);
	}

	#[test]
	fn from_columns_checks_lengths() {
		let mut cols: [Vec<f64>; 8] = Default::default();
		for col in cols.iter_mut() {
			col.push(1.);
		}
		assert!(TagColumns::from_columns(None, cols.clone()).is_ok());

		cols[5].push(2.);
		assert_eq!(
			TagColumns::from_columns(None, cols.clone()),
			Err(DecodeError::ColumnLength { key: "Roll", actual: 2, expected: 1 })
		);

		cols[5].pop();
		assert_eq!(
			TagColumns::from_columns(Some(vec![1, 2]), cols),
			Err(DecodeError::ColumnLength { key: IDS, actual: 2, expected: 1 })
		);
	}

	#[test]
	fn row_layout() {
		assert_eq!(size_of::<TagRow>(), 72);
	}

	#[test]
	fn struct_array_rows() {
		let columns = sample();
		let array = columns.to_struct_array();
		assert_eq!(array.len(), 2);
		let rows = TagRow::decode(&array).unwrap();
		assert_eq!(rows.into_iter().collect::<TagColumns>(), columns);
	}

	#[test]
	fn bad_struct_array() {
		let array = StructArray { type_name: TagRow::TYPE_NAME.into(), record_size: 16, data: vec![0; 32] };
		assert_eq!(TagRow::decode(&array), Err(DecodeError::RecordSize { actual: 16, expected: 72 }));

		let array = StructArray { type_name: TagRow::TYPE_NAME.into(), record_size: 72, data: vec![0; 100] };
		assert_eq!(TagRow::decode(&array), Err(DecodeError::RecordData(100)));
	}
}
