use std::{borrow::Cow, fmt::Display};

/// Kinds of values that can be published on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    FloatArray,
    IntegerArray,
    StructArray,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ValueKind::Integer => "int",
            ValueKind::FloatArray => "float[]",
            ValueKind::IntegerArray => "int[]",
            ValueKind::StructArray => "struct[]",
        })
    }
}

/// Array of fixed-size packed records, tagged with the record's type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructArray {
    pub type_name: Cow<'static, str>,
    /// Size of one record, in bytes
    pub record_size: usize,
    pub data: Vec<u8>,
}

impl StructArray {
    /// Number of whole records
    pub fn len(&self) -> usize {
        if self.record_size == 0 {
            0
        } else {
            self.data.len() / self.record_size
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A value stored under one bus key
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    FloatArray(Vec<f64>),
    IntegerArray(Vec<i64>),
    StructArray(StructArray),
}

impl Value {
    pub const fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::FloatArray(_) => ValueKind::FloatArray,
            Value::IntegerArray(_) => ValueKind::IntegerArray,
            Value::StructArray(_) => ValueKind::StructArray,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Self::FloatArray(value)
    }
}

impl From<&[f64]> for Value {
    fn from(value: &[f64]) -> Self {
        Self::FloatArray(value.to_vec())
    }
}

impl From<Vec<i64>> for Value {
    fn from(value: Vec<i64>) -> Self {
        Self::IntegerArray(value)
    }
}

impl From<&[i64]> for Value {
    fn from(value: &[i64]) -> Self {
        Self::IntegerArray(value.to_vec())
    }
}

impl From<StructArray> for Value {
    fn from(value: StructArray) -> Self {
        Self::StructArray(value)
    }
}

/// Extract a typed value from a [Value]
pub trait FromValue: Sized {
    const KIND: ValueKind;

    fn from_value(value: Value) -> Option<Self>;
}

impl FromValue for i64 {
    const KIND: ValueKind = ValueKind::Integer;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Integer(v) => Some(v),
            _ => None,
        }
    }
}

impl FromValue for Vec<f64> {
    const KIND: ValueKind = ValueKind::FloatArray;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::FloatArray(v) => Some(v),
            _ => None,
        }
    }
}

impl FromValue for Vec<i64> {
    const KIND: ValueKind = ValueKind::IntegerArray;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::IntegerArray(v) => Some(v),
            _ => None,
        }
    }
}

impl FromValue for StructArray {
    const KIND: ValueKind = ValueKind::StructArray;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::StructArray(v) => Some(v),
            _ => None,
        }
    }
}
