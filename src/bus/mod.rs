//! Polled key-value bus.
//!
//! Keys live in named tables. Publishing overwrites the previous value of a
//! key; reading returns the latest value. There are no transactions across
//! keys.
mod value;
mod memory;

use std::{borrow::Cow, sync::Arc};

use thiserror::Error;

pub use value::{Value, ValueKind, StructArray, FromValue};
pub use memory::MemoryBus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum BusError {
    #[error("Bus unavailable: {0}")]
    Unavailable(String),
    #[error("Key {table}/{key} holds {actual}, expected {expected}")]
    WrongType {
        table: String,
        key: String,
        expected: ValueKind,
        actual: ValueKind,
    },
}

/// Client handle for a key-value bus
pub trait Bus: Send + Sync {
    /// Set the latest value of `table/key`
    fn publish(&self, table: &str, key: &str, value: Value) -> Result<(), BusError>;

    /// Latest value of `table/key`, if it was ever published
    fn get(&self, table: &str, key: &str) -> Result<Option<Value>, BusError>;
}

impl<B: Bus + ?Sized> Bus for Arc<B> {
    fn publish(&self, table: &str, key: &str, value: Value) -> Result<(), BusError> {
        (**self).publish(table, key, value)
    }

    fn get(&self, table: &str, key: &str) -> Result<Option<Value>, BusError> {
        (**self).get(table, key)
    }
}

impl<B: Bus + ?Sized> Bus for &B {
    fn publish(&self, table: &str, key: &str, value: Value) -> Result<(), BusError> {
        (**self).publish(table, key, value)
    }

    fn get(&self, table: &str, key: &str) -> Result<Option<Value>, BusError> {
        (**self).get(table, key)
    }
}

/// A bus handle bound to one table
#[derive(Debug, Clone)]
pub struct Table<B> {
    bus: B,
    name: Cow<'static, str>,
}

impl<B: Bus> Table<B> {
    pub fn new(bus: B, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            bus,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn publish(&self, key: &str, value: impl Into<Value>) -> Result<(), BusError> {
        self.bus.publish(&self.name, key, value.into())
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>, BusError> {
        self.bus.get(&self.name, key)
    }

    /// Read a key, requiring it to hold a `T` if it is present
    pub fn get_as<T: FromValue>(&self, key: &str) -> Result<Option<T>, BusError> {
        let Some(value) = self.get(key)? else {
            return Ok(None);
        };
        let actual = value.kind();
        match T::from_value(value) {
            Some(v) => Ok(Some(v)),
            None => Err(BusError::WrongType {
                table: self.name.to_string(),
                key: key.to_owned(),
                expected: T::KIND,
                actual,
            }),
        }
    }
}
