use std::sync::{Arc, atomic::{AtomicU64, Ordering}};

use hashbrown::HashMap;
use parking_lot::RwLock;

use super::{Bus, BusError, Value};

#[derive(Default)]
struct Inner {
    tables: RwLock<HashMap<String, HashMap<String, Value>>>,
    updates: AtomicU64,
}

/// In-process bus.
///
/// Clones share the same store, so a producer and any number of consumers on
/// other threads can each hold a handle.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemoryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBus")
            .field("updates", &self.updates())
            .finish_non_exhaustive()
    }
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of publish calls so far
    pub fn updates(&self) -> u64 {
        self.inner.updates.load(Ordering::Acquire)
    }

    /// Keys present in `table`, sorted
    pub fn keys(&self, table: &str) -> Vec<String> {
        let tables = self.inner.tables.read();
        let mut keys = tables.get(table)
            .map(|t| t.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }
}

impl Bus for MemoryBus {
    fn publish(&self, table: &str, key: &str, value: Value) -> Result<(), BusError> {
        let mut tables = self.inner.tables.write();
        match tables.get_mut(table) {
            Some(entries) => {
                entries.insert(key.to_owned(), value);
            },
            None => {
                let mut entries = HashMap::new();
                entries.insert(key.to_owned(), value);
                tables.insert(table.to_owned(), entries);
            }
        }
        self.inner.updates.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn get(&self, table: &str, key: &str) -> Result<Option<Value>, BusError> {
        let tables = self.inner.tables.read();
        Ok(tables.get(table).and_then(|t| t.get(key)).cloned())
    }
}
