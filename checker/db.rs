//! An in-memory [`CheckerDatabase`] for tests and for hosts that don't need
//! request persistence across restarts.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::checker::item::DatastoreCheckerItem;
use crate::traits::CheckerDatabase;
use crate::types::{GetterId, NodeDbHandle};

/// Stores [`DatastoreCheckerItem`]s keyed by getter, round-tripping each one
/// through `bincode` on the way in and out so this implementation exercises
/// the same (de)serialization path a disk-backed database would.
#[derive(Default)]
pub struct InMemoryCheckerDatabase {
    items: Mutex<BTreeMap<u64, Vec<u8>>>,
}

impl InMemoryCheckerDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("db lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CheckerDatabase for InMemoryCheckerDatabase {
    fn query_by_priority(&self, node_db_handle: NodeDbHandle, prio: u8) -> Vec<DatastoreCheckerItem> {
        self.items
            .lock()
            .expect("db lock poisoned")
            .values()
            .filter_map(|bytes| bincode::deserialize::<DatastoreCheckerItem>(bytes).ok())
            .filter(|item| item.node_db_handle == node_db_handle && item.prio == prio)
            .collect()
    }

    fn store(&self, item: &DatastoreCheckerItem) {
        let encoded = bincode::serialize(item).expect("DatastoreCheckerItem is always encodable");
        self.items
            .lock()
            .expect("db lock poisoned")
            .insert(item.getter.0, encoded);
    }

    fn delete(&self, getter: GetterId) {
        self.items.lock().expect("db lock poisoned").remove(&getter.0);
    }

    fn is_stored(&self, getter: GetterId) -> bool {
        self.items.lock().expect("db lock poisoned").contains_key(&getter.0)
    }
}
