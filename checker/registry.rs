//! Live-object lookup for queued requests. A [`DatastoreCheckerItem`]
//! persisted to the database is plain data; the `SendableGet` it refers
//! to, and any caller-supplied `BlockSet`, live only in memory and are
//! resolved here by [`GetterId`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::traits::{BlockSet, SendableGet};
use crate::types::GetterId;

struct Registered {
    getter: Arc<dyn SendableGet>,
    blocks: Option<Arc<dyn BlockSet>>,
}

/// Maps a [`GetterId`] back to the live request object (and optional
/// pre-staged block set) it was minted for. Entries are added when a
/// caller queues a persistent request and removed once the checker has
/// finished dispatching it or the database record is deleted.
#[derive(Default)]
pub struct GetterRegistry {
    entries: RwLock<HashMap<GetterId, Registered>>,
}

impl GetterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        getter: GetterId,
        get: Arc<dyn SendableGet>,
        blocks: Option<Arc<dyn BlockSet>>,
    ) {
        self.entries
            .write()
            .expect("registry lock poisoned")
            .insert(getter, Registered { getter: get, blocks });
    }

    pub fn lookup(&self, getter: GetterId) -> Option<(Arc<dyn SendableGet>, Option<Arc<dyn BlockSet>>)> {
        self.entries
            .read()
            .expect("registry lock poisoned")
            .get(&getter)
            .map(|r| (r.getter.clone(), r.blocks.clone()))
    }

    pub fn remove(&self, getter: GetterId) {
        self.entries
            .write()
            .expect("registry lock poisoned")
            .remove(&getter);
    }

    pub fn contains(&self, getter: GetterId) -> bool {
        self.entries
            .read()
            .expect("registry lock poisoned")
            .contains_key(&getter)
    }
}
