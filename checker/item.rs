//! The persistent work descriptor: `DatastoreCheckerItem`.

use serde::{Deserialize, Serialize};

use crate::types::{GetterId, NodeDbHandle};

/// Stamped onto an item when the checker adopts it during a boot session;
/// `0` means "unadopted".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChosenBy(pub u64);

impl ChosenBy {
    pub const UNADOPTED: ChosenBy = ChosenBy(0);

    pub fn is_adopted(&self) -> bool {
        self.0 != 0
    }
}

/// A persistent request's durable record. The live `SendableGet` and any
/// caller-supplied `BlockSet` are *not* stored here — they are resolved
/// in-memory through a `GetterRegistry` keyed by `getter`. A database
/// record is always plain data here, never a live object-graph edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastoreCheckerItem {
    pub getter: GetterId,
    pub node_db_handle: NodeDbHandle,
    pub prio: u8,
    pub chosen_by: ChosenBy,
}

impl DatastoreCheckerItem {
    pub fn new(getter: GetterId, node_db_handle: NodeDbHandle, prio: u8) -> Self {
        Self {
            getter,
            node_db_handle,
            prio,
            chosen_by: ChosenBy::UNADOPTED,
        }
    }
}
