//! External interfaces consumed or invoked by [`crate::checker`]. These
//! are the seams the host node fills in: a local block store, caller-staged
//! block sets, the request objects themselves, the downstream scheduler
//! they report to, and the durable database.
//!
//! All of them are plain (non-async) traits: the store probe and scheduler
//! callbacks are bounded and non-suspending by contract, so the dispatch
//! loop never needs to suspend on them.

use crate::checker::item::DatastoreCheckerItem;
use crate::types::{Block, GetterId, RoutingKey};

/// The local, already-downloaded block store.
pub trait BlockStore: Send + Sync {
    /// Looks up `key`, honoring `dont_cache` (callers that don't want the
    /// lookup itself to promote the block into a hotter cache tier set
    /// this).
    fn fetch(&self, key: &RoutingKey, dont_cache: bool) -> Option<Block>;
}

/// A caller-scoped, pre-staged block dictionary probed before the global
/// store.
pub trait BlockSet: Send + Sync {
    fn get(&self, key: &RoutingKey) -> Option<Block>;
}

/// A pending retrieval request, transient or persistent.
pub trait SendableGet: Send + Sync {
    fn list_keys(&self) -> Vec<RoutingKey>;
    fn priority_class(&self) -> u8;
    fn dont_cache(&self) -> bool;
    fn scheduler(&self) -> std::sync::Arc<dyn RequestScheduler>;
}

/// The downstream scheduler that owns a request and is notified as it
/// progresses.
pub trait RequestScheduler: Send + Sync {
    /// Hands a newly found block to the subsystem awaiting it.
    fn trip_pending_key(&self, block: Block);

    /// Reports that dispatch finished for `getters`. `db` is only `Some`
    /// when `on_database_thread` is true.
    fn finish_register(
        &self,
        getters: &[GetterId],
        is_persistent: bool,
        on_database_thread: bool,
        db: Option<&dyn CheckerDatabase>,
        any_valid: bool,
        item: Option<&DatastoreCheckerItem>,
    );
}

/// Reports how deep the downstream "trip-pending" completion queue is, so
/// the dispatch loop can back off before it overloads the host.
pub trait DownstreamQueueProbe: Send + Sync {
    fn completion_queue_len(&self) -> usize;
}

/// The durable object database. Persists [`DatastoreCheckerItem`]s only —
/// there is no slot here for an [`SSKBlock`]; the absence of block storage
/// is a type-level fact, not a runtime check.
pub trait CheckerDatabase: Send + Sync {
    /// All items for `node_db_handle` at exactly `prio`.
    fn query_by_priority(
        &self,
        node_db_handle: crate::types::NodeDbHandle,
        prio: u8,
    ) -> Vec<DatastoreCheckerItem>;

    fn store(&self, item: &DatastoreCheckerItem);

    fn delete(&self, getter: GetterId);

    fn is_stored(&self, getter: GetterId) -> bool;
}
