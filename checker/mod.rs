//! The datastore checker: a priority-ordered scheduler that dequeues
//! pending retrieval requests, probes a local store, trips waiting
//! continuations, and survives restarts by reloading persistent work from a
//! durable database.

pub mod db;
pub mod dispatch;
pub mod item;
pub mod loader;
pub mod queue;
pub mod registry;
pub mod trimmer;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock};

use item::{ChosenBy, DatastoreCheckerItem};
use queue::{PersistentEntry, PriorityQueues, TransientEntry};
use registry::GetterRegistry;

use crate::config::CheckerConfig;
use crate::error::CheckerError;
use crate::executor::PriorityExecutor;
use crate::traits::{BlockSet, BlockStore, CheckerDatabase, DownstreamQueueProbe, SendableGet};
use crate::types::{BootId, GetterId, NodeDbHandle};

/// The host-provided collaborators a checker needs. Injected once at
/// construction and never mutated afterward.
pub struct NodeContext {
    pub store: Arc<dyn BlockStore>,
    pub database: Arc<dyn CheckerDatabase>,
    pub downstream: Arc<dyn DownstreamQueueProbe>,
    pub node_db_handle: NodeDbHandle,
    pub boot_id: BootId,
}

pub(crate) struct Inner {
    queues: Mutex<PriorityQueues>,
    condvar: Condvar,
    registry: GetterRegistry,
    store: Arc<dyn BlockStore>,
    db: Arc<dyn CheckerDatabase>,
    downstream: Arc<dyn DownstreamQueueProbe>,
    node_db_handle: NodeDbHandle,
    boot_id: BootId,
    config: CheckerConfig,
    executor: OnceLock<Arc<PriorityExecutor>>,
    next_getter_id: AtomicU64,
}

/// Public handle to the checker. Cheap to clone — every clone shares the
/// same worker state through an `Arc`.
#[derive(Clone)]
pub struct DatastoreChecker {
    inner: Arc<Inner>,
}

impl DatastoreChecker {
    pub fn new(ctx: NodeContext, config: CheckerConfig) -> Self {
        let queues = PriorityQueues::new(config.num_priorities as usize);
        Self {
            inner: Arc::new(Inner {
                queues: Mutex::new(queues),
                condvar: Condvar::new(),
                registry: GetterRegistry::new(),
                store: ctx.store,
                db: ctx.database,
                downstream: ctx.downstream,
                node_db_handle: ctx.node_db_handle,
                boot_id: ctx.boot_id,
                config,
                executor: OnceLock::new(),
                next_getter_id: AtomicU64::new(1),
            }),
        }
    }

    fn mint_getter_id(&self) -> GetterId {
        GetterId(self.inner.next_getter_id.fetch_add(1, Ordering::Relaxed))
    }

    fn check_priority(&self, prio: u8) -> Result<(), CheckerError> {
        if prio >= self.inner.config.num_priorities {
            return Err(CheckerError::PriorityOutOfRange(prio, self.inner.config.num_priorities));
        }
        Ok(())
    }

    /// Consults `getter` for its key list and priority, appends to the
    /// matching transient queue, and wakes the dispatch loop.
    ///
    /// Fails with [`CheckerError::PriorityOutOfRange`] if `getter`'s
    /// priority class isn't one this checker was constructed with.
    pub fn queue_transient_request(
        &self,
        getter: Arc<dyn SendableGet>,
        blocks: Option<Arc<dyn BlockSet>>,
    ) -> Result<GetterId, CheckerError> {
        let prio = getter.priority_class();
        self.check_priority(prio)?;

        let id = self.mint_getter_id();
        let keys = getter.list_keys();
        self.inner.registry.register(id, getter, blocks.clone());

        {
            let mut queues = self.inner.queues.lock().expect("checker monitor poisoned");
            queues.push_transient(prio as usize, TransientEntry { keys, getter: id, blocks });
        }
        self.inner.condvar.notify_all();
        Ok(id)
    }

    /// Creates a [`DatastoreCheckerItem`], persists it, and — if the
    /// at-or-above-priority persistent queue doesn't already exceed the
    /// configured limit — adopts and enqueues it immediately.
    ///
    /// Fails with [`CheckerError::PriorityOutOfRange`] if `getter`'s
    /// priority class isn't one this checker was constructed with.
    pub fn queue_persistent_request(
        &self,
        getter: Arc<dyn SendableGet>,
        blocks: Option<Arc<dyn BlockSet>>,
    ) -> Result<GetterId, CheckerError> {
        let prio = getter.priority_class();
        self.check_priority(prio)?;

        let id = self.mint_getter_id();
        self.inner.registry.register(id, getter.clone(), blocks.clone());

        let item = DatastoreCheckerItem::new(id, self.inner.node_db_handle, prio);
        self.inner.db.store(&item);

        let mut queues = self.inner.queues.lock().expect("checker monitor poisoned");
        if queues.persistent_keys_at_or_above(prio) <= self.inner.config.max_persistent_keys {
            let dont_cache = getter.dont_cache();
            let scheduler = getter.scheduler();
            let keys = getter.list_keys();

            let mut stamped = item;
            stamped.chosen_by = ChosenBy(self.inner.boot_id.0);
            self.inner.db.store(&stamped);

            queues.push_persistent(
                prio as usize,
                PersistentEntry {
                    keys,
                    getter: id,
                    dont_cache,
                    scheduler,
                    item: stamped,
                    blocks,
                },
            );
            trimmer::trim(&mut queues, self.inner.db.as_ref(), prio, self.inner.config.max_persistent_keys);
        }
        drop(queues);
        self.inner.condvar.notify_all();
        Ok(id)
    }

    /// Schedules the loader once at high priority on the database thread,
    /// then launches the dispatch loop on `executor`.
    pub fn start(&self, executor: Arc<PriorityExecutor>, name: &str) {
        tracing::info!(name, "starting datastore checker");
        let _ = self.inner.executor.set(executor.clone());

        let inner = self.inner.clone();
        executor.execute_priority(Box::new(move || {
            loader::load(
                &inner.queues,
                inner.db.as_ref(),
                &inner.registry,
                inner.node_db_handle,
                inner.boot_id,
                inner.config.max_persistent_keys,
            );
            inner.condvar.notify_all();
        }));

        let inner = self.inner.clone();
        executor.execute(Box::new(move || {
            dispatch::run(inner);
        }));
    }

    /// Releases any dispatcher waiting on its condition.
    pub fn wake_up(&self) {
        self.inner.condvar.notify_all();
    }
}
