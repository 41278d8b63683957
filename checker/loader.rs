//! Replenishes the persistent in-memory queues from the durable database.
//! Runs on the database thread. Takes the checker's monitor only for the
//! brief in-memory checks and pushes — the monitor is never held while a
//! [`CheckerDatabase`] call is in flight, so a slow or re-entrant database
//! can't wedge the dispatch loop.

use std::sync::Mutex;

use crate::checker::item::ChosenBy;
use crate::checker::queue::{PersistentEntry, PriorityQueues};
use crate::checker::registry::GetterRegistry;
use crate::checker::trimmer::{trim, TrimOutcome};
use crate::types::{BootId, NodeDbHandle};
use crate::traits::CheckerDatabase;

/// Pulls unadopted persistent items out of the database, highest priority
/// first, and enqueues them in memory. Stops early if the queues are
/// already at or over capacity, or if trimming after an enqueue reports
/// they're still over.
pub fn load(
    queues: &Mutex<PriorityQueues>,
    db: &dyn CheckerDatabase,
    registry: &GetterRegistry,
    node_db_handle: NodeDbHandle,
    boot_id: BootId,
    max_keys: usize,
) {
    let already_over = queues.lock().expect("checker monitor poisoned").total_persistent_keys() > max_keys;
    if already_over {
        return;
    }

    let num_priorities = queues.lock().expect("checker monitor poisoned").num_priorities();

    for prio in 0..num_priorities {
        let prio_u8 = prio as u8;
        for item in db.query_by_priority(node_db_handle, prio_u8) {
            if item.chosen_by.0 == boot_id.0 {
                continue;
            }

            let Some((getter, blocks)) = registry.lookup(item.getter) else {
                db.delete(item.getter);
                continue;
            };

            let already_queued = queues
                .lock()
                .expect("checker monitor poisoned")
                .persistent_contains(prio, item.getter);
            if already_queued {
                continue;
            }

            let dont_cache = getter.dont_cache();
            let scheduler = getter.scheduler();
            let keys = getter.list_keys();

            let mut stamped = item.clone();
            stamped.chosen_by = ChosenBy(boot_id.0);
            db.store(&stamped);

            let enqueued = queues.lock().expect("checker monitor poisoned").push_persistent(
                prio,
                PersistentEntry {
                    keys,
                    getter: item.getter,
                    dont_cache,
                    scheduler,
                    item: stamped,
                    blocks,
                },
            );
            if !enqueued {
                continue;
            }

            let over_limit = queues.lock().expect("checker monitor poisoned").total_persistent_keys() > max_keys;
            if over_limit {
                let mut guard = queues.lock().expect("checker monitor poisoned");
                if let TrimOutcome::StillOver = trim(&mut guard, db, prio_u8, max_keys) {
                    return;
                }
            }
        }
    }
}
