//! Keeps the persistent queues bounded by `MAX_PERSISTENT_KEYS`. Called
//! after every enqueue that might have pushed the total over the limit.

use crate::checker::item::ChosenBy;
use crate::checker::queue::PriorityQueues;
use crate::traits::CheckerDatabase;

#[derive(Debug, PartialEq, Eq)]
pub enum TrimOutcome {
    WithinLimit,
    StillOver,
}

/// Shrinks the persistent queues toward `max_keys` without discarding
/// anything at priority `<= prio`. `prio` is the priority of the most
/// recently added work.
///
/// Known limitation, preserved rather than fixed: when `pre_size` alone
/// already exceeds the limit, the entries dropped (at priority `> prio`)
/// can't reduce `pre_size`, so the oversize condition at priorities `<=
/// prio` is left unchanged even though this call reports `StillOver`.
pub fn trim(
    queues: &mut PriorityQueues,
    db: &dyn CheckerDatabase,
    prio: u8,
    max_keys: usize,
) -> TrimOutcome {
    let pre_size = queues.persistent_keys_above(prio);
    if pre_size > max_keys {
        for mut entry in queues.drain_persistent_below(prio) {
            entry.item.chosen_by = ChosenBy::UNADOPTED;
            db.store(&entry.item);
        }
        return TrimOutcome::StillOver;
    }

    let post_size = queues.persistent_keys_below(prio);
    if pre_size + post_size < max_keys {
        return TrimOutcome::WithinLimit;
    }

    let mut total = pre_size + post_size;
    while total >= max_keys {
        match queues.pop_persistent_tail_below(prio) {
            Some(mut entry) => {
                total -= entry.keys.len();
                entry.item.chosen_by = ChosenBy::UNADOPTED;
                db.store(&entry.item);
            }
            None => return TrimOutcome::StillOver,
        }
    }
    TrimOutcome::WithinLimit
}
