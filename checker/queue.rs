//! Per-priority in-memory queues.
//!
//! Each priority class gets one FIFO of transient entries and one FIFO of
//! persistent entries, instead of several arrays kept in lockstep — "same
//! index means same request" becomes structural rather than an invariant
//! someone has to maintain by hand. `TransientEntry`/`PersistentEntry` are
//! the record; `VecDeque` is the FIFO, since within a priority class both
//! kinds of work are served in arrival order.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::checker::item::DatastoreCheckerItem;
use crate::traits::{BlockSet, RequestScheduler};
use crate::types::{GetterId, RoutingKey};

#[derive(Clone)]
pub struct TransientEntry {
    pub keys: Vec<RoutingKey>,
    pub getter: GetterId,
    pub blocks: Option<Arc<dyn BlockSet>>,
}

#[derive(Clone)]
pub struct PersistentEntry {
    pub keys: Vec<RoutingKey>,
    pub getter: GetterId,
    pub dont_cache: bool,
    pub scheduler: Arc<dyn RequestScheduler>,
    pub item: DatastoreCheckerItem,
    pub blocks: Option<Arc<dyn BlockSet>>,
}

/// One piece of work pulled off the queues by the dispatch loop, with
/// enough context to probe the store and report back without re-acquiring
/// the monitor.
pub enum DequeuedWork {
    Transient {
        prio: u8,
        keys: Vec<RoutingKey>,
        getter: GetterId,
        blocks: Option<Arc<dyn BlockSet>>,
    },
    Persistent {
        prio: u8,
        keys: Vec<RoutingKey>,
        getter: GetterId,
        dont_cache: bool,
        scheduler: Arc<dyn RequestScheduler>,
        item: DatastoreCheckerItem,
        blocks: Option<Arc<dyn BlockSet>>,
    },
}

/// The checker's per-priority transient and persistent FIFOs. Always
/// accessed from inside the checker's single monitor — this type has no
/// internal locking of its own.
pub struct PriorityQueues {
    transient: Vec<VecDeque<TransientEntry>>,
    persistent: Vec<VecDeque<PersistentEntry>>,
}

impl PriorityQueues {
    pub fn new(num_priorities: usize) -> Self {
        Self {
            transient: (0..num_priorities).map(|_| VecDeque::new()).collect(),
            persistent: (0..num_priorities).map(|_| VecDeque::new()).collect(),
        }
    }

    pub fn num_priorities(&self) -> usize {
        self.transient.len()
    }

    pub fn push_transient(&mut self, prio: usize, entry: TransientEntry) {
        self.transient[prio].push_back(entry);
    }

    /// Enqueues a persistent entry. Returns `false` without enqueuing if
    /// `entry.getter` is already present at this priority — a getter never
    /// appears twice in the persistent queue for the same priority.
    pub fn push_persistent(&mut self, prio: usize, entry: PersistentEntry) -> bool {
        if self.persistent_contains(prio, entry.getter) {
            return false;
        }
        self.persistent[prio].push_back(entry);
        true
    }

    pub fn persistent_contains(&self, prio: usize, getter: GetterId) -> bool {
        self.persistent[prio].iter().any(|e| e.getter == getter)
    }

    pub fn transient_len(&self, prio: usize) -> usize {
        self.transient[prio].len()
    }

    pub fn persistent_key_count(&self, prio: usize) -> usize {
        self.persistent[prio].iter().map(|e| e.keys.len()).sum()
    }

    pub fn total_persistent_keys(&self) -> usize {
        (0..self.persistent.len())
            .map(|p| self.persistent_key_count(p))
            .sum()
    }

    /// Sum of persistent keys at priorities strictly higher (numerically
    /// lower) than `prio`.
    pub fn persistent_keys_above(&self, prio: u8) -> usize {
        (0..prio as usize).map(|p| self.persistent_key_count(p)).sum()
    }

    /// Sum of persistent keys at priority `prio` and everything more urgent.
    pub fn persistent_keys_at_or_above(&self, prio: u8) -> usize {
        self.persistent_keys_above(prio) + self.persistent_key_count(prio as usize)
    }

    /// Sum of persistent keys at priorities strictly lower (numerically
    /// higher) than `prio`.
    pub fn persistent_keys_below(&self, prio: u8) -> usize {
        ((prio as usize + 1)..self.persistent.len())
            .map(|p| self.persistent_key_count(p))
            .sum()
    }

    /// Drops every persistent entry at priorities strictly greater than
    /// `prio` (i.e. less urgent), returning the dropped entries so the
    /// caller can reset `chosen_by` and re-persist them.
    pub fn drain_persistent_below(&mut self, prio: u8) -> Vec<PersistentEntry> {
        let mut dropped = Vec::new();
        for queue in self.persistent.iter_mut().skip(prio as usize + 1) {
            dropped.extend(queue.drain(..));
        }
        dropped
    }

    /// Pops one entry from the back (most recently enqueued) of the lowest
    /// populated persistent priority that is strictly greater than `prio`.
    /// Used by the trimmer to shed work one item at a time.
    pub fn pop_persistent_tail_below(&mut self, prio: u8) -> Option<PersistentEntry> {
        for p in (prio as usize + 1..self.persistent.len()).rev() {
            if let Some(entry) = self.persistent[p].pop_back() {
                return Some(entry);
            }
        }
        None
    }

    /// Selects the next work item by priority-then-arrival: for each
    /// priority from highest to lowest, prefer the head of the transient
    /// queue; otherwise, unless `only_transient`, take the head of the
    /// persistent queue.
    pub fn pop_next(&mut self, only_transient: bool) -> Option<DequeuedWork> {
        for prio in 0..self.transient.len() {
            if let Some(entry) = self.transient[prio].pop_front() {
                return Some(DequeuedWork::Transient {
                    prio: prio as u8,
                    keys: entry.keys,
                    getter: entry.getter,
                    blocks: entry.blocks,
                });
            }
            if !only_transient {
                if let Some(entry) = self.persistent[prio].pop_front() {
                    return Some(DequeuedWork::Persistent {
                        prio: prio as u8,
                        keys: entry.keys,
                        getter: entry.getter,
                        dont_cache: entry.dont_cache,
                        scheduler: entry.scheduler,
                        item: entry.item,
                        blocks: entry.blocks,
                    });
                }
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.transient.iter().all(|q| q.is_empty())
            && self.persistent.iter().all(|q| q.is_empty())
    }
}
