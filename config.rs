//! Tunables for the checker: a plain struct of named fields with a
//! `Default` impl carrying the production defaults, rather than magic
//! numbers scattered through the dispatch code.

use serde::Deserialize;

/// The ceiling the trimmer enforces on the total number of keys held
/// across all persistent queues.
pub const MAX_PERSISTENT_KEYS: usize = 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckerConfig {
    /// Number of priority classes the queues and database are indexed by.
    pub num_priorities: u8,

    /// Ceiling on total persistent keys across all priorities; the trimmer
    /// runs whenever the loader pushes the queues over this.
    pub max_persistent_keys: usize,

    /// Downstream-queue length above which the dispatch loop sleeps
    /// instead of probing the store.
    pub downstream_sleep_threshold: usize,

    /// Downstream-queue length above which the dispatch loop still runs
    /// but skips persistent work.
    pub downstream_only_transient_threshold: usize,

    /// How long the dispatch loop sleeps when the downstream queue is over
    /// `downstream_sleep_threshold`.
    pub sleep_when_congested: std::time::Duration,

    /// How long the dispatch loop waits on its condition variable when
    /// there is no work.
    pub poll_timeout: std::time::Duration,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            num_priorities: 3,
            max_persistent_keys: MAX_PERSISTENT_KEYS,
            downstream_sleep_threshold: 500,
            downstream_only_transient_threshold: 100,
            sleep_when_congested: std::time::Duration::from_secs(10),
            poll_timeout: std::time::Duration::from_secs(100),
        }
    }
}
