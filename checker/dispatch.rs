//! The worker loop. One of these runs per
//! [`DatastoreChecker`](crate::checker::DatastoreChecker), dispatched onto
//! the host's [`PriorityExecutor`](crate::executor::PriorityExecutor) as a
//! single long-lived job.

use std::sync::Arc;

use tracing::{error, warn};

use crate::checker::loader;
use crate::checker::queue::DequeuedWork;
use crate::checker::Inner;
use crate::types::GetterId;

pub(crate) fn run(inner: Arc<Inner>) {
    loop {
        if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            run_one_iteration(&inner);
        })) {
            error!(?panic, "datastore checker dispatch iteration panicked, resuming");
        }
    }
}

fn run_one_iteration(inner: &Arc<Inner>) {
    let downstream_len = inner.downstream.completion_queue_len();
    if downstream_len > inner.config.downstream_sleep_threshold {
        warn!(downstream_len, "downstream completion queue overloaded, sleeping");
        std::thread::sleep(inner.config.sleep_when_congested);
        return;
    }
    let only_transient = downstream_len > inner.config.downstream_only_transient_threshold;

    let work = {
        let mut queues = inner.queues.lock().expect("checker monitor poisoned");
        loop {
            if let Some(work) = queues.pop_next(only_transient) {
                break Some(work);
            }
            // Submitting the job is a plain channel send, so this happens
            // while `queues` is still held; the loader body itself runs on
            // the priority lane and never touches this lock across a
            // database call. Holding the lock through to `wait_timeout`
            // below closes the window where the loader could enqueue and
            // notify before we start waiting — without it we could sleep
            // out the full poll timeout on work the loader already found.
            schedule_loader(inner);
            let (guard, timeout) = inner
                .condvar
                .wait_timeout(queues, inner.config.poll_timeout)
                .expect("checker monitor poisoned");
            queues = guard;
            if timeout.timed_out() {
                return;
            }
        }
    };

    let Some(work) = work else { return };
    dispatch(inner, work);
}

/// Queues the loader onto the priority (database) lane. A no-op if the
/// checker hasn't been started yet — `run_one_iteration` only reaches this
/// with an empty queue, so there's nothing to lose by skipping a reload.
fn schedule_loader(inner: &Arc<Inner>) {
    let Some(executor) = inner.executor.get() else {
        return;
    };
    let inner = inner.clone();
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
}

fn dispatch(inner: &Arc<Inner>, work: DequeuedWork) {
    match work {
        DequeuedWork::Transient { keys, getter, blocks, .. } => {
            let (scheduler, any_valid) = {
                let Some((get, registered_blocks)) = inner.registry.lookup(getter) else {
                    return;
                };
                let blocks = blocks.or(registered_blocks);
                let scheduler = get.scheduler();
                let dont_cache = get.dont_cache();
                let any_valid = probe_and_trip(inner, &keys, blocks.as_deref(), dont_cache, scheduler.as_ref());
                (scheduler, any_valid)
            };
            scheduler.finish_register(&[getter], false, false, None, any_valid, None);
        }
        DequeuedWork::Persistent {
            keys,
            getter,
            dont_cache,
            scheduler,
            item,
            blocks,
            ..
        } => {
            let any_valid = probe_and_trip(inner, &keys, blocks.as_deref(), dont_cache, scheduler.as_ref());

            schedule_loader(inner);

            finish_persistent(inner, getter, scheduler, any_valid, item);
        }
    }
}

fn probe_and_trip(
    inner: &Arc<Inner>,
    keys: &[crate::types::RoutingKey],
    blocks: Option<&dyn crate::traits::BlockSet>,
    dont_cache: bool,
    scheduler: &dyn crate::traits::RequestScheduler,
) -> bool {
    let mut any_valid = false;
    for key in keys {
        let found = match blocks {
            Some(set) => set.get(key),
            None => inner.store.fetch(key, dont_cache),
        };
        match found {
            Some(block) => scheduler.trip_pending_key(block),
            None => any_valid = true,
        }
    }
    any_valid
}

/// The database-thread job queued after a persistent dispatch: silently
/// drop deleted getters, otherwise report completion and re-run the
/// loader.
fn finish_persistent(
    inner: &Arc<Inner>,
    getter: GetterId,
    scheduler: Arc<dyn crate::traits::RequestScheduler>,
    any_valid: bool,
    item: crate::checker::item::DatastoreCheckerItem,
) {
    let inner_for_job = inner.clone();
    let job: Box<dyn FnOnce() + Send + 'static> = Box::new(move || {
        let inner = inner_for_job;
        if !inner.db.is_stored(getter) {
            return;
        }
        scheduler.finish_register(&[getter], true, true, Some(inner.db.as_ref()), any_valid, Some(&item));

        loader::load(
            &inner.queues,
            inner.db.as_ref(),
            &inner.registry,
            inner.node_db_handle,
            inner.boot_id,
            inner.config.max_persistent_keys,
        );
        inner.condvar.notify_all();
    });

    if let Some(executor) = inner.executor.get() {
        executor.execute_priority(job);
    } else {
        job();
    }
}
