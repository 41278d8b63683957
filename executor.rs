//! A small priority thread pool the checker dispatches work onto.
//!
//! One thread is dedicated solely to the priority lane — the checker's
//! "database thread" — so at most one database-thread job ever runs at a
//! time, no matter how large the pool is; the rest drain the nice lane. A
//! [`DatastoreChecker`](crate::checker::DatastoreChecker) is a long-lived,
//! owned singleton rather than a scope-bound borrower, so this pool spawns
//! plain `'static` threads and joins them on `Drop`.

use crossbeam::channel::{select_biased, unbounded, Receiver, Sender};
use std::thread::{Builder, JoinHandle};
use tracing::error;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size pool with a priority lane — the loader's work and the
/// database-thread finish-register jobs are always queued here — and a
/// regular lane for everything else. The priority lane is drained by
/// exactly one thread, so it behaves as the single "database thread" the
/// checker's locking discipline assumes.
pub struct PriorityExecutor {
    priority_sender: Sender<Job>,
    nice_sender: Sender<Job>,
    threads: Vec<JoinHandle<()>>,
}

impl PriorityExecutor {
    pub fn new(thread_count: usize, name: &str) -> Self {
        let thread_count = thread_count.max(1);
        let (priority_sender, priority_receiver) = unbounded::<Job>();
        let (nice_sender, nice_receiver) = unbounded::<Job>();
        let mut threads = Vec::with_capacity(thread_count);

        // With only one thread in the pool there's nobody else to dedicate
        // the priority lane to, so that thread multiplexes both — the
        // single-database-thread invariant still holds trivially, since a
        // pool of one can never run two jobs at once regardless of lane.
        if thread_count == 1 {
            if let Some(handle) = spawn_multiplexed(format!("{name}-0"), priority_receiver, nice_receiver) {
                threads.push(handle);
            }
        } else {
            if let Some(handle) = spawn_db_thread(format!("{name}-db"), priority_receiver) {
                threads.push(handle);
            }
            for i in 1..thread_count {
                if let Some(handle) = spawn_nice_thread(format!("{name}-{i}"), nice_receiver.clone()) {
                    threads.push(handle);
                }
            }
        }

        if threads.is_empty() {
            panic!("PriorityExecutor::new couldn't spawn any threads");
        }

        Self {
            priority_sender,
            nice_sender,
            threads,
        }
    }

    pub fn execute(&self, task: Job) {
        let _ = self.nice_sender.send(task);
    }

    pub fn execute_priority(&self, task: Job) {
        let _ = self.priority_sender.send(task);
    }
}

fn spawn_db_thread(name: String, priority_receiver: Receiver<Job>) -> Option<JoinHandle<()>> {
    Builder::new()
        .name(name)
        .spawn(move || {
            while let Ok(task) = priority_receiver.recv() {
                task();
            }
        })
        .inspect_err(|err| error!(error = %err, "couldn't spawn database-thread executor thread"))
        .ok()
}

fn spawn_nice_thread(name: String, nice_receiver: Receiver<Job>) -> Option<JoinHandle<()>> {
    Builder::new()
        .name(name)
        .spawn(move || {
            while let Ok(task) = nice_receiver.recv() {
                task();
            }
        })
        .inspect_err(|err| error!(error = %err, "couldn't spawn executor thread"))
        .ok()
}

fn spawn_multiplexed(name: String, priority_receiver: Receiver<Job>, nice_receiver: Receiver<Job>) -> Option<JoinHandle<()>> {
    Builder::new()
        .name(name)
        .spawn(move || {
            while let Ok(task) = select_biased! {
                recv(priority_receiver) -> msg => msg,
                recv(nice_receiver) -> msg => msg,
            } {
                task();
            }
        })
        .inspect_err(|err| error!(error = %err, "couldn't spawn executor thread"))
        .ok()
}

impl Drop for PriorityExecutor {
    fn drop(&mut self) {
        let (priority_sender, _) = unbounded::<Job>();
        let (nice_sender, _) = unbounded::<Job>();
        self.priority_sender = priority_sender;
        self.nice_sender = nice_sender;
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}
