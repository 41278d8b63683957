//! # ssk-datastore
//!
//! A fragment of a peer-to-peer content-addressed network node: a
//! self-verifying content block format and the scheduler that fetches
//! blocks for pending requests.
//!
//! ## Overview
//!
//! - **SSK block** ([`block`]): a fixed-size payload plus a 142-byte header
//!   carrying a DSA signature over a layered SHA-256 hash. Parsed from a
//!   flat byte buffer produced by untrusted peers and validated against a
//!   publisher's public key before being admitted.
//! - **Datastore checker** ([`checker`]): a priority-ordered scheduler that
//!   dequeues pending retrieval requests (transient or persistent), probes
//!   a local store, trips waiting continuations with found blocks, and
//!   re-routes the remainder for network fetch. Survives restarts by
//!   reloading persistent work from a durable database.
//!
//! ## Key components
//!
//! - [`block::SSKBlock`]: the self-verifying content block
//! - [`crypto::dsa`]: DSA signature verification
//! - [`checker::DatastoreChecker`]: the scheduler
//! - [`checker::NodeContext`]: host collaborators injected at construction
//! - [`executor::PriorityExecutor`]: the worker/database-thread pool
//! - [`traits`]: the external interfaces a host implements
//!
//! ## Usage
//!
//! ```ignore
//! use ssk_datastore::checker::{DatastoreChecker, NodeContext};
//! use ssk_datastore::config::CheckerConfig;
//! use ssk_datastore::executor::PriorityExecutor;
//! use std::sync::Arc;
//!
//! let checker = DatastoreChecker::new(node_context, CheckerConfig::default());
//! let executor = Arc::new(PriorityExecutor::new(4, "datastore-checker"));
//! checker.start(executor, "datastore-checker");
//! checker.queue_transient_request(getter, None)?;
//! ```

pub mod block;
pub mod checker;
pub mod config;
pub mod crypto;
pub mod error;
pub mod executor;
pub mod traits;
pub mod types;
