//! Keyspace Module
//!
//! In-memory data structure holding the backend's strings, counters and sets.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Atomic counter increments (record ID allocation)
//! - Set membership add/remove/query (secondary index storage)
//! - Snapshots for checkpoints
//!
//! ## Data Structure Choice
//! Two BTreeMaps behind one RwLock:
//! - Ordered keys keep snapshots deterministic
//! - A single lock makes `incr` trivially atomic

mod table;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub use table::Keyspace;

/// Full keyspace contents, as written to a checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyspaceSnapshot {
    /// String values (counters are stored as decimal strings)
    pub strings: BTreeMap<Vec<u8>, Vec<u8>>,

    /// Non-empty sets
    pub sets: BTreeMap<Vec<u8>, BTreeSet<Vec<u8>>>,
}
