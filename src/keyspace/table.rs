//! Keyspace implementation
//!
//! BTreeMap-based keyspace with RwLock for concurrency.

use parking_lot::RwLock;

use crate::error::{MetaError, Result};
use crate::wal::Operation;

use super::KeyspaceSnapshot;

/// In-memory keyspace of strings and sets
pub struct Keyspace {
    data: RwLock<KeyspaceSnapshot>,
}

impl Keyspace {
    /// Create a new empty keyspace
    pub fn new() -> Self {
        Self {
            data: RwLock::new(KeyspaceSnapshot::default()),
        }
    }

    /// Build a keyspace from checkpointed contents
    pub fn from_snapshot(snapshot: KeyspaceSnapshot) -> Self {
        Self {
            data: RwLock::new(snapshot),
        }
    }

    // =========================================================================
    // Strings and counters
    // =========================================================================

    /// Get a string value (read lock)
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.read().strings.get(key).cloned()
    }

    /// Set a string value (write lock)
    pub fn set(&self, key: Vec<u8>, value: Vec<u8>) {
        self.data.write().strings.insert(key, value);
    }

    /// Increment the counter at `key` and return its new value
    ///
    /// A missing key counts as 0.
    pub fn incr(&self, key: &[u8]) -> Result<u64> {
        let mut data = self.data.write();
        let current = match data.strings.get(key) {
            Some(raw) => parse_counter(raw)?,
            None => 0,
        };
        let next = current.checked_add(1).ok_or_else(|| {
            MetaError::InvalidInput(format!("counter {} overflow", String::from_utf8_lossy(key)))
        })?;

        data.strings.insert(key.to_vec(), next.to_string().into_bytes());
        Ok(next)
    }

    // =========================================================================
    // Sets
    // =========================================================================

    /// Add a member to the set at `key`; returns false if already present
    pub fn sadd(&self, key: Vec<u8>, member: Vec<u8>) -> bool {
        self.data.write().sets.entry(key).or_default().insert(member)
    }

    /// Remove a member from the set at `key`; returns false if it was absent
    ///
    /// Sets that become empty are dropped.
    pub fn srem(&self, key: &[u8], member: &[u8]) -> bool {
        let mut data = self.data.write();
        let (removed, now_empty) = match data.sets.get_mut(key) {
            Some(set) => (set.remove(member), set.is_empty()),
            None => return false,
        };
        if now_empty {
            data.sets.remove(key);
        }
        removed
    }

    /// All members of the set at `key` (empty if absent), in sorted order
    pub fn smembers(&self, key: &[u8]) -> Vec<Vec<u8>> {
        self.data
            .read()
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `member` is in the set at `key`
    pub fn sismember(&self, key: &[u8], member: &[u8]) -> bool {
        self.data
            .read()
            .sets
            .get(key)
            .map_or(false, |set| set.contains(member))
    }

    // =========================================================================
    // Replay and checkpoints
    // =========================================================================

    /// Apply a logged operation
    pub fn apply(&self, operation: Operation) -> Result<()> {
        match operation {
            Operation::Set { key, value } => self.set(key, value),
            Operation::Incr { key } => {
                self.incr(&key)?;
            }
            Operation::SetAdd { key, member } => {
                self.sadd(key, member);
            }
            Operation::SetRemove { key, member } => {
                self.srem(&key, &member);
            }
        }
        Ok(())
    }

    /// Copy the full contents (read lock)
    pub fn snapshot(&self) -> KeyspaceSnapshot {
        self.data.read().clone()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of string keys plus number of sets
    pub fn key_count(&self) -> usize {
        let data = self.data.read();
        data.strings.len() + data.sets.len()
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_counter(raw: &[u8]) -> Result<u64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| MetaError::InvalidInput("value is not an integer".to_string()))
}
