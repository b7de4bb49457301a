//! Backend Module
//!
//! The key-value primitives the record engine is built on, and the adapters
//! that provide them.
//!
//! ## Adapters
//! - `MemoryBackend`: in-process keyspace, nothing persisted
//! - `Store` (see `crate::store`): keyspace + WAL + checkpoints, embedded
//! - `RemoteBackend`: pooled TCP client for `metaengine-server`
//!
//! ## Primitive Contract
//! - `incr` is atomic and is the only non-idempotent primitive
//! - `sadd`/`srem` report whether membership changed, and never fail
//!   because a member is already present/absent

mod memory;
mod remote;

pub use memory::MemoryBackend;
pub use remote::RemoteBackend;

use crate::error::Result;

/// Key-value primitives consumed by the record table and the index
pub trait Backend: Send + Sync {
    /// Atomically increment the counter at `key` (missing = 0), returning the new value
    fn incr(&self, key: &[u8]) -> Result<u64>;

    /// Get a string value
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Set a string value
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Add `member` to the set at `key`; true if it was not present
    fn sadd(&self, key: &[u8], member: &[u8]) -> Result<bool>;

    /// Remove `member` from the set at `key`; true if it was present
    fn srem(&self, key: &[u8], member: &[u8]) -> Result<bool>;

    /// All members of the set at `key` (empty if absent)
    fn smembers(&self, key: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// Health check
    fn ping(&self) -> Result<()>;

    /// Largest value `set` can carry; unbounded unless the transport limits it
    fn max_value_len(&self) -> usize {
        usize::MAX
    }
}
