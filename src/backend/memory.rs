//! In-memory backend
//!
//! Serves the backend primitives straight from a `Keyspace`.

use crate::error::Result;
use crate::keyspace::Keyspace;

use super::Backend;

/// Non-durable backend for embedding and tests
#[derive(Default)]
pub struct MemoryBackend {
    keyspace: Keyspace,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying keyspace
    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }
}

impl Backend for MemoryBackend {
    fn incr(&self, key: &[u8]) -> Result<u64> {
        self.keyspace.incr(key)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.keyspace.get(key))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.keyspace.set(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn sadd(&self, key: &[u8], member: &[u8]) -> Result<bool> {
        Ok(self.keyspace.sadd(key.to_vec(), member.to_vec()))
    }

    fn srem(&self, key: &[u8], member: &[u8]) -> Result<bool> {
        Ok(self.keyspace.srem(key, member))
    }

    fn smembers(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        Ok(self.keyspace.smembers(key))
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}
