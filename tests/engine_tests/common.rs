//! Shared helpers for engine tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use metaengine::backend::{Backend, MemoryBackend};
use metaengine::{Config, MetaEngine, MetaError, Result};

/// Engine over a fresh memory backend with a small cell width
pub fn small_engine(width: usize) -> MetaEngine {
    let config = Config::builder().max_string_length(width).build();
    MetaEngine::new(Arc::new(MemoryBackend::new()), config).unwrap()
}

/// Memory backend whose writes can be switched off per key prefix
#[derive(Default)]
pub struct FlakyBackend {
    inner: MemoryBackend,
    fail_records: AtomicBool,
    fail_index: AtomicBool,
}

impl FlakyBackend {
    pub fn fail_record_writes(&self, on: bool) {
        self.fail_records.store(on, Ordering::SeqCst);
    }

    pub fn fail_index_writes(&self, on: bool) {
        self.fail_index.store(on, Ordering::SeqCst);
    }

    fn check(&self, key: &[u8]) -> Result<()> {
        let down = (key.starts_with(b"me:rec:") && self.fail_records.load(Ordering::SeqCst))
            || (key.starts_with(b"me:idx:") && self.fail_index.load(Ordering::SeqCst));
        if down {
            Err(MetaError::BackendUnavailable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Backend for FlakyBackend {
    fn incr(&self, key: &[u8]) -> Result<u64> {
        self.inner.incr(key)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.check(key)?;
        self.inner.set(key, value)
    }

    fn sadd(&self, key: &[u8], member: &[u8]) -> Result<bool> {
        self.check(key)?;
        self.inner.sadd(key, member)
    }

    fn srem(&self, key: &[u8], member: &[u8]) -> Result<bool> {
        self.check(key)?;
        self.inner.srem(key, member)
    }

    fn smembers(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.inner.smembers(key)
    }

    fn ping(&self) -> Result<()> {
        self.inner.ping()
    }
}

/// Engine plus a handle on its flaky backend
pub fn flaky_engine() -> (Arc<FlakyBackend>, MetaEngine) {
    let backend = Arc::new(FlakyBackend::default());
    let engine = MetaEngine::new(backend.clone(), Config::default()).unwrap();
    (backend, engine)
}
