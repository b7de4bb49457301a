//! Configuration for the Meta Engine
//!
//! Centralized configuration with sensible defaults. One `Config` covers the
//! record engine, the durable store and the backend server; each component
//! reads only the fields it needs.

use std::path::PathBuf;

use crate::error::{MetaError, Result};

/// Default fixed cell width for field names and values (bytes, including NUL)
pub const ME_STRING_MAX_LENGTH: usize = 1024;

/// Main configuration for a Meta Engine deployment
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Record Configuration
    // -------------------------------------------------------------------------
    /// Width of one field cell. Strings may use `max_string_length - 1` bytes;
    /// every writer sharing a backend must agree on this value.
    pub max_string_length: usize,

    /// Number of per-record write lock stripes
    pub lock_stripes: usize,

    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for durable store files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     └── checkpoint.bin   (keyspace snapshot)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// WAL size (in bytes) after which the store takes a checkpoint
    pub wal_size_limit: u64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address of the backend server
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds), 0 disables
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds), 0 disables
    pub write_timeout_ms: u64,

    /// Password required by the server (`None` = open server)
    pub password: Option<String>,

    /// Connections kept by a remote backend client
    pub pool_size: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_string_length: ME_STRING_MAX_LENGTH,
            lock_stripes: 64,
            data_dir: PathBuf::from("./metaengine_data"),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            wal_size_limit: 64 * 1024 * 1024, // 64 MB
            listen_addr: "127.0.0.1:6379".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            password: None,
            pool_size: 8,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check values that would make the engine unusable
    pub fn validate(&self) -> Result<()> {
        if self.max_string_length < 2 {
            return Err(MetaError::Config(format!(
                "max_string_length must be at least 2, got {}",
                self.max_string_length
            )));
        }
        if self.lock_stripes == 0 {
            return Err(MetaError::Config("lock_stripes must be non-zero".to_string()));
        }
        if self.pool_size == 0 {
            return Err(MetaError::Config("pool_size must be non-zero".to_string()));
        }
        if self.max_connections == 0 {
            return Err(MetaError::Config(
                "max_connections must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the field cell width
    pub fn max_string_length(mut self, len: usize) -> Self {
        self.config.max_string_length = len;
        self
    }

    /// Set the number of record lock stripes
    pub fn lock_stripes(mut self, stripes: usize) -> Self {
        self.config.lock_stripes = stripes;
        self
    }

    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the WAL size that triggers a checkpoint (in bytes)
    pub fn wal_size_limit(mut self, bytes: u64) -> Self {
        self.config.wal_size_limit = bytes;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Require (server) or send (client) a password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Set the remote connection pool size
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
