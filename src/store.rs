//! Store Module
//!
//! The durable backend: a keyspace made crash-safe by a write-ahead log and
//! periodic checkpoints.
//!
//! ## Responsibilities
//! - Log every mutation to the WAL before applying it to the keyspace
//! - Handle concurrent read/write access
//! - Checkpoint the keyspace when the WAL grows too large
//! - Manage crash recovery on startup (checkpoint + WAL replay)

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::backend::Backend;
use crate::config::Config;
use crate::error::{MetaError, Result};
use crate::keyspace::{Keyspace, KeyspaceSnapshot};
use crate::protocol::{Command, Response};
use crate::wal::{Operation, WalRecovery, WalWriter};

/// Magic bytes identifying a checkpoint file
const CHECKPOINT_MAGIC: &[u8; 4] = b"MECK";

/// Current checkpoint format version
const CHECKPOINT_VERSION: u16 = 1;

/// Checkpoint header: Magic (4) + Version (2) + CRC (4) + Len (8)
const CHECKPOINT_HEADER_SIZE: usize = 18;

/// The durable key-value store
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (set/incr/sadd/srem/checkpoint): Serialized by `write_lock`
///   - Must acquire: write_lock → WAL → keyspace
///
/// - **Reads** (get/smembers): Keyspace read lock only
///
/// ## Recovery Caveat
/// A crash after a checkpoint is written but before the WAL is truncated
/// replays the WAL on top of the checkpoint. Set operations are idempotent;
/// counters may advance twice, which leaves a gap in record IDs but never
/// reuses one.
pub struct Store {
    /// Store configuration
    config: Config,

    /// Write-ahead log for durability (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// In-memory state (internal RwLock)
    keyspace: Keyspace,

    /// Serializes write operations
    write_lock: Mutex<()>,
}

impl Store {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const CHECKPOINT_FILENAME: &'static str = "checkpoint.bin";

    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Open/create data directory
    /// 2. Load the latest checkpoint if one exists
    /// 3. Recover from WAL and replay on top of it
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let checkpoint_path = config.data_dir.join(Self::CHECKPOINT_FILENAME);

        let keyspace = if checkpoint_path.exists() {
            let snapshot = read_checkpoint(&checkpoint_path)?;
            tracing::info!(
                "Loaded checkpoint: {} strings, {} sets",
                snapshot.strings.len(),
                snapshot.sets.len()
            );
            Keyspace::from_snapshot(snapshot)
        } else {
            Keyspace::new()
        };

        if wal_path.exists() {
            let (entries, recovery_result) = WalRecovery::recover(&wal_path)?;

            if recovery_result.entries_recovered > 0 || recovery_result.entries_corrupted > 0 {
                tracing::info!(
                    "WAL recovery: {} entries recovered, {} corrupted, last_lsn={}",
                    recovery_result.entries_recovered,
                    recovery_result.entries_corrupted,
                    recovery_result.last_lsn
                );
            }

            for entry in entries {
                let lsn = entry.lsn;
                if let Err(e) = keyspace.apply(entry.operation) {
                    tracing::warn!("Skipping WAL entry {} during replay: {}", lsn, e);
                }
            }
        }

        let wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;

        Ok(Self {
            config,
            wal: Mutex::new(wal),
            keyspace,
            write_lock: Mutex::new(()),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Execute a wire command
    ///
    /// Routes commands to the matching primitive. AUTH is answered by the
    /// connection, never by the store.
    pub fn execute(&self, command: Command) -> Result<Response> {
        match command {
            Command::Get { key } => Ok(match self.keyspace.get(&key) {
                Some(value) => Response::ok(Some(value)),
                None => Response::not_found(),
            }),
            Command::Set { key, value } => {
                self.set_value(key, value)?;
                Ok(Response::ok(None))
            }
            Command::Incr { key } => Ok(Response::integer(self.increment(&key)?)),
            Command::SAdd { key, member } => Ok(Response::flag(self.add_member(key, member)?)),
            Command::SRem { key, member } => {
                Ok(Response::flag(self.remove_member(key, member)?))
            }
            Command::SMembers { key } => Ok(Response::members(&self.keyspace.smembers(&key))),
            Command::Ping => Ok(Response::ok(Some(b"PONG".to_vec()))),
            Command::Auth { .. } => Err(MetaError::Protocol(
                "AUTH must be handled by the connection".to_string(),
            )),
        }
    }

    /// Set a string value
    pub fn set_value(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let _write_guard = self.write_lock.lock();

        self.wal.lock().append(Operation::Set {
            key: key.clone(),
            value: value.clone(),
        })?;
        self.keyspace.set(key, value);

        self.maybe_checkpoint()
    }

    /// Increment a counter, returning its new value
    pub fn increment(&self, key: &[u8]) -> Result<u64> {
        let _write_guard = self.write_lock.lock();

        // Refuse before logging so replay never meets a bad increment
        if let Some(raw) = self.keyspace.get(key) {
            let numeric = std::str::from_utf8(&raw)
                .map(|s| s.parse::<u64>().is_ok())
                .unwrap_or(false);
            if !numeric {
                return Err(MetaError::InvalidInput("value is not an integer".to_string()));
            }
        }

        self.wal.lock().append(Operation::Incr { key: key.to_vec() })?;
        let value = self.keyspace.incr(key)?;

        self.maybe_checkpoint()?;
        Ok(value)
    }

    /// Add a set member; unchanged memberships are not logged
    pub fn add_member(&self, key: Vec<u8>, member: Vec<u8>) -> Result<bool> {
        let _write_guard = self.write_lock.lock();

        if self.keyspace.sismember(&key, &member) {
            return Ok(false);
        }
        self.wal.lock().append(Operation::SetAdd {
            key: key.clone(),
            member: member.clone(),
        })?;
        self.keyspace.sadd(key, member);

        self.maybe_checkpoint()?;
        Ok(true)
    }

    /// Remove a set member; unchanged memberships are not logged
    pub fn remove_member(&self, key: Vec<u8>, member: Vec<u8>) -> Result<bool> {
        let _write_guard = self.write_lock.lock();

        if !self.keyspace.sismember(&key, &member) {
            return Ok(false);
        }
        self.wal.lock().append(Operation::SetRemove {
            key: key.clone(),
            member: member.clone(),
        })?;
        self.keyspace.srem(&key, &member);

        self.maybe_checkpoint()?;
        Ok(true)
    }

    /// Write a checkpoint and truncate the WAL (public API)
    pub fn checkpoint(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.checkpoint_internal()
    }

    /// Checkpoint if the WAL passed its size limit (write lock held)
    fn maybe_checkpoint(&self) -> Result<()> {
        if self.wal.lock().size() >= self.config.wal_size_limit {
            self.checkpoint_internal()?;
        }
        Ok(())
    }

    /// Internal checkpoint implementation (called with write lock held)
    fn checkpoint_internal(&self) -> Result<()> {
        let snapshot = self.keyspace.snapshot();
        write_checkpoint(&self.checkpoint_path(), &snapshot)?;

        // Checkpoint is durable, the logged entries are no longer needed
        self.wal.lock().truncate()?;

        tracing::debug!(
            "Checkpoint written: {} strings, {} sets",
            snapshot.strings.len(),
            snapshot.sets.len()
        );
        Ok(())
    }

    /// Close the store gracefully
    ///
    /// Syncs the WAL so every acknowledged write is on disk
    pub fn close(self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.wal.lock().sync()?;
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    fn checkpoint_path(&self) -> PathBuf {
        self.config.data_dir.join(Self::CHECKPOINT_FILENAME)
    }

    /// Get the current WAL size in bytes
    pub fn wal_size(&self) -> u64 {
        self.wal.lock().size()
    }

    /// Number of keys held (strings + sets)
    pub fn key_count(&self) -> usize {
        self.keyspace.key_count()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Backend for Store {
    fn incr(&self, key: &[u8]) -> Result<u64> {
        self.increment(key)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.keyspace.get(key))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.set_value(key.to_vec(), value.to_vec())
    }

    fn sadd(&self, key: &[u8], member: &[u8]) -> Result<bool> {
        self.add_member(key.to_vec(), member.to_vec())
    }

    fn srem(&self, key: &[u8], member: &[u8]) -> Result<bool> {
        self.remove_member(key.to_vec(), member.to_vec())
    }

    fn smembers(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        Ok(self.keyspace.smembers(key))
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Checkpoint Files
// =============================================================================

/// Write a snapshot via a temp file + rename so a crash never leaves a torn checkpoint
fn write_checkpoint(path: &Path, snapshot: &KeyspaceSnapshot) -> Result<()> {
    let body =
        bincode::serialize(snapshot).map_err(|e| MetaError::Serialization(e.to_string()))?;
    let crc = crc32fast::hash(&body);

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(CHECKPOINT_MAGIC)?;
        file.write_all(&CHECKPOINT_VERSION.to_le_bytes())?;
        file.write_all(&crc.to_le_bytes())?;
        file.write_all(&(body.len() as u64).to_le_bytes())?;
        file.write_all(&body)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    // The rename must be durable before the WAL is truncated
    if let Some(parent) = path.parent() {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}

fn read_checkpoint(path: &Path) -> Result<KeyspaceSnapshot> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;

    if bytes.len() < CHECKPOINT_HEADER_SIZE || &bytes[0..4] != CHECKPOINT_MAGIC {
        return Err(MetaError::Serialization(format!(
            "{} is not a checkpoint file",
            path.display()
        )));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != CHECKPOINT_VERSION {
        return Err(MetaError::Serialization(format!(
            "Unsupported checkpoint version: {}",
            version
        )));
    }

    let mut crc = [0u8; 4];
    crc.copy_from_slice(&bytes[6..10]);
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[10..18]);
    let len = u64::from_le_bytes(len) as usize;

    let body = &bytes[CHECKPOINT_HEADER_SIZE..];
    if body.len() != len || crc32fast::hash(body) != u32::from_le_bytes(crc) {
        return Err(MetaError::Serialization(format!(
            "Checkpoint {} failed its integrity check",
            path.display()
        )));
    }

    bincode::deserialize(body).map_err(|e| MetaError::Serialization(e.to_string()))
}
