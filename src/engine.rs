//! Engine Module
//!
//! The `MetaEngine` facade: one explicitly constructed instance owning a
//! backend handle and the record table, index and query layers built on it.
//!
//! ## Responsibilities
//! - Build the backend adapter (memory, durable store or remote server)
//! - Collapse caller pair sequences into field maps
//! - Expose the boundary operations, turning empty searches into `NoMatch`
//!
//! ## Sharing
//! `MetaEngine` is `Send + Sync`; share one instance through an `Arc`.
//! Creations contend only on the backend counter, appends only on the lock
//! stripe of their record.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::backend::{Backend, MemoryBackend, RemoteBackend};
use crate::config::Config;
use crate::error::{MetaError, Result};
use crate::field::{collect_fields, FieldPair, Fields, RecordId};
use crate::query::{QueryEngine, Scan};
use crate::record::RecordTable;
use crate::store::Store;

/// Schema-less record store over a key-value backend
pub struct MetaEngine {
    /// Engine configuration
    config: Config,

    /// Shared backend handle (also held by the table and index)
    backend: Arc<dyn Backend>,

    /// Record storage, owning the secondary index
    table: RecordTable,
}

impl MetaEngine {
    /// Build an engine over an existing backend
    pub fn new(backend: Arc<dyn Backend>, config: Config) -> Result<Self> {
        let table = RecordTable::new(Arc::clone(&backend), &config)?;
        Ok(Self {
            config,
            backend,
            table,
        })
    }

    /// Engine over a fresh in-process backend; nothing is persisted
    pub fn in_memory() -> Result<Self> {
        Self::new(Arc::new(MemoryBackend::new()), Config::default())
    }

    /// Engine over an embedded durable store in `config.data_dir`
    pub fn open(config: Config) -> Result<Self> {
        let store = Store::open(config.clone())?;
        tracing::info!("Opened durable store at {}", config.data_dir.display());
        Self::new(Arc::new(store), config)
    }

    /// Connect to a `metaengine-server` at `host:port`
    ///
    /// Fails with `BackendUnavailable` when the server cannot be reached; no
    /// engine is built in that case.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let backend = RemoteBackend::connect(host, port)?;
        Self::new(Arc::new(backend), Config::default())
    }

    /// Connect and authenticate with `password`
    pub fn connect_with_password(host: &str, port: u16, password: &str) -> Result<Self> {
        let backend = RemoteBackend::connect_with_password(host, port, password)?;
        Self::new(Arc::new(backend), Config::default())
    }

    /// Connect to `addr` using the pool size, timeouts and password of `config`
    pub fn connect_with_config(addr: &str, config: Config) -> Result<Self> {
        let backend = RemoteBackend::connect_with_config(addr, &config)?;
        Self::new(Arc::new(backend), config)
    }

    // =========================================================================
    // Boundary Operations
    // =========================================================================

    /// Create a record from name/value pairs, returning its ID
    ///
    /// Duplicate names collapse to the last value.
    pub fn create_record<I, P>(&self, pairs: I) -> Result<RecordId>
    where
        I: IntoIterator<Item = P>,
        P: Into<FieldPair>,
    {
        self.table.create(&collect_fields(pairs))
    }

    /// Add or overwrite fields of an existing record
    pub fn append_to_record<I, P>(&self, id: RecordId, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: Into<FieldPair>,
    {
        self.table.append(id, &collect_fields(pairs))
    }

    /// Records with `search_name == search_value` lacking `exclude_name`
    ///
    /// Returns `NoMatch` when there are none.
    pub fn get_unprocessed_records(
        &self,
        search_name: &str,
        search_value: &str,
        exclude_name: &str,
    ) -> Result<BTreeMap<RecordId, String>> {
        let matches = self
            .query()
            .find_unprocessed(search_name, search_value, exclude_name)?;
        non_empty(matches)
    }

    /// Full field maps of records with `name == value`
    ///
    /// Returns `NoMatch` when there are none.
    pub fn get_records(&self, name: &str, value: &str) -> Result<BTreeMap<RecordId, Fields>> {
        non_empty(self.query().find_all(name, value)?)
    }

    // =========================================================================
    // Component Operations
    // =========================================================================

    /// Full field set of a record (empty if it does not exist)
    pub fn get_all_fields(&self, id: RecordId) -> Result<Fields> {
        self.table.get_all_fields(id)
    }

    pub fn get_field(&self, id: RecordId, name: &str) -> Result<Option<String>> {
        self.table.get_field(id, name)
    }

    /// IDs of records with `name == value` (empty set when none)
    pub fn find_by_field(&self, name: &str, value: &str) -> Result<BTreeSet<RecordId>> {
        self.query().find_by_field(name, value)
    }

    /// Complete a creation that failed with `IncompleteWrite`
    pub fn resume_create<I, P>(&self, id: RecordId, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: Into<FieldPair>,
    {
        self.table.resume_create(id, &collect_fields(pairs))
    }

    /// Restore missing index entries of a record
    pub fn reindex(&self, id: RecordId) -> Result<()> {
        self.table.reindex(id)
    }

    /// Highest allocated record ID
    pub fn last_id(&self) -> Result<Option<RecordId>> {
        self.table.last_id()
    }

    /// Every field name ever written
    pub fn field_names(&self) -> Result<BTreeSet<String>> {
        self.table.field_names()
    }

    /// Append `(new_name, new_value)` to every record matching `(match_name, match_value)`
    ///
    /// Each record is updated under its own lock. Returns the number of
    /// records updated.
    pub fn add_field_to_all_matched(
        &self,
        match_name: &str,
        match_value: &str,
        new_name: &str,
        new_value: &str,
    ) -> Result<usize> {
        let update = collect_fields([(new_name, new_value)]);
        self.table.codec().validate_fields(&update)?;

        let matched = self.query().find_all(match_name, match_value)?;
        for id in matched.keys() {
            self.table.append(*id, &update)?;
        }

        tracing::debug!(
            "Tagged {} records matching {}={} with {}={}",
            matched.len(),
            match_name,
            match_value,
            new_name,
            new_value
        );
        Ok(matched.len())
    }

    /// Iterate over every stored record in ID order
    pub fn scan(&self) -> Result<Scan<'_>> {
        self.query().scan()
    }

    /// Query layer over this engine's table
    pub fn query(&self) -> QueryEngine<'_> {
        QueryEngine::new(&self.table)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Check the backend is reachable
    pub fn ping(&self) -> Result<()> {
        self.backend.ping()
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn non_empty<K, V>(map: BTreeMap<K, V>) -> Result<BTreeMap<K, V>> {
    if map.is_empty() {
        Err(MetaError::NoMatch)
    } else {
        Ok(map)
    }
}
