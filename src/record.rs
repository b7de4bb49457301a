//! Record Table
//!
//! Owns record identity and the authoritative field storage of each record.
//!
//! ## Key Layout
//! ```text
//! me:last_id   →  number of IDs ever allocated (counter)
//! me:rec:<id>  →  encoded field cells
//! me:fields    →  { every field name ever written }
//! ```
//!
//! ## Write Ordering
//! ```text
//! create:  validate → allocate ID → store cells → insert index → register names
//! append:  lock stripe → read → remove stale index → store cells → insert index
//! ```
//! Fields are stored before they are indexed, so a failure part way through
//! leaves a record under-indexed (repairable with `reindex`), never pointing
//! the index at pairs the record does not hold.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::backend::Backend;
use crate::config::Config;
use crate::error::{MetaError, Result, WriteStage};
use crate::field::{FieldCodec, Fields, RecordId};
use crate::index::SecondaryIndex;

/// Counter holding the number of allocated record IDs
pub const COUNTER_KEY: &[u8] = b"me:last_id";

/// Set of every field name ever written
pub const FIELDS_KEY: &[u8] = b"me:fields";

/// Prefix shared by every record key
pub const RECORD_PREFIX: &str = "me:rec:";

/// Build the backend key holding the cells of record `id`
pub fn record_key(id: RecordId) -> Vec<u8> {
    format!("{}{}", RECORD_PREFIX, id).into_bytes()
}

/// Record storage and identity allocation
pub struct RecordTable {
    backend: Arc<dyn Backend>,
    codec: FieldCodec,
    index: SecondaryIndex,

    /// Per-record write locks, stripe = id % locks.len()
    locks: Box<[Mutex<()>]>,
}

impl RecordTable {
    /// Build a table over `backend` using the string bound and stripe count of `config`
    pub fn new(backend: Arc<dyn Backend>, config: &Config) -> Result<Self> {
        config.validate()?;
        let codec = FieldCodec::new(config.max_string_length)?;
        let locks = (0..config.lock_stripes).map(|_| Mutex::new(())).collect();

        Ok(Self {
            index: SecondaryIndex::new(Arc::clone(&backend)),
            backend,
            codec,
            locks,
        })
    }

    /// The index kept in step with this table
    pub fn index(&self) -> &SecondaryIndex {
        &self.index
    }

    /// The cell codec
    pub fn codec(&self) -> &FieldCodec {
        &self.codec
    }

    fn lock_record(&self, id: RecordId) -> MutexGuard<'_, ()> {
        self.locks[(id % self.locks.len() as u64) as usize].lock()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Create a record holding `fields`, returning its new ID
    ///
    /// Input is validated before any mutation. Once an ID is allocated, later
    /// failures are reported as `IncompleteWrite` carrying that ID.
    pub fn create(&self, fields: &Fields) -> Result<RecordId> {
        self.codec.validate_fields(fields)?;
        let encoded = self.codec.encode(fields)?;
        self.check_encoded_len(&encoded)?;

        let id = self.allocate_id()?;
        let _guard = self.lock_record(id);

        self.backend
            .set(&record_key(id), &encoded)
            .map_err(|e| MetaError::incomplete(id, WriteStage::StoreFields, e))?;
        self.index_pairs(id, fields.iter())
            .map_err(|e| MetaError::incomplete(id, WriteStage::UpdateIndex, e))?;

        tracing::debug!("Created record {} with {} fields", id, fields.len());
        Ok(id)
    }

    /// Merge `fields` into an existing record
    ///
    /// Names already present are overwritten. Pairs equal to the stored value
    /// are left untouched.
    pub fn append(&self, id: RecordId, fields: &Fields) -> Result<()> {
        self.codec.validate_fields(fields)?;

        let _guard = self.lock_record(id);
        let current = self.read(id)?.ok_or(MetaError::RecordNotFound(id))?;

        let changed: Fields = fields
            .iter()
            .filter(|(name, value)| current.get(*name) != Some(*value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        if changed.is_empty() {
            return Ok(());
        }

        let mut merged = current.clone();
        merged.extend(changed.clone());
        self.replace_locked(id, &current, &merged, &changed)?;

        tracing::debug!("Appended {} fields to record {}", changed.len(), id);
        Ok(())
    }

    /// Finish a creation whose ID was allocated but whose later steps failed
    ///
    /// The record's content becomes exactly `fields`. Never allocates: IDs
    /// past the last allocated one are `RecordNotFound`.
    pub fn resume_create(&self, id: RecordId, fields: &Fields) -> Result<()> {
        self.codec.validate_fields(fields)?;
        match self.last_id()? {
            Some(last) if id <= last => {}
            _ => return Err(MetaError::RecordNotFound(id)),
        }

        let _guard = self.lock_record(id);
        let current = self.read(id)?.unwrap_or_default();
        self.replace_locked(id, &current, fields, fields)?;

        tracing::debug!("Resumed creation of record {}", id);
        Ok(())
    }

    /// Re-insert index entries for every stored field of record `id`
    pub fn reindex(&self, id: RecordId) -> Result<()> {
        let _guard = self.lock_record(id);
        let fields = self.read(id)?.ok_or(MetaError::RecordNotFound(id))?;

        self.index_pairs(id, fields.iter())
            .map_err(|e| MetaError::incomplete(id, WriteStage::UpdateIndex, e))?;

        tracing::debug!("Reindexed record {} ({} fields)", id, fields.len());
        Ok(())
    }

    /// Swap the stored content of `id` from `current` to `next` (stripe lock held)
    ///
    /// `fresh` are the pairs of `next` that need new index entries.
    fn replace_locked(
        &self,
        id: RecordId,
        current: &Fields,
        next: &Fields,
        fresh: &Fields,
    ) -> Result<()> {
        let encoded = self.codec.encode(next)?;
        self.check_encoded_len(&encoded)?;

        for (name, old_value) in current {
            if next.get(name) != Some(old_value) {
                self.index
                    .remove(name, old_value, id)
                    .map_err(|e| MetaError::incomplete(id, WriteStage::UpdateIndex, e))?;
            }
        }

        self.backend
            .set(&record_key(id), &encoded)
            .map_err(|e| MetaError::incomplete(id, WriteStage::StoreFields, e))?;

        self.index_pairs(id, fresh.iter())
            .map_err(|e| MetaError::incomplete(id, WriteStage::UpdateIndex, e))
    }

    /// Reject a record the backend cannot store in one value
    fn check_encoded_len(&self, encoded: &[u8]) -> Result<()> {
        let limit = self.backend.max_value_len();
        if encoded.len() > limit {
            return Err(MetaError::InvalidInput(format!(
                "record encodes to {} bytes, backend accepts at most {}",
                encoded.len(),
                limit
            )));
        }
        Ok(())
    }

    /// Insert index entries and register the names of `pairs`
    fn index_pairs<'a, I>(&self, id: RecordId, pairs: I) -> Result<()>
    where
        I: Iterator<Item = (&'a String, &'a String)>,
    {
        for (name, value) in pairs {
            self.index.insert(name, value, id)?;
            self.backend.sadd(FIELDS_KEY, name.as_bytes())?;
        }
        Ok(())
    }

    fn allocate_id(&self) -> Result<RecordId> {
        let allocated = self.backend.incr(COUNTER_KEY)?;
        allocated.checked_sub(1).ok_or_else(|| {
            MetaError::CorruptRecord("ID counter returned 0 after increment".to_string())
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Stored fields of `id`, `None` if the record does not exist
    pub fn read(&self, id: RecordId) -> Result<Option<Fields>> {
        match self.backend.get(&record_key(id))? {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Full current field set of `id` (empty if the record does not exist)
    pub fn get_all_fields(&self, id: RecordId) -> Result<Fields> {
        Ok(self.read(id)?.unwrap_or_default())
    }

    /// Value of one field
    pub fn get_field(&self, id: RecordId, name: &str) -> Result<Option<String>> {
        Ok(self.read(id)?.and_then(|mut fields| fields.remove(name)))
    }

    /// Highest allocated ID, `None` before the first creation
    pub fn last_id(&self) -> Result<Option<RecordId>> {
        let raw = match self.backend.get(COUNTER_KEY)? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let allocated: u64 = std::str::from_utf8(&raw)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| MetaError::CorruptRecord("ID counter is not an integer".to_string()))?;
        Ok(allocated.checked_sub(1))
    }

    /// Every field name ever written to any record
    pub fn field_names(&self) -> Result<BTreeSet<String>> {
        self.backend
            .smembers(FIELDS_KEY)?
            .into_iter()
            .map(|name| {
                String::from_utf8(name).map_err(|e| {
                    MetaError::CorruptRecord(format!("field name is not UTF-8: {}", e))
                })
            })
            .collect()
    }
}
