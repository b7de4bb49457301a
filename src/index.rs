//! Secondary Index
//!
//! Reverse mapping from a (field name, field value) pair to the set of record
//! IDs holding it.
//!
//! ## Key Layout
//! ```text
//! me:idx:<name-len>:<name>:<value>  →  { "0", "7", "42", ... }
//! ```
//! The name length keeps keys unambiguous when names contain `:`.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::backend::Backend;
use crate::error::{MetaError, Result};
use crate::field::RecordId;

/// Prefix shared by every index key
pub const INDEX_PREFIX: &str = "me:idx:";

/// Build the backend key holding the IDs for `(name, value)`
pub fn index_key(name: &str, value: &str) -> Vec<u8> {
    format!("{}{}:{}:{}", INDEX_PREFIX, name.len(), name, value).into_bytes()
}

/// Equality index over field pairs
#[derive(Clone)]
pub struct SecondaryIndex {
    backend: Arc<dyn Backend>,
}

impl SecondaryIndex {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Record that `id` holds `(name, value)`; idempotent
    pub fn insert(&self, name: &str, value: &str, id: RecordId) -> Result<()> {
        self.backend
            .sadd(&index_key(name, value), id.to_string().as_bytes())?;
        Ok(())
    }

    /// Forget that `id` holds `(name, value)`; idempotent
    pub fn remove(&self, name: &str, value: &str, id: RecordId) -> Result<()> {
        self.backend
            .srem(&index_key(name, value), id.to_string().as_bytes())?;
        Ok(())
    }

    /// IDs of every record indexed under `(name, value)`
    pub fn lookup(&self, name: &str, value: &str) -> Result<BTreeSet<RecordId>> {
        self.backend
            .smembers(&index_key(name, value))?
            .iter()
            .map(|member| parse_id(member))
            .collect()
    }
}

fn parse_id(member: &[u8]) -> Result<RecordId> {
    std::str::from_utf8(member)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            MetaError::CorruptRecord(format!(
                "index member is not a record ID: {:?}",
                String::from_utf8_lossy(member)
            ))
        })
}
