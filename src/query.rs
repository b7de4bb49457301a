//! Query Engine
//!
//! Read-only lookups over the record table. Candidates come from the
//! secondary index; each candidate is re-read and kept only while its stored
//! value still matches, so a record caught mid-append is skipped instead of
//! reported with stale data.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::field::{Fields, RecordId};
use crate::record::RecordTable;

/// Exact-match queries over one record table
pub struct QueryEngine<'a> {
    table: &'a RecordTable,
}

impl<'a> QueryEngine<'a> {
    pub fn new(table: &'a RecordTable) -> Self {
        Self { table }
    }

    /// IDs of all records with `name == value`
    pub fn find_by_field(&self, name: &str, value: &str) -> Result<BTreeSet<RecordId>> {
        self.table.index().lookup(name, value)
    }

    /// Records with `search_name == search_value` that lack `exclude_name`
    ///
    /// Maps each ID to its value of `search_name`.
    pub fn find_unprocessed(
        &self,
        search_name: &str,
        search_value: &str,
        exclude_name: &str,
    ) -> Result<BTreeMap<RecordId, String>> {
        let mut matches = BTreeMap::new();
        for (id, mut fields) in self.matching(search_name, search_value)? {
            if fields.contains_key(exclude_name) {
                continue;
            }
            if let Some(value) = fields.remove(search_name) {
                matches.insert(id, value);
            }
        }
        Ok(matches)
    }

    /// Full field maps of all records with `name == value`
    pub fn find_all(&self, name: &str, value: &str) -> Result<BTreeMap<RecordId, Fields>> {
        Ok(self.matching(name, value)?.into_iter().collect())
    }

    /// Iterate over every stored record in ID order
    pub fn scan(&self) -> Result<Scan<'a>> {
        Ok(Scan {
            table: self.table,
            next: 0,
            last: self.table.last_id()?,
        })
    }

    /// Materialize index candidates whose stored value still matches
    fn matching(&self, name: &str, value: &str) -> Result<Vec<(RecordId, Fields)>> {
        let candidates = self.find_by_field(name, value)?;
        let mut records = Vec::with_capacity(candidates.len());

        for id in candidates {
            let fields = match self.table.read(id)? {
                Some(fields) => fields,
                None => continue,
            };
            if fields.get(name).map(String::as_str) != Some(value) {
                tracing::debug!("Skipping record {}: {} changed since indexed", id, name);
                continue;
            }
            records.push((id, fields));
        }
        Ok(records)
    }
}

/// Iterator over `(id, fields)` for `0..=last_id`, skipping IDs with no stored fields
pub struct Scan<'a> {
    table: &'a RecordTable,
    next: RecordId,
    last: Option<RecordId>,
}

impl Iterator for Scan<'_> {
    type Item = Result<(RecordId, Fields)>;

    fn next(&mut self) -> Option<Self::Item> {
        let last = self.last?;
        while self.next <= last {
            let id = self.next;
            self.next += 1;
            match self.table.read(id) {
                Ok(Some(fields)) => return Some(Ok((id, fields))),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
