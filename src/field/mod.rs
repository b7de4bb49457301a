//! Field Module
//!
//! Record identity and field pair types, plus the fixed-width cell codec.
//!
//! ## Record Layout
//! ```text
//! ┌──────────────┬──────────────┬──────────────┬──────────────┬─────┐
//! │ name 0 (W)   │ value 0 (W)  │ name 1 (W)   │ value 1 (W)  │ ... │
//! └──────────────┴──────────────┴──────────────┴──────────────┴─────┘
//! W = max_string_length, every cell NUL padded
//! ```

mod codec;

use std::collections::BTreeMap;

pub use codec::FieldCodec;

/// Record identity, assigned sequentially from 0
pub type RecordId = u64;

/// Current field set of a record, keyed by field name
pub type Fields = BTreeMap<String, String>;

/// A single (name, value) field pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPair {
    pub name: String,
    pub value: String,
}

impl FieldPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl<N: Into<String>, V: Into<String>> From<(N, V)> for FieldPair {
    fn from((name, value): (N, V)) -> Self {
        Self::new(name, value)
    }
}

/// Collapse a pair sequence into a field map (last value for a name wins)
pub fn collect_fields<I, P>(pairs: I) -> Fields
where
    I: IntoIterator<Item = P>,
    P: Into<FieldPair>,
{
    pairs
        .into_iter()
        .map(Into::into)
        .map(|pair| (pair.name, pair.value))
        .collect()
}
