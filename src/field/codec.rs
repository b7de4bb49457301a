//! Field cell codec
//!
//! Encodes field maps into fixed-width NUL-padded cells and back.

use crate::error::{MetaError, Result};

use super::Fields;

/// Fixed-width encoder/decoder for record field cells
#[derive(Debug, Clone, Copy)]
pub struct FieldCodec {
    /// Cell width in bytes (one byte is reserved for the terminating NUL)
    cell_width: usize,
}

impl FieldCodec {
    /// Create a codec for cells of `cell_width` bytes
    pub fn new(cell_width: usize) -> Result<Self> {
        if cell_width < 2 {
            return Err(MetaError::Config(format!(
                "cell width must be at least 2 bytes, got {}",
                cell_width
            )));
        }
        Ok(Self { cell_width })
    }

    /// Width of one cell in bytes
    pub fn cell_width(&self) -> usize {
        self.cell_width
    }

    /// Longest string (in bytes) a cell can hold
    pub fn max_string_len(&self) -> usize {
        self.cell_width - 1
    }

    /// Validate one field pair against the cell bounds
    ///
    /// Oversized strings are rejected rather than truncated.
    pub fn validate(&self, name: &str, value: &str) -> Result<()> {
        if name.is_empty() {
            return Err(MetaError::InvalidInput("field name is empty".to_string()));
        }
        self.check_string("field name", name)?;
        self.check_string("field value", value)
    }

    /// Validate every pair of a field map; empty maps are rejected
    pub fn validate_fields(&self, fields: &Fields) -> Result<()> {
        if fields.is_empty() {
            return Err(MetaError::InvalidInput("no fields supplied".to_string()));
        }
        for (name, value) in fields {
            self.validate(name, value)?;
        }
        Ok(())
    }

    fn check_string(&self, what: &str, s: &str) -> Result<()> {
        if s.len() > self.max_string_len() {
            return Err(MetaError::InvalidInput(format!(
                "{} is {} bytes, limit is {}",
                what,
                s.len(),
                self.max_string_len()
            )));
        }
        if s.as_bytes().contains(&0) {
            return Err(MetaError::InvalidInput(format!("{} contains a NUL byte", what)));
        }
        Ok(())
    }

    /// Encode a field map as consecutive name/value cells
    pub fn encode(&self, fields: &Fields) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(fields.len() * 2 * self.cell_width);
        for (name, value) in fields {
            self.validate(name, value)?;
            self.push_cell(&mut buf, name);
            self.push_cell(&mut buf, value);
        }
        Ok(buf)
    }

    fn push_cell(&self, buf: &mut Vec<u8>, s: &str) {
        let start = buf.len();
        buf.extend_from_slice(s.as_bytes());
        buf.resize(start + self.cell_width, 0);
    }

    /// Decode name/value cells into a field map
    pub fn decode(&self, bytes: &[u8]) -> Result<Fields> {
        let pair_width = 2 * self.cell_width;
        if bytes.len() % pair_width != 0 {
            return Err(MetaError::CorruptRecord(format!(
                "record length {} is not a multiple of {}",
                bytes.len(),
                pair_width
            )));
        }

        let mut fields = Fields::new();
        for pair in bytes.chunks_exact(pair_width) {
            let (name_cell, value_cell) = pair.split_at(self.cell_width);
            let name = Self::read_cell(name_cell)?;
            let value = Self::read_cell(value_cell)?;
            if name.is_empty() {
                return Err(MetaError::CorruptRecord("empty field name cell".to_string()));
            }
            fields.insert(name, value);
        }
        Ok(fields)
    }

    fn read_cell(cell: &[u8]) -> Result<String> {
        let end = cell.iter().position(|&b| b == 0).ok_or_else(|| {
            MetaError::CorruptRecord("cell is missing its NUL terminator".to_string())
        })?;
        String::from_utf8(cell[..end].to_vec())
            .map_err(|e| MetaError::CorruptRecord(format!("cell is not UTF-8: {}", e)))
    }
}
