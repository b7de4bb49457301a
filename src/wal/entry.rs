//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their framing.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{MetaError, Result};

/// Entry header: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The keyspace mutation to replay
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Keyspace mutations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Set a string value
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Increment a counter by one
    Incr { key: Vec<u8> },

    /// Add a member to a set
    SetAdd { key: Vec<u8>, member: Vec<u8> },

    /// Remove a member from a set
    SetRemove { key: Vec<u8>, member: Vec<u8> },
}

/// Body of an entry as stored after the header
#[derive(Serialize, Deserialize)]
struct EntryBody {
    operation: Operation,
    timestamp: u64,
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Serialize to `[lsn][crc][len][body]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(&EntryBody {
            operation: self.operation.clone(),
            timestamp: self.timestamp,
        })
        .map_err(|e| MetaError::Serialization(e.to_string()))?;

        let lsn_bytes = self.lsn.to_le_bytes();
        let len_bytes = (body.len() as u32).to_le_bytes();
        let crc = compute_crc(&lsn_bytes, &len_bytes, &body);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + body.len());
        bytes.extend_from_slice(&lsn_bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&len_bytes);
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Deserialize one complete entry, verifying its CRC
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(MetaError::WalCorruption(format!(
                "entry shorter than header: {} bytes",
                bytes.len()
            )));
        }

        let (lsn, crc, len) = parse_header(&bytes[..HEADER_SIZE]);
        if bytes.len() != HEADER_SIZE + len {
            return Err(MetaError::WalCorruption(format!(
                "entry length mismatch: header says {}, got {}",
                len,
                bytes.len() - HEADER_SIZE
            )));
        }

        let body = &bytes[HEADER_SIZE..];
        let actual = compute_crc(&bytes[0..8], &bytes[12..16], body);
        if actual != crc {
            return Err(MetaError::WalCorruption(format!(
                "CRC mismatch at lsn {}: expected {:08x}, got {:08x}",
                lsn, crc, actual
            )));
        }

        let body: EntryBody = bincode::deserialize(body)
            .map_err(|e| MetaError::WalCorruption(format!("undecodable body: {}", e)))?;

        Ok(Self {
            lsn,
            operation: body.operation,
            timestamp: body.timestamp,
        })
    }
}

/// Split a header into (lsn, crc, body length)
pub(super) fn parse_header(header: &[u8]) -> (u64, u32, usize) {
    let mut lsn = [0u8; 8];
    lsn.copy_from_slice(&header[0..8]);
    let mut crc = [0u8; 4];
    crc.copy_from_slice(&header[8..12]);
    let mut len = [0u8; 4];
    len.copy_from_slice(&header[12..16]);
    (
        u64::from_le_bytes(lsn),
        u32::from_le_bytes(crc),
        u32::from_le_bytes(len) as usize,
    )
}

fn compute_crc(lsn: &[u8], len: &[u8], body: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(lsn);
    hasher.update(len);
    hasher.update(body);
    hasher.finalize()
}
