//! Error types for the Meta Engine
//!
//! Provides a unified error type for all operations.

use std::fmt;

use thiserror::Error;

use crate::field::RecordId;

/// Result type alias using MetaError
pub type Result<T> = std::result::Result<T, MetaError>;

/// Step of a multi-step record write that failed after the record ID was allocated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    /// Field cells were not (fully) persisted
    StoreFields,
    /// Fields are stored but one or more index entries are missing
    UpdateIndex,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStage::StoreFields => write!(f, "store fields"),
            WriteStage::UpdateIndex => write!(f, "update index"),
        }
    }
}

/// Unified error type for Meta Engine operations
#[derive(Debug, Error)]
pub enum MetaError {
    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("No match found")]
    NoMatch,

    #[error("Incomplete write for record {id} at stage '{stage}': {source}")]
    IncompleteWrite {
        id: RecordId,
        stage: WriteStage,
        #[source]
        source: Box<MetaError>,
    },

    #[error("Corrupt record data: {0}")]
    CorruptRecord(String),

    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MetaError {
    /// Wrap an error raised after `id` was allocated
    pub(crate) fn incomplete(id: RecordId, stage: WriteStage, source: MetaError) -> Self {
        MetaError::IncompleteWrite {
            id,
            stage,
            source: Box::new(source),
        }
    }

    /// Whether the error came from the transport rather than from the request
    pub fn is_transport(&self) -> bool {
        match self {
            MetaError::Io(_) | MetaError::BackendUnavailable(_) => true,
            MetaError::IncompleteWrite { source, .. } => source.is_transport(),
            _ => false,
        }
    }
}
