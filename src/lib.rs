//! # Meta Engine
//!
//! A schema-less record store layered on a key-value backend, with:
//! - Sequential record IDs and free-form string fields per record
//! - Secondary indexes for exact-match search on any field
//! - "Unprocessed" queries: records matching one field but lacking another
//! - Memory, embedded durable (WAL + checkpoint) and remote TCP backends
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        MetaEngine                            │
//! │      create / append / get_records / get_unprocessed         │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │ writes                        │ reads
//!                ▼                               ▼
//!   ┌──────────────────────┐          ┌──────────────────────┐
//!   │     RecordTable      │◄─────────│     QueryEngine      │
//!   │ (striped locks, IDs) │          │ (index → re-verify)  │
//!   └───┬──────────────┬───┘          └──────────────────────┘
//!       │              │
//!       ▼              ▼
//!  ┌──────────┐ ┌────────────────┐
//!  │FieldCodec│ │ SecondaryIndex │
//!  └──────────┘ └───────┬────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Backend (trait)                          │
//! │   MemoryBackend  │  Store (WAL + checkpoint)  │  Remote TCP  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use metaengine::MetaEngine;
//!
//! # fn main() -> metaengine::Result<()> {
//! let engine = MetaEngine::in_memory()?;
//! let id = engine.create_record([("name", "alice"), ("status", "new")])?;
//! engine.append_to_record(id, [("processed", "yes")])?;
//! let records = engine.get_records("name", "alice")?;
//! assert_eq!(records[&id]["processed"], "yes");
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod field;
pub mod record;
pub mod index;
pub mod query;
pub mod engine;

pub mod backend;
pub mod keyspace;
pub mod wal;
pub mod store;
pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MetaError, Result, WriteStage};
pub use config::{Config, ConfigBuilder, WalSyncStrategy, ME_STRING_MAX_LENGTH};
pub use engine::MetaEngine;
pub use field::{FieldCodec, FieldPair, Fields, RecordId};
pub use backend::{Backend, MemoryBackend, RemoteBackend};
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Meta Engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
