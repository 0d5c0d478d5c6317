//! # dualstore
//!
//! Dual-store CRUD core for the Project entity:
//! - Every mutation is one atomic batch over a primary row and its shadow row
//! - Shadow rows stream into a search store (eventually consistent)
//! - Declarative filter / sort / cursor requests translate into the search
//!   store's native boolean query
//! - Point reads go straight to the primary store
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ProjectService                           │
//! │          (create / get / update / delete / list)             │
//! └──────┬──────────────────────┬────────────────────┬──────────┘
//!        │ mutations            │ point reads        │ lists
//!        ▼                      │                    ▼
//! ┌──────────────────┐          │           ┌──────────────────┐
//! │ DualWriteCoord.  │          │           │ Query Translator │
//! │   (write-set)    │          │           │ + Cursor Codec   │
//! └──┬────────────┬──┘          │           └────────┬─────────┘
//!    │            │             │                    │
//!    ▼            ▼             ▼                    ▼
//! ┌────────┐  ┌────────┐  ┌──────────┐       ┌──────────────┐
//! │ Record │  │ Shadow │  │  Record  │       │    Shadow    │
//! │  put   │  │ upsert │  │   get    │       │    query     │
//! └───┬────┘  └───┬────┘  └────┬─────┘       └──────┬───────┘
//!     └─── one ───┘            │                    │
//!         batch                ▼                    ▼
//! ┌──────────────────────────────────┐      ┌──────────────┐
//! │     KeyValueBackend (primary)    │─────►│ SearchEngine │
//! │  primary table  │  shadow table  │ feed │  (indexes)   │
//! └──────────────────────────────────┘  +   └──────────────┘
//!                                  ShadowReplicator
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod keys;
pub mod model;

pub mod backend;
pub mod search;
pub mod query;
pub mod adapter;
pub mod coordinator;
pub mod replicator;
pub mod service;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Error, ErrorResponse, Result, WriteLeg};
pub use config::{Config, JournalSyncStrategy};
pub use keys::{PrimaryKey, Scope};
pub use model::{Identity, Project, ProjectInput, ProjectPatch, Timestamp};
pub use backend::{FileBackend, KeyValueBackend, MemoryBackend};
pub use search::{MemorySearchEngine, SearchEngine};
pub use query::ListWhere;
pub use coordinator::{DualWriteCoordinator, WriteSet};
pub use replicator::{reindex, ShadowReplicator};
pub use service::{ListArgs, ListPage, ProjectService, RequestContext};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of dualstore, stamped into stored rows by default
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
