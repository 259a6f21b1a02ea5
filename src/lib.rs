//! searchstack - pluggable search-indexing engine
//!
//! Application code declares which record fields are searchable; the engine
//! keeps one or more search backends synchronized with the authoritative
//! record store and exposes a uniform query facade regardless of engine.
//!
//! The moving parts, leaves first:
//!
//! - [`connections`]: named connections binding an alias to one backend
//!   engine plus its unified index
//! - [`routing`]: ordered router chain deciding which alias receives a write
//! - [`unified`]: per-connection registry of model-to-index mappings
//! - [`backends`]: the adapter contract and the memory/tantivy engines
//! - [`engine`]: batch partitioning, worker-pool indexing, and stale-record
//!   reconciliation
//! - [`query`]: lazy, backend-agnostic query building

pub mod app;
pub mod backends;
pub mod cli;
pub mod config;
pub mod connections;
pub mod document;
pub mod engine;
pub mod error;
pub mod indexes;
pub mod query;
pub mod routing;
pub mod sources;
pub mod unified;

pub mod test_utils;

pub use config::Config;
pub use connections::{Connection, ConnectionRegistry, DEFAULT_ALIAS};
pub use document::{Document, FieldSpec, ModelKey, Record};
pub use engine::{batch_ranges, clear_index, update_index, UpdateOptions, UpdateSummary};
pub use error::{Result, StackError};
pub use indexes::IndexDefinition;
pub use query::SearchQuerySet;
pub use routing::{RouterChain, WriteRouter};
pub use unified::UnifiedIndex;
