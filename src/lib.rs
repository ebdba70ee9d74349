//! Typed document and edge models for ArangoDB.
//!
//! Records are plain serde structs deriving [`Document`] or [`Edge`]. A
//! [`Database`] handle carries the storage driver, collection prefix, key
//! generator and lock provider, and is passed to every operation.

extern crate self as arangodantic;

pub mod codec;
pub mod config;
pub mod cursor;
pub mod driver;
pub mod error;
mod inflect;
pub mod lock;
pub mod model;
pub mod query;
pub mod record;
pub mod resolver;
pub mod translate;

pub use config::{uuid_key, Config, Database, DatabaseBuilder, KeyGenerator};
pub use cursor::{Cursor, CursorState};
pub use driver::{EdgeDefinition, GraphDefinition, InMemoryDriver, IndexSpec, StorageDriver};
pub use error::{ArangodanticError, Result};
pub use lock::{InMemoryLockProvider, LockError, LockGuard, LockHandle, LockProvider, LockState, Locked};
pub use model::{Collection, Graph, ModelExt};
pub use query::{Comparison, Direction, Filter, FindOptions, Operator, SortKey, ASCENDING, DESCENDING};
pub use record::{CollectionKind, Endpoints, Meta, Record, Reference};
pub use resolver::CollectionResolver;

pub use arangodantic_macros::{Document, Edge};

// Re-exported for custom driver and lock provider implementations.
pub use async_trait::async_trait;
