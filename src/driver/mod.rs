//! Storage driver contract.
//!
//! The persistence layer talks to storage only through [`StorageDriver`].
//! Drivers report failures as [`DriverError`]: server faults carry the
//! ArangoDB error number and are translated into domain errors by
//! [`crate::translate`]; transport failures and timeouts pass through untouched.
//!
//! Named graphs are part of the contract: writes routed through a graph let
//! storage check edge endpoints and cascade vertex removal to edges.
//!
//! [`InMemoryDriver`] implements the contract in-process for tests and
//! development.

pub mod errno;
mod eval;
mod in_memory;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::query::QueryRequest;
use crate::record::CollectionKind;

pub use in_memory::InMemoryDriver;

/// Generic key/value document as accepted by storage.
pub type Document = Map<String, Value>;

/// A fault reported by the storage server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageFault {
    /// ArangoDB error number (see [`errno`]).
    pub code: i64,
    pub http_status: u16,
    pub message: String,
}

impl StorageFault {
    pub fn new(code: i64, http_status: u16, message: impl Into<String>) -> Self {
        StorageFault {
            code,
            http_status,
            message: message.into(),
        }
    }
}

impl fmt::Display for StorageFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[HTTP {}][ERR {}] {}", self.http_status, self.code, self.message)
    }
}

impl std::error::Error for StorageFault {}

#[derive(Debug, Clone, Error)]
pub enum DriverError {
    #[error(transparent)]
    Fault(#[from] StorageFault),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("storage request timed out: {0}")]
    Timeout(String),
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Identity attributes storage returns after a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub id: String,
    pub key: String,
    pub rev: String,
}

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct QueryBatch {
    /// Server-side cursor id, present while more batches remain.
    pub cursor_id: Option<String>,
    pub documents: Vec<Document>,
    pub has_more: bool,
    pub count: Option<u64>,
    pub full_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub fields: Vec<String>,
    pub unique: bool,
    /// Skip documents where any indexed field is null or missing.
    pub sparse: bool,
    pub name: Option<String>,
}

impl IndexSpec {
    pub fn persistent<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IndexSpec {
            fields: fields.into_iter().map(Into::into).collect(),
            unique: false,
            sparse: false,
            name: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// One edge collection of a named graph and the vertex collections it connects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeDefinition {
    pub collection: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
}

/// Edge definitions and orphan vertex collections of a named graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphDefinition {
    pub edge_definitions: Vec<EdgeDefinition>,
    pub orphan_collections: Vec<String>,
}

impl GraphDefinition {
    pub fn edge_definition(&self, collection: &str) -> Option<&EdgeDefinition> {
        self.edge_definitions
            .iter()
            .find(|definition| definition.collection == collection)
    }

    /// Every vertex collection, in declaration order and without repeats.
    pub fn vertex_collections(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let declared = self
            .edge_definitions
            .iter()
            .flat_map(|definition| definition.from.iter().chain(&definition.to))
            .chain(&self.orphan_collections);
        for name in declared {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    pub fn is_vertex_collection(&self, collection: &str) -> bool {
        self.vertex_collections().contains(&collection)
    }
}

/// Document database operations consumed by the model layer.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    async fn has_collection(&self, name: &str) -> DriverResult<bool>;

    async fn create_collection(&self, name: &str, kind: CollectionKind) -> DriverResult<()>;

    async fn drop_collection(&self, name: &str) -> DriverResult<()>;

    async fn truncate_collection(&self, name: &str) -> DriverResult<()>;

    async fn add_index(&self, collection: &str, index: &IndexSpec) -> DriverResult<()>;

    /// Insert a new document. A missing `_key` is generated by storage.
    async fn insert(&self, collection: &str, document: Document) -> DriverResult<WriteResult>;

    /// Replace an existing document. When the document carries `_rev` it
    /// must match the stored revision.
    async fn replace(&self, collection: &str, document: Document) -> DriverResult<WriteResult>;

    /// Fetch by identity key. `Ok(None)` when the document does not exist.
    async fn get(&self, collection: &str, key: &str) -> DriverResult<Option<Document>>;

    /// Remove a document, checking `rev` when given.
    async fn remove(&self, collection: &str, key: &str, rev: Option<&str>) -> DriverResult<()>;

    async fn query(&self, request: &QueryRequest) -> DriverResult<QueryBatch>;

    /// Fetch the next batch of an open server-side cursor.
    async fn next_batch(&self, cursor_id: &str) -> DriverResult<QueryBatch>;

    async fn close_cursor(&self, cursor_id: &str) -> DriverResult<()>;

    async fn has_graph(&self, name: &str) -> DriverResult<bool>;

    /// Create a named graph, creating any of its collections that are missing.
    async fn create_graph(&self, name: &str, definition: &GraphDefinition) -> DriverResult<()>;

    /// Drop a named graph; with `drop_collections`, also drop its collections
    /// that no other graph uses.
    async fn drop_graph(&self, name: &str, drop_collections: bool) -> DriverResult<()>;

    /// Insert through a graph. Edges are rejected unless both endpoint
    /// vertices exist.
    async fn graph_insert(
        &self,
        graph: &str,
        collection: &str,
        document: Document,
    ) -> DriverResult<WriteResult>;

    /// Replace through a graph, with the same endpoint checks as `graph_insert`.
    async fn graph_replace(
        &self,
        graph: &str,
        collection: &str,
        document: Document,
    ) -> DriverResult<WriteResult>;

    /// Remove through a graph. Removing a vertex also removes every edge of
    /// the graph that starts or ends at it.
    async fn graph_remove(
        &self,
        graph: &str,
        collection: &str,
        key: &str,
        rev: Option<&str>,
    ) -> DriverResult<()>;
}

/// Run `request` and collect the documents of every batch.
pub(crate) async fn drain(
    driver: &dyn StorageDriver,
    request: &QueryRequest,
) -> DriverResult<Vec<Document>> {
    let mut batch = driver.query(request).await?;
    let mut documents = std::mem::take(&mut batch.documents);
    while batch.has_more {
        let Some(cursor_id) = batch.cursor_id.take() else {
            break;
        };
        batch = driver.next_batch(&cursor_id).await?;
        documents.append(&mut batch.documents);
    }
    Ok(documents)
}
