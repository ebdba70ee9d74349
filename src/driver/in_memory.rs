//! InMemoryDriver - HashMap-backed document storage for testing and development.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

use super::{
    errno, eval, Document, DriverError, DriverResult, GraphDefinition, IndexSpec, QueryBatch,
    StorageDriver, StorageFault, WriteResult,
};
use crate::query::{split_path, QueryRequest};
use crate::record::{storage_id, CollectionKind};

const MAX_KEY_LENGTH: usize = 254;

/// Documents of one collection, kept in insertion order.
struct StoredCollection {
    kind: CollectionKind,
    documents: BTreeMap<u64, Document>,
    keys: HashMap<String, u64>,
    indexes: Vec<IndexSpec>,
    next_seq: u64,
}

impl StoredCollection {
    fn new(kind: CollectionKind) -> Self {
        StoredCollection {
            kind,
            documents: BTreeMap::new(),
            keys: HashMap::new(),
            indexes: Vec::new(),
            next_seq: 0,
        }
    }

    fn get(&self, key: &str) -> Option<&Document> {
        self.keys.get(key).and_then(|seq| self.documents.get(seq))
    }

    fn remove(&mut self, key: &str) {
        if let Some(seq) = self.keys.remove(key) {
            self.documents.remove(&seq);
        }
    }

    /// Keys of the edges starting or ending at `id`.
    fn edges_touching(&self, id: &str) -> Vec<String> {
        self.documents
            .values()
            .filter(|edge| {
                ["_from", "_to"]
                    .iter()
                    .any(|attr| edge.get(*attr).and_then(Value::as_str) == Some(id))
            })
            .filter_map(|edge| edge.get("_key").and_then(Value::as_str).map(String::from))
            .collect()
    }

    fn check_unique(&self, document: &Document, own_key: &str) -> Result<(), StorageFault> {
        for index in self.indexes.iter().filter(|index| index.unique) {
            let paths: Vec<Vec<String>> = index.fields.iter().map(|f| split_path(f)).collect();
            let values: Vec<&Value> = paths.iter().map(|p| eval::lookup(document, p)).collect();
            if index.sparse && values.iter().any(|v| v.is_null()) {
                continue;
            }
            let conflict = self.documents.values().find(|other| {
                other.get("_key").and_then(Value::as_str) != Some(own_key)
                    && paths
                        .iter()
                        .zip(&values)
                        .all(|(path, value)| eval::compare(eval::lookup(other, path), value).is_eq())
            });
            if let Some(other) = conflict {
                let other_key = other.get("_key").and_then(Value::as_str).unwrap_or_default();
                return Err(unique_violation(index, other_key));
            }
        }
        Ok(())
    }
}

/// Remaining batches of a query that did not fit in the first response.
struct OpenCursor {
    batches: VecDeque<Vec<Document>>,
    count: Option<u64>,
    full_count: Option<u64>,
}

#[derive(Default)]
struct State {
    collections: HashMap<String, StoredCollection>,
    graphs: HashMap<String, GraphDefinition>,
    cursors: HashMap<String, OpenCursor>,
    clock: u64,
    next_key: u64,
    next_cursor: u64,
    injected: Option<DriverError>,
}

impl State {
    fn collection(&self, name: &str) -> Result<&StoredCollection, StorageFault> {
        self.collections.get(name).ok_or_else(|| missing_collection(name))
    }

    fn collection_mut(&mut self, name: &str) -> Result<&mut StoredCollection, StorageFault> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| missing_collection(name))
    }

    /// Revision tokens are opaque to callers; a monotonic clock keeps them unique.
    fn next_rev(&mut self) -> String {
        self.clock += 1;
        format!("_{}", URL_SAFE_NO_PAD.encode(self.clock.to_be_bytes()))
    }

    fn generate_key(&mut self, collection: &str) -> String {
        loop {
            self.next_key += 1;
            let key = self.next_key.to_string();
            let taken = self
                .collections
                .get(collection)
                .is_some_and(|c| c.keys.contains_key(&key));
            if !taken {
                return key;
            }
        }
    }

    fn graph(&self, name: &str) -> Result<&GraphDefinition, StorageFault> {
        self.graphs.get(name).ok_or_else(|| {
            StorageFault::new(
                errno::GRAPH_NOT_FOUND,
                404,
                format!("graph '{}' not found", name),
            )
        })
    }

    /// Create `name` with `kind` unless it exists; an existing collection must match `kind`.
    fn ensure_collection(&mut self, name: &str, kind: CollectionKind) -> Result<(), StorageFault> {
        match self.collections.get(name) {
            Some(existing) if existing.kind != kind => Err(StorageFault::new(
                errno::COLLECTION_TYPE_INVALID,
                400,
                format!("collection '{}' is not a {} collection", name, kind),
            )),
            Some(_) => Ok(()),
            None => {
                self.collections
                    .insert(name.to_string(), StoredCollection::new(kind));
                Ok(())
            }
        }
    }

    fn insert_document(&mut self, collection: &str, mut document: Document) -> DriverResult<WriteResult> {
        let kind = self.collection(collection)?.kind;

        let key = match document.get("_key") {
            None | Some(Value::Null) => self.generate_key(collection),
            Some(Value::String(key)) if valid_key(key) => key.clone(),
            Some(other) => return Err(bad_key(format!("illegal document key: {}", other)).into()),
        };
        check_edge(kind, &document)?;

        let rev = self.next_rev();
        let id = storage_id(collection, &key);
        document.insert("_key".into(), Value::String(key.clone()));
        document.insert("_id".into(), Value::String(id.clone()));
        document.insert("_rev".into(), Value::String(rev.clone()));

        let stored = self.collection_mut(collection)?;
        if stored.keys.contains_key(&key) {
            return Err(primary_violation(&key).into());
        }
        stored.check_unique(&document, &key)?;

        let seq = stored.next_seq;
        stored.next_seq += 1;
        stored.keys.insert(key.clone(), seq);
        stored.documents.insert(seq, document);

        Ok(WriteResult { id, key, rev })
    }

    fn replace_document(&mut self, collection: &str, mut document: Document) -> DriverResult<WriteResult> {
        let stored = self.collection(collection)?;

        let key = document
            .get("_key")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| bad_key("replace requires _key"))?;
        let current = stored
            .get(&key)
            .ok_or_else(|| missing_document(collection, &key))?;
        if let Some(expected) = document.get("_rev").and_then(Value::as_str) {
            if current.get("_rev").and_then(Value::as_str) != Some(expected) {
                return Err(revision_conflict(collection, &key).into());
            }
        }
        check_edge(stored.kind, &document)?;
        stored.check_unique(&document, &key)?;

        let rev = self.next_rev();
        let id = storage_id(collection, &key);
        document.insert("_id".into(), Value::String(id.clone()));
        document.insert("_rev".into(), Value::String(rev.clone()));

        let stored = self.collection_mut(collection)?;
        if let Some(seq) = stored.keys.get(&key).copied() {
            stored.documents.insert(seq, document);
        }

        Ok(WriteResult { id, key, rev })
    }

    fn remove_document(&mut self, collection: &str, key: &str, rev: Option<&str>) -> DriverResult<()> {
        let stored = self.collection_mut(collection)?;
        let current = stored
            .get(key)
            .ok_or_else(|| missing_document(collection, key))?;
        if let Some(expected) = rev {
            if current.get("_rev").and_then(Value::as_str) != Some(expected) {
                return Err(revision_conflict(collection, key).into());
            }
        }
        stored.remove(key);
        Ok(())
    }

    /// A graph write must target one of the graph's collections, and an edge
    /// must connect existing vertices of the collections its definition allows.
    fn check_graph_write(
        &self,
        graph: &str,
        collection: &str,
        document: &Document,
    ) -> Result<(), StorageFault> {
        let definition = self.graph(graph)?;
        let Some(edges) = definition.edge_definition(collection) else {
            if definition.is_vertex_collection(collection) {
                return Ok(());
            }
            return Err(not_in_graph(graph, collection));
        };

        check_edge(CollectionKind::Edge, document)?;
        for (attr, allowed) in [("_from", &edges.from), ("_to", &edges.to)] {
            let id = document.get(attr).and_then(Value::as_str).unwrap_or_default();
            let (vertex_collection, key) = id.split_once('/').unwrap_or_default();
            if !allowed.iter().any(|name| name == vertex_collection) {
                return Err(StorageFault::new(
                    errno::GRAPH_VERTEX_COLLECTION_NOT_USED,
                    400,
                    format!(
                        "{} vertex collection '{}' is not used by edge collection '{}'",
                        attr, vertex_collection, collection
                    ),
                ));
            }
            let exists = self
                .collections
                .get(vertex_collection)
                .is_some_and(|stored| stored.get(key).is_some());
            if !exists {
                return Err(StorageFault::new(
                    errno::DOCUMENT_NOT_FOUND,
                    404,
                    format!("{} vertex not found: {}", attr, id),
                ));
            }
        }
        Ok(())
    }

    fn check_injected(&mut self) -> DriverResult<()> {
        match self.injected.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn batch(
        &mut self,
        mut batches: VecDeque<Vec<Document>>,
        count: Option<u64>,
        full_count: Option<u64>,
    ) -> QueryBatch {
        let documents = batches.pop_front().unwrap_or_default();
        if batches.is_empty() {
            return QueryBatch {
                cursor_id: None,
                documents,
                has_more: false,
                count,
                full_count,
            };
        }
        self.next_cursor += 1;
        let cursor_id = self.next_cursor.to_string();
        self.cursors.insert(
            cursor_id.clone(),
            OpenCursor {
                batches,
                count,
                full_count,
            },
        );
        QueryBatch {
            cursor_id: Some(cursor_id),
            documents,
            has_more: true,
            count,
            full_count,
        }
    }
}

fn missing_collection(name: &str) -> StorageFault {
    StorageFault::new(
        errno::DATA_SOURCE_NOT_FOUND,
        404,
        format!("collection or view not found: {}", name),
    )
}

fn not_in_graph(graph: &str, collection: &str) -> StorageFault {
    StorageFault::new(
        errno::GRAPH_EDGE_COLLECTION_NOT_USED,
        404,
        format!("collection '{}' is not part of graph '{}'", collection, graph),
    )
}

fn missing_document(collection: &str, key: &str) -> StorageFault {
    StorageFault::new(
        errno::DOCUMENT_NOT_FOUND,
        404,
        format!("document not found: {}", storage_id(collection, key)),
    )
}

fn revision_conflict(collection: &str, key: &str) -> StorageFault {
    StorageFault::new(
        errno::CONFLICT,
        412,
        format!(
            "conflict, _rev values do not match: {}",
            storage_id(collection, key)
        ),
    )
}

fn unique_violation(index: &IndexSpec, conflicting_key: &str) -> StorageFault {
    StorageFault::new(
        errno::UNIQUE_CONSTRAINT_VIOLATED,
        409,
        format!(
            "unique constraint violated - in index {} of type persistent over '{}'; conflicting key: {}",
            index.name.as_deref().unwrap_or_default(),
            index.fields.join(", "),
            conflicting_key
        ),
    )
}

fn primary_violation(key: &str) -> StorageFault {
    StorageFault::new(
        errno::UNIQUE_CONSTRAINT_VIOLATED,
        409,
        format!(
            "unique constraint violated - in index primary of type primary over '_key'; conflicting key: {}",
            key
        ),
    )
}

fn bad_key(message: impl Into<String>) -> StorageFault {
    StorageFault::new(errno::DOCUMENT_KEY_BAD, 400, message)
}

fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LENGTH
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-:.@()+,=;$!*'%".contains(c))
}

/// Edges must name both endpoints as storage ids.
fn check_edge(kind: CollectionKind, document: &Document) -> Result<(), StorageFault> {
    if kind != CollectionKind::Edge {
        return Ok(());
    }
    for attr in ["_from", "_to"] {
        let valid = document
            .get(attr)
            .and_then(Value::as_str)
            .and_then(|id| id.split_once('/'))
            .is_some_and(|(collection, key)| !collection.is_empty() && !key.is_empty());
        if !valid {
            return Err(StorageFault::new(
                errno::INVALID_EDGE_ATTRIBUTE,
                400,
                format!("edge attribute missing or invalid: {}", attr),
            ));
        }
    }
    Ok(())
}

/// In-memory storage driver.
///
/// Collections keep documents in insertion order and enforce the primary key
/// and any unique indexes. Query results are split into batches held under a
/// cursor id until drained or closed. Clone-friendly via Arc.
#[derive(Clone, Default)]
pub struct InMemoryDriver {
    state: Arc<RwLock<State>>,
}

impl InMemoryDriver {
    /// Create a new empty driver.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> DriverResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StorageFault::new(errno::INTERNAL, 500, "lock poisoned").into())
    }

    fn write(&self) -> DriverResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StorageFault::new(errno::INTERNAL, 500, "lock poisoned").into())
    }

    /// Fail the next operation with `err`.
    pub fn inject_failure(&self, err: DriverError) {
        if let Ok(mut state) = self.state.write() {
            state.injected = Some(err);
        }
    }

    /// Number of server-side cursors still holding batches.
    pub fn open_cursors(&self) -> usize {
        self.state.read().map(|s| s.cursors.len()).unwrap_or(0)
    }

    /// Number of documents stored in `collection`, if it exists.
    pub fn document_count(&self, collection: &str) -> Option<usize> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.collections.get(collection).map(|c| c.documents.len()))
    }
}

#[async_trait]
impl StorageDriver for InMemoryDriver {
    async fn has_collection(&self, name: &str) -> DriverResult<bool> {
        let mut state = self.write()?;
        state.check_injected()?;
        Ok(state.collections.contains_key(name))
    }

    async fn create_collection(&self, name: &str, kind: CollectionKind) -> DriverResult<()> {
        let mut state = self.write()?;
        state.check_injected()?;
        if state.collections.contains_key(name) {
            return Err(StorageFault::new(
                errno::DUPLICATE_NAME,
                409,
                format!("duplicate name: {}", name),
            )
            .into());
        }
        state
            .collections
            .insert(name.to_string(), StoredCollection::new(kind));
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DriverResult<()> {
        let mut state = self.write()?;
        state.check_injected()?;
        state
            .collections
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| missing_collection(name).into())
    }

    async fn truncate_collection(&self, name: &str) -> DriverResult<()> {
        let mut state = self.write()?;
        state.check_injected()?;
        let collection = state.collection_mut(name)?;
        collection.documents.clear();
        collection.keys.clear();
        Ok(())
    }

    async fn add_index(&self, collection: &str, index: &IndexSpec) -> DriverResult<()> {
        let mut state = self.write()?;
        state.check_injected()?;
        let stored = state.collection_mut(collection)?;

        let mut index = index.clone();
        if index.fields.is_empty() {
            return Err(
                StorageFault::new(errno::BAD_PARAMETER, 400, "index needs at least one field").into(),
            );
        }
        let existing = stored
            .indexes
            .iter()
            .any(|i| i.fields == index.fields && i.unique == index.unique && i.sparse == index.sparse);
        if existing {
            return Ok(());
        }
        if index.name.is_none() {
            index.name = Some(format!("idx_{}", stored.indexes.len() + 1));
        }

        // Existing documents must already satisfy a new unique index.
        let mut seen = StoredCollection::new(stored.kind);
        seen.indexes.push(index.clone());
        for document in stored.documents.values() {
            let key = document.get("_key").and_then(Value::as_str).unwrap_or_default();
            seen.check_unique(document, key)?;
            seen.documents.insert(seen.next_seq, document.clone());
            seen.next_seq += 1;
        }

        stored.indexes.push(index);
        Ok(())
    }

    async fn insert(&self, collection: &str, document: Document) -> DriverResult<WriteResult> {
        let mut state = self.write()?;
        state.check_injected()?;
        state.insert_document(collection, document)
    }

    async fn replace(&self, collection: &str, document: Document) -> DriverResult<WriteResult> {
        let mut state = self.write()?;
        state.check_injected()?;
        state.replace_document(collection, document)
    }

    async fn get(&self, collection: &str, key: &str) -> DriverResult<Option<Document>> {
        let mut state = self.write()?;
        state.check_injected()?;
        Ok(state.collection(collection)?.get(key).cloned())
    }

    async fn remove(&self, collection: &str, key: &str, rev: Option<&str>) -> DriverResult<()> {
        let mut state = self.write()?;
        state.check_injected()?;
        state.remove_document(collection, key, rev)
    }

    async fn query(&self, request: &QueryRequest) -> DriverResult<QueryBatch> {
        let mut state = self.write()?;
        state.check_injected()?;
        let stored = state.collection(&request.collection)?;

        let mut matched = Vec::new();
        for document in stored.documents.values() {
            if eval::matches_all(document, &request.conditions)? {
                matched.push(document.clone());
            }
        }
        eval::sort(&mut matched, &request.sort);

        let total = matched.len() as u64;
        let offset = request.offset.unwrap_or(0) as usize;
        let page: Vec<Document> = match request.limit {
            Some(limit) => matched.into_iter().skip(offset).take(limit as usize).collect(),
            None => matched.into_iter().skip(offset).collect(),
        };

        let count = request.count.then_some(page.len() as u64);
        let full_count = request.full_count.then_some(total);

        let batch_size = request.batch_size.max(1);
        let mut batches: VecDeque<Vec<Document>> = VecDeque::new();
        let mut page = page.into_iter().peekable();
        while page.peek().is_some() {
            batches.push_back(page.by_ref().take(batch_size).collect());
        }

        Ok(state.batch(batches, count, full_count))
    }

    async fn next_batch(&self, cursor_id: &str) -> DriverResult<QueryBatch> {
        let mut state = self.write()?;
        state.check_injected()?;
        let cursor = state.cursors.remove(cursor_id).ok_or_else(|| {
            StorageFault::new(
                errno::CURSOR_NOT_FOUND,
                404,
                format!("cursor not found: {}", cursor_id),
            )
        })?;

        let OpenCursor {
            mut batches,
            count,
            full_count,
        } = cursor;
        let documents = batches.pop_front().unwrap_or_default();
        let has_more = !batches.is_empty();
        if has_more {
            state.cursors.insert(
                cursor_id.to_string(),
                OpenCursor {
                    batches,
                    count,
                    full_count,
                },
            );
        }

        Ok(QueryBatch {
            cursor_id: has_more.then(|| cursor_id.to_string()),
            documents,
            has_more,
            count,
            full_count,
        })
    }

    async fn close_cursor(&self, cursor_id: &str) -> DriverResult<()> {
        let mut state = self.write()?;
        state.check_injected()?;
        state.cursors.remove(cursor_id).map(|_| ()).ok_or_else(|| {
            StorageFault::new(
                errno::CURSOR_NOT_FOUND,
                404,
                format!("cursor not found: {}", cursor_id),
            )
            .into()
        })
    }

    async fn has_graph(&self, name: &str) -> DriverResult<bool> {
        let mut state = self.write()?;
        state.check_injected()?;
        Ok(state.graphs.contains_key(name))
    }

    async fn create_graph(&self, name: &str, definition: &GraphDefinition) -> DriverResult<()> {
        let mut state = self.write()?;
        state.check_injected()?;
        if state.graphs.contains_key(name) {
            return Err(StorageFault::new(
                errno::GRAPH_DUPLICATE,
                409,
                format!("graph already exists: {}", name),
            )
            .into());
        }
        for edges in &definition.edge_definitions {
            state.ensure_collection(&edges.collection, CollectionKind::Edge)?;
        }
        for vertices in definition.vertex_collections() {
            state.ensure_collection(vertices, CollectionKind::Document)?;
        }
        state.graphs.insert(name.to_string(), definition.clone());
        Ok(())
    }

    async fn drop_graph(&self, name: &str, drop_collections: bool) -> DriverResult<()> {
        let mut state = self.write()?;
        state.check_injected()?;
        let definition = state.graph(name)?.clone();
        state.graphs.remove(name);
        if !drop_collections {
            return Ok(());
        }

        let owned = definition
            .edge_definitions
            .iter()
            .map(|edges| edges.collection.as_str())
            .chain(definition.vertex_collections());
        let mut unused = Vec::new();
        for collection in owned {
            let shared = state.graphs.values().any(|other| {
                other.edge_definition(collection).is_some() || other.is_vertex_collection(collection)
            });
            if !shared {
                unused.push(collection.to_string());
            }
        }
        for collection in unused {
            state.collections.remove(&collection);
        }
        Ok(())
    }

    async fn graph_insert(
        &self,
        graph: &str,
        collection: &str,
        document: Document,
    ) -> DriverResult<WriteResult> {
        let mut state = self.write()?;
        state.check_injected()?;
        state.check_graph_write(graph, collection, &document)?;
        state.insert_document(collection, document)
    }

    async fn graph_replace(
        &self,
        graph: &str,
        collection: &str,
        document: Document,
    ) -> DriverResult<WriteResult> {
        let mut state = self.write()?;
        state.check_injected()?;
        let key = document.get("_key").and_then(Value::as_str).unwrap_or_default();
        if state.collection(collection)?.get(key).is_none() {
            return Err(missing_document(collection, key).into());
        }
        state.check_graph_write(graph, collection, &document)?;
        state.replace_document(collection, document)
    }

    async fn graph_remove(
        &self,
        graph: &str,
        collection: &str,
        key: &str,
        rev: Option<&str>,
    ) -> DriverResult<()> {
        let mut state = self.write()?;
        state.check_injected()?;
        let definition = state.graph(graph)?.clone();
        if definition.edge_definition(collection).is_some() {
            return state.remove_document(collection, key, rev);
        }
        if !definition.is_vertex_collection(collection) {
            return Err(not_in_graph(graph, collection).into());
        }

        state.remove_document(collection, key, rev)?;
        let id = storage_id(collection, key);
        for edges in &definition.edge_definitions {
            if let Some(stored) = state.collections.get_mut(&edges.collection) {
                for edge in stored.edges_touching(&id) {
                    stored.remove(&edge);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Direction, Operator, ResolvedCondition, SortKey};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn fault_code(err: DriverError) -> i64 {
        match err {
            DriverError::Fault(fault) => fault.code,
            other => panic!("expected fault, got {:?}", other),
        }
    }

    async fn driver_with(collection: &str) -> InMemoryDriver {
        let driver = InMemoryDriver::new();
        driver
            .create_collection(collection, CollectionKind::Document)
            .await
            .unwrap();
        driver
    }

    fn request(collection: &str) -> QueryRequest {
        QueryRequest {
            collection: collection.into(),
            conditions: Vec::new(),
            sort: Vec::new(),
            limit: None,
            offset: None,
            count: false,
            full_count: false,
            batch_size: 1000,
        }
    }

    #[tokio::test]
    async fn insert_assigns_identity() {
        let driver = driver_with("people").await;
        let written = driver
            .insert("people", doc(json!({"_key": "p1", "name": "A"})))
            .await
            .unwrap();
        assert_eq!(written.id, "people/p1");

        let stored = driver.get("people", "p1").await.unwrap().unwrap();
        assert_eq!(stored["_rev"], json!(written.rev));
        assert_eq!(stored["name"], json!("A"));
    }

    #[tokio::test]
    async fn insert_fails_on_existing_key() {
        let driver = driver_with("people").await;
        driver.insert("people", doc(json!({"_key": "p1"}))).await.unwrap();
        let err = driver
            .insert("people", doc(json!({"_key": "p1"})))
            .await
            .unwrap_err();
        assert_eq!(fault_code(err), errno::UNIQUE_CONSTRAINT_VIOLATED);
    }

    #[tokio::test]
    async fn missing_collection_is_data_source_not_found() {
        let driver = InMemoryDriver::new();
        let err = driver.get("nope", "1").await.unwrap_err();
        assert_eq!(fault_code(err), errno::DATA_SOURCE_NOT_FOUND);
    }

    #[tokio::test]
    async fn replace_with_stale_rev_conflicts() {
        let driver = driver_with("people").await;
        let first = driver.insert("people", doc(json!({"_key": "p1"}))).await.unwrap();
        driver
            .replace("people", doc(json!({"_key": "p1", "_rev": first.rev, "n": 1})))
            .await
            .unwrap();
        let err = driver
            .replace("people", doc(json!({"_key": "p1", "_rev": first.rev, "n": 2})))
            .await
            .unwrap_err();
        assert_eq!(fault_code(err), errno::CONFLICT);
    }

    #[tokio::test]
    async fn unique_index_reports_fields() {
        let driver = driver_with("people").await;
        driver
            .add_index("people", &IndexSpec::persistent(["name"]).unique())
            .await
            .unwrap();
        driver.insert("people", doc(json!({"name": "A"}))).await.unwrap();
        let err = driver
            .insert("people", doc(json!({"name": "A"})))
            .await
            .unwrap_err();
        match err {
            DriverError::Fault(fault) => {
                assert_eq!(fault.code, errno::UNIQUE_CONSTRAINT_VIOLATED);
                assert!(fault.message.contains("over 'name'"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn sparse_unique_index_skips_nulls() {
        let driver = driver_with("people").await;
        driver
            .add_index("people", &IndexSpec::persistent(["email"]).unique().sparse())
            .await
            .unwrap();
        driver.insert("people", doc(json!({"email": null}))).await.unwrap();
        driver.insert("people", doc(json!({}))).await.unwrap();
        assert_eq!(driver.document_count("people"), Some(2));
    }

    #[tokio::test]
    async fn query_batches_through_cursor() {
        let driver = driver_with("nums").await;
        for n in 0..5 {
            driver.insert("nums", doc(json!({"n": n}))).await.unwrap();
        }
        let mut req = request("nums");
        req.conditions.push(ResolvedCondition {
            field: "n".into(),
            path: vec!["n".into()],
            operator: Operator::GTE,
            value: json!(1),
        });
        req.sort.push(SortKey {
            field: "n".into(),
            direction: Direction::Desc,
        });
        req.batch_size = 3;
        req.full_count = true;
        req.limit = Some(10);

        let first = driver.query(&req).await.unwrap();
        assert!(first.has_more);
        assert_eq!(first.documents.len(), 3);
        assert_eq!(first.documents[0]["n"], json!(4));
        assert_eq!(first.full_count, Some(4));
        assert_eq!(driver.open_cursors(), 1);

        let id = first.cursor_id.unwrap();
        let second = driver.next_batch(&id).await.unwrap();
        assert!(!second.has_more);
        assert_eq!(second.documents.len(), 1);
        assert_eq!(driver.open_cursors(), 0);

        let err = driver.close_cursor(&id).await.unwrap_err();
        assert_eq!(fault_code(err), errno::CURSOR_NOT_FOUND);
    }

    #[tokio::test]
    async fn edges_require_endpoints() {
        let driver = InMemoryDriver::new();
        driver.create_collection("links", CollectionKind::Edge).await.unwrap();
        let err = driver
            .insert("links", doc(json!({"_from": "people/1"})))
            .await
            .unwrap_err();
        assert_eq!(fault_code(err), errno::INVALID_EDGE_ATTRIBUTE);
    }

    #[tokio::test]
    async fn clone_shares_storage() {
        let driver = driver_with("people").await;
        let other = driver.clone();
        driver.insert("people", doc(json!({"_key": "p1"}))).await.unwrap();
        assert!(other.get("people", "p1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn injected_failure_fails_once() {
        let driver = driver_with("people").await;
        driver.inject_failure(DriverError::Transport("connection reset".into()));
        assert!(matches!(
            driver.get("people", "p1").await,
            Err(DriverError::Transport(_))
        ));
        assert!(driver.get("people", "p1").await.unwrap().is_none());
    }

    fn travel() -> GraphDefinition {
        GraphDefinition {
            edge_definitions: vec![crate::driver::EdgeDefinition {
                collection: "visits".into(),
                from: vec!["people".into()],
                to: vec!["places".into()],
            }],
            orphan_collections: Vec::new(),
        }
    }

    #[tokio::test]
    async fn create_graph_creates_collections() {
        let driver = InMemoryDriver::new();
        driver.create_graph("travel", &travel()).await.unwrap();
        assert!(driver.has_graph("travel").await.unwrap());
        assert_eq!(driver.document_count("visits"), Some(0));
        assert_eq!(driver.document_count("people"), Some(0));
        assert_eq!(driver.document_count("places"), Some(0));

        let err = driver.create_graph("travel", &travel()).await.unwrap_err();
        assert_eq!(fault_code(err), errno::GRAPH_DUPLICATE);
    }

    #[tokio::test]
    async fn create_graph_rejects_kind_mismatch() {
        let driver = driver_with("visits").await;
        let err = driver.create_graph("travel", &travel()).await.unwrap_err();
        assert_eq!(fault_code(err), errno::COLLECTION_TYPE_INVALID);
        assert!(!driver.has_graph("travel").await.unwrap());
    }

    #[tokio::test]
    async fn graph_insert_checks_vertices() {
        let driver = InMemoryDriver::new();
        driver.create_graph("travel", &travel()).await.unwrap();
        driver.insert("people", doc(json!({"_key": "ann"}))).await.unwrap();

        let err = driver
            .graph_insert(
                "travel",
                "visits",
                doc(json!({"_from": "people/ann", "_to": "places/rome"})),
            )
            .await
            .unwrap_err();
        match err {
            DriverError::Fault(fault) => {
                assert_eq!(fault.code, errno::DOCUMENT_NOT_FOUND);
                assert!(fault.message.contains("_to vertex not found: places/rome"));
            }
            other => panic!("expected fault, got {:?}", other),
        }
        assert_eq!(driver.document_count("visits"), Some(0));

        let err = driver
            .graph_insert(
                "travel",
                "visits",
                doc(json!({"_from": "places/rome", "_to": "people/ann"})),
            )
            .await
            .unwrap_err();
        assert_eq!(fault_code(err), errno::GRAPH_VERTEX_COLLECTION_NOT_USED);

        driver.insert("places", doc(json!({"_key": "rome"}))).await.unwrap();
        driver
            .graph_insert(
                "travel",
                "visits",
                doc(json!({"_from": "people/ann", "_to": "places/rome"})),
            )
            .await
            .unwrap();
        assert_eq!(driver.document_count("visits"), Some(1));
    }

    #[tokio::test]
    async fn graph_writes_outside_graph_fail() {
        let driver = driver_with("other").await;
        driver.create_graph("travel", &travel()).await.unwrap();
        let err = driver
            .graph_insert("travel", "other", doc(json!({"_key": "x"})))
            .await
            .unwrap_err();
        assert_eq!(fault_code(err), errno::GRAPH_EDGE_COLLECTION_NOT_USED);

        let err = driver
            .graph_insert("nowhere", "people", doc(json!({"_key": "x"})))
            .await
            .unwrap_err();
        assert_eq!(fault_code(err), errno::GRAPH_NOT_FOUND);
    }

    #[tokio::test]
    async fn graph_remove_cascades_to_edges() {
        let driver = InMemoryDriver::new();
        driver.create_graph("travel", &travel()).await.unwrap();
        driver.insert("people", doc(json!({"_key": "ann"}))).await.unwrap();
        driver.insert("people", doc(json!({"_key": "bob"}))).await.unwrap();
        driver.insert("places", doc(json!({"_key": "rome"}))).await.unwrap();
        for person in ["ann", "bob"] {
            driver
                .graph_insert(
                    "travel",
                    "visits",
                    doc(json!({"_from": format!("people/{}", person), "_to": "places/rome"})),
                )
                .await
                .unwrap();
        }

        driver.graph_remove("travel", "people", "ann", None).await.unwrap();
        assert_eq!(driver.document_count("people"), Some(1));
        assert_eq!(driver.document_count("visits"), Some(1));

        driver.graph_remove("travel", "places", "rome", None).await.unwrap();
        assert_eq!(driver.document_count("visits"), Some(0));
    }

    #[tokio::test]
    async fn drop_graph_keeps_shared_collections() {
        let driver = InMemoryDriver::new();
        driver.create_graph("travel", &travel()).await.unwrap();
        let census = GraphDefinition {
            edge_definitions: Vec::new(),
            orphan_collections: vec!["people".into()],
        };
        driver.create_graph("census", &census).await.unwrap();

        driver.drop_graph("travel", true).await.unwrap();
        assert!(!driver.has_graph("travel").await.unwrap());
        assert_eq!(driver.document_count("visits"), None);
        assert_eq!(driver.document_count("places"), None);
        assert_eq!(driver.document_count("people"), Some(0));

        let err = driver.drop_graph("travel", false).await.unwrap_err();
        assert_eq!(fault_code(err), errno::GRAPH_NOT_FOUND);
    }
}
