//! Collection - Typed accessor for record CRUD, queries and locks.

use std::marker::PhantomData;

use super::edge;
use crate::codec;
use crate::config::Database;
use crate::cursor::Cursor;
use crate::driver::{self, errno, DriverError, IndexSpec, StorageDriver};
use crate::error::{ArangodanticError, Result};
use crate::lock::{LockGuard, Locked};
use crate::query::{Filter, FindOptions, QueryRequest};
use crate::record::{storage_id, Record};
use crate::translate::{not_found_message, translate, FaultContext};

/// Typed view of the collection that stores `R`.
pub struct Collection<'a, R> {
    db: &'a Database,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Clone for Collection<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Collection<'_, R> {}

impl<'a, R: Record> Collection<'a, R> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self {
            db,
            _marker: PhantomData,
        }
    }

    pub fn database(&self) -> &'a Database {
        self.db
    }

    /// Resolved (prefixed) collection name.
    pub fn name(&self) -> Result<String> {
        self.db.collection_name::<R>()
    }

    fn driver(&self) -> &'a dyn StorageDriver {
        self.db.driver().as_ref()
    }

    /// Storage id (`collection/key`) of `record`, or `None` while it has no key.
    pub fn id_of(&self, record: &R) -> Result<Option<String>> {
        match record.key() {
            Some(key) => Ok(Some(storage_id(&self.name()?, key))),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Collection lifecycle
    // ------------------------------------------------------------------

    /// Create the collection (as an edge collection for edges) if it is missing.
    pub async fn ensure_collection(&self) -> Result<()> {
        let name = self.name()?;
        let ctx = FaultContext::new(R::TYPE_NAME, &name);
        let exists = self
            .driver()
            .has_collection(&name)
            .await
            .map_err(|e| translate(e, ctx))?;
        if exists {
            return Ok(());
        }
        match self.driver().create_collection(&name, R::KIND).await {
            Ok(()) => {
                tracing::debug!(collection = %name, kind = %R::KIND, "created collection");
                Ok(())
            }
            // Created concurrently by someone else.
            Err(DriverError::Fault(fault)) if fault.code == errno::DUPLICATE_NAME => Ok(()),
            Err(e) => Err(translate(e, ctx)),
        }
    }

    /// Remove every document. Returns `false` for a missing collection when
    /// `ignore_missing` is set.
    pub async fn truncate_collection(&self, ignore_missing: bool) -> Result<bool> {
        let name = self.name()?;
        let result = self.driver().truncate_collection(&name).await;
        absorb_missing_collection(result, ignore_missing, FaultContext::new(R::TYPE_NAME, &name))
    }

    /// Drop the collection. Returns whether it existed; a missing collection
    /// fails with `DataSourceNotFound` unless `ignore_missing` is set.
    pub async fn delete_collection(&self, ignore_missing: bool) -> Result<bool> {
        let name = self.name()?;
        let result = self.driver().drop_collection(&name).await;
        let dropped =
            absorb_missing_collection(result, ignore_missing, FaultContext::new(R::TYPE_NAME, &name))?;
        if dropped {
            tracing::debug!(collection = %name, "dropped collection");
        }
        Ok(dropped)
    }

    pub async fn add_index(&self, index: &IndexSpec) -> Result<()> {
        let name = self.name()?;
        self.driver()
            .add_index(&name, index)
            .await
            .map_err(|e| translate(e, FaultContext::new(R::TYPE_NAME, &name)))
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Load a record by identity key.
    pub async fn load(&self, key: &str) -> Result<R> {
        let name = self.name()?;
        let document = self
            .driver()
            .get(&name, key)
            .await
            .map_err(|e| translate(e, FaultContext::new(R::TYPE_NAME, &name).with_key(key)))?
            .ok_or_else(|| ArangodanticError::ModelNotFound(not_found_message(R::TYPE_NAME, key)))?;
        codec::decode(document)
    }

    /// Load every existing record among `keys`, in order. Missing keys are skipped.
    pub async fn get_many<I, S>(&self, keys: I) -> Result<Vec<R>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = self.name()?;
        let mut records = Vec::new();
        for key in keys {
            let key = key.as_ref();
            let document = self
                .driver()
                .get(&name, key)
                .await
                .map_err(|e| translate(e, FaultContext::new(R::TYPE_NAME, &name).with_key(key)))?;
            if let Some(document) = document {
                records.push(codec::decode(document)?);
            }
        }
        Ok(records)
    }

    /// Refresh `record` from storage, keeping its identity.
    pub async fn reload(&self, record: &mut R) -> Result<()> {
        let Some(key) = record.key().map(String::from) else {
            return Err(ArangodanticError::ModelNotFound(format!(
                "Can't reload '{}' without a key",
                R::TYPE_NAME
            )));
        };
        *record = self.load(&key).await?;
        Ok(())
    }

    /// Run a query. Dropping or draining the returned cursor releases it.
    pub async fn find(&self, filter: Filter, options: FindOptions) -> Result<Cursor<R>> {
        options.validate()?;
        let name = self.name()?;
        let request = QueryRequest {
            conditions: filter.resolve(self.db.resolver())?,
            collection: name,
            sort: options.sort,
            limit: options.limit,
            offset: options.offset,
            count: options.count,
            full_count: options.full_count,
            batch_size: options.batch_size.unwrap_or(self.db.batch_size()),
        };
        tracing::debug!(
            collection = %request.collection,
            conditions = request.conditions.len(),
            limit = ?request.limit,
            "find"
        );
        let batch = self
            .driver()
            .query(&request)
            .await
            .map_err(|e| translate(e, FaultContext::new(R::TYPE_NAME, &request.collection)))?;
        Ok(Cursor::new(self.db.driver().clone(), request.collection, batch))
    }

    /// First match in `options.sort` order; `ModelNotFound` when nothing matches.
    pub async fn find_one(&self, filter: Filter, options: FindOptions) -> Result<R> {
        let mut cursor = self.find(filter, options.limit(1)).await?;
        let first = cursor.next().await;
        cursor.close(true).await?;
        first?.ok_or_else(|| {
            ArangodanticError::ModelNotFound(format!("No '{}' matched given filters", R::TYPE_NAME))
        })
    }

    /// The single match; `MultipleModelsFound` when more than one document matches.
    pub async fn find_unique(&self, filter: Filter) -> Result<R> {
        let mut cursor = self.find(filter, FindOptions::new().limit(2)).await?;
        let mut matches = cursor.to_list().await?.into_iter();
        match (matches.next(), matches.next()) {
            (Some(record), None) => Ok(record),
            (None, _) => Err(ArangodanticError::ModelNotFound(format!(
                "No '{}' matched given filters",
                R::TYPE_NAME
            ))),
            (Some(_), Some(_)) => Err(ArangodanticError::MultipleModelsFound(format!(
                "More than one '{}' matched given filters",
                R::TYPE_NAME
            ))),
        }
    }

    /// Every record in the collection, in storage order.
    pub async fn all(&self) -> Result<Vec<R>> {
        self.find(Filter::new(), FindOptions::new()).await?.to_list().await
    }

    /// Identity keys of every stored document. Documents are not decoded.
    pub async fn keys(&self) -> Result<Vec<String>> {
        self.attribute_values(codec::KEY).await
    }

    /// Storage ids of every stored document. Documents are not decoded.
    pub async fn ids(&self) -> Result<Vec<String>> {
        self.attribute_values(codec::ID).await
    }

    async fn attribute_values(&self, attribute: &str) -> Result<Vec<String>> {
        let name = self.name()?;
        let request = QueryRequest::scan(&name, self.db.batch_size());
        let documents = driver::drain(self.driver(), &request)
            .await
            .map_err(|e| translate(e, FaultContext::new(R::TYPE_NAME, &name)))?;
        Ok(documents
            .iter()
            .filter_map(|document| document.get(attribute)?.as_str().map(String::from))
            .collect())
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Insert a transient record or replace a persisted one, checking its revision.
    ///
    /// On success the record's key and revision are updated in place. A key
    /// generated for a failed insert is taken back.
    pub async fn save(&self, record: &mut R) -> Result<()> {
        self.save_in(record, None).await
    }

    /// Save directly, or through the named graph when `graph` is set.
    pub(crate) async fn save_in(&self, record: &mut R, graph: Option<&str>) -> Result<()> {
        let is_new = !record.meta().is_persisted();
        let mut generated = false;
        if is_new && record.key().is_none() {
            if let Some(key) = self.db.generate_key() {
                record.meta_mut().set_key(key);
                generated = true;
            }
        }

        let result = self.write(record, is_new, graph).await;
        if result.is_err() && generated {
            record.meta_mut().clear_key();
        }
        result
    }

    async fn write(&self, record: &mut R, is_new: bool, graph: Option<&str>) -> Result<()> {
        let name = self.name()?;
        record.before_save(is_new)?;
        let endpoints = edge::resolve_endpoints(self.db.resolver(), &*record)?;
        let document = codec::encode(&*record, &name, endpoints.as_ref())?;

        let key = record.key().map(String::from);
        let mut ctx = FaultContext::new(R::TYPE_NAME, &name);
        if let Some(key) = key.as_deref() {
            ctx = ctx.with_key(key);
        }
        if let (true, Some(ids)) = (is_new, endpoints.as_ref()) {
            ctx = ctx.with_endpoints(&ids.from, &ids.to);
        }
        let driver = self.driver();
        let result = match (graph, is_new) {
            (None, true) => driver.insert(&name, document).await,
            (None, false) => driver.replace(&name, document).await,
            (Some(graph), true) => driver.graph_insert(graph, &name, document).await,
            (Some(graph), false) => driver.graph_replace(graph, &name, document).await,
        };
        let written = result.map_err(|e| translate(e, ctx))?;

        tracing::debug!(id = %written.id, rev = %written.rev, is_new, graph = ?graph, "saved {}", R::TYPE_NAME);
        record.meta_mut().assign(written.key, written.rev);
        Ok(())
    }

    /// Save each record in order, stopping at the first failure.
    pub async fn insert_many(&self, records: &mut [R]) -> Result<()> {
        for record in records.iter_mut() {
            self.save(record).await?;
        }
        Ok(())
    }

    /// Replace every record in order, checking each revision. All records
    /// must have been saved before; nothing is written otherwise.
    pub async fn update_many(&self, records: &mut [R]) -> Result<()> {
        if let Some(transient) = records.iter().find(|record| !record.meta().is_persisted()) {
            return Err(ArangodanticError::ModelNotFound(format!(
                "Can't update '{}' that was never saved (_key {:?})",
                R::TYPE_NAME,
                transient.key()
            )));
        }
        for record in records.iter_mut() {
            self.write(record, false, None).await?;
        }
        Ok(())
    }

    /// Delete the stored document, checking the held revision when there is one.
    ///
    /// Returns `false` when the document was already gone and `ignore_missing`
    /// is set. A deleted record keeps its key but is transient again, so a
    /// later save inserts it anew.
    pub async fn delete(&self, record: &mut R, ignore_missing: bool) -> Result<bool> {
        self.delete_in(record, ignore_missing, None).await
    }

    /// Delete directly, or through the named graph when `graph` is set.
    pub(crate) async fn delete_in(
        &self,
        record: &mut R,
        ignore_missing: bool,
        graph: Option<&str>,
    ) -> Result<bool> {
        let name = self.name()?;
        let Some(key) = record.key().map(String::from) else {
            if ignore_missing {
                return Ok(false);
            }
            return Err(ArangodanticError::ModelNotFound(format!(
                "Can't delete '{}' without a key",
                R::TYPE_NAME
            )));
        };

        let result = match graph {
            None => self.driver().remove(&name, &key, record.rev()).await,
            Some(graph) => {
                self.driver()
                    .graph_remove(graph, &name, &key, record.rev())
                    .await
            }
        };
        match result {
            Ok(()) => {
                tracing::debug!(id = %storage_id(&name, &key), "deleted {}", R::TYPE_NAME);
                record.meta_mut().forget_rev();
                Ok(true)
            }
            Err(DriverError::Fault(fault)) if fault.code == errno::DOCUMENT_NOT_FOUND && ignore_missing => {
                record.meta_mut().forget_rev();
                Ok(false)
            }
            Err(e) => Err(translate(e, FaultContext::new(R::TYPE_NAME, &name).with_key(&key))),
        }
    }

    // ------------------------------------------------------------------
    // Locks
    // ------------------------------------------------------------------

    /// Name of the lock guarding the record with `key`.
    pub fn lock_name(&self, key: &str) -> Result<String> {
        Ok(format!("{}{}_{}", self.db.lock_name_prefix(), self.name()?, key))
    }

    async fn acquire(&self, key: &str) -> Result<LockGuard> {
        let provider = self.db.lock_provider()?.clone();
        let name = self.lock_name(key)?;
        Ok(LockGuard::acquire(provider, name).await?)
    }

    /// Acquire the record's lock and load it.
    ///
    /// If the load fails the lock is released before the error is returned.
    pub async fn lock_and_load(&self, key: &str) -> Result<Locked<'a, R>> {
        let guard = self.acquire(key).await?;
        match self.load(key).await {
            Ok(record) => Ok(Locked::new(*self, record, guard)),
            Err(err) => {
                release_quietly(guard).await;
                Err(err)
            }
        }
    }

    /// Lock an existing instance's key and refresh it from storage.
    pub async fn lock_and_reload(&self, record: &mut R) -> Result<LockGuard> {
        let Some(key) = record.key().map(String::from) else {
            return Err(ArangodanticError::ModelNotFound(format!(
                "Can't reload '{}' without a key",
                R::TYPE_NAME
            )));
        };
        let guard = self.acquire(&key).await?;
        if let Err(err) = self.reload(record).await {
            release_quietly(guard).await;
            return Err(err);
        }
        Ok(guard)
    }

    /// Lock, load, apply `update`, and save on success. The lock is always
    /// released; a failed update saves nothing.
    pub async fn lock_and_update<F>(&self, key: &str, update: F) -> Result<R>
    where
        F: FnOnce(&mut R) -> Result<()> + Send,
    {
        let mut locked = self.lock_and_load(key).await?;
        match update(&mut *locked) {
            Ok(()) => locked.commit().await,
            Err(err) => {
                if let Err(release_err) = locked.abort().await {
                    tracing::warn!(error = %release_err, "failed to release lock after aborted update");
                }
                Err(err)
            }
        }
    }
}

async fn release_quietly(guard: LockGuard) {
    let name = guard.name().to_string();
    if let Err(err) = guard.release().await {
        tracing::warn!(lock = %name, error = %err, "failed to release lock");
    }
}

fn absorb_missing_collection(
    result: std::result::Result<(), DriverError>,
    ignore_missing: bool,
    ctx: FaultContext<'_>,
) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(DriverError::Fault(fault))
            if fault.code == errno::DATA_SOURCE_NOT_FOUND && ignore_missing =>
        {
            Ok(false)
        }
        Err(e) => Err(translate(e, ctx)),
    }
}
