//! Process-wide settings and the [`Database`] handle passed to every operation.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::driver::StorageDriver;
use crate::error::{ArangodanticError, Result};
use crate::lock::LockProvider;
use crate::model::{Collection, Graph};
use crate::record::Record;
use crate::resolver::{pluralize_underscore, CollectionNamer, CollectionResolver};

/// Produces identity keys for records saved without one.
pub type KeyGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Default key generator: a random UUID v4.
pub fn uuid_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Deserializable settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prepended to every collection name.
    pub prefix: String,
    /// Prepended to every lock name.
    pub lock_name_prefix: String,
    /// Documents per cursor batch when a query does not set one.
    pub batch_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            prefix: String::new(),
            lock_name_prefix: "arangodantic_".to_string(),
            batch_size: None,
        }
    }
}

struct Inner {
    driver: Arc<dyn StorageDriver>,
    resolver: CollectionResolver,
    key_gen: Option<KeyGenerator>,
    locks: Option<Arc<dyn LockProvider>>,
    lock_name_prefix: String,
    batch_size: usize,
}

/// Configured storage handle. Cheap to clone; set up once and shared.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl Database {
    pub fn builder<D: StorageDriver + 'static>(driver: D) -> DatabaseBuilder {
        DatabaseBuilder::new(Arc::new(driver))
    }

    pub fn builder_from_arc(driver: Arc<dyn StorageDriver>) -> DatabaseBuilder {
        DatabaseBuilder::new(driver)
    }

    /// Typed access to the collection of `R`.
    pub fn collection<R: Record>(&self) -> Collection<'_, R> {
        Collection::new(self)
    }

    /// A named graph with an empty definition. The name is prefixed like
    /// collection names.
    pub fn graph(&self, name: &str) -> Graph<'_> {
        Graph::new(self, format!("{}{}", self.prefix(), name))
    }

    pub fn collection_name<R: Record>(&self) -> Result<String> {
        self.inner.resolver.resolve::<R>()
    }

    /// Register `R` up front so a naming collision fails at startup.
    pub fn register<R: Record>(&self) -> Result<&Self> {
        self.inner.resolver.resolve::<R>()?;
        Ok(self)
    }

    pub fn driver(&self) -> &Arc<dyn StorageDriver> {
        &self.inner.driver
    }

    pub fn resolver(&self) -> &CollectionResolver {
        &self.inner.resolver
    }

    pub fn prefix(&self) -> &str {
        self.inner.resolver.prefix()
    }

    pub fn lock_name_prefix(&self) -> &str {
        &self.inner.lock_name_prefix
    }

    pub(crate) fn batch_size(&self) -> usize {
        self.inner.batch_size
    }

    /// A fresh identity key, or `None` when storage generates keys.
    pub(crate) fn generate_key(&self) -> Option<String> {
        self.inner.key_gen.as_ref().map(|generate| generate())
    }

    pub(crate) fn lock_provider(&self) -> Result<&Arc<dyn LockProvider>> {
        self.inner.locks.as_ref().ok_or_else(|| {
            ArangodanticError::Config("Trying to get lock when no lock is configured".into())
        })
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("prefix", &self.prefix())
            .field("lock_name_prefix", &self.inner.lock_name_prefix)
            .field("batch_size", &self.inner.batch_size)
            .field("locks", &self.inner.locks.is_some())
            .finish_non_exhaustive()
    }
}

pub struct DatabaseBuilder {
    driver: Arc<dyn StorageDriver>,
    config: Config,
    key_gen: Option<KeyGenerator>,
    locks: Option<Arc<dyn LockProvider>>,
    namer: CollectionNamer,
}

impl DatabaseBuilder {
    fn new(driver: Arc<dyn StorageDriver>) -> Self {
        DatabaseBuilder {
            driver,
            config: Config::default(),
            key_gen: Some(Arc::new(uuid_key) as KeyGenerator),
            locks: None,
            namer: pluralize_underscore,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    pub fn key_gen<F>(mut self, generate: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.key_gen = Some(Arc::new(generate) as KeyGenerator);
        self
    }

    /// Leave identity keys of new records to storage.
    pub fn server_generated_keys(mut self) -> Self {
        self.key_gen = None;
        self
    }

    pub fn lock_provider<L: LockProvider + 'static>(mut self, provider: L) -> Self {
        self.locks = Some(Arc::new(provider) as Arc<dyn LockProvider>);
        self
    }

    pub fn lock_provider_arc(mut self, provider: Arc<dyn LockProvider>) -> Self {
        self.locks = Some(provider);
        self
    }

    pub fn lock_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.lock_name_prefix = prefix.into();
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = Some(batch_size);
        self
    }

    pub fn collection_namer(mut self, namer: CollectionNamer) -> Self {
        self.namer = namer;
        self
    }

    pub fn build(self) -> Result<Database> {
        let batch_size = self.config.batch_size.unwrap_or(crate::query::DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(ArangodanticError::Config("batch_size must be positive".into()));
        }
        tracing::debug!(
            prefix = %self.config.prefix,
            lock_name_prefix = %self.config.lock_name_prefix,
            batch_size,
            "database configured"
        );
        Ok(Database {
            inner: Arc::new(Inner {
                driver: self.driver,
                resolver: CollectionResolver::with_namer(self.config.prefix, self.namer),
                key_gen: self.key_gen,
                locks: self.locks,
                lock_name_prefix: self.config.lock_name_prefix,
                batch_size,
            }),
        })
    }
}
