//! ModelExt - Instance-level persistence methods for any record.

use async_trait::async_trait;

use crate::config::Database;
use crate::error::Result;
use crate::lock::Locked;
use crate::record::Record;

/// Extension trait putting the collection operations on the record itself:
/// `identity.save(&db)`, `Identity::load(&db, key)`.
#[async_trait]
pub trait ModelExt: Record + Sized {
    async fn save(&mut self, db: &Database) -> Result<()> {
        db.collection::<Self>().save(self).await
    }

    async fn reload(&mut self, db: &Database) -> Result<()> {
        db.collection::<Self>().reload(self).await
    }

    async fn delete(&mut self, db: &Database, ignore_missing: bool) -> Result<bool> {
        db.collection::<Self>().delete(self, ignore_missing).await
    }

    /// Storage id (`collection/key`), or `None` until a key is assigned.
    fn id(&self, db: &Database) -> Result<Option<String>> {
        db.collection::<Self>().id_of(self)
    }

    async fn load(db: &Database, key: &str) -> Result<Self> {
        db.collection::<Self>().load(key).await
    }

    async fn lock_and_load<'a>(db: &'a Database, key: &str) -> Result<Locked<'a, Self>> {
        db.collection::<Self>().lock_and_load(key).await
    }
}

impl<R: Record> ModelExt for R {}
