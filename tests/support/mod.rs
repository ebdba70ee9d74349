//! Shared records and database setup for the integration tests.

#![allow(dead_code)]

pub mod models;

use arangodantic::{Database, InMemoryDriver, InMemoryLockProvider, Record};

/// A database over a fresh in-memory driver, with an in-memory lock provider.
pub fn database() -> (Database, InMemoryDriver) {
    let driver = InMemoryDriver::new();
    let db = Database::builder(driver.clone())
        .prefix("test-")
        .lock_provider(InMemoryLockProvider::new())
        .build()
        .unwrap();
    (db, driver)
}

/// Ensure the collection of `R` exists.
pub async fn ensure<R: Record>(db: &Database) {
    db.collection::<R>().ensure_collection().await.unwrap();
}
