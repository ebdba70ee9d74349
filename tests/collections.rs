mod support;

use arangodantic::{
    ArangodanticError, Config, Database, Document, InMemoryDriver, Meta, ModelExt, StorageDriver,
};
use serde::{Deserialize, Serialize};
use support::models::{Identity, Link};
use support::{database, ensure};

mod clash {
    use super::*;

    /// Resolves to the same collection as `Identity` under a plain prefix.
    #[derive(Debug, Clone, Serialize, Deserialize, Document)]
    #[arango(collection = "identities")]
    pub struct Other {
        #[serde(skip)]
        pub meta: Meta,
    }
}

#[tokio::test]
async fn ensure_collection_is_idempotent() {
    let (db, driver) = database();
    ensure::<Identity>(&db).await;
    ensure::<Identity>(&db).await;
    assert!(driver.has_collection("test-identities").await.unwrap());
}

#[tokio::test]
async fn truncate_removes_documents() {
    let (db, driver) = database();
    ensure::<Identity>(&db).await;
    Identity::new("a").save(&db).await.unwrap();
    Identity::new("b").save(&db).await.unwrap();
    assert_eq!(driver.document_count("test-identities"), Some(2));

    assert!(db.collection::<Identity>().truncate_collection(false).await.unwrap());
    assert_eq!(driver.document_count("test-identities"), Some(0));
}

#[tokio::test]
async fn truncate_missing_collection() {
    let (db, _) = database();
    let collection = db.collection::<Identity>();
    assert!(!collection.truncate_collection(true).await.unwrap());
    let err = collection.truncate_collection(false).await.unwrap_err();
    assert!(matches!(err, ArangodanticError::DataSourceNotFound(_)));
}

#[tokio::test]
async fn delete_collection_reports_existence() {
    let (db, driver) = database();
    ensure::<Link>(&db).await;
    let collection = db.collection::<Link>();

    assert!(collection.delete_collection(false).await.unwrap());
    assert_eq!(driver.document_count("test-links"), None);
    assert!(!collection.delete_collection(true).await.unwrap());
    let err = collection.delete_collection(false).await.unwrap_err();
    assert!(matches!(err, ArangodanticError::DataSourceNotFound(_)));
}

#[tokio::test]
async fn delete_never_created_collection() {
    let (db, _) = database();
    let collection = db.collection::<Identity>();
    let err = collection.delete_collection(false).await.unwrap_err();
    assert!(matches!(err, ArangodanticError::DataSourceNotFound(_)));
    assert!(!collection.delete_collection(true).await.unwrap());
}

#[tokio::test]
async fn colliding_types_are_rejected() {
    let db = Database::builder(InMemoryDriver::new()).build().unwrap();
    db.register::<Identity>().unwrap();
    let err = db.register::<clash::Other>().unwrap_err();
    assert!(matches!(err, ArangodanticError::Config(ref message) if message.contains("identities")));

    // Registration is idempotent for the same type.
    db.register::<Identity>().unwrap();
}

#[tokio::test]
async fn database_from_config() {
    let config: Config =
        serde_json::from_str(r#"{"prefix": "app-", "lock_name_prefix": "lk_", "batch_size": 2}"#)
            .unwrap();
    let db = Database::builder(InMemoryDriver::new())
        .config(config)
        .build()
        .unwrap();

    assert_eq!(db.prefix(), "app-");
    assert_eq!(db.lock_name_prefix(), "lk_");
    assert_eq!(db.collection_name::<Identity>().unwrap(), "app-identities");
    assert_eq!(
        db.collection::<Identity>().lock_name("1").unwrap(),
        "lk_app-identities_1"
    );
}

#[tokio::test]
async fn server_fault_without_dedicated_kind_is_storage() {
    let (db, driver) = database();
    ensure::<Identity>(&db).await;
    driver.inject_failure(arangodantic::driver::DriverError::Fault(
        arangodantic::driver::StorageFault::new(4, 500, "internal error"),
    ));
    let err = Identity::load(&db, "x").await.unwrap_err();
    assert!(matches!(err, ArangodanticError::Storage(ref fault) if fault.code == 4));
}
