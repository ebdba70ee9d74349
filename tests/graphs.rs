mod support;

use arangodantic::{
    ArangodanticError, Database, Endpoints, Graph, ModelExt, Record, StorageDriver,
};
use support::database;
use support::models::{Company, Identity, Link};

fn social(db: &Database) -> Graph<'_> {
    db.graph("social")
        .edge::<Link, Identity, Identity>()
        .unwrap()
        .orphan::<Company>()
        .unwrap()
}

async fn people(db: &Database, graph: &Graph<'_>) -> (Identity, Identity) {
    let mut alice = Identity::new("Alice");
    let mut bob = Identity::new("Bob");
    graph.save(&mut alice).await.unwrap();
    graph.save(&mut bob).await.unwrap();
    assert!(alice.id(db).unwrap().is_some());
    (alice, bob)
}

#[tokio::test]
async fn ensure_graph_creates_collections() {
    let (db, driver) = database();
    let graph = social(&db);
    assert_eq!(graph.name(), "test-social");

    graph.ensure().await.unwrap();
    graph.ensure().await.unwrap();
    assert!(driver.has_graph("test-social").await.unwrap());
    assert_eq!(driver.document_count("test-links"), Some(0));
    assert_eq!(driver.document_count("test-identities"), Some(0));
    assert_eq!(driver.document_count("test-companies"), Some(0));
}

#[tokio::test]
async fn delete_missing_graph_is_graph_not_found() {
    let (db, _) = database();
    let graph = social(&db);

    let err = graph.delete_graph(false, false).await.unwrap_err();
    match err {
        ArangodanticError::GraphNotFound(message) => {
            assert_eq!(message, "No graph found with name 'test-social'")
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(!graph.delete_graph(true, false).await.unwrap());
}

#[tokio::test]
async fn delete_graph_optionally_drops_collections() {
    let (db, driver) = database();
    let graph = social(&db);
    graph.ensure().await.unwrap();

    assert!(graph.delete_graph(false, false).await.unwrap());
    assert!(!driver.has_graph("test-social").await.unwrap());
    assert_eq!(driver.document_count("test-links"), Some(0));

    graph.ensure().await.unwrap();
    assert!(graph.delete_graph(false, true).await.unwrap());
    assert_eq!(driver.document_count("test-links"), None);
    assert_eq!(driver.document_count("test-identities"), None);
}

#[tokio::test]
async fn save_through_missing_graph_fails() {
    let (db, _) = database();
    db.collection::<Identity>().ensure_collection().await.unwrap();
    let mut alice = Identity::new("Alice");
    let err = social(&db).save(&mut alice).await.unwrap_err();
    assert!(matches!(err, ArangodanticError::GraphNotFound(_)));
    assert!(alice.key().is_none());
}

#[tokio::test]
async fn edge_to_missing_vertex_is_rejected() {
    let (db, driver) = database();
    let graph = social(&db);
    graph.ensure().await.unwrap();
    let (alice, _) = people(&db, &graph).await;

    let ghost = "test-identities/ghost";
    let mut link = Link::new(Endpoints::new(&alice, ghost), "friend");
    let err = graph.save(&mut link).await.unwrap_err();
    match err {
        ArangodanticError::ModelNotFound(message) => {
            assert!(message.contains(ghost), "{}", message);
            assert!(message.contains("Link"), "{}", message);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(link.rev().is_none());
    assert!(link.key().is_none());
    assert_eq!(driver.document_count("test-links"), Some(0));
}

#[tokio::test]
async fn edge_between_saved_vertices_is_stored() {
    let (db, _) = database();
    let graph = social(&db);
    graph.ensure().await.unwrap();
    let (alice, bob) = people(&db, &graph).await;

    let mut link = Link::new(Endpoints::new(&alice, &bob), "friend");
    graph.save(&mut link).await.unwrap();
    let first_rev = link.rev().unwrap().to_string();

    link.kind = "colleague".into();
    graph.save(&mut link).await.unwrap();
    assert_ne!(link.rev(), Some(first_rev.as_str()));

    let loaded = Link::load(&db, link.key().unwrap()).await.unwrap();
    assert_eq!(loaded.kind, "colleague");
    assert_eq!(loaded.from_key(), alice.key());
}

#[tokio::test]
async fn delete_vertex_removes_its_edges() {
    let (db, driver) = database();
    let graph = social(&db);
    graph.ensure().await.unwrap();
    let (mut alice, bob) = people(&db, &graph).await;
    let mut carol = Identity::new("Carol");
    graph.save(&mut carol).await.unwrap();

    let mut to_bob = Link::new(Endpoints::new(&alice, &bob), "friend");
    let mut from_carol = Link::new(Endpoints::new(&carol, &alice), "friend");
    let mut unrelated = Link::new(Endpoints::new(&bob, &carol), "friend");
    for link in [&mut to_bob, &mut from_carol, &mut unrelated] {
        graph.save(link).await.unwrap();
    }
    assert_eq!(driver.document_count("test-links"), Some(3));

    assert!(graph.delete_vertex(&mut alice, false).await.unwrap());
    assert!(alice.rev().is_none());
    assert_eq!(driver.document_count("test-identities"), Some(2));
    assert_eq!(driver.document_count("test-links"), Some(1));
    assert!(Link::load(&db, unrelated.key().unwrap()).await.is_ok());
    let err = Link::load(&db, to_bob.key().unwrap()).await.unwrap_err();
    assert!(matches!(err, ArangodanticError::ModelNotFound(_)));
}

#[tokio::test]
async fn delete_edge_keeps_vertices() {
    let (db, driver) = database();
    let graph = social(&db);
    graph.ensure().await.unwrap();
    let (alice, bob) = people(&db, &graph).await;

    let mut link = Link::new(Endpoints::new(&alice, &bob), "friend");
    graph.save(&mut link).await.unwrap();
    assert!(graph.delete_edge(&mut link, false).await.unwrap());
    assert_eq!(driver.document_count("test-links"), Some(0));
    assert_eq!(driver.document_count("test-identities"), Some(2));

    assert!(!graph.delete_edge(&mut link, true).await.unwrap());
    let err = graph.delete_edge(&mut link, false).await.unwrap_err();
    assert!(matches!(err, ArangodanticError::ModelNotFound(_)));
}

#[tokio::test]
async fn delete_checks_record_kind() {
    let (db, _) = database();
    let graph = social(&db);
    graph.ensure().await.unwrap();
    let (mut alice, _) = people(&db, &graph).await;

    let err = graph.delete_edge(&mut alice, false).await.unwrap_err();
    assert!(matches!(err, ArangodanticError::Config(_)));
    assert!(Identity::load(&db, alice.key().unwrap()).await.is_ok());
}

#[tokio::test]
async fn orphan_vertices_are_saved_through_graph() {
    let (db, driver) = database();
    let graph = social(&db);
    graph.ensure().await.unwrap();

    let mut company = Company::new("acme");
    graph.save(&mut company).await.unwrap();
    assert_eq!(driver.document_count("test-companies"), Some(1));
    assert!(graph.delete(&mut company, false).await.unwrap());
    assert_eq!(driver.document_count("test-companies"), Some(0));
}
