//! Graph - Named graph over record collections.

use crate::config::Database;
use crate::driver::{errno, DriverError, EdgeDefinition, GraphDefinition, StorageDriver};
use crate::error::{ArangodanticError, Result};
use crate::record::{CollectionKind, Record};
use crate::translate::{translate, FaultContext};

const TYPE_NAME: &str = "Graph";

/// A named graph and the record collections it connects.
///
/// Built with [`Database::graph`], then [`edge`](Graph::edge) and
/// [`orphan`](Graph::orphan) per record type. Records saved through the graph
/// are rejected when an edge endpoint is missing; deleting a vertex through it
/// also deletes the graph's edges touching that vertex.
#[derive(Debug, Clone)]
pub struct Graph<'a> {
    db: &'a Database,
    name: String,
    definition: GraphDefinition,
}

impl<'a> Graph<'a> {
    pub(crate) fn new(db: &'a Database, name: String) -> Self {
        Graph {
            db,
            name,
            definition: GraphDefinition::default(),
        }
    }

    /// Prefixed graph name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &GraphDefinition {
        &self.definition
    }

    /// Declare that edges of type `E` connect `F` vertices to `T` vertices.
    /// Declaring `E` again widens its allowed vertex collections.
    pub fn edge<E: Record, F: Record, T: Record>(mut self) -> Result<Self> {
        if E::KIND != CollectionKind::Edge {
            return Err(ArangodanticError::Config(format!(
                "'{}' is not an edge model and can't define graph '{}'",
                E::TYPE_NAME,
                self.name
            )));
        }
        let from = vertex_collection::<F>(self.db)?;
        let to = vertex_collection::<T>(self.db)?;
        let collection = self.db.collection_name::<E>()?;

        let index = match self
            .definition
            .edge_definitions
            .iter()
            .position(|definition| definition.collection == collection)
        {
            Some(index) => index,
            None => {
                self.definition.edge_definitions.push(EdgeDefinition {
                    collection,
                    ..EdgeDefinition::default()
                });
                self.definition.edge_definitions.len() - 1
            }
        };
        let definition = &mut self.definition.edge_definitions[index];
        push_unique(&mut definition.from, from);
        push_unique(&mut definition.to, to);
        Ok(self)
    }

    /// Add `V` as a vertex collection not used by any edge definition.
    pub fn orphan<V: Record>(mut self) -> Result<Self> {
        let collection = vertex_collection::<V>(self.db)?;
        push_unique(&mut self.definition.orphan_collections, collection);
        Ok(self)
    }

    fn driver(&self) -> &'a dyn StorageDriver {
        self.db.driver().as_ref()
    }

    fn context(&self) -> FaultContext<'_> {
        FaultContext::new(TYPE_NAME, &self.name)
    }

    /// Create the graph, and any of its missing collections, unless it exists.
    pub async fn ensure(&self) -> Result<()> {
        let exists = self
            .driver()
            .has_graph(&self.name)
            .await
            .map_err(|e| translate(e, self.context()))?;
        if exists {
            return Ok(());
        }
        match self.driver().create_graph(&self.name, &self.definition).await {
            Ok(()) => {
                tracing::debug!(
                    graph = %self.name,
                    edge_definitions = self.definition.edge_definitions.len(),
                    "created graph"
                );
                Ok(())
            }
            Err(DriverError::Fault(fault)) if fault.code == errno::GRAPH_DUPLICATE => Ok(()),
            Err(e) => Err(translate(e, self.context())),
        }
    }

    /// Drop the graph, and with `drop_collections` the collections no other
    /// graph uses. Returns whether the graph existed; a missing graph fails
    /// with `GraphNotFound` unless `ignore_missing` is set.
    pub async fn delete_graph(&self, ignore_missing: bool, drop_collections: bool) -> Result<bool> {
        match self.driver().drop_graph(&self.name, drop_collections).await {
            Ok(()) => {
                tracing::debug!(graph = %self.name, drop_collections, "dropped graph");
                Ok(true)
            }
            Err(DriverError::Fault(fault)) if fault.code == errno::GRAPH_NOT_FOUND => {
                if ignore_missing {
                    Ok(false)
                } else {
                    Err(ArangodanticError::GraphNotFound(format!(
                        "No graph found with name '{}'",
                        self.name
                    )))
                }
            }
            Err(e) => Err(translate(e, self.context())),
        }
    }

    /// Save a vertex or an edge through the graph. Edges whose `_from` or
    /// `_to` vertex does not exist fail with `ModelNotFound` and write nothing.
    pub async fn save<R: Record>(&self, record: &mut R) -> Result<()> {
        self.db.collection::<R>().save_in(record, Some(self.name.as_str())).await
    }

    /// Delete a vertex or an edge, depending on the record's kind.
    pub async fn delete<R: Record>(&self, record: &mut R, ignore_missing: bool) -> Result<bool> {
        self.db
            .collection::<R>()
            .delete_in(record, ignore_missing, Some(self.name.as_str()))
            .await
    }

    /// Delete a vertex along with every edge of the graph touching it.
    pub async fn delete_vertex<R: Record>(&self, record: &mut R, ignore_missing: bool) -> Result<bool> {
        expect_kind::<R>(CollectionKind::Document)?;
        self.delete(record, ignore_missing).await
    }

    pub async fn delete_edge<R: Record>(&self, record: &mut R, ignore_missing: bool) -> Result<bool> {
        expect_kind::<R>(CollectionKind::Edge)?;
        self.delete(record, ignore_missing).await
    }
}

fn vertex_collection<V: Record>(db: &Database) -> Result<String> {
    expect_kind::<V>(CollectionKind::Document)?;
    db.collection_name::<V>()
}

fn expect_kind<R: Record>(kind: CollectionKind) -> Result<()> {
    if R::KIND == kind {
        return Ok(());
    }
    Err(ArangodanticError::Config(format!(
        "'{}' is a {} model, expected a {} model",
        R::TYPE_NAME,
        R::KIND,
        kind
    )))
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::InMemoryDriver;
    use crate::record::{Endpoints, Meta};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, crate::Document)]
    struct Person {
        #[serde(skip)]
        meta: Meta,
    }

    #[derive(Debug, Serialize, Deserialize, crate::Document)]
    struct Place {
        #[serde(skip)]
        meta: Meta,
    }

    #[derive(Debug, Serialize, Deserialize, crate::Edge)]
    struct Visit {
        #[serde(skip)]
        meta: Meta,
        #[serde(skip)]
        endpoints: Endpoints,
    }

    fn db() -> Database {
        Database::builder(InMemoryDriver::new())
            .prefix("t-")
            .build()
            .unwrap()
    }

    #[test]
    fn repeated_edge_widens_definition() {
        let db = db();
        let graph = db
            .graph("travel")
            .edge::<Visit, Person, Place>()
            .unwrap()
            .edge::<Visit, Person, Person>()
            .unwrap()
            .orphan::<Place>()
            .unwrap();

        assert_eq!(graph.name(), "t-travel");
        let definition = graph.definition();
        assert_eq!(definition.edge_definitions.len(), 1);
        let visits = definition.edge_definition("t-visits").unwrap();
        assert_eq!(visits.from, vec!["t-people"]);
        assert_eq!(visits.to, vec!["t-places", "t-people"]);
        assert_eq!(definition.vertex_collections(), vec!["t-people", "t-places"]);
    }

    #[test]
    fn kinds_are_checked() {
        let db = db();
        let err = db.graph("g").edge::<Person, Person, Place>().unwrap_err();
        assert!(matches!(err, ArangodanticError::Config(ref m) if m.contains("Person")));

        let err = db.graph("g").edge::<Visit, Visit, Place>().unwrap_err();
        assert!(matches!(err, ArangodanticError::Config(ref m) if m.contains("edge model")));

        assert!(db.graph("g").orphan::<Visit>().is_err());
    }
}
