//! Document and edge models.
//!
//! [`Collection`] is the typed accessor for one record type's collection;
//! [`ModelExt`] exposes the same operations on record instances.
//! [`Graph`] routes saves and deletes through a named graph so storage checks
//! edge endpoints and removes the edges of a deleted vertex.
//!
//! ## Example
//!
//! ```ignore
//! use arangodantic::{Database, Document, InMemoryDriver, Meta, ModelExt};
//!
//! #[derive(Serialize, Deserialize, Document)]
//! struct Identity {
//!     #[serde(skip)]
//!     meta: Meta,
//!     name: String,
//! }
//!
//! let db = Database::builder(InMemoryDriver::new()).prefix("test-").build()?;
//! db.collection::<Identity>().ensure_collection().await?;
//!
//! let mut identity = Identity { meta: Meta::new(), name: "John Doe".into() };
//! identity.save(&db).await?;
//! let loaded = Identity::load(&db, identity.key().unwrap()).await?;
//! ```

mod collection;
mod edge;
mod ext;
mod graph;

pub use collection::Collection;
pub use ext::ModelExt;
pub use graph::Graph;
