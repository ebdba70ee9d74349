//! The record capability shared by document and edge models.

use std::fmt;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{ArangodanticError, Result};
use crate::resolver::CollectionResolver;

/// Whether a record type is stored in a document or an edge collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Document,
    Edge,
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionKind::Document => f.write_str("document"),
            CollectionKind::Edge => f.write_str("edge"),
        }
    }
}

/// Identity attributes kept apart from a record's user fields.
///
/// `key` is the identity key; `rev` is the revision token storage assigned on
/// the last successful write. A record without `rev` is transient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    key: Option<String>,
    rev: Option<String>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transient meta with a caller-chosen identity key.
    pub fn with_key(key: impl Into<String>) -> Self {
        Meta {
            key: Some(key.into()),
            rev: None,
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn rev(&self) -> Option<&str> {
        self.rev.as_deref()
    }

    pub fn is_persisted(&self) -> bool {
        self.rev.is_some()
    }

    /// Set the identity key. Ignored once the record is persisted.
    pub fn set_key(&mut self, key: impl Into<String>) {
        if !self.is_persisted() {
            self.key = Some(key.into());
        }
    }

    /// Drop the identity key of a transient record so a new one is generated.
    pub fn clear_key(&mut self) {
        if !self.is_persisted() {
            self.key = None;
        }
    }

    pub(crate) fn assign(&mut self, key: String, rev: String) {
        self.key = Some(key);
        self.rev = Some(rev);
    }

    /// Forget the revision token, returning the record to transient state.
    pub(crate) fn forget_rev(&mut self) {
        self.rev = None;
    }

    pub(crate) fn from_parts(key: String, rev: Option<String>) -> Self {
        Meta {
            key: Some(key),
            rev,
        }
    }
}

/// Compose the storage id of a document.
pub fn storage_id(collection: &str, key: &str) -> String {
    format!("{}/{}", collection, key)
}

type CollectionFn = fn(&CollectionResolver) -> Result<String>;

/// One end of an edge: either a raw storage id or a record captured by type and key.
///
/// A record reference snapshots the record's identity key at construction; a
/// record that had not been saved yet stays unresolved.
#[derive(Clone)]
pub enum Reference {
    Id(String),
    Record {
        collection: CollectionFn,
        key: Option<String>,
    },
}

impl Reference {
    pub fn to<R: Record>(record: &R) -> Self {
        Reference::Record {
            collection: CollectionResolver::resolve::<R>,
            key: record.meta().key().map(String::from),
        }
    }

    /// The storage id, or `None` when the reference cannot be resolved.
    pub fn resolve(&self, resolver: &CollectionResolver) -> Result<Option<String>> {
        match self {
            Reference::Id(id) if id.is_empty() => Ok(None),
            Reference::Id(id) => Ok(Some(id.clone())),
            Reference::Record { key: None, .. } => Ok(None),
            Reference::Record {
                collection,
                key: Some(key),
            } => Ok(Some(storage_id(&collection(resolver)?, key))),
        }
    }

    /// The identity-key portion of the reference.
    pub fn key(&self) -> Option<&str> {
        match self {
            Reference::Id(id) => id
                .rsplit_once('/')
                .map(|(_, key)| key)
                .filter(|key| !key.is_empty()),
            Reference::Record { key, .. } => key.as_deref(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        match self {
            Reference::Id(id) => !id.is_empty(),
            Reference::Record { key, .. } => key.is_some(),
        }
    }
}

impl Default for Reference {
    fn default() -> Self {
        Reference::Id(String::new())
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Id(id) => f.debug_tuple("Id").field(id).finish(),
            Reference::Record { key, .. } => f.debug_struct("Record").field("key", key).finish(),
        }
    }
}

impl From<&str> for Reference {
    fn from(id: &str) -> Self {
        Reference::Id(id.to_string())
    }
}

impl From<String> for Reference {
    fn from(id: String) -> Self {
        Reference::Id(id)
    }
}

impl<R: Record> From<&R> for Reference {
    fn from(record: &R) -> Self {
        Reference::to(record)
    }
}

/// The two directed endpoints of an edge.
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    pub from: Reference,
    pub to: Reference,
}

impl Endpoints {
    pub fn new(from: impl Into<Reference>, to: impl Into<Reference>) -> Self {
        Endpoints {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn from_key(&self) -> Option<&str> {
        self.from.key()
    }

    pub fn to_key(&self) -> Option<&str> {
        self.to.key()
    }
}

/// A typed record mapped to one storage document.
///
/// Usually derived with `#[derive(Document)]` or `#[derive(Edge)]`; the meta
/// (and endpoints) fields must be `#[serde(skip)]` so user fields never
/// collide with the reserved storage attributes.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Type name the default collection name is derived from.
    const TYPE_NAME: &'static str;

    /// Explicit collection name (still prefixed) overriding the derived one.
    const COLLECTION_NAME: Option<&'static str> = None;

    const KIND: CollectionKind = CollectionKind::Document;

    fn meta(&self) -> &Meta;

    fn meta_mut(&mut self) -> &mut Meta;

    fn endpoints(&self) -> Option<&Endpoints> {
        None
    }

    fn endpoints_mut(&mut self) -> Option<&mut Endpoints> {
        None
    }

    /// Runs before every save, before encoding. An error aborts the save.
    fn before_save(&mut self, is_new: bool) -> Result<(), ArangodanticError> {
        let _ = is_new;
        Ok(())
    }

    fn key(&self) -> Option<&str> {
        self.meta().key()
    }

    fn rev(&self) -> Option<&str> {
        self.meta().rev()
    }

    /// Identity key of the `_from` endpoint (edges only).
    fn from_key(&self) -> Option<&str> {
        self.endpoints().and_then(Endpoints::from_key)
    }

    /// Identity key of the `_to` endpoint (edges only).
    fn to_key(&self) -> Option<&str> {
        self.endpoints().and_then(Endpoints::to_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_key_is_immutable() {
        let mut meta = Meta::with_key("a");
        meta.assign("a".into(), "_rev1".into());
        meta.set_key("b");
        meta.clear_key();
        assert_eq!(meta.key(), Some("a"));
        assert!(meta.is_persisted());
    }

    #[test]
    fn id_reference_key_strips_collection() {
        let reference = Reference::from("identities/abc");
        assert_eq!(reference.key(), Some("abc"));
        assert!(reference.is_resolved());

        assert_eq!(Reference::from("identities/").key(), None);
        assert!(!Reference::default().is_resolved());
    }

    #[test]
    fn empty_id_resolves_to_none() {
        let resolver = CollectionResolver::new("");
        assert_eq!(Reference::default().resolve(&resolver).unwrap(), None);
        assert_eq!(
            Reference::from("people/1").resolve(&resolver).unwrap(),
            Some("people/1".to_string())
        );
    }
}
