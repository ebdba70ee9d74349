//! Collection name resolution.
//!
//! Names are `prefix + namer(TYPE_NAME)` (or `prefix + COLLECTION_NAME` when a
//! type overrides it). Every type that resolves is registered; a second type
//! claiming an already registered name is a configuration error.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{ArangodanticError, Result};
use crate::inflect;
use crate::record::{CollectionKind, Record};

/// Maps a type name to an unprefixed collection name.
pub type CollectionNamer = fn(&str) -> String;

/// Default namer: `ExtendedIdentity` -> `extended_identities`.
pub fn pluralize_underscore(type_name: &str) -> String {
    inflect::pluralize(&inflect::underscore(type_name))
}

/// Namer without pluralization: `ExtendedIdentity` -> `extended_identity`.
pub fn underscore(type_name: &str) -> String {
    inflect::underscore(type_name)
}

#[derive(Debug, Clone)]
struct Registration {
    type_id: TypeId,
    type_name: &'static str,
    kind: CollectionKind,
}

#[derive(Default)]
struct Registry {
    by_type: HashMap<TypeId, String>,
    by_name: HashMap<String, Registration>,
}

pub struct CollectionResolver {
    prefix: String,
    namer: CollectionNamer,
    registry: RwLock<Registry>,
}

impl CollectionResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_namer(prefix, pluralize_underscore)
    }

    pub fn with_namer(prefix: impl Into<String>, namer: CollectionNamer) -> Self {
        CollectionResolver {
            prefix: prefix.into(),
            namer,
            registry: RwLock::new(Registry::default()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Resolve (and on first use register) the collection of `R`.
    pub fn resolve<R: Record>(&self) -> Result<String> {
        let type_id = TypeId::of::<R>();
        {
            let registry = self
                .registry
                .read()
                .map_err(|_| ArangodanticError::Config("collection registry poisoned".into()))?;
            if let Some(name) = registry.by_type.get(&type_id) {
                return Ok(name.clone());
            }
        }

        let base = match R::COLLECTION_NAME {
            Some(name) => name.to_string(),
            None => (self.namer)(R::TYPE_NAME),
        };
        if base.is_empty() {
            return Err(ArangodanticError::Config(format!(
                "type '{}' resolves to an empty collection name",
                R::TYPE_NAME
            )));
        }
        let name = format!("{}{}", self.prefix, base);

        let mut registry = self
            .registry
            .write()
            .map_err(|_| ArangodanticError::Config("collection registry poisoned".into()))?;

        if let Some(existing) = registry.by_name.get(&name) {
            if existing.type_id != type_id {
                let reason = if existing.kind == R::KIND {
                    format!("{} collection", existing.kind)
                } else {
                    format!(
                        "{} collection, but '{}' declares kind {}",
                        existing.kind,
                        R::TYPE_NAME,
                        R::KIND
                    )
                };
                return Err(ArangodanticError::Config(format!(
                    "'{}' and '{}' both resolve to collection '{}' (already registered as {})",
                    existing.type_name,
                    R::TYPE_NAME,
                    name,
                    reason
                )));
            }
        }

        registry.by_name.insert(
            name.clone(),
            Registration {
                type_id,
                type_name: R::TYPE_NAME,
                kind: R::KIND,
            },
        );
        registry.by_type.insert(type_id, name.clone());
        tracing::debug!(type_name = R::TYPE_NAME, collection = %name, kind = %R::KIND, "registered collection");
        Ok(name)
    }

    /// Kind of the type registered under `name`, if any.
    pub fn kind_of(&self, name: &str) -> Option<CollectionKind> {
        self.registry
            .read()
            .ok()
            .and_then(|registry| registry.by_name.get(name).map(|r| r.kind))
    }
}

impl std::fmt::Debug for CollectionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionResolver")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Endpoints, Meta};
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Company {
        #[serde(skip)]
        meta: Meta,
    }

    impl Record for Company {
        const TYPE_NAME: &'static str = "Company";
        fn meta(&self) -> &Meta {
            &self.meta
        }
        fn meta_mut(&mut self) -> &mut Meta {
            &mut self.meta
        }
    }

    #[derive(Serialize, Deserialize)]
    struct Firm {
        #[serde(skip)]
        meta: Meta,
    }

    impl Record for Firm {
        const TYPE_NAME: &'static str = "Firm";
        const COLLECTION_NAME: Option<&'static str> = Some("companies");
        fn meta(&self) -> &Meta {
            &self.meta
        }
        fn meta_mut(&mut self) -> &mut Meta {
            &mut self.meta
        }
    }

    #[derive(Serialize, Deserialize)]
    struct CompanyLink {
        #[serde(skip)]
        meta: Meta,
        #[serde(skip)]
        endpoints: Endpoints,
    }

    impl Record for CompanyLink {
        const TYPE_NAME: &'static str = "CompanyLink";
        const COLLECTION_NAME: Option<&'static str> = Some("companies");
        const KIND: CollectionKind = CollectionKind::Edge;
        fn meta(&self) -> &Meta {
            &self.meta
        }
        fn meta_mut(&mut self) -> &mut Meta {
            &mut self.meta
        }
        fn endpoints(&self) -> Option<&Endpoints> {
            Some(&self.endpoints)
        }
        fn endpoints_mut(&mut self) -> Option<&mut Endpoints> {
            Some(&mut self.endpoints)
        }
    }

    #[test]
    fn resolves_prefixed_plural_name() {
        let resolver = CollectionResolver::new("test-");
        assert_eq!(resolver.resolve::<Company>().unwrap(), "test-companies");
        // cached
        assert_eq!(resolver.resolve::<Company>().unwrap(), "test-companies");
        assert_eq!(resolver.kind_of("test-companies"), Some(CollectionKind::Document));
    }

    #[test]
    fn collision_is_a_config_error() {
        let resolver = CollectionResolver::new("");
        resolver.resolve::<Company>().unwrap();
        let err = resolver.resolve::<Firm>().unwrap_err();
        assert!(matches!(err, ArangodanticError::Config(_)));
    }

    #[test]
    fn collision_across_kinds_names_both_kinds() {
        let resolver = CollectionResolver::new("");
        resolver.resolve::<Company>().unwrap();
        let err = resolver.resolve::<CompanyLink>().unwrap_err();
        assert!(err.to_string().contains("declares kind edge"));
    }

    #[test]
    fn custom_namer() {
        let resolver = CollectionResolver::with_namer("x_", underscore);
        assert_eq!(resolver.resolve::<Company>().unwrap(), "x_company");
    }
}
