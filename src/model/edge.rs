//! Endpoint handling for edge records.

use crate::codec::EdgeIds;
use crate::error::{ArangodanticError, Result};
use crate::record::{CollectionKind, Record, Reference};
use crate::resolver::CollectionResolver;

/// Resolve an edge's endpoints to storage ids before anything is written.
///
/// Documents have no endpoints and yield `None`. An edge whose `_from` or
/// `_to` does not resolve fails with `ModelNotFound`.
pub(crate) fn resolve_endpoints<R: Record>(
    resolver: &CollectionResolver,
    record: &R,
) -> Result<Option<EdgeIds>> {
    if R::KIND != CollectionKind::Edge {
        return Ok(None);
    }
    let endpoints = record.endpoints().ok_or_else(|| {
        ArangodanticError::Config(format!("edge type '{}' exposes no endpoints", R::TYPE_NAME))
    })?;
    Ok(Some(EdgeIds {
        from: resolve_one::<R>(resolver, &endpoints.from, "_from")?,
        to: resolve_one::<R>(resolver, &endpoints.to, "_to")?,
    }))
}

fn resolve_one<R: Record>(
    resolver: &CollectionResolver,
    reference: &Reference,
    attribute: &str,
) -> Result<String> {
    reference.resolve(resolver)?.ok_or_else(|| {
        ArangodanticError::ModelNotFound(format!(
            "'{}' has an unresolved {} reference ({:?})",
            R::TYPE_NAME,
            attribute,
            reference
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Endpoints, Meta};
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Person {
        #[serde(skip)]
        meta: Meta,
    }

    impl Record for Person {
        const TYPE_NAME: &'static str = "Person";
        fn meta(&self) -> &Meta {
            &self.meta
        }
        fn meta_mut(&mut self) -> &mut Meta {
            &mut self.meta
        }
    }

    #[derive(Serialize, Deserialize)]
    struct Knows {
        #[serde(skip)]
        meta: Meta,
        #[serde(skip)]
        endpoints: Endpoints,
    }

    impl Record for Knows {
        const TYPE_NAME: &'static str = "Knows";
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
    fn record_references_resolve_through_the_resolver() {
        let resolver = CollectionResolver::new("t_");
        let alice = Person {
            meta: Meta::with_key("alice"),
        };
        let knows = Knows {
            meta: Meta::new(),
            endpoints: Endpoints::new(&alice, "people/bob"),
        };
        let ids = resolve_endpoints(&resolver, &knows).unwrap().unwrap();
        assert_eq!(ids.from, "t_people/alice");
        assert_eq!(ids.to, "people/bob");
    }

    #[test]
    fn unresolved_reference_is_not_found() {
        let resolver = CollectionResolver::new("");
        let ghost = Person { meta: Meta::new() };
        let knows = Knows {
            meta: Meta::new(),
            endpoints: Endpoints::new("people/alice", &ghost),
        };
        let err = resolve_endpoints(&resolver, &knows).unwrap_err();
        assert!(matches!(err, ArangodanticError::ModelNotFound(ref m) if m.contains("_to")));
    }

    #[test]
    fn documents_have_no_endpoints() {
        let resolver = CollectionResolver::new("");
        let person = Person { meta: Meta::new() };
        assert!(resolve_endpoints(&resolver, &person).unwrap().is_none());
    }
}
