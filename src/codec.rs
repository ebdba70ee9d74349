//! Storage document codec.
//!
//! User fields are whatever serde produces for the record; identity attributes
//! live in [`Meta`] (and [`Endpoints`] for edges) and are written to the
//! reserved `_key`, `_id`, `_rev`, `_from` and `_to` attributes.

use serde_json::Value;

use crate::driver::Document;
use crate::error::{ArangodanticError, Result};
use crate::record::{storage_id, CollectionKind, Endpoints, Meta, Record, Reference};

pub const KEY: &str = "_key";
pub const ID: &str = "_id";
pub const REV: &str = "_rev";
pub const FROM: &str = "_from";
pub const TO: &str = "_to";

const RESERVED: [&str; 5] = [KEY, ID, REV, FROM, TO];

/// Resolved storage ids of an edge's endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeIds {
    pub from: String,
    pub to: String,
}

/// Encode `record` as a storage document for `collection`.
///
/// Fails with a validation error before anything is sent to storage when the
/// record's fields do not serialize to an object or use a reserved name.
pub fn encode<R: Record>(record: &R, collection: &str, edge: Option<&EdgeIds>) -> Result<Document> {
    let value = serde_path_to_error::serialize(record, serde_json::value::Serializer)
        .map_err(|err| ArangodanticError::validation(err.path().to_string(), err.inner().to_string()))?;

    let mut document = match value {
        Value::Object(map) => map,
        other => {
            return Err(ArangodanticError::validation(
                ".",
                format!("{} must serialize to an object, got {}", R::TYPE_NAME, kind_of(&other)),
            ))
        }
    };

    if let Some(field) = document.keys().find(|k| RESERVED.contains(&k.as_str())) {
        return Err(ArangodanticError::validation(
            field.clone(),
            "field name is reserved for storage identity attributes",
        ));
    }

    let meta = record.meta();
    if let Some(key) = meta.key() {
        document.insert(KEY.into(), Value::String(key.to_string()));
        document.insert(ID.into(), Value::String(storage_id(collection, key)));
    }
    if let Some(rev) = meta.rev() {
        document.insert(REV.into(), Value::String(rev.to_string()));
    }
    if let Some(edge) = edge {
        document.insert(FROM.into(), Value::String(edge.from.clone()));
        document.insert(TO.into(), Value::String(edge.to.clone()));
    }
    Ok(document)
}

/// Decode a storage document into a fresh `R`, restoring its meta (and endpoints).
pub fn decode<R: Record>(mut document: Document) -> Result<R> {
    let key = take_string(&mut document, KEY)
        .ok_or_else(|| ArangodanticError::validation(KEY, "missing identity key"))?;
    let rev = take_string(&mut document, REV);
    document.remove(ID);

    let endpoints = match R::KIND {
        CollectionKind::Edge => {
            let from = take_string(&mut document, FROM)
                .ok_or_else(|| ArangodanticError::validation(FROM, "missing edge endpoint"))?;
            let to = take_string(&mut document, TO)
                .ok_or_else(|| ArangodanticError::validation(TO, "missing edge endpoint"))?;
            Some(Endpoints {
                from: Reference::Id(from),
                to: Reference::Id(to),
            })
        }
        CollectionKind::Document => None,
    };

    let mut record: R = serde_path_to_error::deserialize(Value::Object(document))
        .map_err(|err| ArangodanticError::validation(err.path().to_string(), err.inner().to_string()))?;

    *record.meta_mut() = Meta::from_parts(key, rev);
    if let (Some(decoded), Some(slot)) = (endpoints, record.endpoints_mut()) {
        *slot = decoded;
    }
    Ok(record)
}

fn take_string(document: &mut Document, name: &str) -> Option<String> {
    match document.remove(name) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
