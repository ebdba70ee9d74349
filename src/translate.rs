//! Storage fault translation.
//!
//! Every driver call made by the model layer passes its error through
//! [`translate`] exactly once. Faults with a known error number become domain
//! errors; anything else is kept as [`ArangodanticError::Storage`], and
//! transport failures pass through untouched.

use crate::driver::{errno, DriverError, StorageFault};
use crate::error::ArangodanticError;

/// What the failing call was working on, used to phrase translated errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultContext<'a> {
    pub type_name: &'a str,
    pub collection: &'a str,
    pub key: Option<&'a str>,
    /// `_from` and `_to` of an edge being inserted. A missing document then
    /// means a missing vertex, not the edge itself.
    pub endpoints: Option<(&'a str, &'a str)>,
}

impl<'a> FaultContext<'a> {
    pub fn new(type_name: &'a str, collection: &'a str) -> Self {
        FaultContext {
            type_name,
            collection,
            key: None,
            endpoints: None,
        }
    }

    pub fn with_key(mut self, key: &'a str) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_endpoints(mut self, from: &'a str, to: &'a str) -> Self {
        self.endpoints = Some((from, to));
        self
    }

    fn id(&self) -> String {
        match self.key {
            Some(key) => format!("{}/{}", self.collection, key),
            None => self.collection.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    DataSourceNotFound,
    GraphNotFound,
    ModelNotFound,
    UniqueConstraint,
    RevisionMismatch,
    CursorNotFound,
}

const TABLE: &[(i64, Kind)] = &[
    (errno::DATA_SOURCE_NOT_FOUND, Kind::DataSourceNotFound),
    (errno::GRAPH_NOT_FOUND, Kind::GraphNotFound),
    (errno::DOCUMENT_NOT_FOUND, Kind::ModelNotFound),
    (errno::UNIQUE_CONSTRAINT_VIOLATED, Kind::UniqueConstraint),
    (errno::CONFLICT, Kind::RevisionMismatch),
    (errno::CURSOR_NOT_FOUND, Kind::CursorNotFound),
];

pub fn translate(err: DriverError, ctx: FaultContext<'_>) -> ArangodanticError {
    match err {
        DriverError::Fault(fault) => translate_fault(fault, ctx),
        other => ArangodanticError::Transport(other),
    }
}

pub fn translate_fault(fault: StorageFault, ctx: FaultContext<'_>) -> ArangodanticError {
    let kind = TABLE
        .iter()
        .find(|(code, _)| *code == fault.code)
        .map(|(_, kind)| *kind);

    match kind {
        Some(Kind::DataSourceNotFound) => ArangodanticError::DataSourceNotFound(fault.message),
        Some(Kind::GraphNotFound) => ArangodanticError::GraphNotFound(fault.message),
        Some(Kind::ModelNotFound) => ArangodanticError::ModelNotFound(match (ctx.endpoints, ctx.key) {
            (Some((from, to)), _) => format!(
                "'{}' references a missing vertex (_from '{}', _to '{}'): {}",
                ctx.type_name, from, to, fault.message
            ),
            (None, Some(key)) => not_found_message(ctx.type_name, key),
            (None, None) => fault.message,
        }),
        Some(Kind::UniqueConstraint) => ArangodanticError::UniqueConstraint {
            fields: constrained_fields(&fault.message),
            message: fault.message,
        },
        Some(Kind::RevisionMismatch) => ArangodanticError::RevisionMismatch {
            id: ctx.id(),
            message: fault.message,
        },
        Some(Kind::CursorNotFound) => ArangodanticError::CursorNotFound(fault.message),
        None => ArangodanticError::Storage(fault),
    }
}

pub(crate) fn not_found_message(type_name: &str, key: &str) -> String {
    format!("No '{}' found with _key '{}'", type_name, key)
}

/// Fields named by a unique-constraint message: `... over 'a, b'; ...`.
fn constrained_fields(message: &str) -> Vec<String> {
    message
        .split_once("over '")
        .and_then(|(_, rest)| rest.split_once('\''))
        .map(|(fields, _)| {
            fields
                .split(", ")
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
