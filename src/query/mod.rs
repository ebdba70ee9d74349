//! Filter, sort and paging primitives accepted by `find`.
//!
//! A [`Filter`] is an ordered conjunction of conditions on dotted field paths.
//! Values are either literal JSON values or [`Reference`]s to other records,
//! which are compared by storage id once the collection resolver is known.
//!
//! ```ignore
//! let filter = Filter::new()
//!     .eq("owner.name", "John")
//!     .op("founded", Operator::Compare(Comparison::Gte), 2000);
//! let options = FindOptions::new().sort("name", Direction::Asc).limit(10);
//! ```

pub mod aql;

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{ArangodanticError, Result};
use crate::record::Reference;
use crate::resolver::CollectionResolver;

/// Scalar comparison used on its own or as the element test of an array operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
        }
    }

    /// Identifier-safe name, used in bind variable names.
    pub fn name(self) -> &'static str {
        match self {
            Comparison::Eq => "eq",
            Comparison::Ne => "ne",
            Comparison::Lt => "lt",
            Comparison::Lte => "lte",
            Comparison::Gt => "gt",
            Comparison::Gte => "gte",
        }
    }

    fn parse(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "==" => Comparison::Eq,
            "!=" => Comparison::Ne,
            "<" => Comparison::Lt,
            "<=" => Comparison::Lte,
            ">" => Comparison::Gt,
            ">=" => Comparison::Gte,
            _ => return None,
        })
    }
}

/// AQL comparison and array comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Compare(Comparison),
    In,
    NotIn,
    Like,
    NotLike,
    RegMatch,
    NotRegMatch,
    AllIn,
    NoneIn,
    AnyIn,
    /// `ANY <cmp>`: at least one array element satisfies the comparison.
    Any(Comparison),
    /// `ALL <cmp>`: every array element satisfies the comparison.
    All(Comparison),
    /// `NONE <cmp>`: no array element satisfies the comparison.
    NoneOf(Comparison),
}

impl Operator {
    pub const EQ: Operator = Operator::Compare(Comparison::Eq);
    pub const NE: Operator = Operator::Compare(Comparison::Ne);
    pub const LT: Operator = Operator::Compare(Comparison::Lt);
    pub const LTE: Operator = Operator::Compare(Comparison::Lte);
    pub const GT: Operator = Operator::Compare(Comparison::Gt);
    pub const GTE: Operator = Operator::Compare(Comparison::Gte);

    /// Identifier-safe name, used in bind variable names.
    pub fn name(self) -> String {
        match self {
            Operator::Compare(cmp) => cmp.name().to_string(),
            Operator::In => "in".into(),
            Operator::NotIn => "not_in".into(),
            Operator::Like => "like".into(),
            Operator::NotLike => "not_like".into(),
            Operator::RegMatch => "reg_match".into(),
            Operator::NotRegMatch => "not_reg_match".into(),
            Operator::AllIn => "all_in".into(),
            Operator::NoneIn => "none_in".into(),
            Operator::AnyIn => "any_in".into(),
            Operator::Any(cmp) => format!("any_{}", cmp.name()),
            Operator::All(cmp) => format!("all_{}", cmp.name()),
            Operator::NoneOf(cmp) => format!("none_{}", cmp.name()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Compare(cmp) => f.write_str(cmp.symbol()),
            Operator::In => f.write_str("IN"),
            Operator::NotIn => f.write_str("NOT IN"),
            Operator::Like => f.write_str("LIKE"),
            Operator::NotLike => f.write_str("NOT LIKE"),
            Operator::RegMatch => f.write_str("=~"),
            Operator::NotRegMatch => f.write_str("!~"),
            Operator::AllIn => f.write_str("ALL IN"),
            Operator::NoneIn => f.write_str("NONE IN"),
            Operator::AnyIn => f.write_str("ANY IN"),
            Operator::Any(cmp) => write!(f, "ANY {}", cmp.symbol()),
            Operator::All(cmp) => write!(f, "ALL {}", cmp.symbol()),
            Operator::NoneOf(cmp) => write!(f, "NONE {}", cmp.symbol()),
        }
    }
}

impl FromStr for Operator {
    type Err = ArangodanticError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();

        if let Some(cmp) = Comparison::parse(&normalized) {
            return Ok(Operator::Compare(cmp));
        }

        let op = match normalized.as_str() {
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            "LIKE" => Operator::Like,
            "NOT LIKE" => Operator::NotLike,
            "=~" => Operator::RegMatch,
            "!~" => Operator::NotRegMatch,
            "ALL IN" => Operator::AllIn,
            "NONE IN" => Operator::NoneIn,
            "ANY IN" => Operator::AnyIn,
            other => {
                let quantified = other.split_once(' ').and_then(|(quantifier, symbol)| {
                    let cmp = Comparison::parse(symbol)?;
                    match quantifier {
                        "ANY" => Some(Operator::Any(cmp)),
                        "ALL" => Some(Operator::All(cmp)),
                        "NONE" => Some(Operator::NoneOf(cmp)),
                        _ => None,
                    }
                });
                return quantified.ok_or_else(|| {
                    ArangodanticError::InvalidQuery(format!("support for '{}' not implemented", s))
                });
            }
        };
        Ok(op)
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone)]
pub enum FilterValue {
    Value(Value),
    /// Compared by the referenced record's storage id.
    Reference(Reference),
}

#[derive(Debug, Clone)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: FilterValue,
}

/// Ordered conjunction of conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Literal equality, the shorthand form of `{field: value}`.
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op(field, Operator::EQ, value)
    }

    pub fn op(mut self, field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            operator,
            value: FilterValue::Value(value.into()),
        });
        self
    }

    /// Condition using an AQL operator symbol such as `">="` or `"ANY =="`.
    pub fn cmp(self, field: impl Into<String>, symbol: &str, value: impl Into<Value>) -> Result<Self> {
        let operator = symbol.parse()?;
        Ok(self.op(field, operator, value))
    }

    /// Equality against another record's storage id (e.g. `_from == alice`).
    pub fn reference(self, field: impl Into<String>, reference: impl Into<Reference>) -> Self {
        self.op_reference(field, Operator::EQ, reference)
    }

    pub fn op_reference(
        mut self,
        field: impl Into<String>,
        operator: Operator,
        reference: impl Into<Reference>,
    ) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            operator,
            value: FilterValue::Reference(reference.into()),
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Resolve references to storage ids. Unresolved references compare as `null`.
    pub(crate) fn resolve(&self, resolver: &CollectionResolver) -> Result<Vec<ResolvedCondition>> {
        self.conditions
            .iter()
            .map(|condition| {
                let value = match &condition.value {
                    FilterValue::Value(value) => value.clone(),
                    FilterValue::Reference(reference) => reference
                        .resolve(resolver)?
                        .map(Value::String)
                        .unwrap_or(Value::Null),
                };
                Ok(ResolvedCondition {
                    path: split_path(&condition.field),
                    field: condition.field.clone(),
                    operator: condition.operator,
                    value,
                })
            })
            .collect()
    }
}

/// Split a dotted field path, ignoring leading and trailing dots.
pub fn split_path(field: &str) -> Vec<String> {
    field.trim_matches('.').split('.').map(String::from).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

pub const ASCENDING: Direction = Direction::Asc;
pub const DESCENDING: Direction = Direction::Desc;

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => f.write_str("ASC"),
            Direction::Desc => f.write_str("DESC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

/// Sort, paging and count options for `find`.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Vec<SortKey>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Report the number of documents in the result.
    pub count: bool,
    /// Report the number of matches ignoring limit and offset.
    pub full_count: bool,
    pub batch_size: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn sort_by(mut self, keys: impl IntoIterator<Item = (String, Direction)>) -> Self {
        self.sort
            .extend(keys.into_iter().map(|(field, direction)| SortKey { field, direction }));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn with_full_count(mut self) -> Self {
        self.full_count = true;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.offset.is_some_and(|offset| offset > 0) && self.limit.is_none() {
            return Err(ArangodanticError::InvalidQuery(
                "offset is only supported together with limit".into(),
            ));
        }
        if self.batch_size == Some(0) {
            return Err(ArangodanticError::InvalidQuery(
                "batch size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCondition {
    pub field: String,
    pub path: Vec<String>,
    pub operator: Operator,
    pub value: Value,
}

/// A fully resolved query, as handed to the storage driver.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub collection: String,
    pub conditions: Vec<ResolvedCondition>,
    pub sort: Vec<SortKey>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub count: bool,
    pub full_count: bool,
    pub batch_size: usize,
}

impl QueryRequest {
    /// Every document of `collection`, unfiltered and unsorted.
    pub fn scan(collection: impl Into<String>, batch_size: usize) -> Self {
        QueryRequest {
            collection: collection.into(),
            conditions: Vec::new(),
            sort: Vec::new(),
            limit: None,
            offset: None,
            count: false,
            full_count: false,
            batch_size,
        }
    }
}

pub const DEFAULT_BATCH_SIZE: usize = 1000;
