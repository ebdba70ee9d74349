//! AQL value ordering and operator semantics for the in-memory driver.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::Value;

use super::{errno, Document, StorageFault};
use crate::query::{Comparison, Operator, ResolvedCondition, SortKey};

/// null < bool < number < string < array < object
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

pub(crate) fn compare(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ord = compare(left, right);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            let mut keys: Vec<&String> = x.keys().chain(y.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let left = x.get(key).unwrap_or(&NULL);
                let right = y.get(key).unwrap_or(&NULL);
                let ord = compare(left, right);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        }
        _ => Ordering::Equal,
    }
}

static NULL: Value = Value::Null;

/// Value at a dotted path; missing attributes read as `null`.
pub(crate) fn lookup<'a>(document: &'a Document, path: &[String]) -> &'a Value {
    let Some((first, rest)) = path.split_first() else {
        return &NULL;
    };
    let mut current = document.get(first);
    for segment in rest {
        current = current
            .and_then(Value::as_object)
            .and_then(|object| object.get(segment));
    }
    current.unwrap_or(&NULL)
}

fn satisfies(a: &Value, cmp: Comparison, b: &Value) -> bool {
    let ord = compare(a, b);
    match cmp {
        Comparison::Eq => ord == Ordering::Equal,
        Comparison::Ne => ord != Ordering::Equal,
        Comparison::Lt => ord == Ordering::Less,
        Comparison::Lte => ord != Ordering::Greater,
        Comparison::Gt => ord == Ordering::Greater,
        Comparison::Gte => ord != Ordering::Less,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    haystack
        .as_array()
        .is_some_and(|items| items.iter().any(|item| compare(item, needle) == Ordering::Equal))
}

fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compile(pattern: &str) -> Result<Regex, StorageFault> {
    Regex::new(pattern).map_err(|e| {
        StorageFault::new(
            errno::QUERY_INVALID_REGEX,
            400,
            format!("invalid regular expression '{}': {}", pattern, e),
        )
    })
}

/// Translate a LIKE pattern (`%`, `_`, backslash escapes) into an anchored regex.
fn like_to_regex(pattern: &str) -> String {
    let mut out = String::from("(?s)^");
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
                None => out.push_str(&regex::escape("\\")),
            },
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

fn quantified(lhs: &Value, test: impl Fn(&Value) -> bool) -> Option<(usize, usize)> {
    let items = lhs.as_array()?;
    Some((items.iter().filter(|item| test(item)).count(), items.len()))
}

pub(crate) fn matches(lhs: &Value, operator: Operator, rhs: &Value) -> Result<bool, StorageFault> {
    let result = match operator {
        Operator::Compare(cmp) => satisfies(lhs, cmp, rhs),
        Operator::In => contains(rhs, lhs),
        Operator::NotIn => !contains(rhs, lhs),
        Operator::Like => compile(&like_to_regex(&as_text(rhs)))?.is_match(&as_text(lhs)),
        Operator::NotLike => !compile(&like_to_regex(&as_text(rhs)))?.is_match(&as_text(lhs)),
        Operator::RegMatch => compile(&as_text(rhs))?.is_match(&as_text(lhs)),
        Operator::NotRegMatch => !compile(&as_text(rhs))?.is_match(&as_text(lhs)),
        Operator::AllIn => {
            quantified(lhs, |item| contains(rhs, item)).is_some_and(|(hits, len)| hits == len)
        }
        Operator::NoneIn => quantified(lhs, |item| contains(rhs, item)).is_some_and(|(hits, _)| hits == 0),
        Operator::AnyIn => quantified(lhs, |item| contains(rhs, item)).is_some_and(|(hits, _)| hits > 0),
        Operator::Any(cmp) => quantified(lhs, |item| satisfies(item, cmp, rhs)).is_some_and(|(hits, _)| hits > 0),
        Operator::All(cmp) => {
            quantified(lhs, |item| satisfies(item, cmp, rhs)).is_some_and(|(hits, len)| hits == len)
        }
        Operator::NoneOf(cmp) => {
            quantified(lhs, |item| satisfies(item, cmp, rhs)).is_some_and(|(hits, _)| hits == 0)
        }
    };
    Ok(result)
}

pub(crate) fn matches_all(
    document: &Document,
    conditions: &[ResolvedCondition],
) -> Result<bool, StorageFault> {
    for condition in conditions {
        let lhs = lookup(document, &condition.path);
        if !matches(lhs, condition.operator, &condition.value)? {
            return Ok(false);
        }
    }
    Ok(true)
}

pub(crate) fn sort(documents: &mut [Document], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    let paths: Vec<Vec<String>> = keys
        .iter()
        .map(|key| crate::query::split_path(&key.field))
        .collect();
    documents.sort_by(|a, b| {
        for (key, path) in keys.iter().zip(&paths) {
            let ord = compare(lookup(a, path), lookup(b, path));
            let ord = match key.direction {
                crate::query::Direction::Asc => ord,
                crate::query::Direction::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}
