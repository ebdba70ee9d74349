//! AQL rendering of a [`QueryRequest`] for drivers that speak to a real server.
//!
//! Field paths and values never appear in the query text; every path segment
//! and every value is passed as a bind variable.

use serde_json::{Map, Value};

use super::QueryRequest;

/// Name of the loop variable in the rendered `FOR` statement.
pub const INSTANCE_NAME: &str = "i";

#[derive(Debug, Clone, PartialEq)]
pub struct AqlQuery {
    pub query: String,
    pub bind_vars: Map<String, Value>,
}

pub fn render(request: &QueryRequest) -> AqlQuery {
    let mut bind_vars = Map::new();
    let mut lines = vec![format!("FOR {} IN @@collection", INSTANCE_NAME)];

    let mut filters = Vec::with_capacity(request.conditions.len());
    for (i, condition) in request.conditions.iter().enumerate() {
        let prefix = format!("field_{}", i);
        let (field, field_vars) = split_field(&condition.path, &prefix);
        bind_vars.extend(field_vars);

        let value_var = format!("{}_{}", prefix, condition.operator.name());
        bind_vars.insert(value_var.clone(), condition.value.clone());

        filters.push(format!(
            "{}.{} {} @{}",
            INSTANCE_NAME, field, condition.operator, value_var
        ));
    }
    if !filters.is_empty() {
        lines.push(format!("    FILTER {}", filters.join("\n        AND ")));
    }

    if !request.sort.is_empty() {
        let mut keys = Vec::with_capacity(request.sort.len());
        for (i, key) in request.sort.iter().enumerate() {
            let (field, field_vars) =
                split_field(&super::split_path(&key.field), &format!("sort_{}", i));
            bind_vars.extend(field_vars);
            keys.push(format!("{}.{} {}", INSTANCE_NAME, field, key.direction));
        }
        lines.push(format!("    SORT {}", keys.join(", ")));
    }

    if let Some(limit) = request.limit {
        lines.push(format!("    LIMIT {}, {}", request.offset.unwrap_or(0), limit));
    }

    lines.push(format!("    RETURN {}", INSTANCE_NAME));
    bind_vars.insert("@collection".into(), Value::String(request.collection.clone()));

    AqlQuery {
        query: lines.join("\n"),
        bind_vars,
    }
}

/// `["owner", "name"]` with prefix `field_0` becomes
/// `@field_0_0.@field_0_1` plus the two bind variables.
fn split_field(path: &[String], prefix: &str) -> (String, Vec<(String, Value)>) {
    let mut parts = Vec::with_capacity(path.len());
    let mut vars = Vec::with_capacity(path.len());
    for (i, part) in path.iter().enumerate() {
        let var = format!("{}_{}", prefix, i);
        parts.push(format!("@{}", var));
        vars.push((var, Value::String(part.clone())));
    }
    (parts.join("."), vars)
}
