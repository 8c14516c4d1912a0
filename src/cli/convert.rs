//! JSON <-> Value conversion and result rendering

use std::collections::HashMap;

use serde_json::json;

use super::CliError;
use crate::{Document, Frontmatter, QueryResult, Value};

/// Convert serde_json::Value to Value
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => {
            Value::Array(arr.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(obj) => {
            Value::Object(obj.into_iter().map(|(k, v)| (k, json_to_value(v))).collect())
        }
    }
}

/// Convert Value to serde_json::Value
pub fn value_to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(arr) => serde_json::Value::Array(arr.iter().map(value_to_json).collect()),
        Value::Object(obj) => serde_json::Value::Object(
            obj.iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect(),
        ),
    }
}

/// Takes the optional `frontmatterCache` object (document id to parsed
/// frontmatter) out of `{"documents": [...], "frontmatterCache": {...}}`.
pub fn frontmatter_cache_from_json(
    json: &mut serde_json::Value,
) -> Result<Option<HashMap<String, Frontmatter>>, CliError> {
    let Some(cache) = json.get_mut("frontmatterCache").map(serde_json::Value::take) else {
        return Ok(None);
    };
    let cache: HashMap<String, serde_json::Map<String, serde_json::Value>> =
        serde_json::from_value(cache)?;
    Ok(Some(
        cache
            .into_iter()
            .map(|(id, fields)| {
                let fields = fields.into_iter().map(|(k, v)| (k, json_to_value(v))).collect();
                (id, fields)
            })
            .collect(),
    ))
}

/// Accepts either a bare array of documents or `{"documents": [...]}`.
pub fn documents_from_json(mut json: serde_json::Value) -> Result<Vec<Document>, CliError> {
    if let Some(documents) = json.get_mut("documents") {
        json = documents.take();
    }
    Ok(serde_json::from_value(json)?)
}

/// Renders a successful result. TABLE rows carry `values` aligned with
/// `columns`; TASK rows carry `tasks`.
pub fn result_to_json(result: &QueryResult) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = result
        .rows
        .iter()
        .map(|row| {
            let mut out = json!({
                "id": row.document.id,
                "title": row.document.title,
                "path": row.document.path,
            });
            if let Some(columns) = &row.extracted_columns {
                out["values"] = columns.iter().map(|(_, v)| value_to_json(v)).collect();
            }
            if let Some(tasks) = &row.tasks {
                out["tasks"] = tasks
                    .iter()
                    .map(|task| {
                        json!({ "text": task.text, "completed": task.completed, "line": task.line })
                    })
                    .collect();
            }
            out
        })
        .collect();

    let mut out = json!({
        "queryType": result.query_type.map(|t| t.to_string()),
        "rows": rows,
        "elapsedMs": result.elapsed_ms,
    });
    if !result.columns.is_empty() {
        out["columns"] = result.columns.iter().map(|c| json!(c.to_string())).collect();
    }
    if let Some(groups) = &result.groups {
        out["groups"] = groups
            .iter()
            .map(|group| json!({ "key": value_to_json(&group.key), "rows": group.rows }))
            .collect();
    }
    out
}
