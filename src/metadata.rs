//! Per-document field surface seen by WHERE, SORT and column extraction.
//!
//! The executor only talks to [`MetadataSource`]. [`FrontmatterMetadata`] is
//! the implementation used by default: it reads a `---` delimited block of
//! `key: value` lines and exposes the document's own properties under `file`.

use std::{collections::HashMap, sync::LazyLock};

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::{ast::FieldPath, document::Document, executor::EvalError, value::Value};

/// Parsed frontmatter keys and values.
pub type Frontmatter = HashMap<String, Value>;

/// Field lookup surface for one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryMetadata {
    pub fields: HashMap<String, Value>,
}

impl QueryMetadata {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Metadata collaborator consumed by the executor.
pub trait MetadataSource {
    fn parse_frontmatter(&self, raw_content: &str) -> Result<Frontmatter, EvalError>;

    fn build_metadata(
        &self,
        document: &Document,
        frontmatter: &Frontmatter,
    ) -> Result<QueryMetadata, EvalError>;

    /// Resolves `path`; `None` when the field is absent.
    fn field_value(&self, metadata: &QueryMetadata, path: &FieldPath) -> Option<Value>;

    /// Canonical form used for equality and ordering.
    fn normalize(&self, value: &Value) -> Value;
}

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})(?:[T ](\d{2}:\d{2})(:\d{2})?)?$").expect("valid date regex")
});

const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parses `YYYY-MM-DD` with an optional `THH:MM[:SS]` (or space separated) time.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let caps = DATE_PATTERN.captures(text.trim())?;
    let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
    match caps.get(2) {
        None => date.and_hms_opt(0, 0, 0),
        Some(hm) => {
            let seconds = caps.get(3).map(|s| s.as_str()).unwrap_or(":00");
            let time = format!("{}{}", hm.as_str(), seconds);
            NaiveDateTime::parse_from_str(&format!("{} {}", &caps[1], time), "%Y-%m-%d %H:%M:%S")
                .ok()
        }
    }
}

pub fn format_date(datetime: &NaiveDateTime) -> String {
    datetime.format(CANONICAL_DATE_FORMAT).to_string()
}

/// Default metadata collaborator.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrontmatterMetadata;

impl FrontmatterMetadata {
    fn parse_scalar(text: &str) -> Value {
        let text = text.trim();
        if text.is_empty() || text == "~" || text.eq_ignore_ascii_case("null") {
            return Value::Null;
        }
        if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            return Value::Array(
                inner
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(Self::parse_scalar)
                    .collect(),
            );
        }
        for quote in ['"', '\''] {
            if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
                return Value::String(text[1..text.len() - 1].to_string());
            }
        }
        match text {
            "true" | "True" | "TRUE" => return Value::Boolean(true),
            "false" | "False" | "FALSE" => return Value::Boolean(false),
            _ => {}
        }
        if let Ok(n) = text.parse::<i64>() {
            return Value::Integer(n);
        }
        if text.contains('.')
            && let Ok(n) = text.parse::<f64>()
        {
            return Value::Float(n);
        }
        Value::String(text.to_string())
    }

    fn tag_names(value: &Value) -> Vec<String> {
        match value {
            Value::String(s) => s
                .split([',', ' '])
                .map(|t| t.trim().trim_start_matches('#'))
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            Value::Array(items) => items.iter().flat_map(Self::tag_names).collect(),
            _ => vec![],
        }
    }

    fn lookup<'a>(map: &'a HashMap<String, Value>, key: &str) -> Option<&'a Value> {
        map.get(key).or_else(|| {
            map.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }
}

impl MetadataSource for FrontmatterMetadata {
    fn parse_frontmatter(&self, raw_content: &str) -> Result<Frontmatter, EvalError> {
        let mut frontmatter = Frontmatter::new();
        let mut lines = raw_content.lines();

        if lines.next().map(str::trim_end) != Some("---") {
            return Ok(frontmatter);
        }

        let mut list_key: Option<String> = None;
        for (number, line) in lines.enumerate() {
            if line.trim_end() == "---" {
                return Ok(frontmatter);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(item) = trimmed.strip_prefix("- ") {
                let Some(key) = &list_key else {
                    return Err(EvalError::Metadata(format!(
                        "frontmatter line {}: list item without a key",
                        number + 2
                    )));
                };
                let entry = frontmatter.entry(key.clone()).or_insert(Value::Null);
                let item = Self::parse_scalar(item);
                match entry {
                    Value::Array(items) => items.push(item),
                    other => *other = Value::Array(vec![item]),
                }
                continue;
            }

            match trimmed.split_once(':') {
                Some((key, value)) => {
                    let key = key.trim().to_string();
                    let value = Self::parse_scalar(value);
                    list_key = value.is_null().then(|| key.clone());
                    frontmatter.insert(key, value);
                }
                None => {
                    return Err(EvalError::Metadata(format!(
                        "frontmatter line {}: expected 'key: value'",
                        number + 2
                    )));
                }
            }
        }

        // No closing delimiter: not a frontmatter block.
        Ok(Frontmatter::new())
    }

    fn build_metadata(
        &self,
        document: &Document,
        frontmatter: &Frontmatter,
    ) -> Result<QueryMetadata, EvalError> {
        let mut fields = frontmatter.clone();

        let mut tags: Vec<String> = Vec::new();
        let frontmatter_tags = frontmatter.get("tags").map(Self::tag_names).unwrap_or_default();
        for tag in document
            .tags
            .iter()
            .map(|t| t.trim_start_matches('#').to_string())
            .chain(frontmatter_tags)
        {
            if !tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
                tags.push(tag);
            }
        }
        let tags = Value::from(tags);

        let file = HashMap::from([
            ("name".to_string(), Value::from(document.title.as_str())),
            ("path".to_string(), Value::from(document.path.as_str())),
            ("folder".to_string(), Value::from(document.folder())),
            ("tags".to_string(), tags.clone()),
            ("outlinks".to_string(), Value::from(document.outgoing_link_titles.clone())),
            ("inlinks".to_string(), Value::from(document.incoming_link_document_ids.clone())),
        ]);

        fields.insert("tags".to_string(), tags);
        fields.insert("file".to_string(), Value::Object(file));
        for (key, value) in [
            ("id", &document.id),
            ("title", &document.title),
            ("path", &document.path),
        ] {
            fields
                .entry(key.to_string())
                .or_insert_with(|| Value::from(value.as_str()));
        }

        Ok(QueryMetadata { fields })
    }

    fn field_value(&self, metadata: &QueryMetadata, path: &FieldPath) -> Option<Value> {
        let segments = path.segments();
        if segments.len() > 1
            && let Some(value) = Self::lookup(&metadata.fields, &path.to_string())
        {
            return Some(value.clone());
        }

        let (first, rest) = segments.split_first()?;
        let mut current = Self::lookup(&metadata.fields, first)?;
        for segment in rest {
            current = match current {
                Value::Object(map) => Self::lookup(map, segment)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }

    fn normalize(&self, value: &Value) -> Value {
        match value {
            Value::Float(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                Value::Integer(*n as i64)
            }
            Value::String(s) => match parse_date(s) {
                Some(datetime) => Value::String(format_date(&datetime)),
                None => value.clone(),
            },
            Value::Array(items) => Value::Array(items.iter().map(|v| self.normalize(v)).collect()),
            _ => value.clone(),
        }
    }
}
