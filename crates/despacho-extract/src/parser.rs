//! Parse model output into schema fields
//!
//! Models occasionally wrap JSON in markdown fences or drift into prose.
//! Strict parsing is tried first; a lenient line-based salvage pass exists
//! so a drifting response still yields whatever fields it plainly states.

use crate::error::ParseError;
use crate::schema::{FieldKind, FieldSchema};
use despacho_domain::FieldValue;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Parse a model response as a JSON object of schema fields.
///
/// Fields not in the schema are dropped; schema fields absent from the
/// response stay absent (never defaulted), so "not found" and "found empty"
/// remain distinguishable downstream.
pub fn parse_fields(
    response: &str,
    schema: &FieldSchema,
) -> Result<BTreeMap<String, FieldValue>, ParseError> {
    let json_str = strip_fences(response);
    let json: Value =
        serde_json::from_str(json_str).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    let object = json.as_object().ok_or(ParseError::NotAnObject)?;

    let mut fields = BTreeMap::new();
    for (name, value) in object {
        let Some(spec) = schema.field(name) else {
            warn!(field = %name, "dropping field not in schema");
            continue;
        };
        if value.is_null() {
            continue;
        }
        match (spec.kind, coerce(spec.kind, value)) {
            (_, Some(field_value)) => {
                fields.insert(name.clone(), field_value);
            }
            (kind, None) => {
                warn!(field = %name, ?kind, "dropping field with incompatible value shape");
            }
        }
    }
    Ok(fields)
}

/// Lenient recovery: scan `name: value` lines for schema fields.
///
/// Used when strict parsing fails; extracts only scalar statements the
/// response makes in plain text.
pub fn salvage_fields(response: &str, schema: &FieldSchema) -> BTreeMap<String, FieldValue> {
    let mut fields = BTreeMap::new();
    for spec in &schema.fields {
        let pattern = format!(r#"(?mi)^\s*"?{}"?\s*[:=]\s*(.+?)\s*,?\s*$"#, regex::escape(spec.name));
        let Ok(regex) = Regex::new(&pattern) else {
            continue;
        };
        if let Some(capture) = regex.captures(response).and_then(|c| c.get(1)) {
            let value = capture.as_str().trim_matches(['"', '\'']).trim();
            if !value.is_empty() {
                fields.insert(spec.name.to_string(), FieldValue::Text(value.to_string()));
            }
        }
    }
    fields
}

/// Remove a wrapping markdown code fence, if present
fn strip_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    else {
        return trimmed;
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn coerce(kind: FieldKind, value: &Value) -> Option<FieldValue> {
    match kind {
        FieldKind::Scalar => scalar_string(value).map(FieldValue::Text),
        FieldKind::List => match value {
            Value::Array(items) => Some(FieldValue::List(
                items.iter().filter_map(scalar_string).collect(),
            )),
            other => scalar_string(other).map(|s| FieldValue::List(vec![s])),
        },
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
