//! Shape summaries of a serialized context, for debugging prompts.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextKeyReport {
    pub total_keys: usize,
    /// JSON type of each top-level value.
    pub key_types: BTreeMap<String, &'static str>,
    /// Element count for arrays/objects, character count otherwise.
    pub key_sizes: BTreeMap<String, usize>,
    /// Element type of non-empty arrays.
    pub nested_structures: BTreeMap<String, &'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletenessReport {
    pub is_complete: bool,
    pub missing_keys: Vec<String>,
    pub empty_keys: Vec<String>,
    /// Share of required keys present, 1.0 when none are required.
    pub completeness_score: f64,
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Summarize the top-level keys of a context object. Non-objects have no
/// keys.
pub fn debug_context_keys(context: &Value) -> ContextKeyReport {
    let Some(map) = context.as_object() else {
        return ContextKeyReport::default();
    };

    let mut report = ContextKeyReport {
        total_keys: map.len(),
        ..Default::default()
    };
    for (key, value) in map {
        report.key_types.insert(key.clone(), type_name(value));
        let size = match value {
            Value::Array(items) => {
                if let Some(first) = items.first() {
                    report.nested_structures.insert(key.clone(), type_name(first));
                }
                items.len()
            }
            Value::Object(fields) => fields.len(),
            Value::String(s) => s.chars().count(),
            other if is_blank(other) => 0,
            other => other.to_string().len(),
        };
        report.key_sizes.insert(key.clone(), size);
    }
    report
}

/// Check that `required_keys` are present and non-blank in `context`.
pub fn validate_context_completeness(context: &Value, required_keys: &[&str]) -> CompletenessReport {
    let mut missing_keys = Vec::new();
    let mut empty_keys = Vec::new();
    for key in required_keys {
        match context.get(*key) {
            None => missing_keys.push((*key).to_owned()),
            Some(value) if is_blank(value) => empty_keys.push((*key).to_owned()),
            Some(_) => {}
        }
    }

    let completeness_score = if required_keys.is_empty() {
        1.0
    } else {
        (required_keys.len() - missing_keys.len()) as f64 / required_keys.len() as f64
    };

    CompletenessReport {
        is_complete: missing_keys.is_empty(),
        missing_keys,
        empty_keys,
        completeness_score,
    }
}
