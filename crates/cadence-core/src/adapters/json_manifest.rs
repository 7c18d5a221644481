use super::{DependencyEntry, malformed};
use crate::errors::Result;
use serde_json::Value;
use std::path::Path;

pub(super) fn parse(path: &Path, input: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(input)
        .map_err(|err| malformed(path, format!("invalid JSON: {err}")))?;
    if !value.is_object() {
        return Err(malformed(path, "top-level JSON value must be an object"));
    }
    Ok(value)
}

pub(super) fn name(doc: &Value) -> Option<&str> {
    doc.get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(super) fn version(doc: &Value) -> Option<&str> {
    doc.get("version").and_then(Value::as_str)
}

pub(super) fn set_version(doc: &mut Value, version: &str) {
    // Map::insert keeps the key at its original position (preserve_order).
    if let Some(map) = doc.as_object_mut() {
        map.insert("version".to_string(), Value::String(version.to_string()));
    }
}

pub(super) fn dependency_names(doc: &Value, section: &str) -> Vec<String> {
    doc.get(section)
        .and_then(Value::as_object)
        .map(|deps| deps.keys().cloned().collect())
        .unwrap_or_default()
}

pub(super) fn dependency<'a>(
    doc: &'a Value,
    section: &str,
    dep_name: &str,
) -> Option<DependencyEntry<'a>> {
    let entry = doc.get(section)?.as_object()?.get(dep_name)?;
    let entry = match entry {
        Value::String(req) => DependencyEntry::Bare(req),
        Value::Object(fields) => match fields.get("version").and_then(Value::as_str) {
            Some(req) => DependencyEntry::Detailed(req),
            None => DependencyEntry::Unpinned,
        },
        _ => DependencyEntry::Unpinned,
    };
    Some(entry)
}

pub(super) fn set_dependency(
    doc: &mut Value,
    section: &str,
    dep_name: &str,
    requirement: &str,
) -> bool {
    let Some(entry) = doc
        .get_mut(section)
        .and_then(Value::as_object_mut)
        .and_then(|deps| deps.get_mut(dep_name))
    else {
        return false;
    };

    match entry {
        Value::String(req) => {
            *req = requirement.to_string();
            true
        }
        Value::Object(fields) => match fields.get_mut("version") {
            Some(Value::String(req)) => {
                *req = requirement.to_string();
                true
            }
            _ => false,
        },
        _ => false,
    }
}

/// Two-space indentation, original key order, trailing newline.
pub(super) fn serialize(path: &Path, doc: &Value) -> Result<String> {
    let mut out = serde_json::to_string_pretty(doc)
        .map_err(|err| malformed(path, format!("failed to serialize JSON: {err}")))?;
    out.push('\n');
    Ok(out)
}
