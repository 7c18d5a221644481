use super::{DependencyEntry, malformed};
use crate::errors::Result;
use std::path::Path;
use toml_edit::{DocumentMut, Item, Value};

pub(super) fn parse(path: &Path, input: &str) -> Result<DocumentMut> {
    input
        .parse::<DocumentMut>()
        .map_err(|err| malformed(path, format!("invalid TOML: {err}")))
}

fn package_str<'a>(doc: &'a DocumentMut, key: &str) -> Option<&'a str> {
    doc.get("package")
        .and_then(Item::as_table_like)
        .and_then(|package| package.get(key))
        .and_then(Item::as_str)
}

pub(super) fn name(doc: &DocumentMut) -> Option<&str> {
    package_str(doc, "name")
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(super) fn version(doc: &DocumentMut) -> Option<&str> {
    package_str(doc, "version")
}

pub(super) fn set_version(doc: &mut DocumentMut, version: &str) {
    if let Some(item) = doc
        .get_mut("package")
        .and_then(Item::as_table_like_mut)
        .and_then(|package| package.get_mut("version"))
    {
        replace_item_str(item, version);
    }
}

pub(super) fn dependency_names(doc: &DocumentMut, section: &str) -> Vec<String> {
    doc.get(section)
        .and_then(Item::as_table_like)
        .map(|deps| deps.iter().map(|(name, _)| name.to_string()).collect())
        .unwrap_or_default()
}

pub(super) fn dependency<'a>(
    doc: &'a DocumentMut,
    section: &str,
    dep_name: &str,
) -> Option<DependencyEntry<'a>> {
    let item = doc.get(section)?.as_table_like()?.get(dep_name)?;
    let entry = match item {
        Item::Value(Value::String(req)) => DependencyEntry::Bare(req.value()),
        // Covers both `core = { version = "1" }` and `[dependencies.core]`.
        other => match other
            .as_table_like()
            .and_then(|table| table.get("version"))
            .and_then(Item::as_str)
        {
            Some(req) => DependencyEntry::Detailed(req),
            None => DependencyEntry::Unpinned,
        },
    };
    Some(entry)
}

pub(super) fn set_dependency(
    doc: &mut DocumentMut,
    section: &str,
    dep_name: &str,
    requirement: &str,
) -> bool {
    let Some(item) = doc
        .get_mut(section)
        .and_then(Item::as_table_like_mut)
        .and_then(|deps| deps.get_mut(dep_name))
    else {
        return false;
    };

    if item.is_str() {
        replace_item_str(item, requirement);
        return true;
    }

    match item
        .as_table_like_mut()
        .and_then(|table| table.get_mut("version"))
    {
        Some(version) if version.is_str() => {
            replace_item_str(version, requirement);
            true
        }
        _ => false,
    }
}

/// Swap a string value while keeping its surrounding whitespace and comments.
fn replace_item_str(item: &mut Item, new_value: &str) {
    let Some(value) = item.as_value_mut() else {
        return;
    };
    let decor = value.decor().clone();
    let mut replacement = Value::from(new_value);
    *replacement.decor_mut() = decor;
    *value = replacement;
}

#[cfg(test)]
mod toml_tests;
