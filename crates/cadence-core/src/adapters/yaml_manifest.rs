use super::{DependencyEntry, malformed};
use crate::errors::Result;
use serde_yaml::Value;
use std::path::Path;
use tracing::debug;

/// A YAML manifest: the parsed value plus the source text it came from.
///
/// Edits replace the byte span of the edited scalar in `source`, so comments,
/// quoting and layout elsewhere survive. An edit that cannot be located in
/// block-style YAML switches the document to re-serializing `value`.
#[derive(Debug, Clone)]
pub(crate) struct YamlDocument {
    value: Value,
    source: String,
    reformat: bool,
}

impl YamlDocument {
    /// Apply `replacement` to the scalar at `path`, after `value` was updated.
    fn edit(&mut self, path: &[&str], replacement: &str) {
        if self.reformat {
            return;
        }
        let edited = find_scalar(&self.source, path).map(|span| {
            let mut text = self.source.clone();
            text.replace_range(span.start..span.end, &span.render(replacement));
            text
        });
        match edited {
            Some(text)
                if serde_yaml::from_str::<Value>(&text).is_ok_and(|parsed| parsed == self.value) =>
            {
                self.source = text;
            }
            _ => {
                debug!(?path, "scalar not editable in place, YAML will be re-serialized");
                self.reformat = true;
            }
        }
    }
}

pub(super) fn parse(path: &Path, input: &str) -> Result<YamlDocument> {
    let value: Value = serde_yaml::from_str(input)
        .map_err(|err| malformed(path, format!("invalid YAML: {err}")))?;
    if !value.is_mapping() {
        return Err(malformed(path, "top-level YAML value must be a mapping"));
    }
    Ok(YamlDocument {
        value,
        source: input.to_string(),
        reformat: false,
    })
}

pub(super) fn name(doc: &YamlDocument) -> Option<&str> {
    doc.value
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(super) fn version(doc: &YamlDocument) -> Option<&str> {
    doc.value.get("version").and_then(Value::as_str)
}

pub(super) fn set_version(doc: &mut YamlDocument, version: &str) {
    let Some(slot) = doc.value.get_mut("version") else {
        return;
    };
    *slot = Value::String(version.to_string());
    doc.edit(&["version"], version);
}

pub(super) fn dependency_names(doc: &YamlDocument, section: &str) -> Vec<String> {
    doc.value
        .get(section)
        .and_then(Value::as_mapping)
        .map(|deps| {
            deps.keys()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub(super) fn dependency<'a>(
    doc: &'a YamlDocument,
    section: &str,
    dep_name: &str,
) -> Option<DependencyEntry<'a>> {
    let entry = doc.value.get(section)?.as_mapping()?.get(dep_name)?;
    let entry = match entry {
        Value::String(req) => DependencyEntry::Bare(req),
        Value::Mapping(fields) => match fields.get("version").and_then(Value::as_str) {
            Some(req) => DependencyEntry::Detailed(req),
            None => DependencyEntry::Unpinned,
        },
        // `flutter:` with no value, numbers, sequences
        _ => DependencyEntry::Unpinned,
    };
    Some(entry)
}

pub(super) fn set_dependency(
    doc: &mut YamlDocument,
    section: &str,
    dep_name: &str,
    requirement: &str,
) -> bool {
    let Some(entry) = doc
        .value
        .get_mut(section)
        .and_then(Value::as_mapping_mut)
        .and_then(|deps| deps.get_mut(dep_name))
    else {
        return false;
    };

    let detailed = match entry {
        Value::String(req) => {
            *req = requirement.to_string();
            false
        }
        Value::Mapping(fields) => match fields.get_mut("version") {
            Some(Value::String(req)) => {
                *req = requirement.to_string();
                true
            }
            _ => return false,
        },
        _ => return false,
    };

    if detailed {
        doc.edit(&[section, dep_name, "version"], requirement);
    } else {
        doc.edit(&[section, dep_name], requirement);
    }
    true
}

pub(super) fn serialize(path: &Path, doc: &YamlDocument) -> Result<String> {
    if !doc.reformat {
        return Ok(doc.source.clone());
    }
    serde_yaml::to_string(&doc.value)
        .map_err(|err| malformed(path, format!("failed to serialize YAML: {err}")))
}

/// Byte span of a scalar value in the source, with its quote style.
#[derive(Debug, PartialEq, Eq)]
struct ScalarSpan {
    start: usize,
    end: usize,
    quote: Option<char>,
}

impl ScalarSpan {
    fn render(&self, value: &str) -> String {
        match self.quote {
            Some('\'') => format!("'{}'", value.replace('\'', "''")),
            Some(_) => format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\"")),
            None => value.to_string(),
        }
    }
}

/// A non-blank, non-comment line and where it starts in the source.
struct ScanLine<'a> {
    start: usize,
    indent: usize,
    text: &'a str,
}

fn structural_lines(source: &str) -> Vec<ScanLine<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for raw in source.split_inclusive('\n') {
        let text = raw.trim_end_matches(['\n', '\r']);
        let body = text.trim_start_matches(' ');
        let skipped = body.is_empty()
            || body.starts_with('#')
            || body.starts_with('%')
            || body.starts_with("---")
            || body.starts_with("...");
        if !skipped {
            lines.push(ScanLine {
                start,
                indent: text.len() - body.len(),
                text,
            });
        }
        start += raw.len();
    }
    lines
}

/// Locate the block-style scalar reached by following `path` from the top-level mapping.
fn find_scalar(source: &str, path: &[&str]) -> Option<ScalarSpan> {
    let lines = structural_lines(source);
    find_in(&lines, 0, path)
}

fn find_in(lines: &[ScanLine<'_>], indent: usize, path: &[&str]) -> Option<ScalarSpan> {
    let (wanted, rest) = path.split_first()?;
    for (i, line) in lines.iter().enumerate() {
        if line.indent != indent {
            continue;
        }
        let Some((key, value_at)) = split_key(&line.text[indent..]) else {
            continue;
        };
        if key != *wanted {
            continue;
        }

        if rest.is_empty() {
            let (start, end, quote) = scalar_bounds(line.text, indent + value_at)?;
            return Some(ScalarSpan {
                start: line.start + start,
                end: line.start + end,
                quote,
            });
        }
        let children = &lines[i + 1..];
        let len = children
            .iter()
            .take_while(|child| child.indent > indent)
            .count();
        let block = &children[..len];
        return find_in(block, block.first()?.indent, rest);
    }
    None
}

/// Split `key: value` into the unquoted key and the offset just past the colon.
fn split_key(content: &str) -> Option<(&str, usize)> {
    if let Some(quote) = content.chars().next().filter(|c| matches!(c, '"' | '\'')) {
        let close = content[1..].find(quote)? + 1;
        let after = &content[close + 1..];
        let colon = close + 1 + (after.len() - after.trim_start_matches(' ').len());
        return (content[colon..].starts_with(':')).then(|| (&content[1..close], colon + 1));
    }

    let bytes = content.as_bytes();
    for (i, byte) in bytes.iter().enumerate() {
        match byte {
            b':' if bytes.get(i + 1).is_none_or(|next| *next == b' ') => {
                return Some((content[..i].trim_end(), i + 1));
            }
            b'#' if i > 0 && bytes[i - 1] == b' ' => return None,
            _ => {}
        }
    }
    None
}

/// Bounds of the scalar starting at or after `from` on a single line.
fn scalar_bounds(text: &str, from: usize) -> Option<(usize, usize, Option<char>)> {
    let rest = &text[from..];
    let start = from + (rest.len() - rest.trim_start_matches(' ').len());
    let value = &text[start..];
    match value.chars().next()? {
        quote @ ('\'' | '"') => {
            let close = closing_quote(value, quote)?;
            Some((start, start + close + 1, Some(quote)))
        }
        // nested block, flow collections, block scalars, anchors, aliases, tags
        '#' | '{' | '[' | '|' | '>' | '&' | '*' | '!' => None,
        _ => {
            let end = value.find(" #").unwrap_or(value.len());
            Some((start, start + value[..end].trim_end().len(), None))
        }
    }
}

fn closing_quote(value: &str, quote: char) -> Option<usize> {
    let bytes = value.as_bytes();
    let quote = quote as u8;
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'"' => i += 2,
            byte if byte == quote => {
                if quote == b'\'' && bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                } else {
                    return Some(i);
                }
            }
            _ => i += 1,
        }
    }
    None
}

#[cfg(test)]
mod yaml_tests;
