//! Markdown changelog sections, newest release first under a `# Changelog` header.
use crate::errors::io_error_with_path;
use crate::types::{Bump, ChangeRecord, DependencyUpdate};
use chrono::NaiveDate;
use semver::Version;
use std::io;
use std::path::Path;

pub const CHANGELOG_HEADER: &str = "# Changelog";

/// "Updated dependencies: core@1.3.0, util@2.0.0", or `None` without updates.
pub fn format_dependency_updates_message(updates: &[DependencyUpdate]) -> Option<String> {
    let mut seen: Vec<&str> = Vec::new();
    let mut parts: Vec<String> = Vec::new();
    for update in updates {
        if seen.contains(&update.name.as_str()) {
            continue;
        }
        seen.push(&update.name);
        parts.push(format!("{}@{}", update.name, update.new_version));
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("Updated dependencies: {}", parts.join(", ")))
    }
}

/// Render the section for one release.
///
/// Records are grouped under `### Major changes`, `### Minor changes` and
/// `### Patch changes`; the dependency entry goes under the release's own bump.
pub fn render_section(
    version: &Version,
    date: NaiveDate,
    bump: Bump,
    records: &[ChangeRecord],
    dependency_updates: &[DependencyUpdate],
) -> String {
    let mut entries: Vec<(Bump, &str)> = records
        .iter()
        .map(|record| (record.bump, record.summary.as_str()))
        .collect();
    let dependency_message = format_dependency_updates_message(dependency_updates);
    if let Some(message) = &dependency_message {
        entries.push((bump, message.as_str()));
    }

    let mut section = format!("## {version} – {}\n\n", date.format("%Y-%m-%d"));
    for severity in [Bump::Major, Bump::Minor, Bump::Patch] {
        let group: Vec<&str> = entries
            .iter()
            .filter(|(b, _)| *b == severity)
            .map(|(_, message)| *message)
            .collect();
        if group.is_empty() {
            continue;
        }
        section.push_str("### ");
        section.push_str(severity.changelog_heading());
        section.push_str("\n\n");
        for message in group {
            section.push_str(&format_list_item(message));
        }
        section.push('\n');
    }
    section
}

/// Insert `section` right below the changelog header, adding the header when missing.
pub fn insert_section(existing: &str, section: &str) -> String {
    let body = existing.trim_start_matches('\u{feff}');
    let rest = match body.strip_prefix(CHANGELOG_HEADER) {
        Some(after) if after.is_empty() || after.starts_with('\n') || after.starts_with("\r\n") => {
            after.trim_start_matches(['\r', '\n'])
        }
        _ => body,
    };

    let mut out = String::with_capacity(body.len() + section.len() + CHANGELOG_HEADER.len() + 2);
    out.push_str(CHANGELOG_HEADER);
    out.push_str("\n\n");
    out.push_str(section);
    if !rest.trim().is_empty() {
        if !section.ends_with("\n\n") {
            out.push('\n');
        }
        out.push_str(rest);
    }
    out
}

/// Prepend a section to the changelog at `path`, creating the file if needed.
pub async fn write_section(path: &Path, section: &str) -> io::Result<()> {
    let existing = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(io_error_with_path(e, path)),
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error_with_path(e, parent))?;
    }
    tokio::fs::write(path, insert_section(&existing, section))
        .await
        .map_err(|e| io_error_with_path(e, path))
}

/// Continuation lines are indented so multi-line summaries stay in one list item.
fn format_list_item(message: &str) -> String {
    let mut lines = message.lines();
    let mut out = format!("- {}\n", lines.next().unwrap_or_default());
    for line in lines {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out
}
