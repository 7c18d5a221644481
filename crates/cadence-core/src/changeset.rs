use crate::errors::{CadenceError, Result, io_error_with_path};
use crate::types::{Bump, ChangeRecord};
use changesets::{Change, ChangeType};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default location of change record files, relative to the repository root.
pub const DEFAULT_CHANGESETS_DIR: &str = ".cadence/changesets";

/// Parse a changeset from its markdown content.
/// Uses Knope's `changesets` crate to parse the frontmatter.
///
/// A file naming packages at different severities produces one record per
/// severity, most severe first.
///
/// # Example
/// ```rust,ignore
/// let text = "---\nmy-package: minor\n---\n\nfeat: new feature\n";
/// let records = parse_changeset(text, Path::new("test.md")).unwrap();
/// assert_eq!(records[0].packages, vec!["my-package".to_string()]);
/// ```
pub fn parse_changeset(text: &str, path: &Path) -> Result<Vec<ChangeRecord>> {
    let invalid = |reason: &str| CadenceError::Changeset(format!("{}: {reason}", path.display()));

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| invalid("not a file path"))?;
    let change = Change::from_file_name_and_content(&file_name, text)
        .map_err(|err| invalid(&format!("invalid frontmatter ({err})")))?;

    let mut by_bump: BTreeMap<Bump, Vec<String>> = BTreeMap::new();
    for (package, change_type) in change.versioning.iter() {
        let bump = match change_type {
            ChangeType::Patch => Bump::Patch,
            ChangeType::Minor => Bump::Minor,
            ChangeType::Major => Bump::Major,
            ChangeType::Custom(_) => {
                return Err(invalid(&format!(
                    "unsupported change type for '{package}', expected major, minor or patch"
                )));
            }
        };
        by_bump.entry(bump).or_default().push(package.to_string());
    }
    if by_bump.is_empty() {
        return Err(invalid("no packages listed in frontmatter"));
    }

    let summary = change.summary.trim().to_string();
    if summary.is_empty() {
        return Err(invalid("empty summary"));
    }

    Ok(by_bump
        .into_iter()
        .rev()
        .map(|(bump, mut packages)| {
            packages.sort();
            ChangeRecord::new(packages, bump, summary.clone()).with_source(path)
        })
        .collect())
}

/// Load all change records from a directory, in file name order.
pub fn load_changesets(dir: &Path) -> Result<Vec<ChangeRecord>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_error_with_path(e, dir))? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("md") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut out = Vec::new();
    for path in paths {
        let text = fs::read_to_string(&path).map_err(|e| io_error_with_path(e, &path))?;
        out.extend(parse_changeset(&text, &path)?);
    }
    debug!(count = out.len(), dir = %dir.display(), "loaded change records");
    Ok(out)
}

/// Delete the files the given records were read from.
///
/// Only commands that mutate manifests call this. Returns the number of files removed.
pub fn remove_changesets(records: &[ChangeRecord]) -> Result<usize> {
    let mut paths: Vec<&Path> = records
        .iter()
        .filter_map(|record| record.source.as_deref())
        .collect();
    paths.sort();
    paths.dedup();

    let mut removed = 0;
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error_with_path(e, path).into()),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_changeset() {
        let text = "---\na: minor\nb: minor\n---\n\nfeat: message\n";
        let p = Path::new("/tmp/x.md");
        let records = parse_changeset(text, p).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].packages, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(records[0].bump, Bump::Minor);
        assert_eq!(records[0].summary, "feat: message");
        assert_eq!(records[0].source.as_deref(), Some(p));
    }

    #[test]
    fn mixed_severities_split_into_records() {
        let text = "---\ncore: patch\ncli: major\nweb: patch\n---\n\nrefactor\n";
        let records = parse_changeset(text, Path::new("/tmp/mixed.md")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].bump, Bump::Major);
        assert_eq!(records[0].packages, vec!["cli".to_string()]);
        assert_eq!(records[1].bump, Bump::Patch);
        assert_eq!(
            records[1].packages,
            vec!["core".to_string(), "web".to_string()]
        );
    }

    #[test]
    fn parse_empty_is_an_error() {
        assert!(parse_changeset("", Path::new("/tmp/empty.md")).is_err());
    }

    #[test]
    fn parse_changeset_missing_packages() {
        let text = "---\n---\n\nNo packages defined\n";
        assert!(parse_changeset(text, Path::new("/tmp/no-packages.md")).is_err());
    }

    #[test]
    fn parse_changeset_rejects_custom_change_type() {
        let text = "---\n\"test\": none\n---\n\nNo release type\n";
        let err = parse_changeset(text, Path::new("/tmp/no-release.md")).unwrap_err();
        assert!(err.to_string().contains("no-release.md"));
    }

    #[test]
    fn parse_changeset_empty_message() {
        let text = "---\ntest: patch\n---\n\n";
        assert!(parse_changeset(text, Path::new("/tmp/empty-message.md")).is_err());
    }

    #[test]
    fn load_changesets_missing_dir() {
        let temp = tempfile::tempdir().unwrap();
        let records = load_changesets(&temp.path().join("absent")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn load_changesets_sorted_and_filtered() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();
        fs::write(dir.join("b-second.md"), "---\ncli: patch\n---\n\nsecond\n").unwrap();
        fs::write(dir.join("a-first.md"), "---\ncore: minor\n---\n\nfirst\n").unwrap();

        let records = load_changesets(dir).unwrap();
        let summaries: Vec<_> = records.iter().map(|r| r.summary.as_str()).collect();
        assert_eq!(summaries, vec!["first", "second"]);
    }

    #[test]
    fn removes_consumed_files_once() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        fs::write(dir.join("one.md"), "---\ncore: patch\ncli: major\n---\n\nx\n").unwrap();
        fs::write(dir.join("two.md"), "---\ncore: patch\n---\n\ny\n").unwrap();

        let records = load_changesets(dir).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(remove_changesets(&records).unwrap(), 2);
        assert!(load_changesets(dir).unwrap().is_empty());
        assert_eq!(remove_changesets(&records).unwrap(), 0);
    }
}
