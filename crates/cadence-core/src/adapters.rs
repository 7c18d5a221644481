//! Format adapters for package manifests (JSON, TOML, YAML, bare version text).
//!
//! Every format-specific branch of the release engine lives here. The rest of
//! the crate only talks to [`ManifestHandle`].
mod json_manifest;
mod toml_manifest;
mod yaml_manifest;

use crate::errors::{CadenceError, Result, io_error_with_path};
use semver::Version;
use std::path::{Path, PathBuf};

/// Encoding of a manifest file, chosen from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Toml,
    Yaml,
    Text,
}

impl ManifestFormat {
    /// Detect the format from a manifest path.
    ///
    /// `.txt`, `.version` and an extension-less `VERSION` file are bare version text.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("txt" | "version") => Ok(Self::Text),
            None if path.file_name().and_then(|n| n.to_str()) == Some("VERSION") => {
                Ok(Self::Text)
            }
            _ => Err(CadenceError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Toml => "toml",
            Self::Yaml => "yaml",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The dependency tables a manifest can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DependencyKind {
    Runtime,
    Dev,
    /// Underscore spelling of the dev table (`dev_dependencies`)
    DevAlt,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 3] = [Self::Runtime, Self::Dev, Self::DevAlt];

    /// Table key holding this kind of dependency in the given format.
    pub fn section(&self, format: ManifestFormat) -> &'static str {
        match (self, format) {
            (Self::Runtime, _) => "dependencies",
            (Self::Dev, ManifestFormat::Toml) => "dev-dependencies",
            (Self::Dev, _) => "devDependencies",
            (Self::DevAlt, _) => "dev_dependencies",
        }
    }

    pub fn is_dev(&self) -> bool {
        !matches!(self, Self::Runtime)
    }
}

/// How a dependency entry carries its version requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyShape {
    /// `"core": "^1.2.0"`
    Bare,
    /// `"core": { "version": "^1.2.0", ... }`
    Detailed,
    /// Neither a string nor a `version` subfield (path-only, workspace-inherited, ...)
    Unpinned,
}

/// Borrowed view of a dependency entry inside a parsed document.
pub(crate) enum DependencyEntry<'a> {
    Bare(&'a str),
    Detailed(&'a str),
    Unpinned,
}

impl DependencyEntry<'_> {
    fn shape(&self) -> DependencyShape {
        match self {
            Self::Bare(_) => DependencyShape::Bare,
            Self::Detailed(_) => DependencyShape::Detailed,
            Self::Unpinned => DependencyShape::Unpinned,
        }
    }

    fn requirement(&self) -> Option<&str> {
        match self {
            Self::Bare(req) | Self::Detailed(req) => Some(req),
            Self::Unpinned => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Document {
    Json(serde_json::Value),
    Toml(toml_edit::DocumentMut),
    Yaml(yaml_manifest::YamlDocument),
    Text,
}

/// A parsed manifest, owned by one release run.
///
/// Setters only touch version-bearing fields; everything else in the document
/// is written back as it was read.
#[derive(Debug, Clone)]
pub struct ManifestHandle {
    path: PathBuf,
    format: ManifestFormat,
    name: Option<String>,
    version: Version,
    document: Document,
}

impl ManifestHandle {
    /// Read and parse the manifest at `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let format = ManifestFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| io_error_with_path(e, path))?;
        Self::parse_as(path, format, &content)
    }

    /// Parse manifest content, detecting the format from `path`.
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let path = path.into();
        let format = ManifestFormat::from_path(&path)?;
        Self::parse_as(&path, format, content)
    }

    fn parse_as(path: &Path, format: ManifestFormat, content: &str) -> Result<Self> {
        let (document, name, raw_version) = match format {
            ManifestFormat::Json => {
                let doc = json_manifest::parse(path, content)?;
                let name = json_manifest::name(&doc).map(str::to_string);
                let version = json_manifest::version(&doc).map(str::to_string);
                (Document::Json(doc), name, version)
            }
            ManifestFormat::Toml => {
                let doc = toml_manifest::parse(path, content)?;
                let name = toml_manifest::name(&doc).map(str::to_string);
                let version = toml_manifest::version(&doc).map(str::to_string);
                (Document::Toml(doc), name, version)
            }
            ManifestFormat::Yaml => {
                let doc = yaml_manifest::parse(path, content)?;
                let name = yaml_manifest::name(&doc).map(str::to_string);
                let version = yaml_manifest::version(&doc).map(str::to_string);
                (Document::Yaml(doc), name, version)
            }
            ManifestFormat::Text => (Document::Text, None, Some(content.trim().to_string())),
        };

        if format != ManifestFormat::Text && name.is_none() {
            return Err(malformed(path, "missing a non-empty 'name' field"));
        }
        let raw_version = raw_version.ok_or_else(|| malformed(path, "missing a 'version' field"))?;
        let version = parse_version(path, &raw_version)?;

        Ok(Self {
            path: path.to_path_buf(),
            format,
            name,
            version,
            document,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ManifestFormat {
        self.format
    }

    /// Declared package name; bare version files have none.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn set_version(&mut self, version: &Version) {
        let rendered = version.to_string();
        match &mut self.document {
            Document::Json(doc) => json_manifest::set_version(doc, &rendered),
            Document::Toml(doc) => toml_manifest::set_version(doc, &rendered),
            Document::Yaml(doc) => yaml_manifest::set_version(doc, &rendered),
            Document::Text => {}
        }
        self.version = version.clone();
    }

    /// Names declared in the given dependency table, in document order.
    pub fn dependency_names(&self, kind: DependencyKind) -> Vec<String> {
        let section = kind.section(self.format);
        match &self.document {
            Document::Json(doc) => json_manifest::dependency_names(doc, section),
            Document::Toml(doc) => toml_manifest::dependency_names(doc, section),
            Document::Yaml(doc) => yaml_manifest::dependency_names(doc, section),
            Document::Text => Vec::new(),
        }
    }

    /// Shape of a dependency entry, or `None` when it is not declared.
    pub fn dependency_shape(&self, kind: DependencyKind, dep_name: &str) -> Option<DependencyShape> {
        self.dependency_entry(kind, dep_name)
            .map(|entry| entry.shape())
    }

    /// Version requirement recorded for a dependency.
    ///
    /// Returns `Ok(None)` when the dependency is not declared, and
    /// [`CadenceError::MissingDependencyVersion`] when it is declared without a version.
    pub fn dependency_version(&self, kind: DependencyKind, dep_name: &str) -> Result<Option<String>> {
        match self.dependency_entry(kind, dep_name) {
            None => Ok(None),
            Some(entry) => entry
                .requirement()
                .map(|req| Some(req.to_string()))
                .ok_or_else(|| self.missing_dependency(dep_name)),
        }
    }

    /// Rewrite a dependency requirement in place, keeping the entry's shape.
    ///
    /// Returns `false` when the dependency is not declared.
    pub fn set_dependency_version(
        &mut self,
        kind: DependencyKind,
        dep_name: &str,
        requirement: &str,
    ) -> Result<bool> {
        match self.dependency_shape(kind, dep_name) {
            None => return Ok(false),
            Some(DependencyShape::Unpinned) => return Err(self.missing_dependency(dep_name)),
            Some(_) => {}
        }
        let section = kind.section(self.format);
        let updated = match &mut self.document {
            Document::Json(doc) => json_manifest::set_dependency(doc, section, dep_name, requirement),
            Document::Toml(doc) => toml_manifest::set_dependency(doc, section, dep_name, requirement),
            Document::Yaml(doc) => yaml_manifest::set_dependency(doc, section, dep_name, requirement),
            Document::Text => false,
        };
        Ok(updated)
    }

    /// Render the document back to its original encoding.
    pub fn serialize(&self) -> Result<String> {
        match &self.document {
            Document::Json(doc) => json_manifest::serialize(&self.path, doc),
            Document::Toml(doc) => Ok(doc.to_string()),
            Document::Yaml(doc) => yaml_manifest::serialize(&self.path, doc),
            Document::Text => Ok(self.version.to_string()),
        }
    }

    fn dependency_entry(&self, kind: DependencyKind, dep_name: &str) -> Option<DependencyEntry<'_>> {
        let section = kind.section(self.format);
        match &self.document {
            Document::Json(doc) => json_manifest::dependency(doc, section, dep_name),
            Document::Toml(doc) => toml_manifest::dependency(doc, section, dep_name),
            Document::Yaml(doc) => yaml_manifest::dependency(doc, section, dep_name),
            Document::Text => None,
        }
    }

    fn missing_dependency(&self, dep_name: &str) -> CadenceError {
        CadenceError::MissingDependencyVersion {
            package: self.display_name(),
            dependency: dep_name.to_string(),
            path: self.path.clone(),
        }
    }

    fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.path.display().to_string(),
        }
    }
}

pub(crate) fn malformed(path: &Path, reason: impl Into<String>) -> CadenceError {
    CadenceError::MalformedManifest {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn parse_version(path: &Path, raw: &str) -> Result<Version> {
    let trimmed = raw.trim();
    Version::parse(trimmed).map_err(|err| CadenceError::InvalidVersion {
        path: path.to_path_buf(),
        value: trimmed.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_formats_from_extension() {
        let cases = [
            ("pkg/package.json", ManifestFormat::Json),
            ("pkg/Cargo.toml", ManifestFormat::Toml),
            ("pkg/pubspec.yaml", ManifestFormat::Yaml),
            ("pkg/chart.YML", ManifestFormat::Yaml),
            ("pkg/version.txt", ManifestFormat::Text),
            ("pkg/app.version", ManifestFormat::Text),
            ("pkg/VERSION", ManifestFormat::Text),
        ];
        for (path, expected) in cases {
            assert_eq!(ManifestFormat::from_path(Path::new(path)).unwrap(), expected);
        }
    }

    #[test]
    fn rejects_unknown_extensions() {
        for path in ["pkg/setup.py", "pkg/Makefile", "pkg/build.gradle"] {
            let err = ManifestFormat::from_path(Path::new(path)).unwrap_err();
            assert!(matches!(err, CadenceError::UnsupportedFormat { .. }), "{path}");
        }
    }

    #[test]
    fn dependency_sections_per_format() {
        assert_eq!(DependencyKind::Dev.section(ManifestFormat::Toml), "dev-dependencies");
        assert_eq!(DependencyKind::Dev.section(ManifestFormat::Json), "devDependencies");
        assert_eq!(DependencyKind::DevAlt.section(ManifestFormat::Yaml), "dev_dependencies");
        assert_eq!(DependencyKind::Runtime.section(ManifestFormat::Toml), "dependencies");
    }

    #[test]
    fn bare_version_text_round_trips() {
        let mut handle = ManifestHandle::parse("VERSION", "  1.4.2\n\n").unwrap();
        assert_eq!(handle.format(), ManifestFormat::Text);
        assert_eq!(handle.name(), None);
        assert_eq!(handle.version(), &Version::new(1, 4, 2));
        assert!(handle.dependency_names(DependencyKind::Runtime).is_empty());
        assert_eq!(handle.dependency_version(DependencyKind::Runtime, "x").unwrap(), None);

        handle.set_version(&Version::new(1, 5, 0));
        assert_eq!(handle.serialize().unwrap(), "1.5.0");
    }

    #[test]
    fn bare_version_text_must_be_semver() {
        for body in ["", "v1.2.3", "1.2", "release 1.0.0"] {
            let err = ManifestHandle::parse("version.txt", body).unwrap_err();
            assert!(matches!(err, CadenceError::InvalidVersion { .. }), "{body:?}");
        }
    }

    #[tokio::test]
    async fn load_reports_missing_file_with_path() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("package.json");
        let err = ManifestHandle::load(&path).await.unwrap_err();
        match err {
            CadenceError::Io(io) => assert!(io.to_string().contains("package.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn load_reads_from_disk() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("Cargo.toml");
        std::fs::write(&path, "[package]\nname = \"core\"\nversion = \"1.2.0\"\n").unwrap();
        let handle = ManifestHandle::load(&path).await.unwrap();
        assert_eq!(handle.name(), Some("core"));
        assert_eq!(handle.version(), &Version::new(1, 2, 0));
        assert_eq!(handle.format(), ManifestFormat::Toml);
    }
}
