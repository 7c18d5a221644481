use crate::errors::CadenceError;
use semver::{BuildMetadata, Prerelease, Version};
use std::path::PathBuf;
use std::str::FromStr;

/// Semantic version bump types, ordered by impact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bump {
    Patch,
    Minor,
    Major,
}

impl FromStr for Bump {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "patch" => Ok(Self::Patch),
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            _ => Err(()),
        }
    }
}

impl Bump {
    /// Parse a bump type from a string (convenient method that returns Option)
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Convert bump to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }

    /// Apply this bump to a version using standard semver increments.
    ///
    /// Pre-release and build metadata are dropped.
    pub fn apply(&self, version: &Version) -> Version {
        let (major, minor, patch) = match self {
            Self::Patch => (version.major, version.minor, version.patch + 1),
            Self::Minor => (version.major, version.minor + 1, 0),
            Self::Major => (version.major + 1, 0, 0),
        };
        Version {
            major,
            minor,
            patch,
            pre: Prerelease::EMPTY,
            build: BuildMetadata::EMPTY,
        }
    }

    /// Heading used for this severity in changelog sections.
    pub fn changelog_heading(&self) -> &'static str {
        match self {
            Self::Major => "Major changes",
            Self::Minor => "Minor changes",
            Self::Patch => "Patch changes",
        }
    }
}

impl std::fmt::Display for Bump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A human-authored note naming the packages affected by a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// Affected package names, de-duplicated, in declaration order
    pub packages: Vec<String>,
    pub bump: Bump,
    pub summary: String,
    /// File the record was read from, if any
    pub source: Option<PathBuf>,
}

impl ChangeRecord {
    pub fn new<I, S>(packages: I, bump: Bump, summary: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for name in packages {
            let name = name.into();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Self {
            packages: names,
            bump,
            summary: summary.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Which top-level operation is driving a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Compute, apply, and write changelogs
    Version,
    /// Everything `Version` does, then publish
    Publish,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::Publish => "publish",
        }
    }
}

/// A dependency requirement rewritten to track a bumped package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyUpdate {
    pub name: String,
    pub kind: crate::adapters::DependencyKind,
    pub old_requirement: String,
    pub new_requirement: String,
    /// Version the dependency is being released at
    pub new_version: Version,
}

/// Outcome of the publish stage for a single package
#[derive(Debug)]
pub struct PublishRecord {
    pub package: String,
    pub version: Version,
    pub succeeded: bool,
    pub skipped_as_already_published: bool,
    /// Per-package failure, when `succeeded` is false
    pub error: Option<CadenceError>,
}

impl PublishRecord {
    pub(crate) fn published(package: &str, version: &Version) -> Self {
        Self {
            package: package.to_string(),
            version: version.clone(),
            succeeded: true,
            skipped_as_already_published: false,
            error: None,
        }
    }

    pub(crate) fn skipped(package: &str, version: &Version) -> Self {
        Self {
            skipped_as_already_published: true,
            ..Self::published(package, version)
        }
    }

    pub(crate) fn failed(package: &str, version: &Version, error: CadenceError) -> Self {
        Self {
            succeeded: false,
            error: Some(error),
            ..Self::published(package, version)
        }
    }
}
