use crate::changeset::DEFAULT_CHANGESETS_DIR;
use crate::errors::{CadenceError, Result, io_error_with_path};
use crate::plan::CascadePolicy;
use crate::types::Bump;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding Cadence state, relative to the repository root
pub const CADENCE_DIR: &str = ".cadence";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Upper bound on `release.timeout_secs`, one week
pub const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;
const CHANGELOG_FILE: &str = "CHANGELOG.md";

/// Resolved configuration for Cadence, paths absolute against the repository root
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub version: u64,
    pub release: ReleaseSettings,
    #[serde(serialize_with = "serialize_cascade")]
    pub cascade: CascadePolicy,
    pub packages: BTreeMap<String, PackageConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseSettings {
    pub timeout_secs: u64,
    /// Shell used to run probe and publish commands
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    pub changesets_dir: PathBuf,
}

impl ReleaseSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageConfig {
    pub manifest: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<String>,
    pub working_dir: PathBuf,
    pub changelog: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    version: Option<u64>,
    #[serde(default)]
    release: RawRelease,
    #[serde(default)]
    cascade: RawCascade,
    #[serde(default)]
    packages: BTreeMap<String, RawPackage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRelease {
    timeout_secs: Option<u64>,
    shell: Option<String>,
    changesets_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCascade {
    bump: Option<String>,
    include_dev: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPackage {
    manifest: PathBuf,
    publish: Option<String>,
    probe: Option<String>,
    working_dir: Option<PathBuf>,
    changelog: Option<PathBuf>,
}

impl Config {
    /// Load configuration from .cadence/config.toml, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = config_path(root);
        if !path.exists() {
            return Self::resolve(root, RawConfig::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| io_error_with_path(e, &path))?;
        Self::parse(root, &text)
    }

    /// Parse configuration text, resolving relative paths against `root`.
    pub fn parse(root: &Path, text: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text)
            .map_err(|e| CadenceError::Config(format!("invalid config.toml: {e}")))?;
        Self::resolve(root, raw)
    }

    fn resolve(root: &Path, raw: RawConfig) -> Result<Self> {
        let version = raw.version.unwrap_or(1);
        if version != 1 {
            return Err(CadenceError::Config(format!(
                "unsupported config version {version}, expected 1"
            )));
        }

        let timeout_secs = raw.release.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 || timeout_secs > MAX_TIMEOUT_SECS {
            return Err(CadenceError::Config(format!(
                "release.timeout_secs must be between 1 and {MAX_TIMEOUT_SECS} (got {timeout_secs})"
            )));
        }
        let shell = non_empty(raw.release.shell, "release.shell")?;
        let changesets_dir = root.join(
            raw.release
                .changesets_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CHANGESETS_DIR)),
        );

        let cascade = CascadePolicy {
            bump: match raw.cascade.bump.as_deref() {
                None => CascadePolicy::default().bump,
                Some(value) if value.eq_ignore_ascii_case("none") => None,
                Some(value) => Some(Bump::parse(value).ok_or_else(|| {
                    CadenceError::Config(format!(
                        "cascade.bump must be one of major, minor, patch, none (got '{value}')"
                    ))
                })?),
            },
            include_dev: raw.cascade.include_dev.unwrap_or(false),
        };

        let mut packages = BTreeMap::new();
        for (name, package) in raw.packages {
            let manifest = root.join(&package.manifest);
            let manifest_dir = manifest
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            let resolved = PackageConfig {
                publish: non_empty(package.publish, &format!("packages.{name}.publish"))?,
                probe: non_empty(package.probe, &format!("packages.{name}.probe"))?,
                working_dir: package
                    .working_dir
                    .map(|dir| root.join(dir))
                    .unwrap_or_else(|| manifest_dir.clone()),
                changelog: package
                    .changelog
                    .map(|file| root.join(file))
                    .unwrap_or_else(|| manifest_dir.join(CHANGELOG_FILE)),
                manifest,
            };
            packages.insert(name, resolved);
        }

        Ok(Self {
            version,
            release: ReleaseSettings {
                timeout_secs,
                shell,
                changesets_dir,
            },
            cascade,
            packages,
        })
    }

    /// Configuration of a package named by a change record.
    pub fn package(&self, name: &str) -> Result<&PackageConfig> {
        self.packages
            .get(name)
            .ok_or_else(|| CadenceError::UnknownPackage(name.to_string()))
    }

    /// Render the resolved configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CadenceError::Config(format!("failed to render configuration: {e}")))
    }
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CADENCE_DIR).join("config.toml")
}

fn non_empty(value: Option<String>, key: &str) -> Result<Option<String>> {
    match value {
        Some(command) if command.trim().is_empty() => {
            Err(CadenceError::Config(format!("{key} must not be empty")))
        }
        other => Ok(other),
    }
}

fn serialize_cascade<S: Serializer>(
    policy: &CascadePolicy,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct View {
        bump: &'static str,
        include_dev: bool,
    }
    View {
        bump: policy.bump.map(|b| b.as_str()).unwrap_or("none"),
        include_dev: policy.include_dev,
    }
    .serialize(serializer)
}
