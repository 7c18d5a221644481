use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

/// Canonical result type for Cadence code
pub type Result<T> = std::result::Result<T, CadenceError>;

/// Common error type for Cadence operations
#[derive(Debug, thiserror::Error)]
pub enum CadenceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Changeset error: {0}")]
    Changeset(String),

    #[error("Unsupported manifest format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Malformed manifest {}: {reason}", path.display())]
    MalformedManifest { path: PathBuf, reason: String },

    #[error("Invalid version '{value}' in {}: {reason}", path.display())]
    InvalidVersion {
        path: PathBuf,
        value: String,
        reason: String,
    },

    #[error(
        "Dependency '{dependency}' of package '{package}' has no pinned version in {}",
        path.display()
    )]
    MissingDependencyVersion {
        package: String,
        dependency: String,
        path: PathBuf,
    },

    #[error("Package '{0}' is not configured in .cadence/config.toml")]
    UnknownPackage(String),

    /// `published` lists `name@version` for packages live before the deadline hit.
    #[error("Release deadline of {}s exceeded{}", .timeout.as_secs_f64(), published_suffix(.published))]
    DeadlineExceeded {
        timeout: Duration,
        published: Vec<String>,
    },

    #[error("Publish failed for {package}@{version}: {reason}")]
    PublishFailed {
        package: String,
        version: String,
        reason: String,
    },

    #[error("Failed to write changelog for {package} at {}: {source}", path.display())]
    ChangelogWriteFailed {
        package: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CadenceError {
    /// True for errors that are recorded per package instead of aborting the run.
    pub fn is_isolated(&self) -> bool {
        matches!(
            self,
            Self::PublishFailed { .. } | Self::ChangelogWriteFailed { .. }
        )
    }

    pub(crate) fn publish_status(package: &str, version: &str, status: ExitStatus) -> Self {
        Self::PublishFailed {
            package: package.to_string(),
            version: version.to_string(),
            reason: format!("publish command exited with {status}"),
        }
    }
}

fn published_suffix(published: &[String]) -> String {
    if published.is_empty() {
        String::new()
    } else {
        format!(" after publishing {}", published.join(", "))
    }
}

/// Helper to create an IO error with file path context
pub fn io_error_with_path<P: AsRef<Path>>(error: io::Error, path: P) -> io::Error {
    io::Error::new(
        error.kind(),
        format!("{}: {}", path.as_ref().display(), error),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_carries_path() {
        let err = io_error_with_path(
            io::Error::new(io::ErrorKind::NotFound, "missing"),
            "/tmp/pkg/package.json",
        );
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(err.to_string(), "/tmp/pkg/package.json: missing");
    }

    #[test]
    fn isolated_errors_are_publish_and_changelog() {
        let publish = CadenceError::PublishFailed {
            package: "core".into(),
            version: "1.0.0".into(),
            reason: "boom".into(),
        };
        assert!(publish.is_isolated());
        assert!(!CadenceError::UnknownPackage("core".into()).is_isolated());
        let deadline = CadenceError::DeadlineExceeded {
            timeout: Duration::from_secs(1),
            published: Vec::new(),
        };
        assert!(!deadline.is_isolated());
    }

    #[test]
    fn deadline_message_lists_published_packages() {
        let none = CadenceError::DeadlineExceeded {
            timeout: Duration::from_secs(30),
            published: Vec::new(),
        };
        assert_eq!(none.to_string(), "Release deadline of 30s exceeded");

        let some = CadenceError::DeadlineExceeded {
            timeout: Duration::from_millis(1500),
            published: vec!["core@1.3.0".into(), "util@0.2.1".into()],
        };
        assert_eq!(
            some.to_string(),
            "Release deadline of 1.5s exceeded after publishing core@1.3.0, util@0.2.1"
        );
    }

    #[test]
    fn missing_dependency_message_names_everything() {
        let err = CadenceError::MissingDependencyVersion {
            package: "cli".into(),
            dependency: "core".into(),
            path: PathBuf::from("cli/Cargo.toml"),
        };
        let msg = err.to_string();
        assert!(msg.contains("'core'"));
        assert!(msg.contains("'cli'"));
        assert!(msg.contains("cli/Cargo.toml"));
    }
}
