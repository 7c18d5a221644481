use crate::adapters::{DependencyKind, DependencyShape, ManifestFormat, ManifestHandle};
use crate::errors::CadenceError;
use semver::Version;

const CARGO_TOML: &str = r#"# Top-level comment stays put
[package]
name = "cadence-cli"
version = "0.5.3" # bumped by release tooling
edition = "2024"

[dependencies]
cadence-core = { path = "../core", version = "1.2.0" }
serde = "1.0"
cadence-macros = "=0.3.1"

[dependencies.cadence-plugin]
path = "../plugin"
version = "~2.0.1"

[dev-dependencies]
cadence-testing = "0.1.0"

[dev_dependencies]
cadence-fixtures = "0.2.0"
"#;

fn handle() -> ManifestHandle {
    ManifestHandle::parse("crates/cli/Cargo.toml", CARGO_TOML).unwrap()
}

#[test]
fn reads_package_section() {
    let manifest = handle();
    assert_eq!(manifest.format(), ManifestFormat::Toml);
    assert_eq!(manifest.name(), Some("cadence-cli"));
    assert_eq!(manifest.version(), &Version::new(0, 5, 3));
}

#[test]
fn set_version_preserves_everything_else() {
    let mut manifest = handle();
    manifest.set_version(&Version::new(0, 5, 4));
    let out = manifest.serialize().unwrap();

    let expected = CARGO_TOML.replace(
        "version = \"0.5.3\" # bumped",
        "version = \"0.5.4\" # bumped",
    );
    assert_eq!(out, expected);

    let reparsed = ManifestHandle::parse("crates/cli/Cargo.toml", &out).unwrap();
    assert_eq!(reparsed.version(), &Version::new(0, 5, 4));
}

#[test]
fn dependency_shapes_cover_inline_and_dotted_tables() {
    let manifest = handle();
    assert_eq!(
        manifest.dependency_shape(DependencyKind::Runtime, "cadence-core"),
        Some(DependencyShape::Detailed)
    );
    assert_eq!(
        manifest.dependency_shape(DependencyKind::Runtime, "cadence-plugin"),
        Some(DependencyShape::Detailed)
    );
    assert_eq!(
        manifest.dependency_shape(DependencyKind::Runtime, "serde"),
        Some(DependencyShape::Bare)
    );
    assert_eq!(
        manifest
            .dependency_version(DependencyKind::Dev, "cadence-testing")
            .unwrap()
            .as_deref(),
        Some("0.1.0")
    );
    assert_eq!(
        manifest
            .dependency_version(DependencyKind::DevAlt, "cadence-fixtures")
            .unwrap()
            .as_deref(),
        Some("0.2.0")
    );
}

#[test]
fn rewrites_dependencies_in_place() {
    let mut manifest = handle();
    for (kind, name, req) in [
        (DependencyKind::Runtime, "cadence-core", "1.3.0"),
        (DependencyKind::Runtime, "cadence-plugin", "~2.1.0"),
        (DependencyKind::Runtime, "cadence-macros", "=0.3.2"),
        (DependencyKind::Dev, "cadence-testing", "0.1.1"),
    ] {
        assert!(manifest.set_dependency_version(kind, name, req).unwrap());
    }
    let out = manifest.serialize().unwrap();

    assert!(out.contains("cadence-core = { path = \"../core\", version = \"1.3.0\" }"));
    assert!(out.contains("[dependencies.cadence-plugin]\npath = \"../plugin\"\nversion = \"~2.1.0\"\n"));
    assert!(out.contains("cadence-macros = \"=0.3.2\""));
    assert!(out.contains("cadence-testing = \"0.1.1\""));
    assert!(out.contains("serde = \"1.0\""));
    assert!(out.starts_with("# Top-level comment stays put\n"));
}

#[test]
fn lists_dependencies_in_order() {
    let manifest = handle();
    assert_eq!(
        manifest.dependency_names(DependencyKind::Runtime),
        vec!["cadence-core", "serde", "cadence-macros", "cadence-plugin"]
    );
}

#[test]
fn path_only_and_workspace_dependencies_are_unpinned() {
    let input = r#"[package]
name = "app"
version = "1.0.0"

[dependencies]
core = { path = "../core" }
util = { workspace = true }
"#;
    let manifest = ManifestHandle::parse("app/Cargo.toml", input).unwrap();
    for dep in ["core", "util"] {
        assert_eq!(
            manifest.dependency_shape(DependencyKind::Runtime, dep),
            Some(DependencyShape::Unpinned)
        );
        assert!(matches!(
            manifest.dependency_version(DependencyKind::Runtime, dep),
            Err(CadenceError::MissingDependencyVersion { .. })
        ));
    }
}

#[test]
fn missing_package_fields_are_malformed() {
    for input in [
        "[workspace]\nmembers = [\"crates/*\"]\n",
        "[package]\nversion = \"1.0.0\"\n",
        "[package]\nname = \"a\"\n",
        "[package]\nname = \"a\"\nversion.workspace = true\n",
        "[package\nname = \"a\"\n",
    ] {
        let err = ManifestHandle::parse("Cargo.toml", input).unwrap_err();
        assert!(
            matches!(err, CadenceError::MalformedManifest { .. }),
            "{input}: {err}"
        );
    }
}

#[test]
fn non_semver_version_is_invalid() {
    let err = ManifestHandle::parse("Cargo.toml", "[package]\nname = \"a\"\nversion = \"one\"\n")
        .unwrap_err();
    assert!(matches!(err, CadenceError::InvalidVersion { .. }));
}
