use crate::adapters::{DependencyKind, DependencyShape, ManifestFormat, ManifestHandle};
use crate::errors::CadenceError;
use semver::Version;

const PUBSPEC: &str = "\
name: acme_app
description: Demo application
version: 2.3.1
environment:
  sdk: '>=3.0.0 <4.0.0'
dependencies:
  acme_core: ^1.2.0
  acme_http:
    hosted: https://pub.acme.dev
    version: ^0.4.0
  flutter:
    sdk: flutter
dev_dependencies:
  acme_lints: 1.0.0
";

fn handle() -> ManifestHandle {
    ManifestHandle::parse("apps/acme_app/pubspec.yaml", PUBSPEC).unwrap()
}

#[test]
fn reads_top_level_fields() {
    let manifest = handle();
    assert_eq!(manifest.format(), ManifestFormat::Yaml);
    assert_eq!(manifest.name(), Some("acme_app"));
    assert_eq!(manifest.version(), &Version::new(2, 3, 1));
}

#[test]
fn set_version_changes_only_the_version_bytes() {
    let mut manifest = handle();
    manifest.set_version(&Version::new(2, 4, 0));
    let out = manifest.serialize().unwrap();

    assert_eq!(out, PUBSPEC.replace("version: 2.3.1", "version: 2.4.0"));
    let reparsed = ManifestHandle::parse("pubspec.yaml", &out).unwrap();
    assert_eq!(reparsed.version(), &Version::new(2, 4, 0));
}

#[test]
fn edits_keep_comments_quoting_and_block_scalars() {
    let input = "\
# App manifest
name: app
description: |
  Multi-line text.
  version: not-a-key
version: '0.1.0' # bumped by the release tool

dependencies:
  # internal
  app_core: \"^0.3.0\"   # pinned
  app_http:
    path: ../http
    version: ^0.1.0
  yaml: ^3.1.0
";
    let mut manifest = ManifestHandle::parse("pubspec.yaml", input).unwrap();
    manifest.set_version(&Version::new(0, 2, 0));
    assert!(
        manifest
            .set_dependency_version(DependencyKind::Runtime, "app_core", "^0.4.0")
            .unwrap()
    );
    assert!(
        manifest
            .set_dependency_version(DependencyKind::Runtime, "app_http", "^0.2.0")
            .unwrap()
    );

    let expected = input
        .replace("version: '0.1.0'", "version: '0.2.0'")
        .replace("app_core: \"^0.3.0\"", "app_core: \"^0.4.0\"")
        .replace("version: ^0.1.0", "version: ^0.2.0");
    assert_eq!(manifest.serialize().unwrap(), expected);
}

#[test]
fn flow_style_dependencies_fall_back_to_reserializing() {
    let input = "name: app\nversion: 1.0.0\ndependencies: {app_core: ^1.0.0, yaml: ^3.1.0}\n";
    let mut manifest = ManifestHandle::parse("pubspec.yaml", input).unwrap();
    manifest.set_version(&Version::new(1, 1, 0));
    assert!(
        manifest
            .set_dependency_version(DependencyKind::Runtime, "app_core", "^1.1.0")
            .unwrap()
    );

    let out: serde_yaml::Value = serde_yaml::from_str(&manifest.serialize().unwrap()).unwrap();
    assert_eq!(out["version"].as_str(), Some("1.1.0"));
    assert_eq!(out["dependencies"]["app_core"].as_str(), Some("^1.1.0"));
    assert_eq!(out["dependencies"]["yaml"].as_str(), Some("^3.1.0"));
}

#[test]
fn detects_dependency_shapes() {
    let manifest = handle();
    assert_eq!(
        manifest.dependency_shape(DependencyKind::Runtime, "acme_core"),
        Some(DependencyShape::Bare)
    );
    assert_eq!(
        manifest.dependency_shape(DependencyKind::Runtime, "acme_http"),
        Some(DependencyShape::Detailed)
    );
    assert_eq!(
        manifest.dependency_shape(DependencyKind::Runtime, "flutter"),
        Some(DependencyShape::Unpinned)
    );
    assert_eq!(
        manifest
            .dependency_version(DependencyKind::DevAlt, "acme_lints")
            .unwrap()
            .as_deref(),
        Some("1.0.0")
    );
    assert_eq!(
        manifest
            .dependency_version(DependencyKind::Dev, "acme_lints")
            .unwrap(),
        None
    );
}

#[test]
fn rewrites_dependencies_keeping_shape() {
    let mut manifest = handle();
    assert!(
        manifest
            .set_dependency_version(DependencyKind::Runtime, "acme_core", "^1.3.0")
            .unwrap()
    );
    assert!(
        manifest
            .set_dependency_version(DependencyKind::Runtime, "acme_http", "^0.5.0")
            .unwrap()
    );
    let expected = PUBSPEC
        .replace("acme_core: ^1.2.0", "acme_core: ^1.3.0")
        .replace("version: ^0.4.0", "version: ^0.5.0");
    assert_eq!(manifest.serialize().unwrap(), expected);
}

#[test]
fn unpinned_dependency_cannot_be_rewritten() {
    let mut manifest = handle();
    assert!(matches!(
        manifest.set_dependency_version(DependencyKind::Runtime, "flutter", "1.0.0"),
        Err(CadenceError::MissingDependencyVersion { .. })
    ));
}

#[test]
fn rejects_non_mapping_and_missing_fields() {
    for input in ["- a\n- b\n", "version: 1.0.0\n", "name: a\n", "name: [unclosed\n"] {
        let err = ManifestHandle::parse("pubspec.yaml", input).unwrap_err();
        assert!(
            matches!(err, CadenceError::MalformedManifest { .. }),
            "{input}: {err}"
        );
    }
}
