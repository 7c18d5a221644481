use crate::release::NOTHING_TO_RELEASE;
use cadence_core::{Config, errors::Result, load_changesets, release_plan};
use std::path::Path;

/// Pending plan as printed by `cadence status`.
pub async fn status_report(root: &Path) -> Result<String> {
    let config = Config::load(root)?;
    let records = load_changesets(&config.release.changesets_dir)?;
    if records.is_empty() {
        return Ok(format!("{NOTHING_TO_RELEASE}\n"));
    }

    let plan = release_plan(&config, &records).await?;
    let noun = if records.len() == 1 { "change record" } else { "change records" };
    let mut out = format!("{} {noun} pending:\n", records.len());
    for line in plan.summary().lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    Ok(out)
}

/// Resolved configuration as printed by `cadence config`.
pub fn config_report(root: &Path) -> Result<String> {
    Config::load(root)?.to_toml()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn reports_nothing_to_release() {
        let temp = tempfile::tempdir().unwrap();
        let out = status_report(temp.path()).await.unwrap();
        assert_eq!(out, "No changesets found; nothing to release.\n");
    }

    #[tokio::test]
    async fn reports_pending_plan() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join(".cadence/changesets")).unwrap();
        fs::create_dir_all(root.join("web")).unwrap();
        fs::write(
            root.join(".cadence/config.toml"),
            "[packages.web]\nmanifest = \"web/package.json\"\n",
        )
        .unwrap();
        fs::write(
            root.join("web/package.json"),
            "{\n  \"name\": \"web\",\n  \"version\": \"3.0.0\"\n}\n",
        )
        .unwrap();
        fs::write(
            root.join(".cadence/changesets/one.md"),
            "---\nweb: major\n---\n\nbreaking: drop IE\n",
        )
        .unwrap();
        fs::write(
            root.join(".cadence/changesets/two.md"),
            "---\nweb: patch\n---\n\nfix: typo\n",
        )
        .unwrap();

        let out = status_report(root).await.unwrap();
        assert_eq!(out, "2 change records pending:\n  web: major (2 changesets)\n");
        assert!(root.join(".cadence/changesets/one.md").exists());
    }

    #[test]
    fn config_report_is_toml() {
        let temp = tempfile::tempdir().unwrap();
        let out = config_report(temp.path()).unwrap();
        assert!(out.contains("timeout_secs = 120"));
        assert!(out.contains("bump = \"patch\""));
    }
}
