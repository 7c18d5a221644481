use crate::ui::{log_hint, log_success_value, log_warning};
use cadence_core::{
    Config, ReleaseOptions, RunMode, RunReport, errors::Result, load_changesets, run_release,
};
use std::path::Path;

pub const NOTHING_TO_RELEASE: &str = "No changesets found; nothing to release.";

/// Run `version` or `publish` from the repository at `root` and print the outcome.
pub async fn run(root: &Path, mode: RunMode, dry_run: bool) -> Result<RunReport> {
    let config = Config::load(root)?;
    let records = load_changesets(&config.release.changesets_dir)?;
    if records.is_empty() {
        println!("{NOTHING_TO_RELEASE}");
    }

    let report = run_release(&config, records, ReleaseOptions::new(mode).dry_run(dry_run)).await?;
    print_report(&report);
    Ok(report)
}

fn print_report(report: &RunReport) {
    if report.is_empty() {
        return;
    }

    println!("Planned releases:");
    for action in &report.actions {
        println!(
            "  {}: {} -> {} ({})",
            action.package, action.from, action.to, action.bump
        );
    }
    for dependent in &report.dependent_updates {
        let updates: Vec<String> = dependent
            .dependency_updates
            .iter()
            .map(|u| format!("{} {} -> {}", u.name, u.old_requirement, u.new_requirement))
            .collect();
        println!("  {}: dependencies updated ({})", dependent.package, updates.join(", "));
    }

    if report.dry_run {
        log_hint("Dry-run: no files modified. Run again without --dry-run to apply.");
        return;
    }

    for action in &report.actions {
        log_success_value(&action.package, &action.to.to_string());
    }
    if report.removed_changesets > 0 {
        println!("Removed {} consumed changeset(s).", report.removed_changesets);
    }
    for failure in &report.changelog_failures {
        log_warning(&failure.to_string());
    }

    for record in &report.publish {
        let target = format!("{}@{}", record.package, record.version);
        if record.skipped_as_already_published {
            log_success_value("Already published", &target);
        } else if record.succeeded {
            log_success_value("Published", &target);
        } else if let Some(err) = &record.error {
            log_warning(&err.to_string());
        }
    }
}
