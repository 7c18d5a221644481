//! Release orchestration: load, compute, apply, changelog, publish.
use crate::adapters::{DependencyKind, ManifestHandle};
use crate::changelog;
use crate::changeset::remove_changesets;
use crate::config::Config;
use crate::errors::{CadenceError, Result, io_error_with_path};
use crate::plan::{
    DependencyGraph, PlanReason, ReleasePlan, assemble, cascade, dependency_order,
    retarget_requirement,
};
use crate::publish::publish_action;
use crate::types::{Bump, ChangeRecord, DependencyUpdate, PublishRecord, RunMode};
use chrono::NaiveDate;
use semver::Version;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Last state reached by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Idle,
    Loaded,
    Computed,
    Applied,
    ChangelogWritten,
    Published,
    /// Publishing was not part of the run
    Skipped,
}

/// Everything needed to release one package.
#[derive(Debug, Clone)]
pub struct PackageAction {
    pub package: String,
    pub manifest: PathBuf,
    pub from: Version,
    pub to: Version,
    pub bump: Bump,
    pub reason: PlanReason,
    pub records: Vec<ChangeRecord>,
    pub dependency_updates: Vec<DependencyUpdate>,
    pub changelog_path: PathBuf,
    pub publish: Option<String>,
    pub probe: Option<String>,
    pub working_dir: PathBuf,
}

/// Dependency edits for a package that is not itself released.
#[derive(Debug, Clone)]
pub struct DependentUpdate {
    pub package: String,
    pub manifest: PathBuf,
    pub dependency_updates: Vec<DependencyUpdate>,
}

#[derive(Debug, Clone, Copy)]
pub struct ReleaseOptions {
    pub mode: RunMode,
    /// Stop after computing; nothing is written, published or deleted
    pub dry_run: bool,
    /// Date stamped on changelog sections
    pub today: NaiveDate,
}

impl ReleaseOptions {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            dry_run: false,
            today: chrono::Local::now().date_naive(),
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub mode: RunMode,
    pub dry_run: bool,
    pub stage: Stage,
    /// Released packages, dependencies first
    pub actions: Vec<PackageAction>,
    pub dependent_updates: Vec<DependentUpdate>,
    pub changelog_failures: Vec<CadenceError>,
    pub publish: Vec<PublishRecord>,
    /// Change record files deleted after applying
    pub removed_changesets: usize,
}

impl RunReport {
    fn new(options: &ReleaseOptions) -> Self {
        Self {
            mode: options.mode,
            dry_run: options.dry_run,
            stage: Stage::Idle,
            actions: Vec::new(),
            dependent_updates: Vec::new(),
            changelog_failures: Vec::new(),
            publish: Vec::new(),
            removed_changesets: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn publish_failures(&self) -> impl Iterator<Item = &PublishRecord> {
        self.publish.iter().filter(|record| !record.succeeded)
    }

    pub fn has_publish_failures(&self) -> bool {
        self.publish_failures().next().is_some()
    }
}

/// Manifests of every configured package, keyed by package name.
struct Loaded {
    manifests: BTreeMap<String, ManifestHandle>,
    graph: DependencyGraph,
}

/// Result of the compute stage, ready to be written.
struct Computed {
    actions: Vec<PackageAction>,
    dependent_updates: Vec<DependentUpdate>,
    writes: Vec<(PathBuf, String)>,
}

/// Run a release over `records`.
///
/// A single deadline starts here. In version mode it covers loading, computing
/// and applying; in publish mode it covers every stage through publishing.
pub async fn run_release(
    config: &Config,
    records: Vec<ChangeRecord>,
    options: ReleaseOptions,
) -> Result<RunReport> {
    let timeout = config.release.timeout();
    let deadline = Instant::now().checked_add(timeout).ok_or_else(|| {
        CadenceError::Config(format!(
            "release.timeout_secs = {} is out of range",
            config.release.timeout_secs
        ))
    })?;
    let mut report = RunReport::new(&options);

    debug!(mode = options.mode.as_str(), dry_run = options.dry_run, ?timeout, "starting release run");
    match options.mode {
        RunMode::Version => {
            let computed =
                guarded(deadline, timeout, prepare(config, &records, &options, &mut report)).await?;
            if let Some(computed) = computed {
                finish(&records, computed, &mut report, &options).await?;
            }
        }
        RunMode::Publish => {
            let outcome = guarded(deadline, timeout, async {
                if let Some(computed) = prepare(config, &records, &options, &mut report).await? {
                    finish(&records, computed, &mut report, &options).await?;
                    publish_all(config, &mut report).await;
                }
                Ok(())
            })
            .await;
            outcome.map_err(|err| with_published(err, &report))?;
        }
    }
    Ok(report)
}

/// Plan that `run_release` would act on, cascade included, without computing versions.
pub async fn release_plan(config: &Config, records: &[ChangeRecord]) -> Result<ReleasePlan> {
    let mut plan = assemble(records);
    if plan.is_empty() {
        return Ok(plan);
    }
    let loaded = load(config, &plan).await?;
    cascade(&mut plan, &loaded.graph, &config.cascade);
    Ok(plan)
}

async fn guarded<T>(
    deadline: Instant,
    timeout: std::time::Duration,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout_at(deadline, work).await {
        Ok(result) => result,
        Err(_) => {
            warn!(?timeout, "release deadline exceeded, aborting");
            Err(CadenceError::DeadlineExceeded {
                timeout,
                published: Vec::new(),
            })
        }
    }
}

/// Attach the packages that went live before an expired deadline.
fn with_published(err: CadenceError, report: &RunReport) -> CadenceError {
    match err {
        CadenceError::DeadlineExceeded { timeout, .. } => {
            let published: Vec<String> = report
                .publish
                .iter()
                .filter(|record| record.succeeded)
                .map(|record| format!("{}@{}", record.package, record.version))
                .collect();
            for target in &published {
                warn!(release = %target, "published before the deadline");
            }
            CadenceError::DeadlineExceeded { timeout, published }
        }
        other => other,
    }
}

/// Load, compute and apply. Returns `None` when there is nothing to write.
async fn prepare(
    config: &Config,
    records: &[ChangeRecord],
    options: &ReleaseOptions,
    report: &mut RunReport,
) -> Result<Option<Computed>> {
    let mut plan = assemble(records);
    if plan.is_empty() {
        debug!("no change records, nothing to release");
        return Ok(None);
    }

    let loaded = load(config, &plan).await?;
    report.stage = Stage::Loaded;
    debug!(manifests = loaded.manifests.len(), "manifests loaded");

    cascade(&mut plan, &loaded.graph, &config.cascade);
    let computed = compute(config, &plan, loaded)?;
    report.stage = Stage::Computed;
    report.actions = computed.actions.clone();
    report.dependent_updates = computed.dependent_updates.clone();

    if options.dry_run {
        debug!("dry run, stopping before writes");
        return Ok(None);
    }

    apply(&computed.writes).await?;
    report.stage = Stage::Applied;
    for action in &computed.actions {
        info!(package = %action.package, from = %action.from, to = %action.to, "version applied");
    }
    Ok(Some(computed))
}

async fn load(config: &Config, plan: &ReleasePlan) -> Result<Loaded> {
    for package in plan.packages() {
        config.package(package)?;
    }

    let mut manifests = BTreeMap::new();
    for (name, package) in &config.packages {
        let manifest = ManifestHandle::load(&package.manifest).await?;
        if let Some(declared) = manifest.name()
            && declared != name
        {
            return Err(CadenceError::Config(format!(
                "package '{name}' points at {} which declares name '{declared}'",
                package.manifest.display()
            )));
        }
        manifests.insert(name.clone(), manifest);
    }

    let mut graph = DependencyGraph::new();
    for (name, manifest) in &manifests {
        for kind in DependencyKind::ALL {
            for dependency in manifest.dependency_names(kind) {
                if dependency != *name && manifests.contains_key(&dependency) {
                    graph.add_dependency(name, &dependency, kind);
                }
            }
        }
    }
    Ok(Loaded { manifests, graph })
}

fn compute(config: &Config, plan: &ReleasePlan, loaded: Loaded) -> Result<Computed> {
    let Loaded {
        mut manifests,
        graph,
    } = loaded;

    let mut targets: BTreeMap<&str, (Version, Version)> = BTreeMap::new();
    for (name, entry) in plan.iter() {
        let manifest = manifests
            .get(name)
            .ok_or_else(|| CadenceError::UnknownPackage(name.clone()))?;
        let from = manifest.version().clone();
        let to = entry.bump.apply(&from);
        targets.insert(name.as_str(), (from, to));
    }

    let mut updates: BTreeMap<String, Vec<DependencyUpdate>> = BTreeMap::new();
    for (name, manifest) in manifests.iter_mut() {
        for kind in DependencyKind::ALL {
            for (dependency, (_, to)) in &targets {
                if *dependency == name.as_str() {
                    continue;
                }
                let Some(old) = manifest.dependency_version(kind, dependency)? else {
                    continue;
                };
                let Some(new) = retarget_requirement(&old, to) else {
                    continue;
                };
                manifest.set_dependency_version(kind, dependency, &new)?;
                updates.entry(name.clone()).or_default().push(DependencyUpdate {
                    name: dependency.to_string(),
                    kind,
                    old_requirement: old,
                    new_requirement: new,
                    new_version: to.clone(),
                });
            }
        }
    }

    let mut actions = Vec::with_capacity(targets.len());
    for name in dependency_order(targets.keys().copied(), &graph)? {
        let (Some(entry), Some((from, to)), Some(manifest), Ok(package)) = (
            plan.get(&name),
            targets.get(name.as_str()),
            manifests.get_mut(&name),
            config.package(&name),
        ) else {
            return Err(CadenceError::UnknownPackage(name));
        };
        manifest.set_version(to);
        actions.push(PackageAction {
            manifest: package.manifest.clone(),
            from: from.clone(),
            to: to.clone(),
            bump: entry.bump,
            reason: entry.reason.clone(),
            records: entry.records.clone(),
            dependency_updates: updates.remove(&name).unwrap_or_default(),
            changelog_path: package.changelog.clone(),
            publish: package.publish.clone(),
            probe: package.probe.clone(),
            working_dir: package.working_dir.clone(),
            package: name,
        });
    }

    let dependent_updates: Vec<DependentUpdate> = updates
        .into_iter()
        .filter_map(|(package, dependency_updates)| {
            let manifest = manifests.get(&package)?.path().to_path_buf();
            Some(DependentUpdate {
                package,
                manifest,
                dependency_updates,
            })
        })
        .collect();

    let mut writes = Vec::new();
    for action in &actions {
        if let Some(manifest) = manifests.get(&action.package) {
            writes.push((action.manifest.clone(), manifest.serialize()?));
        }
    }
    for dependent in &dependent_updates {
        if let Some(manifest) = manifests.get(&dependent.package) {
            writes.push((dependent.manifest.clone(), manifest.serialize()?));
        }
    }

    Ok(Computed {
        actions,
        dependent_updates,
        writes,
    })
}

async fn apply(writes: &[(PathBuf, String)]) -> Result<()> {
    for (path, content) in writes {
        tokio::fs::write(path, content)
            .await
            .map_err(|e| io_error_with_path(e, path))?;
        debug!(path = %path.display(), "manifest written");
    }
    Ok(())
}

/// Write changelogs and delete the consumed change record files.
async fn finish(
    records: &[ChangeRecord],
    computed: Computed,
    report: &mut RunReport,
    options: &ReleaseOptions,
) -> Result<()> {
    report.changelog_failures = write_changelogs(&computed.actions, options.today).await;
    report.stage = Stage::ChangelogWritten;
    report.removed_changesets = remove_changesets(records)?;
    if report.mode == RunMode::Version {
        report.stage = Stage::Skipped;
    }
    Ok(())
}

async fn write_changelogs(actions: &[PackageAction], today: NaiveDate) -> Vec<CadenceError> {
    let mut tasks = JoinSet::new();
    for action in actions {
        let section = changelog::render_section(
            &action.to,
            today,
            action.bump,
            &action.records,
            &action.dependency_updates,
        );
        let package = action.package.clone();
        let path = action.changelog_path.clone();
        tasks.spawn(async move {
            let result = changelog::write_section(&path, &section).await;
            (package, path, result)
        });
    }

    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, _, Ok(()))) => {}
            Ok((package, path, Err(source))) => {
                let err = CadenceError::ChangelogWriteFailed {
                    package,
                    path,
                    source,
                };
                warn!(error = %err, "changelog not written");
                failures.push(err);
            }
            Err(join_error) => {
                warn!(error = %join_error, "changelog task did not complete");
                failures.push(CadenceError::Io(std::io::Error::other(join_error)));
            }
        }
    }
    failures
}

async fn publish_all(config: &Config, report: &mut RunReport) {
    let shell = config.release.shell.as_deref();
    for action in &report.actions {
        if let Some(record) = publish_action(action, shell).await {
            report.publish.push(record);
        }
    }
    report.stage = Stage::Published;
}
