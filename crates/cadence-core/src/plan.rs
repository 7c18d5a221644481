//! Release plan assembly: merge change records, cascade to dependents, order packages.
use crate::adapters::DependencyKind;
use crate::errors::{CadenceError, Result};
use crate::types::{Bump, ChangeRecord};
use rustc_hash::FxHashMap;
use semver::Version;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

/// Why a package is part of the plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanReason {
    /// Named by at least one change record
    Direct,
    /// Added because packages it depends on are released
    Dependency { on: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub bump: Bump,
    /// Contributing records, in input order
    pub records: Vec<ChangeRecord>,
    pub reason: PlanReason,
}

/// Per-package outcome of merging change records, keyed by package name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleasePlan {
    entries: BTreeMap<String, PlanEntry>,
}

impl ReleasePlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, package: &str) -> Option<&PlanEntry> {
        self.entries.get(package)
    }

    pub fn contains(&self, package: &str) -> bool {
        self.entries.contains_key(package)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PlanEntry)> {
        self.entries.iter()
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Human-readable report, one line per package.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (name, entry) in &self.entries {
            let _ = write!(out, "{name}: {}", entry.bump);
            match &entry.reason {
                PlanReason::Direct => {
                    let count = entry.records.len();
                    let noun = if count == 1 { "changeset" } else { "changesets" };
                    let _ = writeln!(out, " ({count} {noun})");
                }
                PlanReason::Dependency { on } => {
                    let _ = writeln!(out, " (depends on {})", on.join(", "));
                }
            }
        }
        out
    }
}

/// Merge change records into a release plan.
///
/// The resolved bump of each package is the most severe one across the records naming it.
pub fn assemble(records: &[ChangeRecord]) -> ReleasePlan {
    let mut entries: BTreeMap<String, PlanEntry> = BTreeMap::new();
    for record in records {
        for package in &record.packages {
            entries
                .entry(package.clone())
                .and_modify(|entry| {
                    entry.bump = entry.bump.max(record.bump);
                    entry.records.push(record.clone());
                })
                .or_insert_with(|| PlanEntry {
                    bump: record.bump,
                    records: vec![record.clone()],
                    reason: PlanReason::Direct,
                });
        }
    }
    ReleasePlan { entries }
}

/// Dependency edges between configured packages, as declared in their manifests.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// package -> (dependency, kind)
    edges: FxHashMap<String, Vec<(String, DependencyKind)>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dependency(&mut self, package: &str, dependency: &str, kind: DependencyKind) {
        let deps = self.edges.entry(package.to_string()).or_default();
        if !deps.iter().any(|(name, k)| name == dependency && *k == kind) {
            deps.push((dependency.to_string(), kind));
        }
    }

    /// Packages declaring `dependency`, in name order.
    pub fn dependents_of(&self, dependency: &str, include_dev: bool) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .edges
            .iter()
            .filter(|(_, deps)| {
                deps.iter()
                    .any(|(name, kind)| name == dependency && (include_dev || !kind.is_dev()))
            })
            .map(|(package, _)| package.as_str())
            .collect();
        out.sort_unstable();
        out
    }

    fn runtime_dependencies(&self, package: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(package)
            .into_iter()
            .flatten()
            .filter(|(_, kind)| !kind.is_dev())
            .map(|(name, _)| name.as_str())
    }
}

/// How dependents of released packages are bumped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadePolicy {
    /// `None` disables the cascade
    pub bump: Option<Bump>,
    /// Whether dev dependencies trigger a cascade
    pub include_dev: bool,
}

impl Default for CascadePolicy {
    fn default() -> Self {
        Self {
            bump: Some(Bump::Patch),
            include_dev: false,
        }
    }
}

/// Add dependents of planned packages until no new package is added.
///
/// Planned packages are never downgraded; one planned below the cascade severity is raised.
pub fn cascade(plan: &mut ReleasePlan, graph: &DependencyGraph, policy: &CascadePolicy) {
    let Some(bump) = policy.bump else {
        return;
    };

    loop {
        let mut changed = false;
        let released: Vec<String> = plan.entries.keys().cloned().collect();
        for dependency in &released {
            for dependent in graph.dependents_of(dependency, policy.include_dev) {
                if dependent == dependency {
                    continue;
                }
                match plan.entries.get_mut(dependent) {
                    Some(entry) => {
                        if bump > entry.bump {
                            entry.bump = bump;
                            changed = true;
                        }
                        if let PlanReason::Dependency { on } = &mut entry.reason
                            && !on.contains(dependency)
                        {
                            on.push(dependency.clone());
                        }
                    }
                    None => {
                        plan.entries.insert(
                            dependent.to_string(),
                            PlanEntry {
                                bump,
                                records: Vec::new(),
                                reason: PlanReason::Dependency {
                                    on: vec![dependency.clone()],
                                },
                            },
                        );
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }
}

/// Order packages so runtime dependencies come first, name order otherwise.
pub fn dependency_order<'a>(
    packages: impl IntoIterator<Item = &'a str>,
    graph: &DependencyGraph,
) -> Result<Vec<String>> {
    let include: BTreeSet<&str> = packages.into_iter().collect();
    let mut indegree: BTreeMap<&str, usize> = include.iter().map(|name| (*name, 0)).collect();
    let mut forward: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for &name in &include {
        for dep in graph.runtime_dependencies(name) {
            if dep != name && include.contains(dep) {
                forward.entry(dep).or_default().push(name);
                if let Some(degree) = indegree.get_mut(name) {
                    *degree += 1;
                }
            }
        }
    }

    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut out = Vec::with_capacity(include.len());

    while let Some(name) = ready.pop_first() {
        out.push(name.to_string());
        for &child in forward.get(name).into_iter().flatten() {
            if let Some(degree) = indegree.get_mut(child) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(child);
                }
            }
        }
    }

    if out.len() != include.len() {
        let stuck: Vec<&str> = indegree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(name, _)| *name)
            .collect();
        return Err(CadenceError::Config(format!(
            "dependency cycle detected among packages: {}",
            stuck.join(", ")
        )));
    }
    Ok(out)
}

/// Rewrite a dependency requirement to track `new_version`.
///
/// Keeps `^`, `~`, `=` and `workspace:` operators. Returns `None` when the
/// requirement already matches or should not be touched (`*`, comparison
/// ranges, path/git/url specifiers).
pub fn retarget_requirement(old: &str, new_version: &Version) -> Option<String> {
    let new_version = new_version.to_string();
    let trimmed = old.trim();
    if trimmed.is_empty() {
        return Some(new_version);
    }

    if let Some(suffix) = trimmed.strip_prefix("workspace:") {
        return match suffix {
            "*" => None,
            "^" | "~" => Some(format!("workspace:{suffix}{new_version}")),
            _ if suffix.starts_with('^') => Some(format!("workspace:^{new_version}")),
            _ if suffix.starts_with('~') => Some(format!("workspace:~{new_version}")),
            _ if suffix == new_version => None,
            _ => Some(format!("workspace:{new_version}")),
        };
    }

    if trimmed == "*" {
        return None;
    }

    for prefix in ["file:", "link:", "npm:", "git:", "git+", "http:", "https:", "path:"] {
        if trimmed.starts_with(prefix) {
            return None;
        }
    }

    for operator in ['^', '~', '='] {
        if let Some(rest) = trimmed.strip_prefix(operator) {
            if rest.trim() == new_version {
                return None;
            }
            return Some(format!("{operator}{new_version}"));
        }
    }

    if trimmed == new_version || trimmed.starts_with('>') || trimmed.starts_with('<') {
        return None;
    }
    Some(new_version)
}
