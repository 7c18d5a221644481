pub mod adapters;
pub mod changelog;
pub mod changeset;
pub mod config;
pub mod errors;
pub mod plan;
pub mod process;
pub mod publish;
pub mod release;
pub mod types;

// Re-export commonly used items
pub use adapters::{DependencyKind, DependencyShape, ManifestFormat, ManifestHandle};
pub use changeset::{load_changesets, parse_changeset, remove_changesets};
pub use config::{Config, PackageConfig};
pub use errors::{CadenceError, Result};
pub use plan::{
    CascadePolicy, DependencyGraph, PlanEntry, PlanReason, ReleasePlan, assemble, cascade,
    retarget_requirement,
};
pub use release::{
    DependentUpdate, PackageAction, ReleaseOptions, RunReport, Stage, release_plan, run_release,
};
pub use types::{Bump, ChangeRecord, DependencyUpdate, PublishRecord, RunMode};
