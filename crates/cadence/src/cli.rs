use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Cadence CLI – coordinated versions, changelogs, and publishing for multi-package repositories
#[derive(Debug, Parser)]
#[command(name = "cadence", version, about, long_about = None)]
pub struct Cli {
    /// Repository root holding .cadence/ (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Consume changesets, bump versions, and update changelogs.
    Version(VersionArgs),

    /// Everything `version` does, then publish released packages.
    #[command(after_long_help = "\
Behavior:\n  - Packages are published dependencies first.\n  - When a probe command prints the target version, the package is skipped.\n  - A failed publish does not stop the remaining packages; the exit code is 1.")]
    Publish(PublishArgs),

    /// Show the pending release plan without modifying anything
    Status,

    /// Print the resolved configuration as TOML
    Config,
}

#[derive(Debug, Args, Default)]
pub struct VersionArgs {
    /// Dry-run: compute and show changes without modifying files
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args, Default)]
pub struct PublishArgs {
    /// Dry-run: compute and show changes without writing or publishing
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version() {
        let cli = Cli::try_parse_from(["cadence", "version"]).unwrap();
        match cli.command {
            Commands::Version(args) => assert!(!args.dry_run),
            _ => panic!("wrong variant"),
        }
        assert!(cli.root.is_none());
    }

    #[test]
    fn parses_publish_dry_run() {
        let cli = Cli::try_parse_from(["cadence", "publish", "--dry-run"]).unwrap();
        match cli.command {
            Commands::Publish(args) => assert!(args.dry_run),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn root_is_global() {
        let cli = Cli::try_parse_from(["cadence", "status", "--root", "/repo"]).unwrap();
        assert!(matches!(cli.command, Commands::Status));
        assert_eq!(cli.root, Some(PathBuf::from("/repo")));

        let cli = Cli::try_parse_from(["cadence", "--root", "repo", "config"]).unwrap();
        assert!(matches!(cli.command, Commands::Config));
        assert_eq!(cli.root, Some(PathBuf::from("repo")));
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(Cli::try_parse_from(["cadence", "status", "--dry-run"]).is_err());
        assert!(Cli::try_parse_from(["cadence"]).is_err());
    }
}
