mod cli;
mod logging;
mod release;
mod status;
mod ui;

use cadence_core::RunMode;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    let root = match cli.root {
        Some(dir) => dir,
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                ui::log_error(&format!("Failed to get current directory: {e}"));
                return ExitCode::from(1);
            }
        },
    };
    tracing::debug!(root = %root.display(), "resolved repository root");

    match cli.command {
        Commands::Version(args) => release_command(root, RunMode::Version, args.dry_run).await,
        Commands::Publish(args) => release_command(root, RunMode::Publish, args.dry_run).await,
        Commands::Status => match status::status_report(&root).await {
            Ok(report) => {
                print!("{report}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                ui::log_error(&format!("Failed to compute release status: {e}"));
                ExitCode::from(1)
            }
        },
        Commands::Config => match status::config_report(&root) {
            Ok(report) => {
                print!("{report}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                ui::log_error(&format!("Failed to load configuration: {e}"));
                ExitCode::from(1)
            }
        },
    }
}

async fn release_command(root: PathBuf, mode: RunMode, dry_run: bool) -> ExitCode {
    match release::run(&root, mode, dry_run).await {
        Ok(report) if report.has_publish_failures() => {
            let failed: Vec<String> = report
                .publish_failures()
                .map(|record| record.package.clone())
                .collect();
            ui::log_error(&format!("Failed to publish: {}", failed.join(", ")));
            ExitCode::from(1)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            ui::log_error(&format!("Failed to {} packages: {e}", mode.as_str()));
            ExitCode::from(1)
        }
    }
}
