use crate::errors::{CadenceError, Result, io_error_with_path};
use crate::process::{ShellChild, shell_command};
use crate::release::PackageAction;
use crate::types::PublishRecord;
use semver::Version;
use std::io::IsTerminal;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// Run a probe command and return the first non-empty line it prints.
///
/// The rest of the output is drained before waiting for exit. A probe that
/// exits unsuccessfully or prints nothing reports `None`.
pub async fn probe_live_version(
    shell: Option<&str>,
    command: &str,
    working_dir: &Path,
) -> Result<Option<String>> {
    let mut child = ShellChild::spawn(
        shell_command(shell, command, working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit()),
    )
    .map_err(|e| io_error_with_path(e, working_dir))?;

    let mut value = None;
    if let Some(stdout) = child.take_stdout() {
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                value = Some(trimmed.to_string());
                break;
            }
        }
        let mut rest = lines.into_inner();
        tokio::io::copy(&mut rest, &mut tokio::io::sink()).await?;
    }

    let status = child.wait().await?;
    if !status.success() {
        debug!(command, %status, "probe exited unsuccessfully");
        return Ok(None);
    }
    Ok(value)
}

/// True when a probe value names `version`.
pub fn is_live(probe_value: &str, version: &Version) -> bool {
    let value = probe_value.trim();
    let value = value.strip_prefix('v').unwrap_or(value);
    Version::parse(value).is_ok_and(|live| &live == version)
}

/// Run a publish command with inherited stdio and wait for it to exit.
///
/// The command runs in its own process group, which cannot read from a
/// controlling terminal, so a terminal stdin is replaced with null input.
pub async fn run_publish_command(
    shell: Option<&str>,
    command: &str,
    working_dir: &Path,
) -> std::io::Result<std::process::ExitStatus> {
    let stdin = if cfg!(unix) && std::io::stdin().is_terminal() {
        Stdio::null()
    } else {
        Stdio::inherit()
    };
    let mut child = ShellChild::spawn(
        shell_command(shell, command, working_dir)
            .stdin(stdin)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit()),
    )
    .map_err(|e| io_error_with_path(e, working_dir))?;
    child.wait().await
}

/// Publish one package unless its target version is already live.
///
/// Failures are recorded on the returned record, never propagated.
pub async fn publish_action(action: &PackageAction, shell: Option<&str>) -> Option<PublishRecord> {
    let command = action.publish.as_deref()?;
    let package = action.package.as_str();
    let version = &action.to;

    if let Some(probe) = action.probe.as_deref() {
        match probe_live_version(shell, probe, &action.working_dir).await {
            Ok(Some(live)) if is_live(&live, version) => {
                info!(package, %version, "already published, skipping");
                return Some(PublishRecord::skipped(package, version));
            }
            Ok(live) => debug!(package, live = ?live, "probe did not report target version"),
            Err(err) => {
                warn!(package, error = %err, "probe failed to run");
                return Some(PublishRecord::failed(
                    package,
                    version,
                    CadenceError::PublishFailed {
                        package: package.to_string(),
                        version: version.to_string(),
                        reason: format!("probe command could not run: {err}"),
                    },
                ));
            }
        }
    }

    info!(package, %version, command, "publishing");
    let record = match run_publish_command(shell, command, &action.working_dir).await {
        Ok(status) if status.success() => PublishRecord::published(package, version),
        Ok(status) => PublishRecord::failed(
            package,
            version,
            CadenceError::publish_status(package, &version.to_string(), status),
        ),
        Err(err) => PublishRecord::failed(
            package,
            version,
            CadenceError::PublishFailed {
                package: package.to_string(),
                version: version.to_string(),
                reason: format!("publish command could not run: {err}"),
            },
        ),
    };
    if let Some(err) = &record.error {
        warn!(package, error = %err, "publish failed");
    }
    Some(record)
}
