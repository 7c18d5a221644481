use std::io;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::ExitStatus;
use tokio::process::{Child, ChildStdout, Command};

/// Builds a `Command` running `line` through a shell in `working_dir`.
///
/// Without an explicit shell this is `sh -c` on Unix and `cmd /C` on Windows,
/// so `.cmd`/`.bat` wrappers installed by npm, pnpm or composer resolve via PATHEXT.
/// On Unix the shell leads its own process group; spawn it with [`ShellChild::spawn`]
/// so everything it starts is killed along with it.
pub fn shell_command(shell: Option<&str>, line: &str, working_dir: &Path) -> Command {
    let mut cmd = match shell {
        Some(shell) => {
            let mut cmd = std::process::Command::new(shell);
            cmd.arg(if is_cmd(shell) { "/C" } else { "-c" });
            cmd
        }
        None if cfg!(windows) => {
            let mut cmd = std::process::Command::new("cmd");
            cmd.arg("/C");
            cmd
        }
        None => {
            let mut cmd = std::process::Command::new("sh");
            cmd.arg("-c");
            cmd
        }
    };
    cmd.arg(line).current_dir(working_dir);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut cmd = Command::from(cmd);
    cmd.kill_on_drop(true);
    cmd
}

/// A running shell command.
///
/// Dropped before [`ShellChild::wait`] returns, it kills the shell's whole
/// process group, including anything the command line forked.
#[derive(Debug)]
pub struct ShellChild {
    child: Child,
    #[cfg(unix)]
    group: Option<nix::unistd::Pid>,
    exited: bool,
}

impl ShellChild {
    pub fn spawn(command: &mut Command) -> io::Result<Self> {
        let child = command.spawn()?;
        Ok(Self {
            #[cfg(unix)]
            group: child
                .id()
                .and_then(|id| i32::try_from(id).ok())
                .map(nix::unistd::Pid::from_raw),
            child,
            exited: false,
        })
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait().await?;
        self.exited = true;
        Ok(status)
    }

    #[cfg(unix)]
    fn kill_group(&self) {
        use nix::sys::signal::{Signal, killpg};

        if let Some(group) = self.group
            && let Err(errno) = killpg(group, Signal::SIGKILL)
        {
            tracing::debug!(%group, %errno, "process group already gone");
        }
    }

    #[cfg(not(unix))]
    fn kill_group(&self) {}
}

impl Drop for ShellChild {
    fn drop(&mut self) {
        if !self.exited {
            self.kill_group();
        }
    }
}

fn is_cmd(shell: &str) -> bool {
    let program = shell.rsplit(['/', '\\']).next().unwrap_or(shell);
    program.eq_ignore_ascii_case("cmd") || program.eq_ignore_ascii_case("cmd.exe")
}
