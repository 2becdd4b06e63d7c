//! Process supervision: spawn, signal, terminate.
//!
//! The supervisor owns a single OS child process per deployment. Both
//! stdout and stderr are redirected, append-mode, into the deployment's
//! output sink; byte-level interleaving between the two streams depends on
//! OS buffering and is not guaranteed.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::errors::HostError;

/// Handle to a supervised child process
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    child: Child,
}

impl ProcessHandle {
    /// OS process id of the child
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Query the exit status without blocking. `None` while the process is
    /// still alive. There is no active health monitoring; a crash after the
    /// pipeline completes is only visible through this query.
    pub fn exit_status(&mut self) -> Result<Option<std::process::ExitStatus>, HostError> {
        Ok(self.child.try_wait()?)
    }

    /// Send a graceful termination signal, escalating to a forceful kill if
    /// the process has not exited within `grace`. Returns once the child is
    /// reaped or the kill has been issued.
    pub async fn terminate(mut self, grace: Duration) -> Result<(), HostError> {
        let pid = Pid::from_raw(self.pid as i32);
        if let Err(e) = kill(pid, Signal::SIGTERM) {
            // Process may have already exited
            debug!("SIGTERM to pid {} failed: {}", self.pid, e);
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!("Process {} exited with {}", self.pid, status);
            }
            Ok(Err(e)) => {
                warn!("Failed to wait on process {}: {}", self.pid, e);
            }
            Err(_) => {
                warn!(
                    "Process {} did not exit within {:?}, killing",
                    self.pid, grace
                );
                self.child
                    .start_kill()
                    .map_err(|e| HostError::Internal(format!("kill failed: {}", e)))?;
                let _ = self.child.wait().await;
            }
        }

        Ok(())
    }
}

/// Spawn `entry_point` under `runner` with the working directory set to the
/// fetched source tree and both output streams appended to the sink.
pub fn spawn(
    runner: &str,
    entry_point: &str,
    working_dir: &Path,
    sink: &Path,
) -> Result<ProcessHandle, HostError> {
    let entry_path = working_dir.join(entry_point);
    if !entry_path.exists() {
        return Err(HostError::SpawnError(format!(
            "entry point not found: {}",
            entry_path.display()
        )));
    }

    let stdout = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(sink)
        .map_err(|e| HostError::SpawnError(format!("failed to open output sink: {}", e)))?;
    let stderr = stdout
        .try_clone()
        .map_err(|e| HostError::SpawnError(format!("failed to clone sink descriptor: {}", e)))?;

    let mut child = Command::new(runner)
        .arg(&entry_path)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| HostError::SpawnError(format!("failed to start process: {}", e)))?;

    let pid = match child.id() {
        Some(pid) => pid,
        None => {
            // Exited before we could observe it
            let status = child.try_wait().ok().flatten();
            return Err(HostError::SpawnError(format!(
                "process exited immediately: {:?}",
                status
            )));
        }
    };

    info!("Spawned process {} for entry point {}", pid, entry_point);

    Ok(ProcessHandle { pid, child })
}
