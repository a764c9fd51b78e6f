// src/launcher/process.rs
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{info, warn};

use super::LaunchError;

/// How long a killed child gets to be reaped.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(10);

/// A supervised child process that shares our stdio.
pub struct ProcessHandle {
    name: String,
    child: Child,
}

impl ProcessHandle {
    pub fn spawn(name: &str, command: &[String]) -> Result<Self, LaunchError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| LaunchError::EmptyCommand(name.to_string()))?;

        info!("[{}] starting: {}", name, command.join(" "));
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                name: name.to_string(),
                program: program.clone(),
                source,
            })?;

        Ok(Self {
            name: name.to_string(),
            child,
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Kills the child unless it already exited, then waits for it.
    pub async fn terminate(&mut self) {
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }

        if let Err(e) = self.child.start_kill() {
            warn!("[{}] failed to signal process: {}", self.name, e);
        }
        match timeout(TERMINATE_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => info!("[{}] stopped ({})", self.name, status),
            Ok(Err(e)) => warn!("[{}] wait failed: {}", self.name, e),
            Err(_) => warn!(
                "[{}] did not exit within {:?}",
                self.name, TERMINATE_GRACE
            ),
        }
    }
}

/// Replaces `{host}` and `{port}` in every argument.
pub fn substitute_placeholders(command: &[String], host: &str, port: u16) -> Vec<String> {
    let port = port.to_string();
    command
        .iter()
        .map(|arg| arg.replace("{host}", host).replace("{port}", &port))
        .collect()
}
