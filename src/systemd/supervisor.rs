use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::error::TunnelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Running,
    NotRunning,
    Failed,
}

impl UnitStatus {
    /// Map the first line printed by `systemctl is-active`.
    pub fn from_is_active(output: &str) -> Self {
        match output.lines().next().map(str::trim) {
            Some("active") => UnitStatus::Running,
            Some("failed") => UnitStatus::Failed,
            _ => UnitStatus::NotRunning,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UnitStatus::Running => "running",
            UnitStatus::NotRunning => "not running",
            UnitStatus::Failed => "failed",
        }
    }
}

/// The service manager that actually runs tunnels. Calls block until the
/// manager answers; nothing here waits for the unit itself to settle.
pub trait Supervisor {
    /// Re-scan unit files.
    async fn reload(&self) -> Result<(), TunnelError>;
    async fn start(&self, service: &str) -> Result<(), TunnelError>;
    /// Start now and register for future logins.
    async fn enable_now(&self, service: &str) -> Result<(), TunnelError>;
    /// Register for future logins without touching the running instance.
    async fn enable(&self, service: &str) -> Result<(), TunnelError>;
    /// Stop if running, then start.
    async fn restart(&self, service: &str) -> Result<(), TunnelError>;
    async fn stop(&self, service: &str) -> Result<(), TunnelError>;
    async fn disable(&self, service: &str) -> Result<(), TunnelError>;
    /// Query failures collapse to [`UnitStatus::NotRunning`].
    async fn status(&self, service: &str) -> UnitStatus;
}

/// `systemctl --user`.
pub struct Systemctl {
    program: PathBuf,
}

impl Systemctl {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--user").args(args);
        cmd.stdin(Stdio::null());
        cmd
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} --user {}", display(&self.program), args.join(" "))
    }

    async fn run(&self, args: &[&str]) -> Result<(), TunnelError> {
        let description = self.describe(args);
        tracing::debug!(command = %description, "running");

        let output = self
            .command(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| TunnelError::external(&description, e.to_string()))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = match stderr.trim() {
                "" => output.status.to_string(),
                msg => msg.to_string(),
            };
            Err(TunnelError::external(description, detail))
        }
    }
}

impl Supervisor for Systemctl {
    async fn reload(&self) -> Result<(), TunnelError> {
        self.run(&["daemon-reload"]).await
    }

    async fn start(&self, service: &str) -> Result<(), TunnelError> {
        self.run(&["start", service]).await
    }

    async fn enable_now(&self, service: &str) -> Result<(), TunnelError> {
        self.run(&["enable", "--now", service]).await
    }

    async fn enable(&self, service: &str) -> Result<(), TunnelError> {
        self.run(&["enable", service]).await
    }

    async fn restart(&self, service: &str) -> Result<(), TunnelError> {
        self.run(&["restart", service]).await
    }

    async fn stop(&self, service: &str) -> Result<(), TunnelError> {
        self.run(&["stop", service]).await
    }

    async fn disable(&self, service: &str) -> Result<(), TunnelError> {
        self.run(&["disable", service]).await
    }

    async fn status(&self, service: &str) -> UnitStatus {
        let args = ["is-active", service];
        tracing::debug!(command = %self.describe(&args), "running");

        // is-active exits non-zero for anything but "active"; the state is on stdout.
        match self
            .command(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
        {
            Ok(output) => UnitStatus::from_is_active(&String::from_utf8_lossy(&output.stdout)),
            Err(e) => {
                tracing::warn!(service, error = %e, "status query failed");
                UnitStatus::NotRunning
            }
        }
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
