//! Command runner - shell execution and git commit/rollback
//!
//! Handlers only see the [`CommandRunner`] trait; [`SystemRunner`] is the
//! implementation backed by `sh -c` (or `cmd /C`) and the `git` executable.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Prefix of every commit message created for the agent
pub const COMMIT_PREFIX: &str = "feat(mo-2): ";

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to execute command: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Command exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    /// 退出码为 0 但 stderr 有输出，同样视为失败
    #[error("Command reported errors: {0}")]
    Stderr(String),
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Error, Debug)]
pub enum GitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
}

/// Capabilities the dispatcher needs from the host
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` through the OS shell and return its stdout.
    ///
    /// Fails on spawn errors, non-zero exit, or any stderr output.
    async fn run_shell(&self, command: &str) -> Result<String, CommandError>;

    /// Stage everything and commit with `summary` in the message
    async fn commit(&self, summary: &str) -> Result<(), GitError>;

    /// Drop the latest commit and its changes (`reset --hard HEAD~1`)
    async fn rollback(&self) -> Result<(), GitError>;
}

/// Runs commands as child processes in the project root
#[derive(Debug, Clone)]
pub struct SystemRunner {
    working_dir: PathBuf,
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            timeout: None,
        }
    }

    /// Bound shell commands; the child is killed when the limit is hit
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    async fn git(&self, args: &[&str]) -> Result<(), GitError> {
        debug!("Running git {:?}", args);
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(GitError::CommandFailed {
                command: args.first().copied().unwrap_or_default().to_string(),
                stderr: if stderr.is_empty() {
                    describe_status(output.status)
                } else {
                    stderr
                },
            })
        }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run_shell(&self, command: &str) -> Result<String, CommandError> {
        let mut cmd = shell_command(command);
        cmd.current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| CommandError::Timeout(limit))?,
            None => cmd.output().await,
        }
        .map_err(CommandError::Spawn)?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(CommandError::Exit {
                status: describe_status(output.status),
                stderr: stderr.trim().to_string(),
            });
        }
        if !stderr.is_empty() {
            return Err(CommandError::Stderr(stderr));
        }

        Ok(stdout)
    }

    async fn commit(&self, summary: &str) -> Result<(), GitError> {
        self.git(&["add", "."]).await?;
        let message = format!("{}{}", COMMIT_PREFIX, summary);
        self.git(&["commit", "-m", &message]).await?;
        info!("Git commit successful");
        Ok(())
    }

    async fn rollback(&self) -> Result<(), GitError> {
        self.git(&["reset", "--hard", "HEAD~1"]).await?;
        info!("Git rollback successful");
        Ok(())
    }
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "signal".to_string(),
    }
}
