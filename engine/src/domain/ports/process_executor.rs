//! ProcessExecutor port
//! Interface for spawning and signalling child processes

use crate::domain::{DomainError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

/// Configuration for spawning one child process.
#[derive(Debug, Clone, Default)]
pub struct SpawnConfig {
    pub command: String,
    /// Exec parameters are flattened onto the command line as `ID VALUE`
    /// pairs following the well-known launch parameters
    pub args: Vec<String>,
    pub env_vars: Vec<(String, String)>,
    pub working_dir: Option<String>,
}

impl SpawnConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Append one `ID VALUE` parameter pair.
    pub fn push_param(&mut self, id: impl Into<String>, value: impl Into<String>) {
        self.args.push(id.into());
        self.args.push(value.into());
    }
}

/// How a child ended: a normal exit code or the terminating signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExitStatus {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

/// Resolves once the child has been reaped.
pub type ProcessExitHandle =
    Pin<Box<dyn Future<Output = std::result::Result<ChildExitStatus, DomainError>> + Send>>;

/// Result of spawning a process.
pub struct SpawnResult {
    pub pid: u32,
    /// None means the process cannot be monitored
    pub exit_handle: Option<ProcessExitHandle>,
}

impl std::fmt::Debug for SpawnResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnResult")
            .field("pid", &self.pid)
            .field("exit_handle", &self.exit_handle.is_some())
            .finish()
    }
}

/// Port for executing child processes.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    async fn spawn(&self, config: SpawnConfig) -> Result<SpawnResult>;

    /// Send a POSIX signal. Signalling a process that has already exited is
    /// not an error.
    async fn kill(&self, pid: u32, signal: i32) -> Result<()>;

    async fn is_running(&self, pid: u32) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_param_appends_pairs() {
        let mut config = SpawnConfig::new("/bin/dev");
        config.push_param("DEVICE_ID", "dev-1");
        config.push_param("DEVICE_LABEL", "dev_one");
        assert_eq!(
            config.args,
            vec!["DEVICE_ID", "dev-1", "DEVICE_LABEL", "dev_one"]
        );
    }
}
