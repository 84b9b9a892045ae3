//! Tokio Process Executor
//! Real implementation of the ProcessExecutor port: spawns children in their
//! own session, delivers POSIX signals, and exposes exit monitoring through
//! per-child exit handles resolved on the blocking pool.

use crate::domain::ports::{
    ChildExitStatus, ProcessExecutor, ProcessExitHandle, SpawnConfig, SpawnResult,
};
use crate::domain::{DomainError, Result};
use async_trait::async_trait;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Command, Stdio};
use tracing::{debug, error, info, warn};

#[derive(Default)]
pub struct TokioProcessExecutor;

impl TokioProcessExecutor {
    pub fn new() -> Self {
        Self
    }

    fn create_exit_handle(mut child: std::process::Child, pid: u32) -> ProcessExitHandle {
        let (tx, rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let exit_result = tokio::task::spawn_blocking(move || match child.wait() {
                Ok(status) => {
                    let exit = ChildExitStatus {
                        code: status.code(),
                        signal: status.signal(),
                    };
                    debug!(pid = pid, code = ?exit.code, signal = ?exit.signal, "process exited");
                    Ok(exit)
                }
                Err(e) => {
                    error!(pid = pid, error = %e, "failed to wait for process");
                    Err(DomainError::LaunchFailed {
                        label: format!("pid {}", pid),
                        detail: format!("wait failed: {}", e),
                    })
                }
            })
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "blocking wait task panicked");
                Err(DomainError::LaunchFailed {
                    label: format!("pid {}", pid),
                    detail: format!("wait task panicked: {}", e),
                })
            });
            let _ = tx.send(exit_result);
        });

        Box::pin(async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(DomainError::LaunchFailed {
                    label: "unknown".to_string(),
                    detail: "process monitor task died unexpectedly".to_string(),
                }),
            }
        })
    }
}

#[async_trait]
impl ProcessExecutor for TokioProcessExecutor {
    async fn spawn(&self, config: SpawnConfig) -> Result<SpawnResult> {
        info!(command = %config.command, args = ?config.args, "spawning child process");

        if config.command.is_empty() {
            return Err(DomainError::LaunchFailed {
                label: String::new(),
                detail: "empty command".to_string(),
            });
        }

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);

        if let Some(ref dir) = config.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &config.env_vars {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());

        // New session: signals aimed at the device manager's own process
        // group must not reach the children directly, the escalation owns
        // their lifetime
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }

        let child = cmd.spawn().map_err(|e| {
            error!(command = %config.command, error = %e, "failed to spawn child process");
            DomainError::LaunchFailed {
                label: config.command.clone(),
                detail: e.to_string(),
            }
        })?;

        let pid = child.id();
        info!(pid = pid, "child process spawned");

        let exit_handle = Self::create_exit_handle(child, pid);
        Ok(SpawnResult {
            pid,
            exit_handle: Some(exit_handle),
        })
    }

    async fn kill(&self, pid: u32, signal: i32) -> Result<()> {
        debug!(pid = pid, signal = signal, "sending signal");
        let rc = unsafe { libc::kill(pid as i32, signal) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            // The child may simply have been reaped already
            if err.raw_os_error() == Some(libc::ESRCH) {
                return Ok(());
            }
            warn!(pid = pid, signal = signal, error = %err, "failed to send signal");
            return Err(DomainError::LaunchFailed {
                label: format!("pid {}", pid),
                detail: format!("kill({}) failed: {}", signal, err),
            });
        }
        Ok(())
    }

    async fn is_running(&self, pid: u32) -> Result<bool> {
        Ok(unsafe { libc::kill(pid as i32, 0) } == 0)
    }
}
