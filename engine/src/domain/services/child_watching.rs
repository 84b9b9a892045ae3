//! Child Watching Service
//! Event-driven exit monitoring: each spawned child gets one watch task that
//! awaits its exit handle and publishes a `ChildExit` event. No polling.

use crate::domain::ports::ProcessExitHandle;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Exit notification for one child process.
#[derive(Debug, Clone, Copy)]
pub struct ChildExit {
    pub pid: u32,
    /// Exit code for a normal exit
    pub code: Option<i32>,
    /// Terminating signal, when the child was killed
    pub signal: Option<i32>,
}

#[derive(Clone)]
pub struct ChildWatchingService {
    tx: mpsc::UnboundedSender<ChildExit>,
}

impl ChildWatchingService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChildExit>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Start watching one child. The task resolves the exit handle and
    /// forwards the result; the receiver side owns all registry updates.
    pub fn watch(&self, pid: u32, label: String, exit_handle: ProcessExitHandle) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = match exit_handle.await {
                Ok(status) => {
                    debug!(
                        child = %label,
                        pid = pid,
                        code = ?status.code,
                        signal = ?status.signal,
                        "child exit observed"
                    );
                    ChildExit {
                        pid,
                        code: status.code,
                        signal: status.signal,
                    }
                }
                Err(e) => {
                    error!(child = %label, pid = pid, error = %e, "failed to await child exit");
                    ChildExit {
                        pid,
                        code: None,
                        signal: None,
                    }
                }
            };
            let _ = tx.send(event);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ChildExitStatus;

    #[tokio::test]
    async fn test_watch_forwards_exit_event() {
        let (watcher, mut rx) = ChildWatchingService::new();
        let handle: ProcessExitHandle = Box::pin(async {
            Ok(ChildExitStatus {
                code: Some(3),
                signal: None,
            })
        });
        watcher.watch(99, "dev_one".to_string(), handle);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.pid, 99);
        assert_eq!(event.code, Some(3));
        assert_eq!(event.signal, None);
    }

    #[tokio::test]
    async fn test_watch_survives_wait_error() {
        let (watcher, mut rx) = ChildWatchingService::new();
        let handle: ProcessExitHandle = Box::pin(async {
            Err(crate::domain::DomainError::LaunchFailed {
                label: "dev".to_string(),
                detail: "wait failed".to_string(),
            })
        });
        watcher.watch(100, "dev".to_string(), handle);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.pid, 100);
        assert_eq!(event.code, None);
    }
}
