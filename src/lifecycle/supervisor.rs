//! Supervision of long-running named tasks.
//!
//! Every task receives a cancellation token derived from one shared
//! [`Shutdown`]. The first task to fail (return an error or panic) triggers
//! shutdown for all of them; [`TaskGroup::wait`] then waits for every task to
//! exit and reports that first failure.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use thiserror::Error;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::SupervisorConfig;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;

/// Terminal error of a task group.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A task returned an error.
    #[error("task {name:?} failed: {source}")]
    Task {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// A task panicked.
    #[error("task {name:?} panicked: {message}")]
    Panicked { name: String, message: String },

    /// Tasks were still running when shutdown was forced and had to be aborted.
    #[error("forced shutdown aborted tasks: {}", remaining.join(", "))]
    HardShutdown { remaining: Vec<String> },
}

/// Task group settings.
#[derive(Debug, Clone, Default)]
pub struct GroupConfig {
    /// Turn SIGTERM/SIGINT into shutdown requests.
    pub enable_signal_handling: bool,
    /// Abort tasks still running this long after shutdown was triggered.
    pub shutdown_timeout: Option<Duration>,
}

impl GroupConfig {
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self {
            enable_signal_handling: true,
            shutdown_timeout: config.shutdown_timeout(),
        }
    }
}

struct TaskExit {
    name: String,
    outcome: Result<anyhow::Result<()>, String>,
}

/// A group of independently failing tasks sharing one shutdown signal.
pub struct TaskGroup {
    shutdown: Shutdown,
    tasks: JoinSet<TaskExit>,
    running: Vec<String>,
    helpers: Vec<JoinHandle<()>>,
}

impl TaskGroup {
    /// Create a group. Must be called from within a Tokio runtime; signal
    /// handling, if enabled, is installed here, once.
    pub fn new(config: GroupConfig) -> Self {
        let shutdown = Shutdown::new();
        let mut helpers = Vec::new();

        if config.enable_signal_handling {
            helpers.push(spawn_signal_handler(shutdown.clone()));
        }
        if let Some(timeout) = config.shutdown_timeout {
            helpers.push(spawn_deadline(shutdown.clone(), timeout));
        }

        Self {
            shutdown,
            tasks: JoinSet::new(),
            running: Vec::new(),
            helpers,
        }
    }

    /// Handle for triggering shutdown from outside the group.
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Start a named task.
    pub fn go<F, Fut>(&mut self, name: impl Into<String>, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.into();
        if self.running.contains(&name) {
            tracing::warn!(task = %name, "Duplicate task name in group");
        }

        let future = task(self.shutdown.token());
        self.running.push(name.clone());
        self.tasks.spawn(async move {
            tracing::debug!(task = %name, "Task starting");
            let outcome = AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .map_err(panic_message);
            TaskExit { name, outcome }
        });
    }

    /// Wait for every task to exit. Returns the first recorded failure.
    pub async fn wait(mut self) -> Result<(), SupervisorError> {
        let mut first_error = None;
        let mut aborted = false;

        loop {
            tokio::select! {
                joined = self.tasks.join_next() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok(exit) => self.record(exit, &mut first_error),
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => {
                            tracing::error!(error = %e, "Task join failed");
                            self.shutdown.trigger();
                            first_error.get_or_insert(SupervisorError::Panicked {
                                name: "<unknown>".to_string(),
                                message: e.to_string(),
                            });
                        }
                    }
                }
                () = self.shutdown.forced(), if !aborted => {
                    aborted = true;
                    tracing::warn!(remaining = ?self.running, "Aborting tasks still running");
                    first_error.get_or_insert(SupervisorError::HardShutdown {
                        remaining: self.running.clone(),
                    });
                    self.tasks.abort_all();
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn record(&mut self, exit: TaskExit, first_error: &mut Option<SupervisorError>) {
        if let Some(pos) = self.running.iter().position(|n| *n == exit.name) {
            self.running.remove(pos);
        }

        let error = match exit.outcome {
            Ok(Ok(())) => {
                tracing::debug!(task = %exit.name, "Task exited");
                return;
            }
            Ok(Err(source)) => {
                let detail = format!("{source:#}");
                tracing::error!(task = %exit.name, error = %detail, "Task failed, shutting down");
                SupervisorError::Task {
                    name: exit.name,
                    source,
                }
            }
            Err(message) => {
                tracing::error!(task = %exit.name, panic = %message, "Task panicked, shutting down");
                SupervisorError::Panicked {
                    name: exit.name,
                    message,
                }
            }
        };

        self.shutdown.trigger();
        first_error.get_or_insert(error);
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        for helper in &self.helpers {
            helper.abort();
        }
    }
}

fn spawn_deadline(shutdown: Shutdown, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        shutdown.triggered().await;
        tokio::select! {
            () = tokio::time::sleep(timeout) => {
                tracing::warn!(timeout = ?timeout, "Tasks did not stop in time, forcing shutdown");
                shutdown.force();
            }
            () = shutdown.forced() => {}
        }
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn quiet() -> GroupConfig {
        GroupConfig::default()
    }

    #[tokio::test]
    async fn clean_exit_without_shutdown() {
        let mut group = TaskGroup::new(quiet());
        group.go("a", |_| async { Ok(()) });
        group.go("b", |_| async { Ok(()) });

        assert!(group.wait().await.is_ok());
    }

    #[tokio::test]
    async fn failure_cancels_siblings_and_is_reported() {
        let stopped = Arc::new(AtomicUsize::new(0));
        let mut group = TaskGroup::new(quiet());

        for name in ["httpd", "intercept-gc"] {
            let stopped = stopped.clone();
            group.go(name, move |token| async move {
                token.cancelled().await;
                stopped.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        group.go("systema-gc", |_| async { Err(anyhow::anyhow!("stream broke")) });

        let err = group.wait().await.unwrap_err();
        match err {
            SupervisorError::Task { name, source } => {
                assert_eq!(name, "systema-gc");
                assert_eq!(source.to_string(), "stream broke");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(stopped.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn only_first_error_is_kept() {
        let mut group = TaskGroup::new(quiet());
        group.go("first", |_| async { Err(anyhow::anyhow!("one")) });
        group.go("second", |token| async move {
            token.cancelled().await;
            Err(anyhow::anyhow!("two"))
        });

        let err = group.wait().await.unwrap_err();
        assert!(matches!(err, SupervisorError::Task { ref name, .. } if name == "first"));
    }

    #[tokio::test]
    async fn external_shutdown_is_clean() {
        let mut group = TaskGroup::new(quiet());
        for name in ["a", "b", "c"] {
            group.go(name, |token| async move {
                token.cancelled().await;
                Ok(())
            });
        }

        let shutdown = group.shutdown();
        tokio::spawn(async move { shutdown.trigger() });

        assert!(group.wait().await.is_ok());
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let mut group = TaskGroup::new(quiet());
        group.go("bad", |_| async { panic!("boom") });
        group.go("good", |token| async move {
            token.cancelled().await;
            Ok(())
        });

        let err = group.wait().await.unwrap_err();
        match err {
            SupervisorError::Panicked { name, message } => {
                assert_eq!(name, "bad");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stubborn_task_is_aborted_after_deadline() {
        let mut group = TaskGroup::new(GroupConfig {
            enable_signal_handling: false,
            shutdown_timeout: Some(Duration::from_secs(3)),
        });
        group.go("polite", |token| async move {
            token.cancelled().await;
            Ok(())
        });
        group.go("stubborn", |_| std::future::pending());

        group.shutdown().trigger();

        let err = group.wait().await.unwrap_err();
        match err {
            SupervisorError::HardShutdown { remaining } => {
                assert_eq!(remaining, vec!["stubborn".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
