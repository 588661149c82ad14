use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Tracks fire-and-forget background work (post-scan notifications, bulk
/// photo-request loops) so callers stay unblocked while tests and shutdown
/// paths can still await completion deterministically.
#[derive(Clone, Default)]
pub struct TaskGroup {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` on the runtime and records its handle. The task's
    /// outcome is observable via [`TaskGroup::wait_idle`], never silently
    /// detached.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        self.handles
            .lock()
            .expect("task group mutex poisoned")
            .push(handle);
    }

    /// Awaits every tracked task, including tasks spawned while draining.
    pub async fn wait_idle(&self) {
        loop {
            let handle = self
                .handles
                .lock()
                .expect("task group mutex poisoned")
                .pop();
            match handle {
                Some(handle) => {
                    if let Err(err) = handle.await {
                        tracing::warn!(error = %err, "background task aborted");
                    }
                }
                None => break,
            }
        }
    }
}

impl std::fmt::Debug for TaskGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self
            .handles
            .lock()
            .map(|handles| handles.len())
            .unwrap_or(0);
        f.debug_struct("TaskGroup").field("pending", &pending).finish()
    }
}
