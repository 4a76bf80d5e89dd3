// Copyright 2025 The GeoFilter Rust Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use cheetah_string::CheetahString;
use geofilter_error::GeoFilterResult;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;

pub type TaskId = CheetahString;

struct TaskInfo {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodic tasks keyed by a caller chosen id. Adding a task under an id that
/// is already scheduled replaces the old task.
#[derive(Clone, Default)]
pub struct ScheduledTaskManager {
    tasks: Arc<Mutex<HashMap<TaskId, TaskInfo>>>,
}

impl ScheduledTaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fixed delay task: runs are serial and the next one starts `period`
    /// after the previous one completed, so nothing accumulates.
    ///
    /// # Arguments
    /// * `id` - Key of the task; an existing task with the same key is cancelled first.
    /// * `initial_delay` - The delay before the first execution of the task.
    /// * `period` - The pause between the end of one execution and the next.
    /// * `task_fn` - Produces the future for one execution. It receives the task's
    ///   `CancellationToken`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn add_scheduled_task<F, Fut>(&self, id: TaskId, initial_delay: Duration, period: Duration, mut task_fn: F)
    where
        F: FnMut(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = GeoFilterResult<()>> + Send + 'static,
    {
        self.cancel_task(&id);

        let token = CancellationToken::new();
        let token_child = token.clone();
        let task_id = id.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token_child.cancelled() => return,
                _ = time::sleep(initial_delay) => {}
            }
            loop {
                tokio::select! {
                    _ = token_child.cancelled() => {
                        info!("Task {} cancelled gracefully", task_id);
                        break;
                    }
                    _ = async {
                        if let Err(e) = task_fn(token_child.clone()).await {
                            error!("Scheduled task {} failed: {}", task_id, e);
                        }
                        time::sleep(period).await;
                    } => {}
                }
            }
        });

        self.tasks.lock().insert(
            id,
            TaskInfo {
                cancel_token: token,
                handle,
            },
        );
    }

    /// Graceful cancellation
    pub fn cancel_task(&self, id: &TaskId) -> bool {
        match self.tasks.lock().remove(id) {
            Some(info) => {
                info.cancel_token.cancel();
                drop(info.handle);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.lock().contains_key(id)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use geofilter_error::GeoFilterError;

    use super::*;

    fn id(value: &'static str) -> TaskId {
        CheetahString::from_static_str(value)
    }

    #[tokio::test]
    async fn adds_task_and_increments_task_count() {
        let manager = ScheduledTaskManager::new();
        manager.add_scheduled_task(
            id("refresh"),
            Duration::from_millis(10),
            Duration::from_millis(10),
            |_token| async { Ok(()) },
        );
        assert_eq!(manager.task_count(), 1);
        assert!(manager.contains(&id("refresh")));
        assert!(manager.cancel_task(&id("refresh")));
        assert_eq!(manager.task_count(), 0);
    }

    #[tokio::test]
    async fn same_id_replaces_task() {
        let manager = ScheduledTaskManager::new();
        for _ in 0..3 {
            manager.add_scheduled_task(
                id("refresh"),
                Duration::from_millis(10),
                Duration::from_millis(10),
                |_token| async { Ok(()) },
            );
        }
        assert_eq!(manager.task_count(), 1);
        assert!(manager.cancel_task(&id("refresh")));
        assert!(!manager.cancel_task(&id("refresh")));
    }

    #[tokio::test]
    async fn fixed_delay_task_runs_repeatedly_until_cancelled() {
        let manager = ScheduledTaskManager::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        manager.add_scheduled_task(
            id("refresh"),
            Duration::from_millis(1),
            Duration::from_millis(5),
            move |_token| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(GeoFilterError::illegal_argument("logged, not fatal"))
                }
            },
        );
        time::sleep(Duration::from_millis(60)).await;
        manager.cancel_task(&id("refresh"));
        let seen = runs.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected repeated runs, got {seen}");

        time::sleep(Duration::from_millis(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_runs_delay_the_next_one() {
        let manager = ScheduledTaskManager::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        manager.add_scheduled_task(
            id("slow"),
            Duration::ZERO,
            Duration::from_millis(10),
            move |_token| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    time::sleep(Duration::from_millis(100)).await;
                    Ok(())
                }
            },
        );
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        manager.cancel_task(&id("slow"));
    }
}
