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

//! Registry of recurring handlers keyed by request id.
//!
//! At most one handler runs per id. Starting a handler for an id that already
//! has one stops the old handler first, so a consumer never receives two
//! interleaved emission streams for the same id.
//!
//! The handler is invoked once synchronously from [`IntervalRegistry::start`]
//! and then once per period on a tokio task until it returns
//! [`ControlFlow::Break`] or the id is stopped. Stopping is cooperative: a
//! tick that already started runs to completion.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use cheetah_string::CheetahString;
use parking_lot::Mutex;
use tokio::time;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct IntervalHandle {
    generation: u64,
    token: CancellationToken,
}

/// `None` marks an id whose loop has been stopped.
#[derive(Default)]
pub struct IntervalRegistry {
    handles: Mutex<HashMap<CheetahString, Option<IntervalHandle>>>,
    generation: AtomicU64,
}

impl IntervalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be called from within a tokio runtime.
    pub fn start<F>(self: &Arc<Self>, id: CheetahString, period: Duration, mut handler: F)
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        self.stop(&id);

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();
        self.handles.lock().insert(
            id.clone(),
            Some(IntervalHandle {
                generation,
                token: token.clone(),
            }),
        );

        if handler().is_break() {
            self.finish(&id, generation);
            return;
        }

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("interval {} cancelled", id);
                        break;
                    }
                    _ = ticker.tick() => {
                        if handler().is_break() {
                            registry.finish(&id, generation);
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Stops the loop for `id`. Calling it again, or for an unknown id, does nothing.
    pub fn stop(&self, id: &CheetahString) {
        let mut handles = self.handles.lock();
        if let Some(slot) = handles.get_mut(id) {
            if let Some(handle) = slot.take() {
                handle.token.cancel();
            }
        }
    }

    pub fn is_running(&self, id: &CheetahString) -> bool {
        matches!(self.handles.lock().get(id), Some(Some(_)))
    }

    pub fn running_count(&self) -> usize {
        self.handles.lock().values().filter(|slot| slot.is_some()).count()
    }

    // A finished loop only clears its own slot, never a newer loop started for the same id.
    fn finish(&self, id: &CheetahString, generation: u64) {
        let mut handles = self.handles.lock();
        if let Some(slot) = handles.get_mut(id) {
            if slot.as_ref().is_some_and(|handle| handle.generation == generation) {
                *slot = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn id(value: &'static str) -> CheetahString {
        CheetahString::from_static_str(value)
    }

    #[tokio::test]
    async fn handler_runs_synchronously_once() {
        let registry = Arc::new(IntervalRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        registry.start(id("a"), Duration::from_secs(3600), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_running(&id("a")));
        registry.stop(&id("a"));
        assert!(!registry.is_running(&id("a")));
    }

    #[tokio::test]
    async fn break_on_first_call_never_schedules() {
        let registry = Arc::new(IntervalRegistry::new());
        registry.start(id("a"), Duration::from_millis(1), || ControlFlow::Break(()));
        assert!(!registry.is_running(&id("a")));
    }

    #[tokio::test]
    async fn loop_terminates_itself() {
        let registry = Arc::new(IntervalRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        registry.start(id("a"), Duration::from_millis(1), move || {
            if counter.fetch_add(1, Ordering::SeqCst) + 1 >= 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        for _ in 0..200 {
            if !registry.is_running(&id("a")) {
                break;
            }
            time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!registry.is_running(&id("a")));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn restart_leaves_exactly_one_loop() {
        let registry = Arc::new(IntervalRegistry::new());
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        registry.start(id("a"), Duration::from_millis(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        });
        let counter = second.clone();
        registry.start(id("a"), Duration::from_millis(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        });

        assert_eq!(registry.running_count(), 1);
        time::sleep(Duration::from_millis(30)).await;
        // the first loop was cancelled before its first tick
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert!(second.load(Ordering::SeqCst) > 1);
        registry.stop(&id("a"));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let registry = Arc::new(IntervalRegistry::new());
        registry.stop(&id("unknown"));
        registry.start(id("a"), Duration::from_millis(1), || ControlFlow::Continue(()));
        registry.stop(&id("a"));
        registry.stop(&id("a"));
        assert!(!registry.is_running(&id("a")));
        assert_eq!(registry.running_count(), 0);
    }
}
