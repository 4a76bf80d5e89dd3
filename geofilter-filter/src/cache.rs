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

//! Memoized requests with coalescing of concurrent identical requests.
//!
//! A request is identified by a [`CacheKey`], a content hash over the logical
//! request shape. For a given key:
//!
//! * a resolved value is returned immediately;
//! * while a producer is in flight, later callers join its waiting list and
//!   are released in arrival order once it resolves;
//! * otherwise an empty waiting list is registered and the producer runs.
//!
//! Errors are handed to every waiter but never cached, so the next caller runs
//! the producer again. Resolved values live as long as the cache; there is no
//! eviction or invalidation.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use geofilter_common::common::hasher::string_hasher::ContentHasher;
use geofilter_error::GeoFilterError;
use geofilter_error::GeoFilterResult;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(u64);

impl CacheKey {
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Hash function used to derive cache keys. Two requests are the same iff their hashes are equal.
pub trait KeyHasher: Send + Sync {
    fn hash_parts(&self, parts: &[&str]) -> u64;
}

/// 64-bit FNV-1a over the request parts.
#[derive(Debug, Default, Clone, Copy)]
pub struct FnvKeyHasher;

impl KeyHasher for FnvKeyHasher {
    fn hash_parts(&self, parts: &[&str]) -> u64 {
        ContentHasher::hash_parts(parts.iter().copied())
    }
}

type Waiter<V> = oneshot::Sender<GeoFilterResult<V>>;

struct CacheState<V> {
    resolved: HashMap<CacheKey, V>,
    waiting: HashMap<CacheKey, Vec<Waiter<V>>>,
}

enum Lookup<V> {
    Hit(V),
    Wait(oneshot::Receiver<GeoFilterResult<V>>),
    Produce,
}

pub struct RequestCache<V> {
    hasher: Arc<dyn KeyHasher>,
    state: Mutex<CacheState<V>>,
}

impl<V> Default for RequestCache<V>
where
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RequestCache<V>
where
    V: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::with_hasher(Arc::new(FnvKeyHasher))
    }

    pub fn with_hasher(hasher: Arc<dyn KeyHasher>) -> Self {
        Self {
            hasher,
            state: Mutex::new(CacheState {
                resolved: HashMap::new(),
                waiting: HashMap::new(),
            }),
        }
    }

    pub fn key(&self, parts: &[&str]) -> CacheKey {
        CacheKey(self.hasher.hash_parts(parts))
    }

    /// Returns the value for `key`, running `producer` only if no value is
    /// resolved and no identical request is in flight.
    pub async fn request<F, Fut>(&self, key: CacheKey, producer: F) -> GeoFilterResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GeoFilterResult<V>>,
    {
        let lookup = {
            let mut state = self.state.lock();
            if let Some(value) = state.resolved.get(&key) {
                Lookup::Hit(value.clone())
            } else if let Some(waiters) = state.waiting.get_mut(&key) {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Lookup::Wait(rx)
            } else {
                state.waiting.insert(key, Vec::new());
                Lookup::Produce
            }
        };

        match lookup {
            Lookup::Hit(value) => Ok(value),
            Lookup::Wait(rx) => {
                debug!("joining waiting list of {}", key);
                rx.await.unwrap_or_else(|_| Err(GeoFilterError::abandoned(key.to_string())))
            }
            Lookup::Produce => {
                let mut guard = InFlight {
                    cache: self,
                    key,
                    armed: true,
                };
                let result = producer().await;
                guard.armed = false;
                self.resolve(key, &result);
                result
            }
        }
    }

    fn resolve(&self, key: CacheKey, result: &GeoFilterResult<V>) {
        let waiters = {
            let mut state = self.state.lock();
            if let Ok(value) = result {
                state.resolved.insert(key, value.clone());
            }
            state.waiting.remove(&key).unwrap_or_default()
        };
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }

    fn abandon(&self, key: CacheKey) {
        let waiters = self.state.lock().waiting.remove(&key).unwrap_or_default();
        for waiter in waiters {
            let _ = waiter.send(Err(GeoFilterError::abandoned(key.to_string())));
        }
    }

    pub fn is_resolved(&self, key: &CacheKey) -> bool {
        self.state.lock().resolved.contains_key(key)
    }

    /// Number of callers queued behind an in-flight request, `None` when nothing is in flight.
    pub fn waiting_len(&self, key: &CacheKey) -> Option<usize> {
        self.state.lock().waiting.get(key).map(Vec::len)
    }

    pub fn len(&self) -> usize {
        self.state.lock().resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Releases the waiting list when the producing future is dropped before it resolves.
struct InFlight<'a, V>
where
    V: Clone + Send + 'static,
{
    cache: &'a RequestCache<V>,
    key: CacheKey,
    armed: bool,
}

impl<V> Drop for InFlight<'_, V>
where
    V: Clone + Send + 'static,
{
    fn drop(&mut self) {
        if self.armed {
            self.cache.abandon(self.key);
        }
    }
}
