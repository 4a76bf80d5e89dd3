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

use std::future::Future;
use std::time::Duration;

pub mod interval_registry;
pub mod schedule;

pub use interval_registry::IntervalRegistry;
pub use schedule::ScheduledTaskManager;

pub enum GeoFilterRuntime {
    Multi(tokio::runtime::Runtime),
}

impl GeoFilterRuntime {
    #[inline]
    pub fn new_multi(threads: usize, name: &str) -> std::io::Result<Self> {
        Ok(Self::Multi(
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(threads)
                .thread_name(name)
                .enable_all()
                .build()?,
        ))
    }
}

impl GeoFilterRuntime {
    #[inline]
    pub fn get_handle(&self) -> &tokio::runtime::Handle {
        match self {
            Self::Multi(runtime) => runtime.handle(),
        }
    }

    #[inline]
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        match self {
            Self::Multi(runtime) => runtime.block_on(future),
        }
    }

    #[inline]
    pub fn shutdown_timeout(self, timeout: Duration) {
        match self {
            Self::Multi(runtime) => runtime.shutdown_timeout(timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_on_runs_future() {
        let runtime = GeoFilterRuntime::new_multi(1, "geofilter-test").unwrap();
        let value = runtime.block_on(async { 40 + 2 });
        assert_eq!(value, 42);
        runtime.shutdown_timeout(Duration::from_millis(100));
    }
}
