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

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Default number of features examined per paging tick.
pub const DEFAULT_PAGING_SIZE: usize = 1000;

/// Default delay between two paging ticks.
pub const DEFAULT_PAGING_INTERVAL_MILLIS: u64 = 1;

/// Default page size requested from OGC API Features servers.
pub const DEFAULT_OAF_LIMIT: usize = 400;

pub const DEFAULT_WFS_VERSION: &str = "1.1.0";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoFilterConfig {
    #[serde(alias = "pagingSize")]
    pub paging_size: usize,

    #[serde(alias = "pagingIntervalMillis")]
    pub paging_interval_millis: u64,

    #[serde(alias = "oafLimit")]
    pub oaf_limit: usize,

    #[serde(alias = "wfsVersion")]
    pub wfs_version: String,

    /// Transport timeout; the filter core itself never times out.
    #[serde(alias = "httpTimeoutMillis")]
    pub http_timeout_millis: Option<u64>,

    #[serde(alias = "logLevel")]
    pub log_level: String,
}

impl Default for GeoFilterConfig {
    fn default() -> Self {
        GeoFilterConfig {
            paging_size: DEFAULT_PAGING_SIZE,
            paging_interval_millis: DEFAULT_PAGING_INTERVAL_MILLIS,
            oaf_limit: DEFAULT_OAF_LIMIT,
            wfs_version: DEFAULT_WFS_VERSION.to_string(),
            http_timeout_millis: None,
            log_level: "INFO".to_string(),
        }
    }
}

impl GeoFilterConfig {
    pub fn new() -> GeoFilterConfig {
        Self::default()
    }

    #[inline]
    pub fn paging_interval(&self) -> Duration {
        Duration::from_millis(self.paging_interval_millis.max(1))
    }

    #[inline]
    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_millis.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = GeoFilterConfig::default();
        assert_eq!(config.paging_size, 1000);
        assert_eq!(config.paging_interval(), Duration::from_millis(1));
        assert_eq!(config.oaf_limit, 400);
        assert_eq!(config.wfs_version, "1.1.0");
        assert_eq!(config.http_timeout(), None);
    }

    #[test]
    fn deserializes_camel_case_aliases() {
        let config: GeoFilterConfig =
            serde_json::from_str(r#"{"pagingSize": 50, "httpTimeoutMillis": 2000}"#).unwrap();
        assert_eq!(config.paging_size, 50);
        assert_eq!(config.http_timeout(), Some(Duration::from_millis(2000)));
        assert_eq!(config.oaf_limit, DEFAULT_OAF_LIMIT);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let config = GeoFilterConfig {
            paging_interval_millis: 0,
            ..GeoFilterConfig::default()
        };
        assert_eq!(config.paging_interval(), Duration::from_millis(1));
    }
}
