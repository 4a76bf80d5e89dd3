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

//! HTTP transport abstraction used by the extern backends and schema probes.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use geofilter_error::GeoFilterResult;
use tokio_util::sync::CancellationToken;

/// Receives download progress in percent (0..=100).
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

pub const CONTENT_TYPE_XML: &str = "text/xml; charset=UTF-8";

#[derive(Clone, Default)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
    pub content_type: Option<String>,
    pub cancel: Option<CancellationToken>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: Some(body.into()),
            content_type: Some(content_type.into()),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Query value by key, first match.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Url including the encoded query string, for logging.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        reqwest::Url::parse_with_params(&self.url, &self.query)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| self.url.clone())
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("url", &self.full_url())
            .field("body_len", &self.body.as_ref().map(String::len))
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

/// Transport used for every remote call. Implementations must honor `HttpRequest::cancel`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, request: HttpRequest) -> GeoFilterResult<String>;

    async fn post(&self, request: HttpRequest, on_progress: Option<ProgressCallback>) -> GeoFilterResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_url_encodes_query() {
        let request = HttpRequest::get("https://example.com/wfs")
            .with_query("service", "WFS")
            .with_query("typeName", "app:a b");
        assert_eq!(
            request.full_url(),
            "https://example.com/wfs?service=WFS&typeName=app%3Aa+b"
        );
        assert_eq!(request.query_value("TYPENAME"), Some("app:a b"));
    }

    #[test]
    fn post_carries_body() {
        let request = HttpRequest::post("https://example.com/wfs", "<xml/>", CONTENT_TYPE_XML);
        assert_eq!(request.body.as_deref(), Some("<xml/>"));
        assert_eq!(request.full_url(), "https://example.com/wfs");
    }
}
