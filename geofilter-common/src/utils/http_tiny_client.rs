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

use async_trait::async_trait;
use geofilter_error::GeoFilterError;
use geofilter_error::GeoFilterResult;
use geofilter_error::TransportError;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::Response;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::common::transport::HttpRequest;
use crate::common::transport::HttpTransport;
use crate::common::transport::ProgressCallback;

/// Upper bound for pre-sizing a response body from `Content-Length`.
const MAX_PREALLOC: u64 = 8 * 1024 * 1024;

/// reqwest backed transport.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }

    fn prepare(&self, builder: RequestBuilder, request: &HttpRequest) -> RequestBuilder {
        let mut builder = builder.query(&request.query);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(content_type) = &request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        builder
    }

    fn map_error(&self, url: &str, error: reqwest::Error) -> GeoFilterError {
        if error.is_timeout() {
            let timeout_ms = self.timeout.map(|t| t.as_millis() as u64).unwrap_or_default();
            return TransportError::timeout(url, timeout_ms).into();
        }
        TransportError::request_failed(url, error.to_string()).into()
    }

    fn check_status(url: &str, response: Response) -> GeoFilterResult<Response> {
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::http_status(url, status.as_u16()).into());
        }
        Ok(response)
    }

    async fn read_with_progress(
        &self,
        url: &str,
        mut response: Response,
        on_progress: Option<ProgressCallback>,
    ) -> GeoFilterResult<String> {
        let total = response.content_length();
        let mut received: u64 = 0;
        // Content-Length is server controlled, never trust it for allocation.
        let mut body = Vec::with_capacity(total.unwrap_or(0).min(MAX_PREALLOC) as usize);
        while let Some(chunk) = response.chunk().await.map_err(|e| self.map_error(url, e))? {
            received += chunk.len() as u64;
            body.extend_from_slice(&chunk);
            if let (Some(total), Some(on_progress)) = (total, on_progress.as_ref()) {
                if total > 0 {
                    on_progress(((received * 100) / total).min(100) as u8);
                }
            }
        }
        String::from_utf8(body).map_err(|e| TransportError::request_failed(url, e.to_string()).into())
    }
}

async fn cancellable<T, F>(cancel: Option<CancellationToken>, url: &str, fut: F) -> GeoFilterResult<T>
where
    F: Future<Output = GeoFilterResult<T>>,
{
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(TransportError::cancelled(url).into()),
                result = fut => result,
            }
        }
        None => fut.await,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: HttpRequest) -> GeoFilterResult<String> {
        let url = request.url.clone();
        debug!("GET {}", request.full_url());
        let cancel = request.cancel.clone();
        cancellable(cancel, &url, async {
            let response = self
                .prepare(self.client.get(&request.url), &request)
                .send()
                .await
                .map_err(|e| self.map_error(&url, e))?;
            let response = Self::check_status(&url, response)?;
            response.text().await.map_err(|e| self.map_error(&url, e))
        })
        .await
    }

    async fn post(&self, request: HttpRequest, on_progress: Option<ProgressCallback>) -> GeoFilterResult<String> {
        let url = request.url.clone();
        debug!("POST {}", request.full_url());
        let cancel = request.cancel.clone();
        cancellable(cancel, &url, async {
            let response = self
                .prepare(self.client.post(&request.url), &request)
                .send()
                .await
                .map_err(|e| self.map_error(&url, e))?;
            let response = Self::check_status(&url, response)?;
            self.read_with_progress(&url, response, on_progress).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU8;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use tokio::io::AsyncReadExt;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    use super::*;
    use crate::common::transport::CONTENT_TYPE_XML;

    /// Serves one connection with the given raw response and returns the url.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/wfs")
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let result: GeoFilterResult<String> =
            cancellable(Some(token), "https://example.com", std::future::pending()).await;
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let client = ReqwestTransport::new(Some(Duration::from_millis(500)));
        let err = client
            .get(HttpRequest::get("http://127.0.0.1:9/unreachable"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), geofilter_error::ErrorCategory::Transport);
    }

    #[tokio::test]
    async fn post_reports_progress_until_complete() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\n<a/>").await;
        let last = Arc::new(AtomicU8::new(0));
        let seen = last.clone();
        let progress: ProgressCallback = Arc::new(move |percent| seen.store(percent, Ordering::SeqCst));

        let body = ReqwestTransport::new(Some(Duration::from_secs(5)))
            .post(HttpRequest::post(url, "<x/>", CONTENT_TYPE_XML), Some(progress))
            .await
            .unwrap();
        assert_eq!(body, "<a/>");
        assert_eq!(last.load(Ordering::SeqCst), 100);
    }

    #[tokio::test]
    async fn oversized_content_length_is_a_transport_error() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 4611686018427387904\r\nConnection: close\r\n\r\n<a/>",
        )
        .await;
        let progress: ProgressCallback = Arc::new(|_| {});

        let err = ReqwestTransport::new(Some(Duration::from_secs(5)))
            .post(HttpRequest::post(url, "<x/>", CONTENT_TYPE_XML), Some(progress))
            .await
            .unwrap_err();
        assert_eq!(err.category(), geofilter_error::ErrorCategory::Transport);
    }
}
