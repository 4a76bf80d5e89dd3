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

//! HTTP transport errors

use thiserror::Error;

/// Errors raised while talking to a remote service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be sent or the body could not be read
    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    /// The server answered with a non-success status
    #[error("Request to {url} answered with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The request was aborted through its cancellation token
    #[error("Request to {url} was cancelled")]
    Cancelled { url: String },

    /// The transport-level timeout elapsed
    #[error("Request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },
}

impl TransportError {
    /// Create a request failed error
    #[inline]
    pub fn request_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RequestFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an HTTP status error
    #[inline]
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus { url: url.into(), status }
    }

    /// Create a cancelled error
    #[inline]
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Create a timeout error
    #[inline]
    pub fn timeout(url: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            url: url.into(),
            timeout_ms,
        }
    }

    /// Get the url of the failed request
    pub fn url(&self) -> &str {
        match self {
            Self::RequestFailed { url, .. }
            | Self::HttpStatus { url, .. }
            | Self::Cancelled { url }
            | Self::Timeout { url, .. } => url,
        }
    }
}
