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

//! # GeoFilter Error Handling System
//!
//! This crate provides the error types shared by every GeoFilter crate.
//!
//! Errors are grouped by what went wrong rather than by where it happened:
//! - **Configuration**: missing or invalid service descriptors, bad config files
//! - **Schema**: a schema probe or payload could not be understood
//! - **Transport**: an HTTP request failed or was cancelled
//! - **Unsupported**: the selected backend cannot perform the operation
//! - **Rule**: a filter rule is malformed
//!
//! `GeoFilterError` is `Clone` so a single failure of a coalesced request can
//! be handed to every waiter.
//!
//! ### Usage
//!
//! ```rust
//! use geofilter_error::GeoFilterError;
//! use geofilter_error::GeoFilterResult;
//!
//! fn layer_url(url: &str) -> GeoFilterResult<&str> {
//!     if url.is_empty() {
//!         return Err(GeoFilterError::service_invalid("url", "must not be empty"));
//!     }
//!     Ok(url)
//! }
//! # layer_url("https://example.com/wfs").unwrap();
//! ```

pub mod rule_error;
pub mod unified;

pub use rule_error::RuleError;
pub use unified::ErrorCategory;
pub use unified::GeoFilterError;
pub use unified::GeoFilterResult;
pub use unified::SchemaError;
pub use unified::TransportError;
