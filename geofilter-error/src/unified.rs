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

//! Unified error system for GeoFilter
//!
//! All errors surfaced to filter consumers are variants of [`GeoFilterError`].

mod schema;
mod transport;

pub use schema::SchemaError;
use thiserror::Error;
pub use transport::TransportError;

pub use crate::rule_error::RuleError;

/// Coarse classification of an error, used to decide whether retrying makes sense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Schema,
    Transport,
    Unsupported,
    Rule,
}

/// Main error type for all GeoFilter operations
///
/// # Examples
///
/// ```rust
/// use geofilter_error::GeoFilterError;
/// use geofilter_error::GeoFilterResult;
///
/// fn stop_remote(supported: bool) -> GeoFilterResult<()> {
///     if !supported {
///         return Err(GeoFilterError::unsupported_operation("stop", "geojson-extern"));
///     }
///     Ok(())
/// }
/// assert!(stop_remote(false).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeoFilterError {
    // ============================================================================
    // Transport Errors
    // ============================================================================
    /// HTTP request failures and cancellations
    #[error(transparent)]
    Transport(#[from] TransportError),

    // ============================================================================
    // Schema Errors
    // ============================================================================
    /// Schema probes and payload parsing
    #[error(transparent)]
    Schema(#[from] SchemaError),

    // ============================================================================
    // Rule Errors
    // ============================================================================
    #[error(transparent)]
    Rule(#[from] RuleError),

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// No service descriptor has been set on the facade
    #[error("No service has been set for filter '{filter_id}'")]
    ServiceMissing { filter_id: String },

    /// Service descriptor is missing a required field or holds a bad value
    #[error("Invalid service configuration for '{field}': {reason}")]
    ServiceInvalid { field: &'static str, reason: String },

    /// Service type is not one of wfs, oaf, geojson
    #[error("Unsupported service type '{service_type}'")]
    UnsupportedServiceType { service_type: String },

    /// Configuration parsing failed
    #[error("Configuration parse error for '{key}': {reason}")]
    ConfigParseFailed { key: String, reason: String },

    /// Illegal argument
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    // ============================================================================
    // Capability Errors
    // ============================================================================
    /// The backend has no way to perform the operation
    #[error("Operation '{operation}' is not supported by the {backend} backend")]
    UnsupportedOperation {
        operation: &'static str,
        backend: &'static str,
    },

    /// A coalesced request was abandoned before it resolved
    #[error("Request '{key}' was abandoned before it resolved")]
    Abandoned { key: String },
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl GeoFilterError {
    /// Create a service missing error
    #[inline]
    pub fn service_missing(filter_id: impl Into<String>) -> Self {
        Self::ServiceMissing {
            filter_id: filter_id.into(),
        }
    }

    /// Create a service invalid error
    #[inline]
    pub fn service_invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::ServiceInvalid {
            field,
            reason: reason.into(),
        }
    }

    /// Create an unsupported service type error
    #[inline]
    pub fn unsupported_service_type(service_type: impl Into<String>) -> Self {
        Self::UnsupportedServiceType {
            service_type: service_type.into(),
        }
    }

    /// Create an illegal argument error
    #[inline]
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::IllegalArgument(message.into())
    }

    /// Create an unsupported operation error
    #[inline]
    pub fn unsupported_operation(operation: &'static str, backend: &'static str) -> Self {
        Self::UnsupportedOperation { operation, backend }
    }

    /// Create an abandoned request error
    #[inline]
    pub fn abandoned(key: impl Into<String>) -> Self {
        Self::Abandoned { key: key.into() }
    }

    // ============================================================================
    // Transport Error Constructors
    // ============================================================================

    #[inline]
    pub fn request_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport(TransportError::request_failed(url, reason))
    }

    #[inline]
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::Transport(TransportError::http_status(url, status))
    }

    #[inline]
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Transport(TransportError::cancelled(url))
    }

    // ============================================================================
    // Schema Error Constructors
    // ============================================================================

    #[inline]
    pub fn type_name_not_found(typename: impl Into<String>) -> Self {
        Self::Schema(SchemaError::type_name_not_found(typename))
    }

    #[inline]
    pub fn schema_not_found(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema(SchemaError::schema_not_found(collection, reason))
    }

    #[inline]
    pub fn attribute_not_found(attr_name: impl Into<String>) -> Self {
        Self::Schema(SchemaError::attribute_not_found(attr_name))
    }

    #[inline]
    pub fn malformed(format: &'static str, reason: impl Into<String>) -> Self {
        Self::Schema(SchemaError::malformed(format, reason))
    }

    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) | Self::Abandoned { .. } => ErrorCategory::Transport,
            Self::Schema(_) => ErrorCategory::Schema,
            Self::Rule(_) => ErrorCategory::Rule,
            Self::UnsupportedOperation { .. } => ErrorCategory::Unsupported,
            Self::ServiceMissing { .. }
            | Self::ServiceInvalid { .. }
            | Self::UnsupportedServiceType { .. }
            | Self::ConfigParseFailed { .. }
            | Self::IllegalArgument(_) => ErrorCategory::Configuration,
        }
    }

    /// Whether the same call may succeed later without changing its input
    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Transport)
    }

    /// Whether this error is the result of an explicit cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Cancelled { .. }))
    }
}

// ============================================================================
// Error Conversion Implementations
// ============================================================================

#[cfg(feature = "with_serde")]
impl From<serde_json::Error> for GeoFilterError {
    #[inline]
    fn from(e: serde_json::Error) -> Self {
        Self::Schema(SchemaError::malformed("JSON", e.to_string()))
    }
}

#[cfg(feature = "with_config")]
impl From<config::ConfigError> for GeoFilterError {
    fn from(e: config::ConfigError) -> Self {
        let key = match &e {
            config::ConfigError::NotFound(key) => key.clone(),
            _ => "unknown".to_string(),
        };
        Self::ConfigParseFailed {
            key,
            reason: e.to_string(),
        }
    }
}

// ============================================================================
// Type Aliases
// ============================================================================

/// Result type alias for GeoFilter operations
pub type GeoFilterResult<T> = std::result::Result<T, GeoFilterError>;
