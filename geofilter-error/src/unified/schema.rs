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

//! Schema discovery and payload parsing errors

use thiserror::Error;

/// Errors raised while reading a schema or a response payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The feature type is missing from a DescribeFeatureType answer
    #[error("Feature type '{typename}' not found in DescribeFeatureType response")]
    TypeNameNotFound { typename: String },

    /// No schema could be located for a collection
    #[error("Schema for '{collection}' not found: {reason}")]
    SchemaNotFound { collection: String, reason: String },

    /// The requested attribute does not exist
    #[error("Attribute '{attr_name}' not found")]
    AttributeNotFound { attr_name: String },

    /// Payload could not be decoded
    #[error("Malformed {format} payload: {reason}")]
    Malformed { format: &'static str, reason: String },
}

impl SchemaError {
    #[inline]
    pub fn type_name_not_found(typename: impl Into<String>) -> Self {
        Self::TypeNameNotFound {
            typename: typename.into(),
        }
    }

    #[inline]
    pub fn schema_not_found(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaNotFound {
            collection: collection.into(),
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn attribute_not_found(attr_name: impl Into<String>) -> Self {
        Self::AttributeNotFound {
            attr_name: attr_name.into(),
        }
    }

    #[inline]
    pub fn malformed(format: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            format,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::type_name_not_found("app:schools");
        assert_eq!(
            err.to_string(),
            "Feature type 'app:schools' not found in DescribeFeatureType response"
        );

        let err = SchemaError::malformed("GeoJSON", "missing features");
        assert_eq!(err.to_string(), "Malformed GeoJSON payload: missing features");

        let err = SchemaError::attribute_not_found("kapitelbezeichnung");
        assert_eq!(err.to_string(), "Attribute 'kapitelbezeichnung' not found");
    }
}
