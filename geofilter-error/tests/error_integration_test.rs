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

//! Integration tests for the sub-errors wrapped by GeoFilterError

use geofilter_error::ErrorCategory;
use geofilter_error::GeoFilterError;
use geofilter_error::GeoFilterResult;
use geofilter_error::RuleError;
use geofilter_error::SchemaError;
use geofilter_error::TransportError;

#[test]
fn test_rule_error_into_geofilter_error() {
    let rule_err = RuleError::range_attribute_operator("GT");
    let err: GeoFilterError = rule_err.into();

    assert!(matches!(err, GeoFilterError::Rule(_)));
    assert_eq!(err.category(), ErrorCategory::Rule);
    assert!(err.to_string().contains("GT"));
}

#[test]
fn test_transport_error_from_conversion() {
    let err = GeoFilterError::from(TransportError::http_status("https://example.com", 404));

    assert!(matches!(err, GeoFilterError::Transport(TransportError::HttpStatus { status: 404, .. })));
    assert!(err.is_retryable());
}

#[test]
fn test_schema_constructors() {
    let err = GeoFilterError::type_name_not_found("app:kita");
    assert!(matches!(
        err,
        GeoFilterError::Schema(SchemaError::TypeNameNotFound { .. })
    ));

    let err = GeoFilterError::schema_not_found("schools", "no $ref");
    assert!(err.to_string().contains("schools"));
    assert_eq!(err.category(), ErrorCategory::Schema);
}

#[test]
fn test_error_clone_keeps_equality() {
    let err = GeoFilterError::malformed("XML", "unexpected eof");
    let cloned = err.clone();
    assert_eq!(err, cloned);
}

#[test]
fn test_error_result_propagation() {
    fn inner() -> GeoFilterResult<()> {
        Err(RuleError::missing_value().into())
    }

    fn outer() -> GeoFilterResult<()> {
        inner()?;
        Ok(())
    }

    let err = outer().unwrap_err();
    assert_eq!(err, GeoFilterError::Rule(RuleError::MissingValue));
}
