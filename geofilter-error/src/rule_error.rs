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

/// Error types for malformed filter rules
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Rule has no value")]
    MissingValue,

    #[error("Operator {operator} cannot be used with a range attribute")]
    RangeAttributeOperator { operator: String },

    #[error("Operator {operator} expects {expected} values, got {got}")]
    ValueArity {
        operator: String,
        expected: usize,
        got: usize,
    },

    #[error("Date format '{format}' cannot be sent to the server with operator {operator}")]
    UnsupportedDateFormat { format: String, operator: String },
}

impl RuleError {
    pub fn missing_value() -> Self {
        RuleError::MissingValue
    }

    pub fn range_attribute_operator(operator: impl Into<String>) -> Self {
        RuleError::RangeAttributeOperator {
            operator: operator.into(),
        }
    }

    pub fn value_arity(operator: impl Into<String>, expected: usize, got: usize) -> Self {
        RuleError::ValueArity {
            operator: operator.into(),
            expected,
            got,
        }
    }

    pub fn unsupported_date_format(format: impl Into<String>, operator: impl Into<String>) -> Self {
        RuleError::UnsupportedDateFormat {
            format: format.into(),
            operator: operator.into(),
        }
    }
}
