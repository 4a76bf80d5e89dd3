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

//! Coercion of feature values to the type of a rule value.
//!
//! Feature attributes are stored with whatever type the source service
//! delivered (numbers as strings, booleans as "true", ...). Before comparing,
//! the feature value is converted to the JSON type of the rule value:
//!
//! | rule value | feature value            | result                              |
//! |------------|--------------------------|-------------------------------------|
//! | string     | any scalar               | stringified, lower-cased            |
//! | string     | whole float (`5.0`)      | integer digits (`"5"`)              |
//! | number     | number                   | as is                               |
//! | number     | string                   | parsed as f64, no match if invalid  |
//! | number     | boolean                  | `1` or `0`                          |
//! | boolean    | boolean                  | as is                               |
//! | boolean    | `"true"`, `"1"`          | `true`                              |
//! | boolean    | `"false"`, `"0"`, `""`   | `false`                             |
//! | boolean    | other string             | `true`                              |
//! | boolean    | number                   | `!= 0`                              |
//!
//! Null, arrays and objects never coerce. A rule value of an unexpected type
//! silently changes comparison semantics; this mirrors what existing filter
//! configurations rely on.

use std::cmp::Ordering;

use serde_json::Number;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Coerced {
    /// Ordering between two values of the same kind, `None` across kinds or for NaN.
    pub fn compare(&self, other: &Coerced) -> Option<Ordering> {
        match (self, other) {
            (Coerced::Text(a), Coerced::Text(b)) => Some(a.cmp(b)),
            (Coerced::Number(a), Coerced::Number(b)) => a.partial_cmp(b),
            (Coerced::Bool(a), Coerced::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Coerced::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Converts a rule value into its comparable form. Strings are lower-cased.
pub fn coerce_rule_value(rule_value: &Value) -> Option<Coerced> {
    match rule_value {
        Value::String(text) => Some(Coerced::Text(text.to_lowercase())),
        Value::Number(number) => number.as_f64().map(Coerced::Number),
        Value::Bool(flag) => Some(Coerced::Bool(*flag)),
        _ => None,
    }
}

/// Converts `feature_value` to the JSON type of `rule_value`.
pub fn coerce_to_rule_type(feature_value: &Value, rule_value: &Value) -> Option<Coerced> {
    match rule_value {
        Value::String(_) => scalar_to_string(feature_value).map(|text| Coerced::Text(text.to_lowercase())),
        Value::Number(_) => match feature_value {
            Value::Number(number) => number.as_f64().map(Coerced::Number),
            Value::String(text) => text.trim().parse::<f64>().ok().map(Coerced::Number),
            Value::Bool(flag) => Some(Coerced::Number(if *flag { 1.0 } else { 0.0 })),
            _ => None,
        },
        Value::Bool(_) => match feature_value {
            Value::Bool(flag) => Some(Coerced::Bool(*flag)),
            Value::String(text) => Some(Coerced::Bool(string_to_bool(text))),
            Value::Number(number) => number.as_f64().map(|n| Coerced::Bool(n != 0.0)),
            _ => None,
        },
        _ => None,
    }
}

/// String form of a scalar JSON value, `None` for null, arrays and objects.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number_to_string(number)),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Whole floats print without a fraction (`5.0` as `"5"`), like integers from the same service.
fn number_to_string(number: &Number) -> String {
    if number.is_f64() {
        if let Some(float) = number.as_f64() {
            if float == 0.0 {
                return "0".to_string();
            }
            if float.is_finite() && float.fract() == 0.0 && float.abs() < WHOLE_FLOAT_LIMIT {
                return format!("{float:.0}");
            }
        }
    }
    number.to_string()
}

/// Above this magnitude floats keep the exponent notation.
const WHOLE_FLOAT_LIMIT: f64 = 1e21;

fn string_to_bool(text: &str) -> bool {
    match text.trim().to_lowercase().as_str() {
        "true" | "1" => true,
        "false" | "0" | "" => false,
        _ => true,
    }
}
