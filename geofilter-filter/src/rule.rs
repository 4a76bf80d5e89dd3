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

use std::fmt;

use geofilter_common::DateFormatUtils::DateFormat;
use geofilter_error::RuleError;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

pub mod coercion;
pub mod rule_matcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    Between,
    Intersects,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    StartsWith,
    EndsWith,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Between => "BETWEEN",
            Operator::Intersects => "INTERSECTS",
            Operator::Eq => "EQ",
            Operator::Ne => "NE",
            Operator::Gt => "GT",
            Operator::Ge => "GE",
            Operator::Lt => "LT",
            Operator::Le => "LE",
            Operator::In => "IN",
            Operator::StartsWith => "STARTSWITH",
            Operator::EndsWith => "ENDSWITH",
        }
    }

    /// BETWEEN and INTERSECTS, the only operators allowed on a range attribute.
    #[inline]
    pub fn is_range(&self) -> bool {
        matches!(self, Operator::Between | Operator::Intersects)
    }

    #[inline]
    pub fn is_text_match(&self) -> bool {
        matches!(self, Operator::In | Operator::StartsWith | Operator::EndsWith)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single attribute, or a `[from, to]` pair of attributes forming a range on the feature side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrName {
    Single(String),
    Range(String, String),
}

impl AttrName {
    pub fn first(&self) -> &str {
        match self {
            AttrName::Single(name) | AttrName::Range(name, _) => name,
        }
    }

    /// The upper attribute of a range, the single attribute otherwise.
    pub fn second(&self) -> &str {
        match self {
            AttrName::Single(name) | AttrName::Range(_, name) => name,
        }
    }

    #[inline]
    pub fn is_range(&self) -> bool {
        matches!(self, AttrName::Range(..))
    }
}

impl From<&str> for AttrName {
    fn from(name: &str) -> Self {
        AttrName::Single(name.to_string())
    }
}

impl From<String> for AttrName {
    fn from(name: String) -> Self {
        AttrName::Single(name)
    }
}

impl From<(&str, &str)> for AttrName {
    fn from((from, to): (&str, &str)) -> Self {
        AttrName::Range(from.to_string(), to.to_string())
    }
}

/// A single value, or a list. Lists of two are ranges for BETWEEN and INTERSECTS
/// and OR-sets for every other operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Many(Vec<Value>),
    Single(Value),
}

impl RuleValue {
    pub fn as_slice(&self) -> &[Value] {
        match self {
            RuleValue::Many(values) => values,
            RuleValue::Single(value) => std::slice::from_ref(value),
        }
    }
}

impl From<Value> for RuleValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(values) => RuleValue::Many(values),
            value => RuleValue::Single(value),
        }
    }
}

impl From<Vec<Value>> for RuleValue {
    fn from(values: Vec<Value>) -> Self {
        RuleValue::Many(values)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub attr_name: AttrName,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RuleValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Rule {
    pub fn new(attr_name: impl Into<AttrName>, operator: Operator, value: impl Into<RuleValue>) -> Self {
        Self {
            attr_name: attr_name.into(),
            operator,
            value: Some(value.into()),
            format: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn date_format(&self) -> Option<DateFormat> {
        self.format.as_deref().map(DateFormat::new)
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        let Some(value) = &self.value else {
            return Err(RuleError::missing_value());
        };
        if self.attr_name.is_range() && !self.operator.is_range() {
            return Err(RuleError::range_attribute_operator(self.operator.as_str()));
        }
        if let RuleValue::Many(values) = value {
            if self.operator.is_range() && values.len() != 2 {
                return Err(RuleError::value_arity(self.operator.as_str(), 2, values.len()));
            }
        }
        Ok(())
    }
}
