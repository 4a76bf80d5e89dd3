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

//! Predicate evaluation of a single [`Rule`] against feature values.
//!
//! # Single value
//!
//! * `BETWEEN`, `INTERSECTS`: `featureA <= value <= featureB` (`featureB`
//!   defaults to `featureA`).
//! * `EQ`, `NE`, `GT`, `GE`, `LT`, `LE`: direct comparison.
//! * `IN`, `STARTSWITH`, `ENDSWITH`: case-insensitive substring, prefix and
//!   suffix tests, strings only.
//!
//! # List value
//!
//! * `INTERSECTS`: `featureA <= valueB && featureB >= valueA` (overlap).
//! * `BETWEEN`: `valueA <= featureA && featureB <= valueB` (containment).
//! * `EQ`, `IN`, `STARTSWITH`, `ENDSWITH`: at least one listed value matches.
//! * `NE`: no listed value is equal.
//! * `GT`, `GE`, `LT`, `LE`: never match.
//!
//! With a `format`, both sides are parsed as dates and compared in time.
//! Values that cannot be parsed or coerced never match.

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use geofilter_common::DateFormatUtils::DateFormat;
use serde_json::Map;
use serde_json::Value;

use crate::rule::coercion::coerce_rule_value;
use crate::rule::coercion::coerce_to_rule_type;
use crate::rule::coercion::scalar_to_string;
use crate::rule::coercion::Coerced;
use crate::rule::Operator;
use crate::rule::Rule;
use crate::rule::RuleValue;

pub struct RuleMatcher;

impl RuleMatcher {
    /// Evaluates `rule` against one feature value, or a `[a, b]` feature range.
    pub fn matches(rule: &Rule, feature_a: &Value, feature_b: Option<&Value>) -> bool {
        if rule.validate().is_err() {
            return false;
        }
        let Some(value) = &rule.value else {
            return false;
        };
        let feature_b = feature_b.unwrap_or(feature_a);
        let comparator = Comparator::new(rule.format.as_deref());

        match value {
            RuleValue::Single(value) => comparator.single(rule.operator, value, feature_a, feature_b),
            RuleValue::Many(values) => comparator.many(rule.operator, values, feature_a, feature_b),
        }
    }

    /// Evaluates `rule` against a feature's properties. Missing attributes are null.
    pub fn matches_properties(rule: &Rule, properties: &Map<String, Value>) -> bool {
        let feature_a = properties.get(rule.attr_name.first()).unwrap_or(&Value::Null);
        if rule.attr_name.is_range() {
            let feature_b = properties.get(rule.attr_name.second()).unwrap_or(&Value::Null);
            Self::matches(rule, feature_a, Some(feature_b))
        } else {
            Self::matches(rule, feature_a, None)
        }
    }

    /// All rules must match.
    pub fn matches_all(rules: &[Rule], properties: &Map<String, Value>) -> bool {
        rules.iter().all(|rule| Self::matches_properties(rule, properties))
    }
}

struct Comparator {
    format: Option<DateFormat>,
}

impl Comparator {
    fn new(format: Option<&str>) -> Self {
        Self {
            format: format.map(DateFormat::new),
        }
    }

    fn single(&self, operator: Operator, value: &Value, feature_a: &Value, feature_b: &Value) -> bool {
        match operator {
            Operator::Between | Operator::Intersects => {
                is_le(self.compare(feature_a, value)) && is_ge(self.compare(feature_b, value))
            }
            Operator::Eq => self.equals(feature_a, value),
            Operator::Ne => !feature_a.is_null() && !self.equals(feature_a, value),
            Operator::Gt => self.compare(feature_a, value) == Some(Ordering::Greater),
            Operator::Ge => is_ge(self.compare(feature_a, value)),
            Operator::Lt => self.compare(feature_a, value) == Some(Ordering::Less),
            Operator::Le => is_le(self.compare(feature_a, value)),
            Operator::In | Operator::StartsWith | Operator::EndsWith => text_match(operator, value, feature_a),
        }
    }

    fn many(&self, operator: Operator, values: &[Value], feature_a: &Value, feature_b: &Value) -> bool {
        match operator {
            Operator::Intersects => {
                let [value_a, value_b] = values else {
                    return false;
                };
                is_le(self.compare(feature_a, value_b)) && is_ge(self.compare(feature_b, value_a))
            }
            Operator::Between => {
                let [value_a, value_b] = values else {
                    return false;
                };
                is_ge(self.compare(feature_a, value_a)) && is_le(self.compare(feature_b, value_b))
            }
            Operator::Eq => values.iter().any(|value| self.equals(feature_a, value)),
            Operator::Ne => !feature_a.is_null() && !values.iter().any(|value| self.equals(feature_a, value)),
            Operator::In | Operator::StartsWith | Operator::EndsWith => {
                values.iter().any(|value| text_match(operator, value, feature_a))
            }
            Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => false,
        }
    }

    fn equals(&self, feature: &Value, value: &Value) -> bool {
        self.compare(feature, value) == Some(Ordering::Equal)
    }

    /// Ordering of the feature value relative to the rule value.
    fn compare(&self, feature: &Value, value: &Value) -> Option<Ordering> {
        match &self.format {
            Some(format) => {
                let feature = parse_date(format, feature)?;
                let value = parse_date(format, value)?;
                Some(feature.cmp(&value))
            }
            None => {
                let rule = coerce_rule_value(value)?;
                let feature = coerce_to_rule_type(feature, value)?;
                feature.compare(&rule)
            }
        }
    }
}

fn parse_date(format: &DateFormat, value: &Value) -> Option<NaiveDateTime> {
    format.parse(&scalar_to_string(value)?)
}

fn text_match(operator: Operator, value: &Value, feature: &Value) -> bool {
    let (Some(Coerced::Text(needle)), Some(Coerced::Text(haystack))) =
        (coerce_rule_value(value), coerce_to_rule_type(feature, value))
    else {
        return false;
    };
    match operator {
        Operator::In => haystack.contains(&needle),
        Operator::StartsWith => haystack.starts_with(&needle),
        Operator::EndsWith => haystack.ends_with(&needle),
        _ => false,
    }
}

#[inline]
fn is_le(ordering: Option<Ordering>) -> bool {
    matches!(ordering, Some(Ordering::Less | Ordering::Equal))
}

#[inline]
fn is_ge(ordering: Option<Ordering>) -> bool {
    matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
}
