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

//! In-memory reductions shared by the backends that hold whole feature sets.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDateTime;
use geofilter_common::DateFormatUtils::DateFormat;
use serde_json::Map;
use serde_json::Value;

use crate::backend::MinMaxOptions;
use crate::feature::AttrType;
use crate::feature::AttrTypes;
use crate::feature::Feature;
use crate::feature::MinMax;
use crate::rule::coercion::scalar_to_string;
use crate::rule::rule_matcher::RuleMatcher;
use crate::rule::Rule;

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Date(NaiveDateTime),
    Number(f64),
    Text(String),
}

impl SortKey {
    fn of(value: &Value, date_format: Option<&DateFormat>) -> Option<Self> {
        if let Some(format) = date_format {
            return format.parse(&scalar_to_string(value)?).map(SortKey::Date);
        }
        match value {
            Value::Number(number) => number.as_f64().map(SortKey::Number),
            Value::String(text) => Some(match text.trim().parse::<f64>() {
                Ok(number) if !text.trim().is_empty() => SortKey::Number(number),
                _ => SortKey::Text(text.clone()),
            }),
            _ => None,
        }
    }

    // numbers order before text
    fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Number(_), _) => Ordering::Less,
            (_, SortKey::Number(_)) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }
}

/// Smallest and largest value of `attr_name`. Entries without the attribute,
/// and with a date format entries that do not parse, are ignored.
pub fn min_max_from_properties<'a, I>(
    properties: I,
    attr_name: &str,
    min_only: bool,
    max_only: bool,
    date_format: Option<&DateFormat>,
) -> MinMax
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let mut min: Option<(SortKey, &Value)> = None;
    let mut max: Option<(SortKey, &Value)> = None;

    for value in properties.into_iter().filter_map(|props| props.get(attr_name)) {
        let Some(key) = SortKey::of(value, date_format) else {
            continue;
        };
        if min.as_ref().is_none_or(|(current, _)| key.compare(current) == Ordering::Less) {
            min = Some((key.clone(), value));
        }
        if max.as_ref().is_none_or(|(current, _)| key.compare(current) == Ordering::Greater) {
            max = Some((key, value));
        }
    }

    let wants_min = min_only || !max_only;
    let wants_max = max_only || !min_only;
    MinMax {
        min: min.filter(|_| wants_min).map(|(_, value)| value.clone()),
        max: max.filter(|_| wants_max).map(|(_, value)| value.clone()),
    }
}

/// Min/max over features, honoring the context rules and sides of `options`.
pub fn min_max_of_features(features: &[Feature], attr_name: &str, options: &MinMaxOptions) -> MinMax {
    let date_format = options.date_format();
    min_max_from_properties(
        matching(features, options.context_rules()),
        attr_name,
        options.min_only,
        options.max_only,
        date_format.as_ref(),
    )
}

/// Distinct stringified values in first-seen order. Missing and null values are skipped.
pub fn unique_values_from_properties<'a, I>(properties: I, attr_name: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for value in properties.into_iter().filter_map(|props| props.get(attr_name)) {
        if value.is_null() {
            continue;
        }
        let text = scalar_to_string(value).unwrap_or_else(|| value.to_string());
        if seen.insert(text.clone()) {
            values.push(text);
        }
    }
    values
}

/// Attribute types guessed from the first feature's properties.
pub fn attr_types_from_sample(features: &[Feature]) -> AttrTypes {
    features
        .first()
        .map(|feature| {
            feature
                .properties
                .iter()
                .map(|(name, value)| (name.clone(), AttrType::of_value(value)))
                .collect()
        })
        .unwrap_or_default()
}

/// Properties of the features matching every rule.
pub fn matching<'a>(features: &'a [Feature], rules: &'a [Rule]) -> impl Iterator<Item = &'a Map<String, Value>> {
    features
        .iter()
        .map(|feature| &feature.properties)
        .filter(move |properties| RuleMatcher::matches_all(rules, properties))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::rule::Operator;

    fn props(values: Value) -> Vec<Map<String, Value>> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|value| value.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn min_max_ignores_missing_attributes() {
        let properties = props(json!([{"a": 0}, {"a": 10}, {"b": 99}, {"a": -10}]));
        let result = min_max_from_properties(&properties, "a", false, false, None);
        assert_eq!(
            result,
            MinMax {
                min: Some(json!(-10)),
                max: Some(json!(10))
            }
        );
    }

    #[test]
    fn min_max_sides_can_be_restricted() {
        let properties = props(json!([{"a": 3}, {"a": 1}]));
        let min_only = min_max_from_properties(&properties, "a", true, false, None);
        assert_eq!(min_only, MinMax { min: Some(json!(1)), max: None });
        let max_only = min_max_from_properties(&properties, "a", false, true, None);
        assert_eq!(max_only, MinMax { min: None, max: Some(json!(3)) });
    }

    #[test]
    fn numeric_strings_compare_as_numbers() {
        let properties = props(json!([{"a": "9"}, {"a": "10"}, {"a": "2"}]));
        let result = min_max_from_properties(&properties, "a", false, false, None);
        assert_eq!(result.min, Some(json!("2")));
        assert_eq!(result.max, Some(json!("10")));
    }

    #[test]
    fn dates_use_format_and_skip_invalid() {
        let properties = props(json!([
            {"d": "15.03.2021"},
            {"d": "unknown"},
            {"d": "01.12.2020"},
            {"d": "02.01.2022"}
        ]));
        let format = DateFormat::new("DD.MM.YYYY");
        let result = min_max_from_properties(&properties, "d", false, false, Some(&format));
        assert_eq!(result.min, Some(json!("01.12.2020")));
        assert_eq!(result.max, Some(json!("02.01.2022")));
    }

    #[test]
    fn empty_input_has_no_bounds() {
        let result = min_max_from_properties(std::iter::empty(), "a", false, false, None);
        assert_eq!(result, MinMax::default());
    }

    #[test]
    fn unique_values_are_stringified_and_deduplicated() {
        let properties = props(json!([
            {"t": "Stadt"}, {"t": 4}, {"t": "Stadt"}, {"t": null}, {"x": 1}, {"t": true}, {"t": "4"}
        ]));
        assert_eq!(unique_values_from_properties(&properties, "t"), vec!["Stadt", "4", "true"]);

        let floats = props(json!([{"a": 1.0}, {"a": 1}, {"a": 1.5}]));
        assert_eq!(unique_values_from_properties(&floats, "a"), vec!["1", "1.5"]);
    }

    #[test]
    fn context_rules_narrow_min_max() {
        let features: Vec<Feature> = vec![
            Feature::from_properties(json!({"kind": "kita", "places": 40})),
            Feature::from_properties(json!({"kind": "schule", "places": 400})),
            Feature::from_properties(json!({"kind": "kita", "places": 12})),
        ];
        let options = MinMaxOptions {
            context: Some(crate::question::QuestionContext {
                rules: vec![Rule::new("kind", Operator::Eq, json!("Kita"))],
                ..Default::default()
            }),
            ..MinMaxOptions::default()
        };
        let result = min_max_of_features(&features, "places", &options);
        assert_eq!(result, MinMax { min: Some(json!(12)), max: Some(json!(40)) });
    }

    #[test]
    fn sample_types_from_first_feature() {
        let features = vec![Feature::from_properties(json!({"name": "x", "n": 1, "open": false}))];
        let types = attr_types_from_sample(&features);
        assert_eq!(types.get("name"), Some(&AttrType::String));
        assert_eq!(types.get("n"), Some(&AttrType::Number));
        assert_eq!(types.get("open"), Some(&AttrType::Boolean));
        assert!(attr_types_from_sample(&[]).is_empty());
    }
}
