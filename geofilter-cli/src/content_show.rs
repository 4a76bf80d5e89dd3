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

use geofilter_filter::AttrTypes;
use geofilter_filter::Feature;
use geofilter_filter::MinMax;
use serde_json::Value;
use tabled::Table;
use tabled::Tabled;

#[derive(Tabled)]
struct AttrTypeRow {
    #[tabled(rename = "Attribute")]
    attribute: String,
    #[tabled(rename = "Type")]
    attr_type: String,
}

#[derive(Tabled)]
struct BoundRow {
    #[tabled(rename = "Bound")]
    bound: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct ValueRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Properties")]
    properties: String,
}

pub fn attr_types_table(types: &AttrTypes) -> String {
    let rows = types.iter().map(|(attribute, attr_type)| AttrTypeRow {
        attribute: attribute.clone(),
        attr_type: attr_type.to_string(),
    });
    Table::new(rows).to_string()
}

pub fn min_max_table(min_max: &MinMax) -> String {
    let text = |value: &Option<Value>| value.as_ref().map_or_else(|| "-".to_string(), display_value);
    let rows = [
        BoundRow {
            bound: "min",
            value: text(&min_max.min),
        },
        BoundRow {
            bound: "max",
            value: text(&min_max.max),
        },
    ];
    Table::new(rows).to_string()
}

pub fn values_table(values: &[String]) -> String {
    let rows = values.iter().enumerate().map(|(index, value)| ValueRow {
        index: index + 1,
        value: value.clone(),
    });
    Table::new(rows).to_string()
}

pub fn features_table(features: &[Feature]) -> String {
    let rows = features.iter().map(|feature| FeatureRow {
        id: feature.id.as_ref().map(display_value).unwrap_or_default(),
        properties: Value::Object(feature.properties.clone()).to_string(),
    });
    Table::new(rows).to_string()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
