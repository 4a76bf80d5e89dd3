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

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use geofilter_error::GeoFilterError;
use geofilter_error::GeoFilterResult;
use parking_lot::RwLock;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde_json::Map;
use serde_json::Value;

/// `[minx, miny, maxx, maxy]` in map projection units.
pub type Extent = [f64; 4];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Map<String, Value>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Feature {
    pub fn new(id: impl Into<Value>, properties: Map<String, Value>) -> Self {
        Self {
            id: Some(id.into()),
            properties,
            geometry: None,
        }
    }

    /// Builds a feature from a JSON object literal of properties. Non-objects give no properties.
    pub fn from_properties(properties: Value) -> Self {
        Self {
            properties: match properties {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            ..Self::default()
        }
    }

    pub fn with_geometry(mut self, geometry: Value) -> Self {
        self.geometry = Some(geometry);
        self
    }

    #[inline]
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Parses a GeoJSON FeatureCollection; a payload without `features` is malformed.
    pub fn from_json(payload: &str) -> GeoFilterResult<Self> {
        let value: Value = serde_json::from_str(payload)?;
        if !value.get("features").is_some_and(Value::is_array) {
            return Err(GeoFilterError::malformed("GeoJSON", "missing features array"));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Attribute type discovered by a schema probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrType {
    String,
    Number,
    Boolean,
    Date,
    Geometry,
    Other(String),
}

pub type AttrTypes = BTreeMap<String, AttrType>;

impl AttrType {
    pub fn as_str(&self) -> &str {
        match self {
            AttrType::String => "string",
            AttrType::Number => "number",
            AttrType::Boolean => "boolean",
            AttrType::Date => "date",
            AttrType::Geometry => "geometry",
            AttrType::Other(raw) => raw,
        }
    }

    /// Maps an XML schema type such as `xsd:int` or `gml:PointPropertyType`.
    pub fn from_xsd(xsd_type: &str) -> Self {
        let (prefix, local) = match xsd_type.split_once(':') {
            Some((prefix, local)) => (prefix, local),
            None => ("", xsd_type),
        };
        if prefix.eq_ignore_ascii_case("gml") {
            return AttrType::Geometry;
        }
        match local {
            "string" | "anyURI" | "token" | "normalizedString" => AttrType::String,
            "int" | "integer" | "long" | "short" | "decimal" | "double" | "float" | "byte"
            | "nonNegativeInteger" | "positiveInteger" | "unsignedInt" => AttrType::Number,
            "boolean" => AttrType::Boolean,
            "date" | "dateTime" => AttrType::Date,
            _ => AttrType::Other(local.to_string()),
        }
    }

    /// Maps a JSON schema `type` with an optional `format`.
    pub fn from_json_schema(schema_type: Option<&str>, format: Option<&str>) -> Self {
        match (schema_type, format) {
            (Some("string"), Some("date" | "date-time")) => AttrType::Date,
            (Some("string"), _) => AttrType::String,
            (Some("integer" | "number"), _) => AttrType::Number,
            (Some("boolean"), _) => AttrType::Boolean,
            (Some("object"), Some("geometry")) => AttrType::Geometry,
            (Some(other), _) => AttrType::Other(other.to_string()),
            (None, _) => AttrType::Other("unknown".to_string()),
        }
    }

    /// Type of a sampled value.
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::String(_) => AttrType::String,
            Value::Number(_) => AttrType::Number,
            Value::Bool(_) => AttrType::Boolean,
            Value::Null => AttrType::Other("null".to_string()),
            Value::Array(_) => AttrType::Other("array".to_string()),
            Value::Object(_) => AttrType::Other("object".to_string()),
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AttrType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Result of a min/max query. A side is absent when it was not requested or no value exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
}

/// Source of features already loaded by the host, plus the map state they are shown in.
#[cfg_attr(test, mockall::automock)]
pub trait FeatureStore: Send + Sync {
    fn get_features_by_layer_id(&self, layer_id: &str) -> Arc<Vec<Feature>>;

    fn is_feature_in_map_extent(&self, feature: &Feature) -> bool;

    fn is_feature_in_geometry(&self, feature: &Feature, geometry: &Value) -> bool;

    fn get_current_extent(&self) -> Extent;

    fn get_map_projection(&self) -> String;
}

/// Feature store backed by plain vectors.
///
/// Spatial tests work on GeoJSON geometries: a point is tested against the
/// outer ring of a polygon, any other pairing by bounding box overlap.
pub struct InMemoryFeatureStore {
    layers: RwLock<HashMap<String, Arc<Vec<Feature>>>>,
    extent: RwLock<Extent>,
    projection: String,
}

impl InMemoryFeatureStore {
    pub fn new(extent: Extent, projection: impl Into<String>) -> Self {
        Self {
            layers: RwLock::new(HashMap::new()),
            extent: RwLock::new(extent),
            projection: projection.into(),
        }
    }

    pub fn insert_layer(&self, layer_id: impl Into<String>, features: Vec<Feature>) {
        self.layers.write().insert(layer_id.into(), Arc::new(features));
    }

    pub fn set_extent(&self, extent: Extent) {
        *self.extent.write() = extent;
    }
}

impl Default for InMemoryFeatureStore {
    fn default() -> Self {
        Self::new([f64::MIN, f64::MIN, f64::MAX, f64::MAX], "EPSG:4326")
    }
}

impl FeatureStore for InMemoryFeatureStore {
    fn get_features_by_layer_id(&self, layer_id: &str) -> Arc<Vec<Feature>> {
        self.layers.read().get(layer_id).cloned().unwrap_or_default()
    }

    fn is_feature_in_map_extent(&self, feature: &Feature) -> bool {
        let extent = *self.extent.read();
        feature
            .geometry
            .as_ref()
            .and_then(geometry_bbox)
            .is_some_and(|bbox| bbox_intersects(&bbox, &extent))
    }

    fn is_feature_in_geometry(&self, feature: &Feature, geometry: &Value) -> bool {
        let Some(feature_geometry) = feature.geometry.as_ref() else {
            return false;
        };
        if let (Some(point), Some(ring)) = (point_of(feature_geometry), outer_ring(geometry)) {
            return point_in_ring(point, &ring);
        }
        match (geometry_bbox(feature_geometry), geometry_bbox(geometry)) {
            (Some(a), Some(b)) => bbox_intersects(&a, &b),
            _ => false,
        }
    }

    fn get_current_extent(&self) -> Extent {
        *self.extent.read()
    }

    fn get_map_projection(&self) -> String {
        self.projection.clone()
    }
}

/// Bounding box over all coordinates of a GeoJSON geometry.
pub fn geometry_bbox(geometry: &Value) -> Option<Extent> {
    let mut bbox: Option<Extent> = None;
    if let Some(geometries) = geometry.get("geometries").and_then(Value::as_array) {
        for part in geometries.iter().filter_map(geometry_bbox) {
            bbox = Some(merge(bbox, [part[0], part[1]]));
            bbox = Some(merge(bbox, [part[2], part[3]]));
        }
        return bbox;
    }
    visit_positions(geometry.get("coordinates")?, &mut |x, y| bbox = Some(merge(bbox, [x, y])));
    bbox
}

fn merge(bbox: Option<Extent>, [x, y]: [f64; 2]) -> Extent {
    match bbox {
        Some([minx, miny, maxx, maxy]) => [minx.min(x), miny.min(y), maxx.max(x), maxy.max(y)],
        None => [x, y, x, y],
    }
}

fn visit_positions(coordinates: &Value, visit: &mut impl FnMut(f64, f64)) {
    let Some(items) = coordinates.as_array() else {
        return;
    };
    if let (Some(x), Some(y)) = (
        items.first().and_then(Value::as_f64),
        items.get(1).and_then(Value::as_f64),
    ) {
        visit(x, y);
        return;
    }
    for item in items {
        visit_positions(item, visit);
    }
}

fn bbox_intersects(a: &Extent, b: &Extent) -> bool {
    a[0] <= b[2] && a[2] >= b[0] && a[1] <= b[3] && a[3] >= b[1]
}

fn point_of(geometry: &Value) -> Option<(f64, f64)> {
    if geometry.get("type")?.as_str()? != "Point" {
        return None;
    }
    let coordinates = geometry.get("coordinates")?.as_array()?;
    Some((coordinates.first()?.as_f64()?, coordinates.get(1)?.as_f64()?))
}

fn outer_ring(geometry: &Value) -> Option<Vec<(f64, f64)>> {
    if geometry.get("type")?.as_str()? != "Polygon" {
        return None;
    }
    let ring = geometry.get("coordinates")?.as_array()?.first()?.as_array()?;
    ring.iter()
        .map(|position| {
            let position = position.as_array()?;
            Some((position.first()?.as_f64()?, position.get(1)?.as_f64()?))
        })
        .collect()
}

// even-odd ray casting
fn point_in_ring((x, y): (f64, f64), ring: &[(f64, f64)]) -> bool {
    let mut inside = false;
    let mut j = ring.len().wrapping_sub(1);
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
