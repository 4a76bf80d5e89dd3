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

//! OGC API Features items pages and OpenAPI schema lookup.

use geofilter_error::GeoFilterError;
use geofilter_error::GeoFilterResult;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;

use crate::feature::AttrType;
use crate::feature::AttrTypes;
use crate::feature::Feature;

#[derive(Debug, Clone, Deserialize)]
struct Link {
    #[serde(default)]
    rel: String,
    #[serde(default)]
    href: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ItemsResponse {
    features: Option<Vec<Feature>>,
    #[serde(default)]
    links: Vec<Link>,
}

/// One page of `/collections/{collection}/items`.
#[derive(Debug, Clone, Default)]
pub struct OafPage {
    pub features: Vec<Feature>,
    /// `href` of the `rel=next` link.
    pub next: Option<String>,
}

impl OafPage {
    pub fn from_json(payload: &str) -> GeoFilterResult<Self> {
        let response: ItemsResponse = serde_json::from_str(payload)?;
        let features = response
            .features
            .ok_or_else(|| GeoFilterError::malformed("GeoJSON", "missing features array"))?;
        let next = response
            .links
            .into_iter()
            .find(|link| link.rel == "next" && !link.href.is_empty())
            .map(|link| link.href);
        Ok(Self { features, next })
    }
}

/// Where the item schema of a collection lives.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaLocation {
    /// Schema found in the OpenAPI document itself.
    Inline(Value),
    /// Schema behind an absolute url.
    Remote(String),
}

/// Looks up the item schema of `collection` in an OpenAPI document.
///
/// The `200` response of `/collections/{collection}/items/{featureId}` is
/// preferred over `/collections/{collection}/items`. Local
/// `#/components/...` references are resolved in place.
pub fn locate_item_schema(api: &Value, collection: &str) -> Option<SchemaLocation> {
    let paths = api.get("paths")?;
    let candidates = [
        format!("/collections/{collection}/items/{{featureId}}"),
        format!("/collections/{collection}/items"),
    ];
    let schema = candidates.iter().find_map(|path| {
        let content = paths.get(path)?.get("get")?.get("responses")?.get("200")?.get("content")?;
        let content = content
            .get("application/geo+json")
            .or_else(|| content.as_object().and_then(|media| media.values().next()))?;
        content.get("schema")
    })?;

    match schema.get("$ref").and_then(Value::as_str) {
        Some(reference) if reference.starts_with('#') => {
            resolve_local(api, reference).cloned().map(SchemaLocation::Inline)
        }
        Some(reference) => Some(SchemaLocation::Remote(reference.to_string())),
        None => Some(SchemaLocation::Inline(schema.clone())),
    }
}

/// Resolves a `#/a/b` JSON pointer reference against `document`.
pub fn resolve_local<'a>(document: &'a Value, reference: &str) -> Option<&'a Value> {
    document.pointer(reference.trim_start_matches('#'))
}

/// Attribute types from a feature or properties JSON schema.
///
/// A GeoJSON feature schema nests the attributes under
/// `properties.properties.properties`; `allOf` parts are merged. Local
/// references are resolved against `document`.
pub fn attr_types_from_json_schema(schema: &Value, document: &Value) -> GeoFilterResult<AttrTypes> {
    let mut properties = Map::new();
    collect_properties(schema, document, &mut properties, 0);
    if properties.is_empty() {
        return Err(GeoFilterError::schema_not_found("item schema", "no properties declared"));
    }
    Ok(properties
        .iter()
        .map(|(name, property)| (name.clone(), attr_type_of(property)))
        .collect())
}

const MAX_REF_DEPTH: usize = 8;

fn collect_properties(schema: &Value, document: &Value, out: &mut Map<String, Value>, depth: usize) {
    if depth > MAX_REF_DEPTH {
        return;
    }
    if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
        if let Some(target) = resolve_local(document, reference) {
            collect_properties(target, document, out, depth + 1);
        }
        return;
    }
    if let Some(parts) = schema.get("allOf").and_then(Value::as_array) {
        for part in parts {
            collect_properties(part, document, out, depth + 1);
        }
    }
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return;
    };
    match properties.get("properties") {
        // GeoJSON feature: attributes live one level down
        Some(nested) if properties.contains_key("geometry") || properties.contains_key("type") => {
            collect_properties(nested, document, out, depth + 1);
        }
        _ => {
            for (name, property) in properties {
                out.insert(name.clone(), property.clone());
            }
        }
    }
}

fn attr_type_of(property: &Value) -> AttrType {
    if let Some(reference) = property.get("$ref").and_then(Value::as_str) {
        if reference.to_lowercase().contains("geometry") {
            return AttrType::Geometry;
        }
        return AttrType::Other("ref".to_string());
    }
    if property.get("x-ogc-role").and_then(Value::as_str) == Some("primary-geometry") {
        return AttrType::Geometry;
    }
    let schema_type = match property.get("type") {
        Some(Value::String(schema_type)) => Some(schema_type.as_str()),
        // ["string", "null"]
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).find(|t| *t != "null"),
        _ => None,
    };
    AttrType::from_json_schema(schema_type, property.get("format").and_then(Value::as_str))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn page_with_next_link() {
        let page = OafPage::from_json(
            r#"{
                "type": "FeatureCollection",
                "features": [{"type": "Feature", "id": 1, "properties": {"a": 0}}],
                "links": [
                    {"rel": "self", "href": "https://api/collections/c/items?limit=1"},
                    {"rel": "next", "href": "https://api/collections/c/items?limit=1&offset=1"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(page.features.len(), 1);
        assert_eq!(page.next.as_deref(), Some("https://api/collections/c/items?limit=1&offset=1"));

        let last = OafPage::from_json(r#"{"features": [], "links": []}"#).unwrap();
        assert!(last.next.is_none());
        assert!(OafPage::from_json(r#"{"links": []}"#).is_err());
    }

    fn api_document() -> Value {
        json!({
            "paths": {
                "/collections/schools/items/{featureId}": {
                    "get": {"responses": {"200": {"content": {
                        "application/geo+json": {"schema": {"$ref": "#/components/schemas/schools"}}
                    }}}}
                },
                "/collections/parks/items": {
                    "get": {"responses": {"200": {"content": {
                        "application/geo+json": {"schema": {"$ref": "https://api/collections/parks/appschema"}}
                    }}}}
                }
            },
            "components": {"schemas": {
                "schools": {
                    "type": "object",
                    "properties": {
                        "type": {"type": "string"},
                        "geometry": {"$ref": "#/components/schemas/pointGeoJSON"},
                        "properties": {
                            "type": "object",
                            "properties": {
                                "name": {"type": "string"},
                                "pupils": {"type": "integer"},
                                "founded": {"type": "string", "format": "date"},
                                "public": {"type": ["boolean", "null"]}
                            }
                        }
                    }
                }
            }}
        })
    }

    #[test]
    fn locates_local_and_remote_schemas() {
        let api = api_document();
        let Some(SchemaLocation::Inline(schema)) = locate_item_schema(&api, "schools") else {
            panic!("expected inline schema");
        };
        let types = attr_types_from_json_schema(&schema, &api).unwrap();
        assert_eq!(types.len(), 4);
        assert_eq!(types["name"], AttrType::String);
        assert_eq!(types["pupils"], AttrType::Number);
        assert_eq!(types["founded"], AttrType::Date);
        assert_eq!(types["public"], AttrType::Boolean);

        assert_eq!(
            locate_item_schema(&api, "parks"),
            Some(SchemaLocation::Remote("https://api/collections/parks/appschema".to_string()))
        );
        assert_eq!(locate_item_schema(&api, "unknown"), None);
    }

    #[test]
    fn flat_properties_schema_with_geometry_ref() {
        let schema = json!({
            "properties": {
                "bezeichnung": {"type": "string"},
                "geom": {"$ref": "https://geojson.org/schema/Geometry.json"}
            }
        });
        let types = attr_types_from_json_schema(&schema, &Value::Null).unwrap();
        assert_eq!(types["bezeichnung"], AttrType::String);
        assert_eq!(types["geom"], AttrType::Geometry);
    }

    #[test]
    fn schema_without_properties_is_not_found() {
        let err = attr_types_from_json_schema(&json!({"type": "object"}), &Value::Null).unwrap_err();
        assert_eq!(err.category(), geofilter_error::ErrorCategory::Schema);
    }
}
