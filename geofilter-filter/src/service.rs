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

use geofilter_error::GeoFilterError;
use geofilter_error::GeoFilterResult;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Wfs,
    Oaf,
    GeoJson,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Wfs => "wfs",
            ServiceKind::Oaf => "oaf",
            ServiceKind::GeoJson => "geojson",
        }
    }
}

/// Whether features are already loaded by the host or have to be requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locality {
    Intern,
    Extern,
}

impl Locality {
    #[inline]
    pub fn from_extern(is_extern: bool) -> Self {
        if is_extern {
            Locality::Extern
        } else {
            Locality::Intern
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WfsService {
    #[serde(rename = "extern", default)]
    pub is_extern: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub typename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srs_name: Option<String>,
    #[serde(rename = "featureNS", default, skip_serializing_if = "Option::is_none")]
    pub feature_ns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<String>,
}

impl WfsService {
    /// Type name carrying the feature prefix, as sent in `typeName`.
    pub fn qualified_typename(&self) -> String {
        match (&self.feature_prefix, self.typename.contains(':')) {
            (Some(prefix), false) if !prefix.is_empty() => format!("{}:{}", prefix, self.typename),
            _ => self.typename.clone(),
        }
    }

    /// Type name without any prefix, as it appears in schema documents.
    pub fn local_typename(&self) -> &str {
        self.typename
            .split_once(':')
            .map_or(self.typename.as_str(), |(_, local)| local)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OafService {
    #[serde(rename = "extern", default)]
    pub is_extern: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<String>,
}

impl OafService {
    pub fn items_url(&self) -> String {
        format!("{}/collections/{}/items", self.url.trim_end_matches('/'), self.collection)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoJsonService {
    #[serde(rename = "extern", default)]
    pub is_extern: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<String>,
}

/// Backend descriptor, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServiceDescriptor {
    Wfs(WfsService),
    Oaf(OafService),
    GeoJson(GeoJsonService),
}

impl ServiceDescriptor {
    /// Parses a descriptor, reporting an unknown `type` as an unsupported service type.
    pub fn from_value(value: Value) -> GeoFilterResult<Self> {
        let Some(service_type) = value.get("type") else {
            return Err(GeoFilterError::service_invalid("type", "missing"));
        };
        match service_type.as_str() {
            Some("wfs" | "oaf" | "geojson") => {}
            Some(other) => return Err(GeoFilterError::unsupported_service_type(other)),
            None => return Err(GeoFilterError::unsupported_service_type(service_type.to_string())),
        }
        serde_json::from_value(value).map_err(|e| GeoFilterError::service_invalid("service", e.to_string()))
    }

    pub fn kind(&self) -> ServiceKind {
        match self {
            ServiceDescriptor::Wfs(_) => ServiceKind::Wfs,
            ServiceDescriptor::Oaf(_) => ServiceKind::Oaf,
            ServiceDescriptor::GeoJson(_) => ServiceKind::GeoJson,
        }
    }

    pub fn is_extern(&self) -> bool {
        match self {
            ServiceDescriptor::Wfs(service) => service.is_extern,
            ServiceDescriptor::Oaf(service) => service.is_extern,
            ServiceDescriptor::GeoJson(service) => service.is_extern,
        }
    }

    pub fn locality(&self) -> Locality {
        Locality::from_extern(self.is_extern())
    }

    pub fn url(&self) -> &str {
        match self {
            ServiceDescriptor::Wfs(service) => &service.url,
            ServiceDescriptor::Oaf(service) => &service.url,
            ServiceDescriptor::GeoJson(service) => &service.url,
        }
    }

    pub fn layer_id(&self) -> Option<&str> {
        let layer_id = match self {
            ServiceDescriptor::Wfs(service) => service.layer_id.as_deref(),
            ServiceDescriptor::Oaf(service) => service.layer_id.as_deref(),
            ServiceDescriptor::GeoJson(service) => service.layer_id.as_deref(),
        };
        layer_id.filter(|layer_id| !layer_id.is_empty())
    }

    /// Layer id of an intern service, an error when it is missing.
    pub fn require_layer_id(&self) -> GeoFilterResult<&str> {
        self.layer_id()
            .ok_or_else(|| GeoFilterError::service_invalid("layerId", "required for intern services"))
    }

    pub fn require_url(&self) -> GeoFilterResult<&str> {
        let url = self.url();
        if url.trim().is_empty() {
            return Err(GeoFilterError::service_invalid("url", "missing"));
        }
        Ok(url)
    }

    pub fn validate(&self) -> GeoFilterResult<()> {
        match self {
            ServiceDescriptor::Wfs(service) if service.typename.trim().is_empty() => {
                return Err(GeoFilterError::service_invalid("typename", "missing"));
            }
            ServiceDescriptor::Oaf(service) if service.collection.trim().is_empty() => {
                return Err(GeoFilterError::service_invalid("collection", "missing"));
            }
            _ => {}
        }
        match self.locality() {
            Locality::Extern => self.require_url().map(|_| ()),
            Locality::Intern => self.require_layer_id().map(|_| ()),
        }
    }

    /// Stable serialization used in cache keys.
    pub fn cache_repr(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locality = match self.locality() {
            Locality::Intern => "intern",
            Locality::Extern => "extern",
        };
        write!(f, "{}-{} {}", self.kind().as_str(), locality, self.url())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_wfs_descriptor() {
        let service = ServiceDescriptor::from_value(json!({
            "type": "wfs",
            "extern": true,
            "url": "https://geodienste.example/wfs",
            "typename": "app:kitas",
            "srsName": "EPSG:25832",
            "featureNS": "http://www.deegree.org/app",
            "featurePrefix": "app",
            "layerId": "8712"
        }))
        .unwrap();
        assert_eq!(service.kind(), ServiceKind::Wfs);
        assert_eq!(service.locality(), Locality::Extern);
        let ServiceDescriptor::Wfs(wfs) = &service else {
            panic!("expected wfs");
        };
        assert_eq!(wfs.feature_ns.as_deref(), Some("http://www.deegree.org/app"));
        assert_eq!(wfs.qualified_typename(), "app:kitas");
        assert_eq!(wfs.local_typename(), "kitas");
        assert!(service.validate().is_ok());
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let err = ServiceDescriptor::from_value(json!({"type": "wms", "url": "x"})).unwrap_err();
        assert_eq!(err, GeoFilterError::unsupported_service_type("wms"));

        let err = ServiceDescriptor::from_value(json!({"url": "x"})).unwrap_err();
        assert_eq!(err, GeoFilterError::service_invalid("type", "missing"));
    }

    #[test]
    fn validate_checks_locality_requirements() {
        let intern = ServiceDescriptor::GeoJson(GeoJsonService::default());
        assert_eq!(
            intern.validate(),
            Err(GeoFilterError::service_invalid("layerId", "required for intern services"))
        );

        let extern_oaf = ServiceDescriptor::Oaf(OafService {
            is_extern: true,
            collection: "schools".into(),
            ..OafService::default()
        });
        assert_eq!(extern_oaf.validate(), Err(GeoFilterError::service_invalid("url", "missing")));

        let no_collection = ServiceDescriptor::Oaf(OafService {
            is_extern: true,
            url: "https://api.example".into(),
            ..OafService::default()
        });
        assert_eq!(
            no_collection.validate(),
            Err(GeoFilterError::service_invalid("collection", "missing"))
        );
    }

    #[test]
    fn oaf_items_url() {
        let service = OafService {
            url: "https://api.example/".into(),
            collection: "schools".into(),
            ..OafService::default()
        };
        assert_eq!(service.items_url(), "https://api.example/collections/schools/items");
    }

    #[test]
    fn cache_repr_is_stable() {
        let a = ServiceDescriptor::GeoJson(GeoJsonService {
            is_extern: true,
            url: "https://x/data.json".into(),
            layer_id: None,
        });
        assert_eq!(a.cache_repr(), a.clone().cache_repr());
        assert_eq!(a.cache_repr(), r#"{"type":"geojson","extern":true,"url":"https://x/data.json"}"#);
    }
}
