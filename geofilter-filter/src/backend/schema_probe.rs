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

//! Attribute type discovery against remote services.

use std::sync::Arc;

use geofilter_common::common::transport::HttpRequest;
use geofilter_common::common::transport::HttpTransport;
use geofilter_error::GeoFilterError;
use geofilter_error::GeoFilterResult;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::backend::reduce::attr_types_from_sample;
use crate::feature::AttrTypes;
use crate::feature::FeatureCollection;
use crate::protocol::gml::parse_describe_feature_type;
use crate::protocol::oaf::attr_types_from_json_schema;
use crate::protocol::oaf::locate_item_schema;
use crate::protocol::oaf::SchemaLocation;
use crate::service::OafService;
use crate::service::ServiceDescriptor;
use crate::service::WfsService;

pub struct SchemaProbe {
    transport: Arc<dyn HttpTransport>,
    wfs_version: String,
}

impl SchemaProbe {
    pub fn new(transport: Arc<dyn HttpTransport>, wfs_version: impl Into<String>) -> Self {
        Self {
            transport,
            wfs_version: wfs_version.into(),
        }
    }

    pub async fn attr_types(&self, service: &ServiceDescriptor) -> GeoFilterResult<AttrTypes> {
        service.require_url()?;
        match service {
            ServiceDescriptor::Wfs(wfs) => self.describe_feature_type(wfs).await,
            ServiceDescriptor::Oaf(oaf) => self.oaf_schema(oaf).await,
            ServiceDescriptor::GeoJson(geojson) => {
                let payload = self.transport.get(HttpRequest::get(&geojson.url)).await?;
                let collection = FeatureCollection::from_json(&payload)?;
                Ok(attr_types_from_sample(&collection.features))
            }
        }
    }

    async fn describe_feature_type(&self, service: &WfsService) -> GeoFilterResult<AttrTypes> {
        if service.typename.is_empty() {
            return Err(GeoFilterError::service_invalid("typename", "missing"));
        }
        let request = HttpRequest::get(&service.url)
            .with_query("service", "WFS")
            .with_query("request", "DescribeFeatureType")
            .with_query("version", &self.wfs_version)
            .with_query("typeName", service.qualified_typename());
        debug!("DescribeFeatureType {}", request.full_url());
        let payload = self.transport.get(request).await?;
        parse_describe_feature_type(&payload, service.local_typename())
    }

    async fn oaf_schema(&self, service: &OafService) -> GeoFilterResult<AttrTypes> {
        if service.collection.is_empty() {
            return Err(GeoFilterError::service_invalid("collection", "missing"));
        }
        let base = service.url.trim_end_matches('/');
        match self.openapi_schema(base, &service.collection).await {
            Ok(types) => Ok(types),
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => {
                warn!(
                    "no item schema for collection {} in the OpenAPI document ({}), trying appschema",
                    service.collection, err
                );
                let url = format!("{}/collections/{}/appschema", base, service.collection);
                let schema = self.get_json(&url).await?;
                attr_types_from_json_schema(&schema, &schema)
            }
        }
    }

    async fn openapi_schema(&self, base: &str, collection: &str) -> GeoFilterResult<AttrTypes> {
        let api = self.get_json(&format!("{base}/api")).await?;
        match locate_item_schema(&api, collection) {
            Some(SchemaLocation::Inline(schema)) => attr_types_from_json_schema(&schema, &api),
            Some(SchemaLocation::Remote(url)) => {
                let schema = self.get_json(&url).await?;
                attr_types_from_json_schema(&schema, &schema)
            }
            None => Err(GeoFilterError::schema_not_found(collection, "no items response in the OpenAPI document")),
        }
    }

    async fn get_json(&self, url: &str) -> GeoFilterResult<Value> {
        let payload = self.transport.get(HttpRequest::get(url)).await?;
        Ok(serde_json::from_str(&payload)?)
    }
}
