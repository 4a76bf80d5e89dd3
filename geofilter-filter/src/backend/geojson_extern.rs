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

//! Backend for static GeoJSON files served over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use geofilter_common::common::transport::HttpRequest;
use geofilter_common::common::transport::HttpTransport;
use geofilter_error::GeoFilterError;
use geofilter_error::GeoFilterResult;
use tracing::debug;

use crate::backend::reduce::attr_types_from_sample;
use crate::backend::reduce::matching;
use crate::backend::reduce::min_max_of_features;
use crate::backend::reduce::unique_values_from_properties;
use crate::backend::FilterBackend;
use crate::backend::MinMaxOptions;
use crate::cache::RequestCache;
use crate::feature::AttrTypes;
use crate::feature::Feature;
use crate::feature::FeatureCollection;
use crate::feature::MinMax;
use crate::question::AnswerCallback;
use crate::question::FilterId;
use crate::question::FilterQuestion;
use crate::question::QuestionContext;
use crate::service::ServiceDescriptor;

const BACKEND_NAME: &str = "geojson-extern";

pub struct GeoJsonExternBackend {
    transport: Arc<dyn HttpTransport>,
    documents: RequestCache<Arc<Vec<Feature>>>,
}

impl GeoJsonExternBackend {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            documents: RequestCache::new(),
        }
    }

    async fn features(&self, service: &ServiceDescriptor) -> GeoFilterResult<Arc<Vec<Feature>>> {
        let url = match service {
            ServiceDescriptor::GeoJson(_) => service.require_url()?,
            _ => return Err(GeoFilterError::service_invalid("type", "expected a geojson service")),
        };
        let key = self.documents.key(&[BACKEND_NAME, url]);
        self.documents
            .request(key, || async {
                let payload = self.transport.get(HttpRequest::get(url)).await?;
                let collection = FeatureCollection::from_json(&payload)?;
                debug!("{} holds {} features", url, collection.features.len());
                Ok(Arc::new(collection.features))
            })
            .await
    }
}

#[async_trait]
impl FilterBackend for GeoJsonExternBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn get_attr_types(&self, service: &ServiceDescriptor) -> GeoFilterResult<AttrTypes> {
        let features = self.features(service).await?;
        Ok(attr_types_from_sample(&features))
    }

    async fn get_min_max(
        &self,
        service: &ServiceDescriptor,
        attr_name: &str,
        options: &MinMaxOptions,
    ) -> GeoFilterResult<MinMax> {
        let features = self.features(service).await?;
        Ok(min_max_of_features(&features, attr_name, options))
    }

    async fn get_unique_values(
        &self,
        service: &ServiceDescriptor,
        attr_name: &str,
        context: Option<&QuestionContext>,
    ) -> GeoFilterResult<Vec<String>> {
        let features = self.features(service).await?;
        let rules = context.map_or(&[][..], |context| context.rules.as_slice());
        Ok(unique_values_from_properties(matching(&features, rules), attr_name))
    }

    async fn filter(&self, _question: FilterQuestion, _on_answer: AnswerCallback) -> GeoFilterResult<()> {
        Err(GeoFilterError::unsupported_operation("filter", BACKEND_NAME))
    }

    async fn stop(&self, _filter_id: &FilterId) -> GeoFilterResult<()> {
        Err(GeoFilterError::unsupported_operation("stop", BACKEND_NAME))
    }
}
