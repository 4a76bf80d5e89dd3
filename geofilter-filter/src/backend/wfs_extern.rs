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

//! Backend for remote WFS services.
//!
//! Min/max take two sorted single-feature GET requests when there is nothing
//! to filter by, otherwise one filtered POST reduced locally. Filtering posts
//! a single `GetFeature` and reports download progress as partial answers.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use geofilter_common::common::transport::HttpRequest;
use geofilter_common::common::transport::HttpTransport;
use geofilter_common::common::transport::ProgressCallback;
use geofilter_common::common::transport::CONTENT_TYPE_XML;
use geofilter_error::GeoFilterError;
use geofilter_error::GeoFilterResult;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::backend::reduce::min_max_from_properties;
use crate::backend::reduce::unique_values_from_properties;
use crate::backend::schema_probe::SchemaProbe;
use crate::backend::FilterBackend;
use crate::backend::MinMaxOptions;
use crate::feature::AttrTypes;
use crate::feature::Feature;
use crate::feature::FeatureStore;
use crate::feature::MinMax;
use crate::protocol::gml::parse_feature_collection;
use crate::protocol::wfs_filter::GetFeatureRequest;
use crate::question::AnswerCallback;
use crate::question::FilterId;
use crate::question::FilterQuestion;
use crate::question::QuestionContext;
use crate::rule::Rule;
use crate::service::ServiceDescriptor;
use crate::service::WfsService;

const BACKEND_NAME: &str = "wfs-extern";

/// `total` of the progress answers of a filter run.
const PROGRESS_TOTAL: usize = 100;

pub struct WfsExternBackend {
    transport: Arc<dyn HttpTransport>,
    probe: Arc<SchemaProbe>,
    store: Arc<dyn FeatureStore>,
    version: String,
    requests: DashMap<FilterId, (u64, CancellationToken)>,
    generation: AtomicU64,
}

impl WfsExternBackend {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        probe: Arc<SchemaProbe>,
        store: Arc<dyn FeatureStore>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            probe,
            store,
            version: version.into(),
            requests: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Whether a filter request for `filter_id` is in flight.
    pub fn is_running(&self, filter_id: &FilterId) -> bool {
        self.requests.contains_key(filter_id)
    }

    fn wfs(service: &ServiceDescriptor) -> GeoFilterResult<&WfsService> {
        service.require_url()?;
        match service {
            ServiceDescriptor::Wfs(wfs) if !wfs.typename.trim().is_empty() => Ok(wfs),
            ServiceDescriptor::Wfs(_) => Err(GeoFilterError::service_invalid("typename", "missing")),
            _ => Err(GeoFilterError::service_invalid("type", "expected a wfs service")),
        }
    }

    fn get_feature(&self, service: &WfsService) -> HttpRequest {
        HttpRequest::get(&service.url)
            .with_query("service", "WFS")
            .with_query("request", "GetFeature")
            .with_query("version", &self.version)
            .with_query("typeName", service.qualified_typename())
    }

    async fn post_rules(&self, service: &WfsService, attr_name: &str, rules: &[Rule]) -> GeoFilterResult<Vec<Feature>> {
        let body = GetFeatureRequest::for_service(service, &self.version)
            .with_property_name(attr_name)
            .with_rules(rules)?
            .to_xml();
        let payload = self
            .transport
            .post(HttpRequest::post(&service.url, body, CONTENT_TYPE_XML), None)
            .await?;
        parse_feature_collection(&payload)
    }

    /// First value of `attr_name` when the features are sorted by it.
    async fn sorted_first(&self, service: &WfsService, attr_name: &str, descending: bool) -> GeoFilterResult<Option<Value>> {
        let order = if descending { "D" } else { "A" };
        let request = self
            .get_feature(service)
            .with_query("maxFeatures", "1")
            .with_query("propertyName", attr_name)
            .with_query("sortBy", format!("{attr_name} {order}"));
        let payload = self.transport.get(request).await?;
        let features = parse_feature_collection(&payload)?;
        Ok(features
            .into_iter()
            .next()
            .and_then(|feature| feature.properties.get(attr_name).cloned())
            .filter(|value| !value.is_null()))
    }

    fn register(&self, filter_id: &FilterId) -> (u64, CancellationToken) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();
        self.requests.insert(filter_id.clone(), (generation, token.clone()));
        (generation, token)
    }

    fn release(&self, filter_id: &FilterId, generation: u64) {
        self.requests
            .remove_if(filter_id, |_, (current, _)| *current == generation);
    }

    fn filter_request(&self, question: &FilterQuestion, service: &WfsService) -> GeoFilterResult<GetFeatureRequest> {
        let commands = &question.commands;
        let mut request = GetFeatureRequest::for_service(service, &self.version).with_rules(&question.rules)?;
        let wants_geometry = commands.search_in_map_extent || commands.filter_geometry.is_some();
        match commands.geometry_name.as_deref().filter(|name| !name.is_empty()) {
            Some(geometry_name) => {
                let srs_name = service
                    .srs_name
                    .clone()
                    .unwrap_or_else(|| self.store.get_map_projection());
                if commands.search_in_map_extent {
                    let extent = self.store.get_current_extent();
                    request = request.with_bbox(geometry_name, &extent, Some(&srs_name));
                }
                if let Some(geometry) = &commands.filter_geometry {
                    request = request.with_intersects(geometry_name, geometry, Some(&srs_name));
                }
            }
            None if wants_geometry => {
                warn!(
                    "filter {} asks for a spatial restriction without a geometry name, ignoring it",
                    question.filter_id
                );
            }
            None => {}
        }
        Ok(request)
    }
}

#[async_trait]
impl FilterBackend for WfsExternBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn get_attr_types(&self, service: &ServiceDescriptor) -> GeoFilterResult<AttrTypes> {
        Self::wfs(service)?;
        self.probe.attr_types(service).await
    }

    async fn get_min_max(
        &self,
        service: &ServiceDescriptor,
        attr_name: &str,
        options: &MinMaxOptions,
    ) -> GeoFilterResult<MinMax> {
        let wfs = Self::wfs(service)?;
        let date_format = options.date_format();
        // server side sorting only orders ISO dates correctly
        let sortable = date_format.as_ref().is_none_or(|format| format.is_iso8601());

        if options.context_rules().is_empty() && sortable {
            let min = if options.wants_min() {
                self.sorted_first(wfs, attr_name, false).await?
            } else {
                None
            };
            let max = if options.wants_max() {
                self.sorted_first(wfs, attr_name, true).await?
            } else {
                None
            };
            return Ok(MinMax { min, max });
        }

        let features = self.post_rules(wfs, attr_name, options.context_rules()).await?;
        Ok(min_max_from_properties(
            features.iter().map(|feature| &feature.properties),
            attr_name,
            options.min_only,
            options.max_only,
            date_format.as_ref(),
        ))
    }

    async fn get_unique_values(
        &self,
        service: &ServiceDescriptor,
        attr_name: &str,
        context: Option<&QuestionContext>,
    ) -> GeoFilterResult<Vec<String>> {
        let wfs = Self::wfs(service)?;
        let features = match context.filter(|context| context.has_rules()) {
            Some(context) => self.post_rules(wfs, attr_name, &context.rules).await?,
            None => {
                let request = self.get_feature(wfs).with_query("propertyName", attr_name);
                parse_feature_collection(&self.transport.get(request).await?)?
            }
        };
        Ok(unique_values_from_properties(
            features.iter().map(|feature| &feature.properties),
            attr_name,
        ))
    }

    async fn filter(&self, question: FilterQuestion, on_answer: AnswerCallback) -> GeoFilterResult<()> {
        question.validate_rules()?;
        let wfs = Self::wfs(&question.service)?;
        let body = self.filter_request(&question, wfs)?.to_xml();
        let url = wfs.url.clone();

        let (generation, token) = self.register(&question.filter_id);
        on_answer(question.answer(1, PROGRESS_TOTAL, Vec::new()));

        let progress: ProgressCallback = {
            let question = question.clone();
            let on_answer = on_answer.clone();
            Arc::new(move |percent: u8| {
                let page = usize::from(percent).clamp(1, PROGRESS_TOTAL - 1);
                on_answer(question.answer(page, PROGRESS_TOTAL, Vec::new()));
            })
        };

        debug!("posting GetFeature for filter {} to {}", question.filter_id, url);
        let request = HttpRequest::post(&url, body, CONTENT_TYPE_XML).with_cancel(token);
        let result = self.transport.post(request, Some(progress)).await;
        self.release(&question.filter_id, generation);

        let features = match result.and_then(|payload| parse_feature_collection(&payload)) {
            Ok(features) => features,
            Err(err) => {
                if err.is_cancelled() {
                    info!("filter {} was stopped", question.filter_id);
                } else {
                    warn!("filter {} failed: {}", question.filter_id, err);
                }
                return Err(err);
            }
        };

        on_answer(question.answer(PROGRESS_TOTAL - 1, PROGRESS_TOTAL, Vec::new()));
        on_answer(question.answer(PROGRESS_TOTAL, PROGRESS_TOTAL, features));
        Ok(())
    }

    async fn stop(&self, filter_id: &FilterId) -> GeoFilterResult<()> {
        if let Some((_, (_, token))) = self.requests.remove(filter_id) {
            token.cancel();
        }
        Ok(())
    }
}
