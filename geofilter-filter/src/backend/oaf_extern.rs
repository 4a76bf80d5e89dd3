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

//! Backend for remote OGC API Features collections.
//!
//! The whole collection is fetched once, following `next` links, and kept in
//! a [`RequestCache`]; min/max and unique values are reduced from that copy.

use std::sync::Arc;

use async_trait::async_trait;
use geofilter_common::common::transport::HttpRequest;
use geofilter_common::common::transport::HttpTransport;
use geofilter_error::GeoFilterError;
use geofilter_error::GeoFilterResult;
use tracing::debug;

use crate::backend::reduce::matching;
use crate::backend::reduce::min_max_of_features;
use crate::backend::reduce::unique_values_from_properties;
use crate::backend::schema_probe::SchemaProbe;
use crate::backend::FilterBackend;
use crate::backend::MinMaxOptions;
use crate::cache::RequestCache;
use crate::feature::AttrTypes;
use crate::feature::Feature;
use crate::feature::MinMax;
use crate::protocol::oaf::OafPage;
use crate::question::AnswerCallback;
use crate::question::FilterId;
use crate::question::FilterQuestion;
use crate::question::QuestionContext;
use crate::service::OafService;
use crate::service::ServiceDescriptor;

const BACKEND_NAME: &str = "oaf-extern";

/// Upper bound on followed `next` links.
const MAX_PAGES: usize = 10_000;

pub struct OafExternBackend {
    transport: Arc<dyn HttpTransport>,
    probe: Arc<SchemaProbe>,
    default_limit: usize,
    collections: RequestCache<Arc<Vec<Feature>>>,
}

impl OafExternBackend {
    pub fn new(transport: Arc<dyn HttpTransport>, probe: Arc<SchemaProbe>, default_limit: usize) -> Self {
        Self {
            transport,
            probe,
            default_limit: default_limit.max(1),
            collections: RequestCache::new(),
        }
    }

    fn oaf(service: &ServiceDescriptor) -> GeoFilterResult<&OafService> {
        service.require_url()?;
        match service {
            ServiceDescriptor::Oaf(oaf) if !oaf.collection.trim().is_empty() => Ok(oaf),
            ServiceDescriptor::Oaf(_) => Err(GeoFilterError::service_invalid("collection", "missing")),
            _ => Err(GeoFilterError::service_invalid("type", "expected an oaf service")),
        }
    }

    /// Every feature of the collection, fetched once per collection and page size.
    async fn collection(&self, service: &OafService) -> GeoFilterResult<Arc<Vec<Feature>>> {
        let limit = service.limit.filter(|&limit| limit > 0).unwrap_or(self.default_limit);
        let items_url = service.items_url();
        let key = self.collections.key(&[BACKEND_NAME, &items_url, &limit.to_string()]);
        self.collections
            .request(key, || self.fetch_all(items_url.clone(), limit))
            .await
    }

    async fn fetch_all(&self, items_url: String, limit: usize) -> GeoFilterResult<Arc<Vec<Feature>>> {
        let mut features = Vec::new();
        let mut request = HttpRequest::get(&items_url).with_query("limit", limit.to_string());
        for page in 1..=MAX_PAGES {
            let current = request.full_url();
            let OafPage { features: batch, next } = OafPage::from_json(&self.transport.get(request).await?)?;
            let fetched = batch.len();
            features.extend(batch);
            debug!("{}: page {} brought {} features", items_url, page, fetched);

            match next.map(|next| absolute(&items_url, &next)) {
                Some(next) if fetched > 0 && next != current => request = HttpRequest::get(next),
                _ => break,
            }
        }
        Ok(Arc::new(features))
    }
}

/// Resolves a `next` href that may be relative to the items url.
fn absolute(items_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match (href.strip_prefix('?'), items_url.split_once("://")) {
        (Some(query), _) => format!("{}?{}", items_url, query),
        (None, Some((scheme, rest))) if href.starts_with('/') => {
            let host = rest.split('/').next().unwrap_or(rest);
            format!("{scheme}://{host}{href}")
        }
        _ => format!("{}/{}", items_url.trim_end_matches('/'), href),
    }
}

#[async_trait]
impl FilterBackend for OafExternBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn get_attr_types(&self, service: &ServiceDescriptor) -> GeoFilterResult<AttrTypes> {
        Self::oaf(service)?;
        self.probe.attr_types(service).await
    }

    async fn get_min_max(
        &self,
        service: &ServiceDescriptor,
        attr_name: &str,
        options: &MinMaxOptions,
    ) -> GeoFilterResult<MinMax> {
        let features = self.collection(Self::oaf(service)?).await?;
        Ok(min_max_of_features(&features, attr_name, options))
    }

    async fn get_unique_values(
        &self,
        service: &ServiceDescriptor,
        attr_name: &str,
        context: Option<&QuestionContext>,
    ) -> GeoFilterResult<Vec<String>> {
        let features = self.collection(Self::oaf(service)?).await?;
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

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use geofilter_common::common::transport::ProgressCallback;
    use parking_lot::Mutex;
    use serde_json::json;
    use serde_json::Value;

    use super::*;
    use crate::rule::Operator;
    use crate::rule::Rule;

    /// Serves canned pages by full url and counts requests.
    #[derive(Default)]
    struct PagedTransport {
        pages: HashMap<String, Value>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpTransport for PagedTransport {
        async fn get(&self, request: HttpRequest) -> GeoFilterResult<String> {
            let url = request.full_url();
            self.requested.lock().push(url.clone());
            self.pages
                .get(&url)
                .map(Value::to_string)
                .ok_or_else(|| GeoFilterError::http_status(url, 404))
        }

        async fn post(&self, request: HttpRequest, _on_progress: Option<ProgressCallback>) -> GeoFilterResult<String> {
            Err(GeoFilterError::http_status(request.url, 405))
        }
    }

    fn feature(baujahr: i64, art: &str) -> Value {
        json!({"type": "Feature", "properties": {"baujahr": baujahr, "art": art}})
    }

    fn transport() -> Arc<PagedTransport> {
        let base = "https://oaf.example/collections/denkmal/items";
        let mut pages = HashMap::new();
        pages.insert(
            format!("{base}?limit=2"),
            json!({
                "features": [feature(1890, "Kirche"), feature(1960, "Schule")],
                "links": [{"rel": "next", "href": format!("{base}?limit=2&offset=2")}]
            }),
        );
        pages.insert(
            format!("{base}?limit=2&offset=2"),
            json!({"features": [feature(1750, "Kirche")], "links": []}),
        );
        Arc::new(PagedTransport {
            pages,
            ..PagedTransport::default()
        })
    }

    fn backend(transport: Arc<PagedTransport>) -> OafExternBackend {
        let probe = Arc::new(SchemaProbe::new(transport.clone(), "1.1.0"));
        OafExternBackend::new(transport, probe, 400)
    }

    fn service() -> ServiceDescriptor {
        ServiceDescriptor::from_value(json!({
            "type": "oaf", "extern": true, "url": "https://oaf.example",
            "collection": "denkmal", "limit": 2
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn min_max_follows_next_links_and_fetches_once() {
        let transport = transport();
        let backend = backend(transport.clone());

        let min_max = backend
            .get_min_max(&service(), "baujahr", &MinMaxOptions::default())
            .await
            .unwrap();
        assert_eq!(min_max.min, Some(json!(1750)));
        assert_eq!(min_max.max, Some(json!(1960)));
        assert_eq!(transport.requested.lock().len(), 2);

        let context = QuestionContext {
            rules: vec![Rule::new("art", Operator::Eq, json!("kirche"))],
            ..QuestionContext::default()
        };
        let options = MinMaxOptions {
            max_only: true,
            context: Some(context.clone()),
            ..MinMaxOptions::default()
        };
        let min_max = backend.get_min_max(&service(), "baujahr", &options).await.unwrap();
        assert_eq!(min_max, MinMax { min: None, max: Some(json!(1890)) });

        let values = backend
            .get_unique_values(&service(), "art", Some(&context))
            .await
            .unwrap();
        assert_eq!(values, vec!["Kirche".to_string()]);
        assert_eq!(transport.requested.lock().len(), 2);
    }

    #[tokio::test]
    async fn filter_and_stop_are_unsupported() {
        let backend = backend(transport());
        let question = FilterQuestion::new("oaf", service(), vec![]);
        let err = backend.filter(question, Arc::new(|_| {})).await.unwrap_err();
        assert_eq!(err, GeoFilterError::unsupported_operation("filter", "oaf-extern"));

        let err = backend.stop(&FilterId::from("oaf")).await.unwrap_err();
        assert_eq!(err.category(), geofilter_error::ErrorCategory::Unsupported);
    }

    #[test]
    fn relative_next_links() {
        let items = "https://oaf.example/api/collections/c/items";
        assert_eq!(absolute(items, "?offset=10"), format!("{items}?offset=10"));
        assert_eq!(
            absolute(items, "/api/collections/c/items?offset=10"),
            "https://oaf.example/api/collections/c/items?offset=10"
        );
        assert_eq!(absolute(items, "https://other/x"), "https://other/x");
    }
}
