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

//! Per-layer facade and the registry holding the six backends.

use std::sync::Arc;
use std::time::Duration;

use geofilter_common::common::geofilter_config::GeoFilterConfig;
use geofilter_common::common::transport::HttpTransport;
use geofilter_error::GeoFilterError;
use geofilter_error::GeoFilterResult;
use geofilter_runtime::IntervalRegistry;
use parking_lot::Mutex;
use tracing::debug;

use crate::backend::geojson_extern::GeoJsonExternBackend;
use crate::backend::intern::InternBackend;
use crate::backend::oaf_extern::OafExternBackend;
use crate::backend::schema_probe::SchemaProbe;
use crate::backend::wfs_extern::WfsExternBackend;
use crate::backend::FilterBackend;
use crate::backend::MinMaxOptions;
use crate::cache::KeyHasher;
use crate::cache::RequestCache;
use crate::feature::AttrTypes;
use crate::feature::FeatureStore;
use crate::feature::MinMax;
use crate::paging::PagingCoordinator;
use crate::question::AnswerCallback;
use crate::question::FilterId;
use crate::question::FilterQuestion;
use crate::question::QuestionContext;
use crate::refresh::RefreshScheduler;
use crate::service::Locality;
use crate::service::ServiceDescriptor;
use crate::service::ServiceKind;

/// Cached result of a discovery operation.
#[derive(Debug, Clone)]
enum Discovery {
    AttrTypes(AttrTypes),
    MinMax(MinMax),
    UniqueValues(Vec<String>),
}

/// The six backends, built once and shared by every [`FilterApi`].
///
/// Discovery results of all facades go through one [`RequestCache`], so two
/// layers asking the same service the same question share one request.
pub struct BackendRegistry {
    wfs_intern: Arc<dyn FilterBackend>,
    oaf_intern: Arc<dyn FilterBackend>,
    geojson_intern: Arc<dyn FilterBackend>,
    wfs_extern: Arc<dyn FilterBackend>,
    oaf_extern: Arc<dyn FilterBackend>,
    geojson_extern: Arc<dyn FilterBackend>,
    cache: RequestCache<Discovery>,
    refresh: RefreshScheduler,
}

impl BackendRegistry {
    pub fn new(store: Arc<dyn FeatureStore>, transport: Arc<dyn HttpTransport>, config: &GeoFilterConfig) -> Self {
        Self::with_cache(store, transport, config, RequestCache::new())
    }

    /// Same as [`BackendRegistry::new`] with cache keys derived by `hasher`.
    pub fn with_key_hasher(
        store: Arc<dyn FeatureStore>,
        transport: Arc<dyn HttpTransport>,
        config: &GeoFilterConfig,
        hasher: Arc<dyn KeyHasher>,
    ) -> Self {
        Self::with_cache(store, transport, config, RequestCache::with_hasher(hasher))
    }

    fn with_cache(
        store: Arc<dyn FeatureStore>,
        transport: Arc<dyn HttpTransport>,
        config: &GeoFilterConfig,
        cache: RequestCache<Discovery>,
    ) -> Self {
        let probe = Arc::new(SchemaProbe::new(transport.clone(), config.wfs_version.as_str()));
        let paging = Arc::new(PagingCoordinator::new(Arc::new(IntervalRegistry::default()), config));
        let intern = |kind: ServiceKind| -> Arc<dyn FilterBackend> {
            Arc::new(InternBackend::new(kind, store.clone(), probe.clone(), paging.clone()))
        };

        Self {
            wfs_intern: intern(ServiceKind::Wfs),
            oaf_intern: intern(ServiceKind::Oaf),
            geojson_intern: intern(ServiceKind::GeoJson),
            wfs_extern: Arc::new(WfsExternBackend::new(
                transport.clone(),
                probe.clone(),
                store.clone(),
                config.wfs_version.as_str(),
            )),
            oaf_extern: Arc::new(OafExternBackend::new(transport.clone(), probe.clone(), config.oaf_limit)),
            geojson_extern: Arc::new(GeoJsonExternBackend::new(transport)),
            cache,
            refresh: RefreshScheduler::new(),
        }
    }

    pub fn backend(&self, kind: ServiceKind, locality: Locality) -> Arc<dyn FilterBackend> {
        let backend = match (kind, locality) {
            (ServiceKind::Wfs, Locality::Intern) => &self.wfs_intern,
            (ServiceKind::Oaf, Locality::Intern) => &self.oaf_intern,
            (ServiceKind::GeoJson, Locality::Intern) => &self.geojson_intern,
            (ServiceKind::Wfs, Locality::Extern) => &self.wfs_extern,
            (ServiceKind::Oaf, Locality::Extern) => &self.oaf_extern,
            (ServiceKind::GeoJson, Locality::Extern) => &self.geojson_extern,
        };
        backend.clone()
    }

    pub fn backend_for(&self, service: &ServiceDescriptor) -> Arc<dyn FilterBackend> {
        self.backend(service.kind(), service.locality())
    }

    pub fn refresh(&self) -> &RefreshScheduler {
        &self.refresh
    }

    /// Number of resolved discovery results.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

/// Entry point of one filter, typically one per layer.
pub struct FilterApi {
    filter_id: FilterId,
    registry: Arc<BackendRegistry>,
    service: Option<ServiceDescriptor>,
    /// Backend that ran the last question, the target of `stop`.
    active: Mutex<Option<Arc<dyn FilterBackend>>>,
}

impl FilterApi {
    pub fn new(filter_id: impl Into<FilterId>, registry: Arc<BackendRegistry>) -> Self {
        Self {
            filter_id: filter_id.into(),
            registry,
            service: None,
            active: Mutex::new(None),
        }
    }

    pub fn filter_id(&self) -> &FilterId {
        &self.filter_id
    }

    pub fn service(&self) -> Option<&ServiceDescriptor> {
        self.service.as_ref()
    }

    /// Binds the facade to `service`; an invalid descriptor leaves the previous one in place.
    pub fn set_service(&mut self, service: ServiceDescriptor) -> GeoFilterResult<()> {
        service.validate()?;
        debug!("filter {} uses {}", self.filter_id, service);
        self.service = Some(service);
        Ok(())
    }

    fn require_service(&self) -> GeoFilterResult<&ServiceDescriptor> {
        self.service
            .as_ref()
            .ok_or_else(|| GeoFilterError::service_missing(self.filter_id.as_str()))
    }

    pub async fn get_attr_types(&self) -> GeoFilterResult<AttrTypes> {
        let service = self.require_service()?;
        let backend = self.registry.backend_for(service);
        let key = self.registry.cache.key(&["getAttrTypes", &service.cache_repr()]);
        let discovery = self
            .registry
            .cache
            .request(key, || async {
                backend.get_attr_types(service).await.map(Discovery::AttrTypes)
            })
            .await?;
        match discovery {
            Discovery::AttrTypes(types) => Ok(types),
            other => Err(unexpected_entry(&other)),
        }
    }

    pub async fn get_min_max(&self, attr_name: &str, options: &MinMaxOptions) -> GeoFilterResult<MinMax> {
        let service = self.require_service()?;
        let backend = self.registry.backend_for(service);
        let context = serde_json::to_string(&options.context)?;
        let key = self.registry.cache.key(&[
            "getMinMax",
            &service.cache_repr(),
            attr_name,
            bool_part(options.min_only),
            bool_part(options.max_only),
            bool_part(options.is_date),
            &context,
        ]);
        let discovery = self
            .registry
            .cache
            .request(key, || async {
                backend
                    .get_min_max(service, attr_name, options)
                    .await
                    .map(Discovery::MinMax)
            })
            .await?;
        match discovery {
            Discovery::MinMax(min_max) => Ok(min_max),
            other => Err(unexpected_entry(&other)),
        }
    }

    pub async fn get_unique_values(
        &self,
        attr_name: &str,
        context: Option<&QuestionContext>,
    ) -> GeoFilterResult<Vec<String>> {
        let service = self.require_service()?;
        let backend = self.registry.backend_for(service);
        let context_part = serde_json::to_string(&context)?;
        let key = self.registry.cache.key(&[
            "getUniqueValues",
            &service.cache_repr(),
            attr_name,
            &context_part,
        ]);
        let discovery = self
            .registry
            .cache
            .request(key, || async {
                backend
                    .get_unique_values(service, attr_name, context)
                    .await
                    .map(Discovery::UniqueValues)
            })
            .await?;
        match discovery {
            Discovery::UniqueValues(values) => Ok(values),
            other => Err(unexpected_entry(&other)),
        }
    }

    /// Runs `question` under this facade's filter id. Filtering is never cached.
    ///
    /// With `autoRefresh` set, the question is re-issued periodically until
    /// [`FilterApi::stop`] is called or another question replaces it.
    pub async fn filter(&self, mut question: FilterQuestion, on_answer: AnswerCallback) -> GeoFilterResult<()> {
        question.service.validate()?;
        question.filter_id = self.filter_id.clone();
        let backend = self.registry.backend_for(&question.service);
        *self.active.lock() = Some(backend.clone());
        let refresh_period = question.commands.auto_refresh.filter(|&millis| millis > 0);

        self.registry.refresh.cancel(&self.filter_id);
        backend.filter(question.for_refresh(), on_answer.clone()).await?;

        if let Some(millis) = refresh_period {
            self.registry
                .refresh
                .schedule(&question, Duration::from_millis(millis), backend, on_answer);
        }
        Ok(())
    }

    /// Stops the running filter and its refresh task.
    ///
    /// Goes to the backend of the last question passed to [`FilterApi::filter`],
    /// or to the backend of the bound service when nothing was filtered yet.
    pub async fn stop(&self) -> GeoFilterResult<()> {
        let active = self.active.lock().clone();
        let backend = match active {
            Some(backend) => backend,
            None => self.registry.backend_for(self.require_service()?),
        };
        self.registry.refresh.cancel(&self.filter_id);
        backend.stop(&self.filter_id).await
    }
}

fn bool_part(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn unexpected_entry(entry: &Discovery) -> GeoFilterError {
    GeoFilterError::illegal_argument(format!("cache entry of unexpected shape: {entry:?}"))
}
