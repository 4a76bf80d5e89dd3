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

//! Backend over features the host has already loaded into its [`FeatureStore`].

use std::sync::Arc;

use async_trait::async_trait;
use geofilter_error::GeoFilterResult;
use tracing::debug;

use crate::backend::reduce::attr_types_from_sample;
use crate::backend::reduce::matching;
use crate::backend::reduce::min_max_of_features;
use crate::backend::reduce::unique_values_from_properties;
use crate::backend::schema_probe::SchemaProbe;
use crate::backend::FilterBackend;
use crate::backend::MinMaxOptions;
use crate::feature::AttrTypes;
use crate::feature::Feature;
use crate::feature::FeatureStore;
use crate::feature::MinMax;
use crate::paging::PagingCoordinator;
use crate::question::AnswerCallback;
use crate::question::FilterId;
use crate::question::FilterQuestion;
use crate::question::QuestionContext;
use crate::service::ServiceDescriptor;
use crate::service::ServiceKind;

pub struct InternBackend {
    kind: ServiceKind,
    store: Arc<dyn FeatureStore>,
    probe: Arc<SchemaProbe>,
    paging: Arc<PagingCoordinator>,
}

impl InternBackend {
    pub fn new(
        kind: ServiceKind,
        store: Arc<dyn FeatureStore>,
        probe: Arc<SchemaProbe>,
        paging: Arc<PagingCoordinator>,
    ) -> Self {
        Self {
            kind,
            store,
            probe,
            paging,
        }
    }

    fn features(&self, service: &ServiceDescriptor) -> GeoFilterResult<Arc<Vec<Feature>>> {
        let layer_id = service.require_layer_id()?;
        Ok(self.store.get_features_by_layer_id(layer_id))
    }
}

#[async_trait]
impl FilterBackend for InternBackend {
    fn name(&self) -> &'static str {
        match self.kind {
            ServiceKind::Wfs => "wfs-intern",
            ServiceKind::Oaf => "oaf-intern",
            ServiceKind::GeoJson => "geojson-intern",
        }
    }

    /// Asks the service behind the layer when it has a url, samples the loaded features otherwise.
    async fn get_attr_types(&self, service: &ServiceDescriptor) -> GeoFilterResult<AttrTypes> {
        if !service.url().trim().is_empty() {
            return self.probe.attr_types(service).await;
        }
        let features = self.features(service)?;
        Ok(attr_types_from_sample(&features))
    }

    async fn get_min_max(
        &self,
        service: &ServiceDescriptor,
        attr_name: &str,
        options: &MinMaxOptions,
    ) -> GeoFilterResult<MinMax> {
        let features = self.features(service)?;
        Ok(min_max_of_features(&features, attr_name, options))
    }

    async fn get_unique_values(
        &self,
        service: &ServiceDescriptor,
        attr_name: &str,
        context: Option<&QuestionContext>,
    ) -> GeoFilterResult<Vec<String>> {
        let features = self.features(service)?;
        let rules = context.map_or(&[][..], |context| context.rules.as_slice());
        Ok(unique_values_from_properties(matching(&features, rules), attr_name))
    }

    async fn filter(&self, question: FilterQuestion, on_answer: AnswerCallback) -> GeoFilterResult<()> {
        question.validate_rules()?;
        let features = self.features(&question.service)?;
        debug!("{} filter {} over {} features", self.name(), question.filter_id, features.len());
        self.paging.start(question, features, self.store.clone(), on_answer);
        Ok(())
    }

    async fn stop(&self, filter_id: &FilterId) -> GeoFilterResult<()> {
        self.paging.stop(filter_id);
        Ok(())
    }
}
