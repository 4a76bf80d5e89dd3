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

//! Chunked evaluation of a filter question over a loaded feature list.
//!
//! Each tick handles up to `paging` features starting at the cursor and emits
//! one [`FilterAnswer`] with the features matched in that chunk and
//! `page = ceil(idx / paging)`, `total = ceil(len / paging)`. The loop ends
//! itself once the cursor reaches the end, so the last answer always has
//! `page == total`. An empty list yields a single `0/0` answer.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use geofilter_common::common::geofilter_config::GeoFilterConfig;
use geofilter_runtime::IntervalRegistry;
use tracing::debug;

use crate::feature::Feature;
use crate::feature::FeatureStore;
use crate::question::AnswerCallback;
use crate::question::FilterId;
use crate::question::FilterQuestion;
use crate::rule::rule_matcher::RuleMatcher;

pub struct PagingCoordinator {
    registry: Arc<IntervalRegistry>,
    default_paging: usize,
    period: Duration,
}

impl PagingCoordinator {
    pub fn new(registry: Arc<IntervalRegistry>, config: &GeoFilterConfig) -> Self {
        Self {
            registry,
            default_paging: config.paging_size.max(1),
            period: config.paging_interval(),
        }
    }

    /// Starts the paging loop for `question.filter_id`, replacing a running one.
    ///
    /// The first chunk is evaluated and emitted before this returns. Must be
    /// called from within a tokio runtime.
    pub fn start(
        &self,
        question: FilterQuestion,
        features: Arc<Vec<Feature>>,
        store: Arc<dyn FeatureStore>,
        on_answer: AnswerCallback,
    ) {
        let paging = question.commands.paging.filter(|&paging| paging > 0).unwrap_or(self.default_paging);
        let len = features.len();
        let total = len.div_ceil(paging);
        let filter_id = question.filter_id.clone();
        debug!("paging {} features for filter {} in chunks of {}", len, filter_id, paging);

        let mut idx = 0usize;
        self.registry.start(filter_id, self.period, move || {
            let end = (idx + paging).min(len);
            let items = features[idx..end]
                .iter()
                .filter(|feature| accepts(&question, store.as_ref(), feature))
                .cloned()
                .collect();
            idx = end;
            on_answer(question.answer(idx.div_ceil(paging), total, items));
            if idx >= len {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
    }

    pub fn stop(&self, filter_id: &FilterId) {
        self.registry.stop(filter_id);
    }

    pub fn is_running(&self, filter_id: &FilterId) -> bool {
        self.registry.is_running(filter_id)
    }
}

/// Map extent first, then filter geometry, then all rules.
fn accepts(question: &FilterQuestion, store: &dyn FeatureStore, feature: &Feature) -> bool {
    if question.commands.search_in_map_extent && !store.is_feature_in_map_extent(feature) {
        return false;
    }
    if let Some(geometry) = &question.commands.filter_geometry {
        if !store.is_feature_in_geometry(feature, geometry) {
            return false;
        }
    }
    RuleMatcher::matches_all(&question.rules, &feature.properties)
}
