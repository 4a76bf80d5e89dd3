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

//! Backend abstraction
//!
//! Every backend offers the same contract over one kind of service: attribute
//! type discovery, min/max, unique values, filtering and stopping a filter run.
//! Backends that cannot perform an operation answer with
//! [`GeoFilterError::UnsupportedOperation`](geofilter_error::GeoFilterError).

pub mod geojson_extern;
pub mod intern;
pub mod oaf_extern;
pub mod reduce;
pub mod schema_probe;
pub mod wfs_extern;

use async_trait::async_trait;
use geofilter_common::DateFormatUtils::DateFormat;
use geofilter_error::GeoFilterResult;
use serde::Deserialize;
use serde::Serialize;

use crate::feature::AttrTypes;
use crate::feature::MinMax;
use crate::question::AnswerCallback;
use crate::question::FilterId;
use crate::question::FilterQuestion;
use crate::question::QuestionContext;
use crate::service::ServiceDescriptor;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MinMaxOptions {
    pub min_only: bool,
    pub max_only: bool,
    pub is_date: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<QuestionContext>,
}

impl MinMaxOptions {
    pub fn wants_min(&self) -> bool {
        self.min_only || !self.max_only
    }

    pub fn wants_max(&self) -> bool {
        self.max_only || !self.min_only
    }

    /// Format for date attributes, taken from the context.
    pub fn date_format(&self) -> Option<DateFormat> {
        if !self.is_date {
            return None;
        }
        self.context
            .as_ref()
            .and_then(|context| context.format.as_deref())
            .map(DateFormat::new)
    }

    pub fn context_rules(&self) -> &[crate::rule::Rule] {
        self.context.as_ref().map_or(&[], |context| context.rules.as_slice())
    }
}

/// Common contract of the six backends.
#[async_trait]
pub trait FilterBackend: Send + Sync {
    /// Short name used in logs and unsupported-operation errors.
    fn name(&self) -> &'static str;

    async fn get_attr_types(&self, service: &ServiceDescriptor) -> GeoFilterResult<AttrTypes>;

    async fn get_min_max(
        &self,
        service: &ServiceDescriptor,
        attr_name: &str,
        options: &MinMaxOptions,
    ) -> GeoFilterResult<MinMax>;

    /// Deduplicated, unsorted, stringified values of `attr_name`.
    async fn get_unique_values(
        &self,
        service: &ServiceDescriptor,
        attr_name: &str,
        context: Option<&QuestionContext>,
    ) -> GeoFilterResult<Vec<String>>;

    /// Runs `question`, delivering answers to `on_answer` until one has `page == total`.
    async fn filter(&self, question: FilterQuestion, on_answer: AnswerCallback) -> GeoFilterResult<()>;

    async fn stop(&self, filter_id: &FilterId) -> GeoFilterResult<()>;
}
