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

use std::sync::Arc;

use cheetah_string::CheetahString;
use geofilter_error::GeoFilterResult;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::feature::Feature;
use crate::rule::Rule;
use crate::service::ServiceDescriptor;

/// De-duplication and cancellation key of a filter request.
pub type FilterId = CheetahString;

/// Receives every answer of a filter run, in emission order.
pub type AnswerCallback = Arc<dyn Fn(FilterAnswer) + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Commands {
    pub search_in_map_extent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paging: Option<usize>,
    /// GeoJSON geometry the features have to intersect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_geometry: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_name: Option<String>,
    /// Re-run period in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_refresh: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuestion {
    pub filter_id: FilterId,
    pub service: ServiceDescriptor,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub commands: Commands,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet_id: Option<Value>,
}

impl FilterQuestion {
    pub fn new(filter_id: impl Into<FilterId>, service: ServiceDescriptor, rules: Vec<Rule>) -> Self {
        Self {
            filter_id: filter_id.into(),
            service,
            rules,
            commands: Commands::default(),
            snippet_id: None,
        }
    }

    pub fn with_commands(mut self, commands: Commands) -> Self {
        self.commands = commands;
        self
    }

    pub fn validate_rules(&self) -> GeoFilterResult<()> {
        for rule in &self.rules {
            rule.validate()?;
        }
        Ok(())
    }

    /// Clone used for a scheduled re-run; the refresh command is cleared so it cannot reschedule itself.
    pub fn for_refresh(&self) -> Self {
        let mut question = self.clone();
        question.commands.auto_refresh = None;
        question
    }

    /// Answer carrying this question's identity.
    pub fn answer(&self, page: usize, total: usize, items: Vec<Feature>) -> FilterAnswer {
        FilterAnswer {
            service: self.service.clone(),
            filter_id: self.filter_id.clone(),
            snippet_id: self.snippet_id.clone(),
            paging: Paging { page, total },
            items,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    pub page: usize,
    pub total: usize,
}

impl Paging {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.page == self.total
    }
}

/// One emission of a filter run. `items` holds only the entries matched since the previous answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterAnswer {
    pub service: ServiceDescriptor,
    pub filter_id: FilterId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet_id: Option<Value>,
    pub paging: Paging,
    pub items: Vec<Feature>,
}

/// Rules already applied by other snippets, used to narrow min/max and unique value queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionContext {
    pub rules: Vec<Rule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_id: Option<FilterId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl QuestionContext {
    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::rule::Operator;

    #[test]
    fn deserializes_question() {
        let question: FilterQuestion = serde_json::from_value(json!({
            "filterId": "7",
            "service": {"type": "geojson", "extern": false, "layerId": "kitas"},
            "rules": [{"attrName": "traeger", "operator": "EQ", "value": "Stadt"}],
            "commands": {"searchInMapExtent": true, "paging": 50, "autoRefresh": 30000},
            "snippetId": 2
        }))
        .unwrap();
        assert_eq!(question.filter_id.as_str(), "7");
        assert_eq!(question.rules[0].operator, Operator::Eq);
        assert!(question.commands.search_in_map_extent);
        assert_eq!(question.commands.paging, Some(50));
        assert_eq!(question.snippet_id, Some(json!(2)));

        let refresh = question.for_refresh();
        assert_eq!(refresh.commands.auto_refresh, None);
        assert_eq!(question.commands.auto_refresh, Some(30000));
    }

    #[test]
    fn terminal_paging() {
        assert!(Paging { page: 0, total: 0 }.is_terminal());
        assert!(!Paging { page: 1, total: 2 }.is_terminal());
    }
}
