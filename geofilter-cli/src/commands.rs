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

//! Execution of the parsed command line against a [`FilterApi`].

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Context;
use geofilter_common::common::geofilter_config::GeoFilterConfig;
use geofilter_common::utils::http_tiny_client::ReqwestTransport;
use geofilter_filter::feature::FeatureCollection;
use geofilter_filter::BackendRegistry;
use geofilter_filter::Commands as QuestionCommands;
use geofilter_filter::Feature;
use geofilter_filter::FilterApi;
use geofilter_filter::FilterQuestion;
use geofilter_filter::InMemoryFeatureStore;
use geofilter_filter::MinMaxOptions;
use geofilter_filter::QuestionContext;
use geofilter_filter::Rule;
use geofilter_filter::ServiceDescriptor;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::info;

use crate::command_line::Commands;
use crate::command_line::ServiceArgs;
use crate::content_show;

/// Reads `input` as JSON, or as the path of a JSON file when it does not start like JSON.
pub fn read_json_arg(input: &str) -> anyhow::Result<Value> {
    let trimmed = input.trim_start();
    let text = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        input.to_string()
    } else {
        fs::read_to_string(input).with_context(|| format!("cannot read {input}"))?
    };
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {input}"))
}

pub fn read_rules(input: Option<&str>) -> anyhow::Result<Vec<Rule>> {
    let Some(input) = input else {
        return Ok(Vec::new());
    };
    let rules: Vec<Rule> = serde_json::from_value(read_json_arg(input)?).context("rules must be a JSON array")?;
    for rule in &rules {
        rule.validate()?;
    }
    Ok(rules)
}

fn load_features(path: &Path) -> anyhow::Result<Vec<Feature>> {
    let payload = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    Ok(FeatureCollection::from_json(&payload)?.features)
}

/// Builds the facade for `source`, loading its feature file into the store of an intern layer.
pub fn build_api(source: &ServiceArgs, filter_id: &str, config: &GeoFilterConfig) -> anyhow::Result<FilterApi> {
    let service = ServiceDescriptor::from_value(read_json_arg(&source.service)?)?;
    let store = InMemoryFeatureStore::default();
    match (&source.features, service.layer_id()) {
        (Some(path), Some(layer_id)) => {
            let features = load_features(path)?;
            info!("loaded {} features from {} as layer {}", features.len(), path.display(), layer_id);
            store.insert_layer(layer_id, features);
        }
        (Some(_), None) => bail!("--features needs a service with a layerId"),
        (None, _) => {}
    }

    let transport = Arc::new(ReqwestTransport::new(config.http_timeout()));
    let registry = Arc::new(BackendRegistry::new(Arc::new(store), transport, config));
    let mut api = FilterApi::new(filter_id, registry);
    api.set_service(service)?;
    Ok(api)
}

/// Runs one command and returns what should be printed.
pub async fn execute(command: Commands, config: &GeoFilterConfig) -> anyhow::Result<String> {
    match command {
        Commands::AttrTypes { source } => {
            let api = build_api(&source, "geofilter-cli", config)?;
            Ok(content_show::attr_types_table(&api.get_attr_types().await?))
        }
        Commands::MinMax {
            source,
            attr,
            min_only,
            max_only,
            date_format,
            rules,
        } => {
            let api = build_api(&source, "geofilter-cli", config)?;
            let options = MinMaxOptions {
                min_only,
                max_only,
                is_date: date_format.is_some(),
                context: Some(QuestionContext {
                    rules: read_rules(rules.as_deref())?,
                    filter_id: Some(api.filter_id().clone()),
                    format: date_format,
                }),
            };
            Ok(content_show::min_max_table(&api.get_min_max(&attr, &options).await?))
        }
        Commands::UniqueValues { source, attr, rules } => {
            let api = build_api(&source, "geofilter-cli", config)?;
            let context = QuestionContext {
                rules: read_rules(rules.as_deref())?,
                ..QuestionContext::default()
            };
            let values = api.get_unique_values(&attr, Some(&context)).await?;
            Ok(content_show::values_table(&values))
        }
        Commands::Filter {
            source,
            rules,
            paging,
            filter_id,
        } => {
            let api = build_api(&source, &filter_id, config)?;
            let service = api
                .service()
                .cloned()
                .context("service was not set")?;
            let question = FilterQuestion::new(filter_id.as_str(), service, read_rules(rules.as_deref())?)
                .with_commands(QuestionCommands {
                    paging,
                    ..QuestionCommands::default()
                });

            let (tx, mut rx) = mpsc::unbounded_channel();
            api.filter(question, Arc::new(move |answer| {
                let _ = tx.send(answer);
            }))
            .await?;

            let mut matches = Vec::new();
            while let Some(answer) = rx.recv().await {
                info!("page {}/{}: {} matches", answer.paging.page, answer.paging.total, answer.items.len());
                matches.extend(answer.items);
                if answer.paging.is_terminal() {
                    break;
                }
            }
            Ok(format!("{}\n{} features matched", content_show::features_table(&matches), matches.len()))
        }
    }
}
