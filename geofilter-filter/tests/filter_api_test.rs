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

//! End-to-end tests of the facade over an in-memory feature store and a canned transport.

use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use geofilter_common::common::geofilter_config::GeoFilterConfig;
use geofilter_common::common::transport::HttpRequest;
use geofilter_common::common::transport::HttpTransport;
use geofilter_common::common::transport::ProgressCallback;
use geofilter_error::ErrorCategory;
use geofilter_error::GeoFilterError;
use geofilter_error::GeoFilterResult;
use geofilter_filter::BackendRegistry;
use geofilter_filter::Commands;
use geofilter_filter::Feature;
use geofilter_filter::FilterAnswer;
use geofilter_filter::FilterApi;
use geofilter_filter::FilterId;
use geofilter_filter::FilterQuestion;
use geofilter_filter::InMemoryFeatureStore;
use geofilter_filter::MinMaxOptions;
use geofilter_filter::Operator;
use geofilter_filter::QuestionContext;
use geofilter_filter::Rule;
use geofilter_filter::ServiceDescriptor;
use parking_lot::Mutex;
use serde_json::json;

const GEOJSON_URL: &str = "https://data.example/baeume.json";
const WFS_URL: &str = "https://wfs.example/ows";

/// Serves canned bodies by url after a short delay, counting every request.
#[derive(Default)]
struct CannedTransport {
    bodies: HashMap<String, String>,
    gets: AtomicUsize,
    posts: AtomicUsize,
}

#[async_trait]
impl HttpTransport for CannedTransport {
    async fn get(&self, request: HttpRequest) -> GeoFilterResult<String> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.bodies
            .get(&request.url)
            .cloned()
            .ok_or_else(|| GeoFilterError::http_status(request.url, 404))
    }

    async fn post(&self, request: HttpRequest, on_progress: Option<ProgressCallback>) -> GeoFilterResult<String> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        if let Some(on_progress) = on_progress {
            on_progress(100);
        }
        self.bodies
            .get(&request.url)
            .cloned()
            .ok_or_else(|| GeoFilterError::http_status(request.url, 404))
    }
}

fn trees() -> Vec<Feature> {
    (0..25)
        .map(|i| {
            Feature::from_properties(json!({
                "art": if i % 2 == 0 { "Linde" } else { "Eiche" },
                "hoehe": 5 + i,
                "pflanzjahr": format!("{:02}.01.{}", 1 + i % 28, 1950 + i),
            }))
        })
        .collect()
}

fn setup() -> (Arc<BackendRegistry>, Arc<CannedTransport>) {
    let store = InMemoryFeatureStore::default();
    store.insert_layer("baeume", trees());

    let mut bodies = HashMap::new();
    bodies.insert(
        GEOJSON_URL.to_string(),
        json!({"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"art": "Ahorn", "hoehe": 12}},
            {"type": "Feature", "properties": {"art": "Birke", "hoehe": 8}}
        ]})
        .to_string(),
    );
    bodies.insert(
        WFS_URL.to_string(),
        r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs" xmlns:gml="http://www.opengis.net/gml" xmlns:app="http://app">
            <gml:featureMember><app:baum gml:id="b1"><app:art>Linde</app:art></app:baum></gml:featureMember>
            <gml:featureMember><app:baum gml:id="b2"><app:art>Eiche</app:art></app:baum></gml:featureMember>
        </wfs:FeatureCollection>"#
            .to_string(),
    );
    let transport = Arc::new(CannedTransport {
        bodies,
        ..CannedTransport::default()
    });
    let config = GeoFilterConfig {
        paging_size: 10,
        ..GeoFilterConfig::default()
    };
    let registry = Arc::new(BackendRegistry::new(Arc::new(store), transport.clone(), &config));
    (registry, transport)
}

fn intern_service() -> ServiceDescriptor {
    ServiceDescriptor::from_value(json!({"type": "geojson", "layerId": "baeume"})).unwrap()
}

fn extern_geojson() -> ServiceDescriptor {
    ServiceDescriptor::from_value(json!({"type": "geojson", "extern": true, "url": GEOJSON_URL})).unwrap()
}

fn collector() -> (Arc<Mutex<Vec<FilterAnswer>>>, Arc<dyn Fn(FilterAnswer) + Send + Sync>) {
    let answers: Arc<Mutex<Vec<FilterAnswer>>> = Arc::default();
    let sink = answers.clone();
    (answers, Arc::new(move |answer| sink.lock().push(answer)))
}

#[tokio::test(start_paused = true)]
async fn intern_filter_streams_pages_until_terminal() {
    let (registry, _) = setup();
    let mut api = FilterApi::new("baeume", registry);
    api.set_service(intern_service()).unwrap();

    let (answers, on_answer) = collector();
    let question = FilterQuestion::new("ignored", intern_service(), vec![Rule::new("art", Operator::Eq, json!("LINDE"))]);
    api.filter(question, on_answer).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let answers = answers.lock();
    let pages: Vec<(usize, usize)> = answers.iter().map(|answer| (answer.paging.page, answer.paging.total)).collect();
    assert_eq!(pages, vec![(1, 3), (2, 3), (3, 3)]);
    assert!(answers.iter().all(|answer| answer.filter_id == FilterId::from("baeume")));
    assert_eq!(answers.iter().map(|answer| answer.items.len()).sum::<usize>(), 13);
}

#[tokio::test]
async fn intern_min_max_with_date_format() {
    let (registry, _) = setup();
    let mut api = FilterApi::new("baeume", registry);
    api.set_service(intern_service()).unwrap();

    let options = MinMaxOptions {
        is_date: true,
        context: Some(QuestionContext {
            format: Some("DD.MM.YYYY".to_string()),
            ..QuestionContext::default()
        }),
        ..MinMaxOptions::default()
    };
    let min_max = api.get_min_max("pflanzjahr", &options).await.unwrap();
    assert_eq!(min_max.min, Some(json!("01.01.1950")));
    assert_eq!(min_max.max, Some(json!("25.01.1974")));
}

#[tokio::test(start_paused = true)]
async fn concurrent_discovery_is_coalesced_and_cached() {
    let (registry, transport) = setup();
    let mut first = FilterApi::new("a", registry.clone());
    let mut second = FilterApi::new("b", registry.clone());
    first.set_service(extern_geojson()).unwrap();
    second.set_service(extern_geojson()).unwrap();

    let (left, right) = tokio::join!(
        first.get_unique_values("art", None),
        second.get_unique_values("art", None)
    );
    assert_eq!(left.unwrap(), vec!["Ahorn".to_string(), "Birke".to_string()]);
    assert_eq!(right.unwrap(), vec!["Ahorn".to_string(), "Birke".to_string()]);
    assert_eq!(transport.gets.load(Ordering::SeqCst), 1);

    let min_max = first.get_min_max("hoehe", &MinMaxOptions::default()).await.unwrap();
    assert_eq!((min_max.min, min_max.max), (Some(json!(8)), Some(json!(12))));
    // the document itself is cached by the backend
    assert_eq!(transport.gets.load(Ordering::SeqCst), 1);
    assert_eq!(registry.cached_len(), 2);
}

#[tokio::test]
async fn extern_geojson_filter_is_unsupported() {
    let (registry, _) = setup();
    let mut api = FilterApi::new("g", registry);
    api.set_service(extern_geojson()).unwrap();

    let (answers, on_answer) = collector();
    let err = api
        .filter(FilterQuestion::new("g", extern_geojson(), vec![]), on_answer)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Unsupported);
    assert!(answers.lock().is_empty());
    assert_eq!(api.stop().await.unwrap_err().category(), ErrorCategory::Unsupported);
}

#[tokio::test]
async fn extern_wfs_filter_ends_with_all_features() {
    let (registry, transport) = setup();
    let service = ServiceDescriptor::from_value(json!({
        "type": "wfs", "extern": true, "url": WFS_URL, "typename": "baum", "featurePrefix": "app"
    }))
    .unwrap();
    let mut api = FilterApi::new("wfs", registry);
    api.set_service(service.clone()).unwrap();

    let (answers, on_answer) = collector();
    api.filter(FilterQuestion::new("wfs", service, vec![]), on_answer)
        .await
        .unwrap();

    let answers = answers.lock();
    let last = answers.last().unwrap();
    assert!(last.paging.is_terminal());
    assert_eq!(last.paging.total, 100);
    assert_eq!(last.items.len(), 2);
    assert_eq!(transport.posts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn auto_refresh_reissues_until_stopped() {
    let (registry, _) = setup();
    let mut api = FilterApi::new("refresh", registry.clone());
    api.set_service(intern_service()).unwrap();

    let (answers, on_answer) = collector();
    let question = FilterQuestion::new("refresh", intern_service(), vec![]).with_commands(Commands {
        paging: Some(100),
        auto_refresh: Some(1_000),
        ..Commands::default()
    });
    api.filter(question, on_answer).await.unwrap();
    assert!(registry.refresh().is_scheduled(&FilterId::from("refresh")));

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(answers.lock().len(), 3);

    api.stop().await.unwrap();
    assert!(!registry.refresh().is_scheduled(&FilterId::from("refresh")));
    tokio::time::sleep(Duration::from_millis(5_000)).await;
    assert_eq!(answers.lock().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn stop_reaches_the_backend_that_ran_the_question() {
    let (registry, _) = setup();
    let mut api = FilterApi::new("baeume", registry);
    api.set_service(extern_geojson()).unwrap();

    let (answers, on_answer) = collector();
    api.filter(FilterQuestion::new("baeume", intern_service(), vec![]), on_answer)
        .await
        .unwrap();
    assert_eq!(answers.lock().len(), 1);

    api.stop().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(answers.lock().len(), 1);
}
