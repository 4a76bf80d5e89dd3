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

//! Periodic re-runs of filter questions that ask for `autoRefresh`.

use std::sync::Arc;
use std::time::Duration;

use geofilter_runtime::ScheduledTaskManager;
use tracing::debug;

use crate::backend::FilterBackend;
use crate::question::AnswerCallback;
use crate::question::FilterId;
use crate::question::FilterQuestion;

/// One refresh task per filter id. Scheduling again for an id replaces its task.
#[derive(Clone, Default)]
pub struct RefreshScheduler {
    tasks: ScheduledTaskManager,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-issues `question` every `period` through `backend`, the first run one period from now.
    ///
    /// The re-issued question has its refresh command cleared. Must be called
    /// from within a tokio runtime.
    pub fn schedule(
        &self,
        question: &FilterQuestion,
        period: Duration,
        backend: Arc<dyn FilterBackend>,
        on_answer: AnswerCallback,
    ) {
        let question = question.for_refresh();
        debug!("refreshing filter {} every {:?}", question.filter_id, period);
        self.tasks.add_scheduled_task(
            question.filter_id.clone(),
            period,
            period,
            move |_cancel| {
                let question = question.clone();
                let backend = backend.clone();
                let on_answer = on_answer.clone();
                async move { backend.filter(question, on_answer).await }
            },
        );
    }

    pub fn cancel(&self, filter_id: &FilterId) -> bool {
        self.tasks.cancel_task(filter_id)
    }

    pub fn is_scheduled(&self, filter_id: &FilterId) -> bool {
        self.tasks.contains(filter_id)
    }

    pub fn scheduled_count(&self) -> usize {
        self.tasks.task_count()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use geofilter_error::GeoFilterResult;
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::backend::MinMaxOptions;
    use crate::feature::AttrTypes;
    use crate::feature::MinMax;
    use crate::question::Commands;
    use crate::question::QuestionContext;
    use crate::service::ServiceDescriptor;

    /// Records the questions it is asked to filter.
    #[derive(Default)]
    struct RecordingBackend {
        questions: Mutex<Vec<FilterQuestion>>,
    }

    #[async_trait]
    impl FilterBackend for RecordingBackend {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn get_attr_types(&self, _service: &ServiceDescriptor) -> GeoFilterResult<AttrTypes> {
            Ok(AttrTypes::new())
        }

        async fn get_min_max(
            &self,
            _service: &ServiceDescriptor,
            _attr_name: &str,
            _options: &MinMaxOptions,
        ) -> GeoFilterResult<MinMax> {
            Ok(MinMax::default())
        }

        async fn get_unique_values(
            &self,
            _service: &ServiceDescriptor,
            _attr_name: &str,
            _context: Option<&QuestionContext>,
        ) -> GeoFilterResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn filter(&self, question: FilterQuestion, _on_answer: AnswerCallback) -> GeoFilterResult<()> {
            self.questions.lock().push(question);
            Ok(())
        }

        async fn stop(&self, _filter_id: &FilterId) -> GeoFilterResult<()> {
            Ok(())
        }
    }

    fn question() -> FilterQuestion {
        let service = ServiceDescriptor::from_value(json!({"type": "geojson", "layerId": "1"})).unwrap();
        FilterQuestion::new("refresh-1", service, vec![]).with_commands(Commands {
            auto_refresh: Some(100),
            ..Commands::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn reissues_without_refresh_command() {
        let scheduler = RefreshScheduler::new();
        let backend = Arc::new(RecordingBackend::default());
        scheduler.schedule(&question(), Duration::from_millis(100), backend.clone(), Arc::new(|_| {}));
        assert!(scheduler.is_scheduled(&FilterId::from("refresh-1")));

        tokio::time::sleep(Duration::from_millis(350)).await;
        let questions = backend.questions.lock().clone();
        assert_eq!(questions.len(), 3);
        assert!(questions.iter().all(|question| question.commands.auto_refresh.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_reissuing() {
        let scheduler = RefreshScheduler::new();
        let backend = Arc::new(RecordingBackend::default());
        scheduler.schedule(&question(), Duration::from_millis(100), backend.clone(), Arc::new(|_| {}));
        scheduler.schedule(&question(), Duration::from_millis(100), backend.clone(), Arc::new(|_| {}));
        assert_eq!(scheduler.scheduled_count(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(scheduler.cancel(&FilterId::from("refresh-1")));
        assert!(!scheduler.cancel(&FilterId::from("refresh-1")));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(backend.questions.lock().len(), 1);
    }
}
