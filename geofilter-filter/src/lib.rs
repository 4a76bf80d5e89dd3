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

//! Rule evaluation and backend dispatch for vector layer filtering.
//!
//! A [`FilterApi`] is bound to one filter id and one [`ServiceDescriptor`].
//! It forwards attribute discovery, min/max, unique value and filter requests
//! to one of six backends ({WFS, OAF, GeoJSON} x {intern, extern}) held by a
//! shared [`BackendRegistry`].
//!
//! Intern backends evaluate rules locally with [`RuleMatcher`] over features
//! supplied by a [`FeatureStore`], walking them in chunks through the
//! [`PagingCoordinator`]. Extern backends translate the request into the
//! service's own protocol.

pub mod api;
pub mod backend;
pub mod cache;
pub mod feature;
pub mod paging;
pub mod protocol;
pub mod question;
pub mod refresh;
pub mod rule;
pub mod service;

pub use api::BackendRegistry;
pub use api::FilterApi;
pub use backend::FilterBackend;
pub use backend::MinMaxOptions;
pub use cache::CacheKey;
pub use cache::KeyHasher;
pub use cache::RequestCache;
pub use feature::AttrType;
pub use feature::AttrTypes;
pub use feature::Extent;
pub use feature::Feature;
pub use feature::FeatureStore;
pub use feature::InMemoryFeatureStore;
pub use feature::MinMax;
pub use paging::PagingCoordinator;
pub use question::AnswerCallback;
pub use question::Commands;
pub use question::FilterAnswer;
pub use question::FilterId;
pub use question::FilterQuestion;
pub use question::Paging;
pub use question::QuestionContext;
pub use refresh::RefreshScheduler;
pub use rule::rule_matcher::RuleMatcher;
pub use rule::AttrName;
pub use rule::Operator;
pub use rule::Rule;
pub use rule::RuleValue;
pub use service::Locality;
pub use service::ServiceDescriptor;
pub use service::ServiceKind;
