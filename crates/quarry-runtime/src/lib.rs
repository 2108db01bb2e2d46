// Copyright 2025 the quarry developers
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

//! The cache registry and its background streaming pipeline.
//!
//! [`CacheRegistry`] owns one byte-budgeted cache per
//! [`ResourceCategory`](quarry_core::ResourceCategory), the table of
//! registered byte sources, and the two long-lived worker threads that
//! stream and initialize resources off the main thread. Callers request
//! resources through a [`ResourceHandle`], either blocking
//! ([`CacheRegistry::load`]) or polling ([`CacheRegistry::try_load`]).

pub mod config;
pub mod handle;
pub mod pipeline;
pub mod registry;

pub use config::{CacheBudget, RegistryConfig};
pub use handle::ResourceHandle;
pub use registry::CacheRegistry;
