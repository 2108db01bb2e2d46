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

//! The cache registry: one budgeted cache per category plus the load
//! protocols that feed them.

use crate::config::RegistryConfig;
use crate::handle::ResourceHandle;
use crate::pipeline::{InitWorker, StreamRequest, StreamResult, StreamWorker};
use quarry_core::{
    EventBus, LoadError, LoadStatus, Resource, ResourceCategory, ResourceKey, ResourcePayload,
    SlotId, Source,
};
use quarry_data::ResourceCache;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// The owning facade of the resource system.
///
/// The registry holds one [`ResourceCache`] per [`ResourceCategory`], the
/// table of registered sources, and the background streaming pipeline.
/// All caches, the request set, and the staging map are mutated only
/// through `&mut self` on the owning context; the workers hand results
/// back over the bus and never touch shared state.
///
/// Dropping the registry shuts the pipeline down: each worker gets the
/// shutdown command and is joined, and results still in flight are
/// abandoned.
pub struct CacheRegistry {
    caches: HashMap<ResourceCategory, ResourceCache>,
    sources: HashMap<String, Arc<dyn Source>>,
    /// Keys currently somewhere in the pipeline. Guards against duplicate
    /// submissions while a request is in flight.
    requests: HashSet<String>,
    /// Completed pipeline results awaiting their next poll.
    staging: HashMap<String, StreamResult>,
    results: EventBus<StreamResult>,
    // Declared ahead of `init` so drop stops the producer side first.
    stream: StreamWorker,
    init: InitWorker,
}

impl CacheRegistry {
    /// Creates the per-category caches from `config` and starts both
    /// pipeline workers.
    pub fn new(config: &RegistryConfig) -> Self {
        let mut caches = HashMap::new();
        for category in ResourceCategory::ALL {
            let budget = config.budget(category);
            log::info!(
                "Cache '{category}' created with a {} byte budget",
                budget.max_bytes
            );
            caches.insert(
                category,
                ResourceCache::new(budget.max_bytes, budget.allow_oversized),
            );
        }
        let results = EventBus::new();
        let init = InitWorker::start(results.sender());
        let stream = StreamWorker::start(init.queue(), results.sender());
        Self {
            caches,
            sources: HashMap::new(),
            requests: HashSet::new(),
            staging: HashMap::new(),
            results,
            stream,
            init,
        }
    }

    /// Registers an already opened source under `name`, the first
    /// component of every key that will read from it. Duplicate names are
    /// rejected.
    pub fn register_source(
        &mut self,
        name: impl Into<String>,
        source: Arc<dyn Source>,
    ) -> Result<(), LoadError> {
        let name = name.into();
        if self.sources.contains_key(&name) {
            return Err(LoadError::SourceAlreadyRegistered { source: name });
        }
        log::info!("Source '{name}' registered");
        self.sources.insert(name, source);
        Ok(())
    }

    /// Loads a resource synchronously on the calling thread.
    ///
    /// On a cache hit the handle resolves immediately and `payload` is
    /// never called. Otherwise the bytes are read through the caller's
    /// slot, thread initialization (if the payload asks for it) and the
    /// completion hook run inline, and the resource is admitted to the
    /// category's cache.
    ///
    /// # Errors
    /// Any failure leaves the cache without a trace of the attempt: a
    /// completion hook that fails after admission rolls the entry back
    /// out.
    pub fn load(
        &mut self,
        handle: &mut ResourceHandle,
        category: ResourceCategory,
        payload: impl FnOnce() -> Box<dyn ResourcePayload>,
    ) -> Result<(), LoadError> {
        let key = handle.key().clone();
        let canonical = key.canonical();
        if let Some(resource) = self.cache_mut(category).get(&canonical) {
            handle.resolve(resource);
            return Ok(());
        }

        let source = self.resolve_source(key.source())?;
        let bytes = source
            .read(key.name(), SlotId::MAIN)
            .map_err(|e| LoadError::SourceRead {
                key: canonical.clone(),
                source: e,
            })?;
        let resource = Arc::new(Resource::with_size(
            canonical.clone(),
            bytes.len(),
            payload(),
        ));

        if resource.payload().requires_thread_init() {
            resource
                .payload()
                .on_thread_init(&bytes)
                .map_err(|e| LoadError::InitializationFailed {
                    key: canonical.clone(),
                    detail: e.to_string(),
                })?;
        }

        self.cache_mut(category)
            .add(&canonical, bytes.len(), resource.clone())?;
        if let Err(e) = resource.payload().on_load(&bytes, false) {
            self.cache_mut(category).remove(&canonical);
            return Err(LoadError::InitializationFailed {
                key: canonical,
                detail: e.to_string(),
            });
        }

        log::debug!("Loaded '{canonical}' synchronously ({} bytes)", bytes.len());
        handle.resolve(resource);
        Ok(())
    }

    /// Polls a resource through the asynchronous pipeline. Never blocks.
    ///
    /// The poll walks the protocol in order: drain completed results,
    /// probe the cache, fold a staged result in, report an in-flight
    /// request as pending, and only then submit a fresh request. A
    /// [`LoadStatus::Failed`] poll discards the staged failure record, so
    /// the next poll for the same key starts a brand new attempt.
    pub fn try_load(
        &mut self,
        handle: &mut ResourceHandle,
        category: ResourceCategory,
        payload: impl FnOnce() -> Box<dyn ResourcePayload>,
    ) -> LoadStatus {
        self.pump();

        let key = handle.key().clone();
        let canonical = key.canonical();
        if let Some(resource) = self.cache_mut(category).get(&canonical) {
            // A synchronous load can make the key resident while a request
            // is still in flight; its staged record is stale and must not
            // be served after an eviction.
            self.staging.remove(&canonical);
            handle.resolve(resource);
            return LoadStatus::Ready;
        }

        if let Some(result) = self.staging.remove(&canonical) {
            return self.admit_staged(handle, category, &canonical, result);
        }

        if self.requests.contains(&canonical) {
            return LoadStatus::Pending;
        }

        let source = match self.resolve_source(key.source()) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("Cannot stream '{canonical}': {e}");
                return LoadStatus::Failed;
            }
        };
        let resource = Arc::new(Resource::new(canonical.clone(), payload()));
        if !self.stream.submit(StreamRequest {
            key,
            source,
            resource,
        }) {
            log::error!("Streaming worker is gone, '{canonical}' cannot load");
            return LoadStatus::Failed;
        }
        log::debug!("Streaming '{canonical}' requested");
        self.requests.insert(canonical);
        LoadStatus::Pending
    }

    /// Drains the handoff bus into the staging map.
    ///
    /// Call once per tick; [`try_load`](Self::try_load) also drains on
    /// every poll, so polling alone makes progress. Drained keys leave the
    /// request set whether they succeeded or not.
    pub fn pump(&mut self) {
        let drained: Vec<StreamResult> = self.results.receiver().try_iter().collect();
        for result in drained {
            let canonical = result.key.canonical();
            log::trace!(
                "'{canonical}' left the pipeline ({})",
                if result.success { "ok" } else { "failed" }
            );
            self.requests.remove(&canonical);
            self.staging.insert(canonical, result);
        }
    }

    /// Probes the category's cache directly, without touching sources or
    /// the pipeline. Resolves the handle and returns `true` on a hit.
    pub fn get_from_cache(
        &mut self,
        handle: &mut ResourceHandle,
        category: ResourceCategory,
    ) -> bool {
        let canonical = handle.key().canonical();
        match self.cache_mut(category).get(&canonical) {
            Some(resource) => {
                handle.resolve(resource);
                true
            }
            None => false,
        }
    }

    /// Admits a procedurally constructed resource under `key`, charging
    /// `size` bytes. The resource's own size estimate is corrected to
    /// match so the books balance on destruction.
    pub fn inject(
        &mut self,
        key: &ResourceKey,
        category: ResourceCategory,
        size: usize,
        resource: Arc<Resource>,
    ) -> Result<(), LoadError> {
        resource.set_size(size);
        self.cache_mut(category).add(&key.canonical(), size, resource)
    }

    /// Forces `key` out of the category's cache. Destruction still waits
    /// on external holders.
    pub fn remove(&mut self, key: &ResourceKey, category: ResourceCategory) -> bool {
        self.cache_mut(category).remove(&key.canonical())
    }

    /// The category's cache, for inspection.
    pub fn cache(&self, category: ResourceCategory) -> Option<&ResourceCache> {
        self.caches.get(&category)
    }

    /// Folds one staged result into the cache, resolving the handle on
    /// success. The staged record has already been removed; on any failure
    /// it stays discarded and the caller may retry from scratch.
    fn admit_staged(
        &mut self,
        handle: &mut ResourceHandle,
        category: ResourceCategory,
        canonical: &str,
        result: StreamResult,
    ) -> LoadStatus {
        if !result.success {
            log::warn!("Streaming of '{canonical}' failed");
            return LoadStatus::Failed;
        }
        let StreamResult {
            bytes,
            size,
            resource,
            ..
        } = result;
        if let Err(e) = self.cache_mut(category).add(canonical, size, resource.clone()) {
            log::warn!("Admitting '{canonical}' failed: {e}");
            return LoadStatus::Failed;
        }
        if let Err(e) = resource.payload().on_load(&bytes, true) {
            log::warn!("Load completion of '{canonical}' failed: {e}");
            self.cache_mut(category).remove(canonical);
            return LoadStatus::Failed;
        }
        log::debug!("'{canonical}' is ready ({size} bytes)");
        handle.resolve(resource);
        LoadStatus::Ready
    }

    fn resolve_source(&self, name: &str) -> Result<Arc<dyn Source>, LoadError> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::SourceUnregistered {
                source: name.to_string(),
            })
    }

    /// A category missing from the map (possible only if construction is
    /// ever bypassed) falls back to load-but-never-cache.
    fn cache_mut(&mut self, category: ResourceCategory) -> &mut ResourceCache {
        self.caches
            .entry(category)
            .or_insert_with(|| ResourceCache::new(0, true))
    }
}
