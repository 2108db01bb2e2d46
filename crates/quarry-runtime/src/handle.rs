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

//! Per-request resource handles.

use quarry_core::{LoadError, Resource, ResourceKey, ResourcePayload};
use std::sync::Arc;

/// A lightweight value a caller uses to name, then hold, one resource.
///
/// Built by parsing the `source/name` addressing string; resolved by the
/// registry's load protocols. Holding a resolved handle counts as an
/// external reference, which protects the resource from cache eviction.
#[derive(Debug)]
pub struct ResourceHandle {
    key: ResourceKey,
    resource: Option<Arc<Resource>>,
}

impl ResourceHandle {
    /// Parses `source/name`. Fails immediately on a malformed string,
    /// before any cache or request state is touched.
    pub fn parse(path: &str) -> Result<Self, LoadError> {
        Ok(Self {
            key: ResourceKey::parse(path)?,
            resource: None,
        })
    }

    /// The parsed key.
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// The resolved resource, once a load has succeeded.
    pub fn resource(&self) -> Option<&Arc<Resource>> {
        self.resource.as_ref()
    }

    /// The resolved payload, downcast to its concrete kind.
    pub fn payload<P: ResourcePayload>(&self) -> Option<&P> {
        self.resource.as_ref()?.payload_as()
    }

    /// Whether the handle holds a resource.
    pub fn is_resolved(&self) -> bool {
        self.resource.is_some()
    }

    /// Releases the held resource, making it evictable again once the
    /// cache is its sole owner.
    pub fn release(&mut self) -> Option<Arc<Resource>> {
        self.resource.take()
    }

    pub(crate) fn resolve(&mut self, resource: Arc<Resource>) {
        self.resource = Some(resource);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_malformed_paths() {
        assert!(matches!(
            ResourceHandle::parse("noSeparatorHere"),
            Err(LoadError::MalformedKey { .. })
        ));
    }

    #[test]
    fn starts_unresolved() {
        let handle = ResourceHandle::parse("fs/a.bin").unwrap();
        assert!(!handle.is_resolved());
        assert!(handle.resource().is_none());
        assert_eq!(handle.key().canonical(), "fs/a.bin");
    }
}
