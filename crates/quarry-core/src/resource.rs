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

//! The resource entity and the per-kind payload contract.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Weak};

/// Boxed error returned by payload hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// The behavior a concrete resource kind plugs into the pipeline.
///
/// One implementation exists per resource kind (texture, material, mesh,
/// script, ...). The cache and registry are written once against this
/// trait and dispatch dynamically.
///
/// Hooks take `&self`: a payload that builds state from its bytes uses
/// interior mutability, since the owning [`Resource`] is shared across the
/// pipeline threads behind an `Arc`.
pub trait ResourcePayload: Send + Sync + 'static {
    /// Whether streamed bytes must pass through the initialization worker
    /// before the resource is considered ready.
    fn requires_thread_init(&self) -> bool {
        false
    }

    /// Thread-safe setup, run on the initialization worker with the streamed
    /// bytes. Only called when [`requires_thread_init`] returns `true`.
    ///
    /// [`requires_thread_init`]: ResourcePayload::requires_thread_init
    fn on_thread_init(&self, _bytes: &[u8]) -> Result<(), HookError> {
        Ok(())
    }

    /// Load-completion hook, invoked on the caller's thread once the
    /// resource has been admitted to a cache. `background` is `true` when
    /// the bytes arrived through the asynchronous pipeline.
    fn on_load(&self, bytes: &[u8], background: bool) -> Result<(), HookError>;

    /// Upcast for typed downcasts via [`Resource::payload_as`].
    fn as_any(&self) -> &dyn Any;
}

/// Shared used-bytes bookkeeping for one cache.
///
/// The cache charges the ledger when a resource is admitted; the resource
/// itself reports the bytes back on destruction through a weak reference,
/// so the ledger stays correct no matter which thread releases the final
/// handle.
#[derive(Debug, Default)]
pub struct CacheLedger {
    used: AtomicUsize,
}

impl CacheLedger {
    /// Creates a ledger with nothing charged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently charged.
    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    /// Charges `bytes` to the ledger.
    pub fn charge(&self, bytes: usize) {
        self.used.fetch_add(bytes, Ordering::SeqCst);
    }

    /// Releases `bytes` from the ledger, clamping at zero if bookkeeping
    /// and object lifetime ever disagree.
    pub fn freed(&self, bytes: usize) {
        let _ = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                Some(used.saturating_sub(bytes))
            });
    }
}

/// A named, reference-counted resource.
///
/// A resource is constructed before its bytes exist (size zero); the
/// streaming worker corrects the size once streaming completes. After
/// admission to a cache it carries a weak back-reference to that cache's
/// ledger, used only to report freed bytes on destruction — it never
/// extends the cache's lifetime.
pub struct Resource {
    name: String,
    size: AtomicUsize,
    ledger: Mutex<Weak<CacheLedger>>,
    payload: Box<dyn ResourcePayload>,
}

impl Resource {
    /// Creates an empty resource (size zero, not yet streamed).
    pub fn new(name: impl Into<String>, payload: Box<dyn ResourcePayload>) -> Self {
        Self::with_size(name, 0, payload)
    }

    /// Creates a resource whose byte size is already known.
    pub fn with_size(
        name: impl Into<String>,
        size: usize,
        payload: Box<dyn ResourcePayload>,
    ) -> Self {
        Self {
            name: name.into(),
            size: AtomicUsize::new(size),
            ledger: Mutex::new(Weak::new()),
            payload,
        }
    }

    /// The canonical `source/name` key this resource was loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current byte-size estimate.
    pub fn size(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    /// Corrects the byte size once streaming has produced the real figure.
    pub fn set_size(&self, size: usize) {
        self.size.store(size, Ordering::SeqCst);
    }

    /// The payload, as the erased trait object.
    pub fn payload(&self) -> &dyn ResourcePayload {
        self.payload.as_ref()
    }

    /// The payload, downcast to its concrete kind.
    pub fn payload_as<P: ResourcePayload>(&self) -> Option<&P> {
        self.payload.as_any().downcast_ref()
    }

    /// Installs the owning cache's ledger. Called by the cache on admission;
    /// re-admission after a forced removal replaces the previous ledger.
    pub fn attach_ledger(&self, ledger: &std::sync::Arc<CacheLedger>) {
        if let Ok(mut slot) = self.ledger.lock() {
            *slot = std::sync::Arc::downgrade(ledger);
        }
    }
}

impl Drop for Resource {
    fn drop(&mut self) {
        let ledger = self
            .ledger
            .lock()
            .map(|slot| slot.clone())
            .unwrap_or_default();
        if let Some(ledger) = ledger.upgrade() {
            let size = self.size();
            ledger.freed(size);
            log::trace!("Resource '{}' destroyed, {} bytes freed", self.name, size);
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Blob;

    impl ResourcePayload for Blob {
        fn on_load(&self, _bytes: &[u8], _background: bool) -> Result<(), HookError> {
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn size_starts_at_zero_and_is_corrected() {
        let res = Resource::new("fs/a.bin", Box::new(Blob));
        assert_eq!(res.size(), 0);
        res.set_size(128);
        assert_eq!(res.size(), 128);
    }

    #[test]
    fn drop_reports_freed_bytes_to_ledger() {
        let ledger = Arc::new(CacheLedger::new());
        ledger.charge(64);
        let res = Resource::with_size("fs/a.bin", 64, Box::new(Blob));
        res.attach_ledger(&ledger);
        drop(res);
        assert_eq!(ledger.used(), 0);
    }

    #[test]
    fn drop_without_ledger_is_harmless() {
        let res = Resource::with_size("fs/a.bin", 64, Box::new(Blob));
        drop(res);
    }

    #[test]
    fn ledger_clamps_at_zero() {
        let ledger = CacheLedger::new();
        ledger.charge(8);
        ledger.freed(32);
        assert_eq!(ledger.used(), 0);
    }

    #[test]
    fn payload_downcast() {
        let res = Resource::new("fs/a.bin", Box::new(Blob));
        assert!(res.payload_as::<Blob>().is_some());
    }
}
