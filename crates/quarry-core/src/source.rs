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

//! The byte-source contract consumed by the cache registry.

use crate::error::SourceError;

/// Identifies one concurrent caller to a [`Source`].
///
/// A source may keep per-slot state (for example one file handle per slot)
/// so concurrent readers never share a cursor. Before a thread first calls
/// [`Source::read`] it obtains a slot via [`Source::new_thread_slot`] and
/// reuses it for every later call from that thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub usize);

impl SlotId {
    /// The slot reserved for the thread that opened the source. Sources
    /// create it in [`Source::open`]; the registry's synchronous path reads
    /// through it.
    pub const MAIN: SlotId = SlotId(0);
}

/// A pluggable provider of named byte blobs: an archive, a directory tree,
/// or a synthetic generator.
///
/// The core never locks around a source call — once slots have been issued,
/// thread isolation is the source's own responsibility.
pub trait Source: Send + Sync {
    /// Initializes the source. Must be called (by the source's creator)
    /// before registration; it also prepares [`SlotId::MAIN`].
    fn open(&self) -> Result<(), SourceError>;

    /// The byte size of the named resource, or 0 if it is absent.
    fn size(&self, name: &str) -> u64;

    /// Reads the named resource in full through the given slot.
    ///
    /// A zero-length result is a failure ([`SourceError::Empty`]), never an
    /// empty success.
    fn read(&self, name: &str, slot: SlotId) -> Result<Vec<u8>, SourceError>;

    /// Issues a fresh slot for a new concurrent caller.
    ///
    /// # Errors
    /// Fails when the source cannot allocate the per-slot state (for
    /// example, a file handle). The caller treats the resource load as
    /// failed; it does not retry.
    fn new_thread_slot(&self) -> Result<SlotId, SourceError>;
}
