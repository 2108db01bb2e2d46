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

use quarry_core::{SlotId, Source, SourceError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A synthetic source backed by an in-memory table.
///
/// Useful for procedurally generated data and for tests; the read counter
/// makes request de-duplication observable.
#[derive(Default)]
pub struct MemorySource {
    blobs: HashMap<String, Vec<u8>>,
    next_slot: AtomicUsize,
    reads: AtomicUsize,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self {
            blobs: HashMap::new(),
            next_slot: AtomicUsize::new(1),
            reads: AtomicUsize::new(0),
        }
    }

    /// Adds a named blob, replacing any previous one.
    pub fn insert(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.blobs.insert(name.into(), bytes.into());
        self
    }

    /// Number of `read` calls served so far (successful or not).
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl Source for MemorySource {
    fn open(&self) -> Result<(), SourceError> {
        Ok(())
    }

    fn size(&self, name: &str) -> u64 {
        self.blobs.get(name).map(|b| b.len() as u64).unwrap_or(0)
    }

    fn read(&self, name: &str, _slot: SlotId) -> Result<Vec<u8>, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let bytes = self.blobs.get(name).ok_or_else(|| SourceError::NotFound {
            name: name.to_string(),
        })?;
        if bytes.is_empty() {
            return Err(SourceError::Empty {
                name: name.to_string(),
            });
        }
        Ok(bytes.clone())
    }

    fn new_thread_slot(&self) -> Result<SlotId, SourceError> {
        Ok(SlotId(self.next_slot.fetch_add(1, Ordering::SeqCst)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_inserted_blobs() {
        let source = MemorySource::new().insert("a.bin", vec![1, 2, 3]);
        source.open().unwrap();
        assert_eq!(source.size("a.bin"), 3);
        assert_eq!(source.read("a.bin", SlotId::MAIN).unwrap(), vec![1, 2, 3]);
        assert_eq!(source.reads(), 1);
    }

    #[test]
    fn missing_and_empty_blobs_fail() {
        let source = MemorySource::new().insert("empty", Vec::new());
        assert!(matches!(
            source.read("missing", SlotId::MAIN),
            Err(SourceError::NotFound { .. })
        ));
        assert!(matches!(
            source.read("empty", SlotId::MAIN),
            Err(SourceError::Empty { .. })
        ));
        assert_eq!(source.reads(), 2);
    }
}
