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
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A source that reads files directly from a directory tree.
///
/// The root path anchors every resource name. Reads open a fresh handle
/// each time, so there is no per-slot state to isolate; slots are still
/// issued to honor the contract.
///
/// Mainly for development; shipping builds read from a
/// [`PackSource`](crate::PackSource).
pub struct FilesystemSource {
    root: PathBuf,
    next_slot: AtomicUsize,
}

impl FilesystemSource {
    /// Creates a source rooted at `root`. Call [`Source::open`] before
    /// registering it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            // Slot 0 is reserved for the opening thread.
            next_slot: AtomicUsize::new(1),
        }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Source for FilesystemSource {
    fn open(&self) -> Result<(), SourceError> {
        if self.root.is_dir() {
            log::debug!("Filesystem source opened at {}", self.root.display());
            Ok(())
        } else {
            Err(SourceError::Open {
                detail: format!("'{}' is not a directory", self.root.display()),
            })
        }
    }

    fn size(&self, name: &str) -> u64 {
        fs::metadata(self.resolve(name))
            .map(|meta| meta.len())
            .unwrap_or(0)
    }

    fn read(&self, name: &str, _slot: SlotId) -> Result<Vec<u8>, SourceError> {
        let path = self.resolve(name);
        let bytes = fs::read(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound {
                name: name.to_string(),
            },
            _ => SourceError::Io {
                name: name.to_string(),
                source,
            },
        })?;
        if bytes.is_empty() {
            return Err(SourceError::Empty {
                name: name.to_string(),
            });
        }
        Ok(bytes)
    }

    fn new_thread_slot(&self) -> Result<SlotId, SourceError> {
        Ok(SlotId(self.next_slot.fetch_add(1, Ordering::SeqCst)))
    }
}
