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
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use thiserror::Error;

/// Pack file layout: an 8-byte little-endian index length, the
/// bincode-encoded entry list, then the raw data blob. Entry offsets are
/// relative to the start of the blob.
#[derive(Debug, Serialize, Deserialize)]
struct PackEntry {
    name: String,
    offset: u64,
    len: u64,
}

/// An error while building or opening a pack file.
#[derive(Debug, Error)]
pub enum PackError {
    /// Reading or writing the pack file failed.
    #[error("pack I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The index bytes could not be decoded.
    #[error("failed to decode pack index: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    /// The index could not be encoded.
    #[error("failed to encode pack index: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    /// The file ends before the declared index does.
    #[error("pack file is truncated")]
    Truncated,
}

/// A source that serves resources out of a single packed data file.
///
/// Every issued [`SlotId`] owns its own file handle, so concurrent readers
/// never share a seek cursor. [`Source::open`] parses the index and
/// prepares the handle behind [`SlotId::MAIN`].
pub struct PackSource {
    path: PathBuf,
    index: RwLock<HashMap<String, (u64, u64)>>,
    data_start: RwLock<u64>,
    handles: RwLock<Vec<Mutex<File>>>,
}

impl PackSource {
    /// Creates a source for the pack at `path`. Call [`Source::open`]
    /// before registering it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            index: RwLock::new(HashMap::new()),
            data_start: RwLock::new(0),
            handles: RwLock::new(Vec::new()),
        }
    }

    /// Writes a pack file containing the given `(name, bytes)` entries.
    /// A build-time tool; the runtime never writes packs.
    pub fn write_pack(path: &Path, entries: &[(&str, &[u8])]) -> Result<(), PackError> {
        let mut offset = 0u64;
        let mut index = Vec::with_capacity(entries.len());
        for (name, bytes) in entries {
            index.push(PackEntry {
                name: name.to_string(),
                offset,
                len: bytes.len() as u64,
            });
            offset += bytes.len() as u64;
        }

        let config = bincode::config::standard();
        let index_bytes = bincode::serde::encode_to_vec(&index, config)?;

        let mut file = File::create(path)?;
        file.write_all(&(index_bytes.len() as u64).to_le_bytes())?;
        file.write_all(&index_bytes)?;
        for (_, bytes) in entries {
            file.write_all(bytes)?;
        }
        log::info!(
            "Wrote pack '{}': {} entries, {} data bytes",
            path.display(),
            entries.len(),
            offset
        );
        Ok(())
    }

    fn parse_index(&self) -> Result<(), PackError> {
        let mut file = File::open(&self.path)?;
        let file_len = file.metadata()?.len();
        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)
            .map_err(|_| PackError::Truncated)?;
        let index_len = u64::from_le_bytes(len_bytes);
        // The header length is untrusted input; an index the file cannot
        // contain must be rejected before it sizes the read buffer.
        if index_len > file_len.saturating_sub(8) {
            return Err(PackError::Truncated);
        }

        let mut index_bytes = vec![0u8; index_len as usize];
        file.read_exact(&mut index_bytes)
            .map_err(|_| PackError::Truncated)?;

        let config = bincode::config::standard();
        let (entries, _): (Vec<PackEntry>, _) =
            bincode::serde::decode_from_slice(&index_bytes, config)?;

        let mut index = self.index.write().unwrap_or_else(|e| e.into_inner());
        index.clear();
        for entry in entries {
            index.insert(entry.name, (entry.offset, entry.len));
        }
        *self.data_start.write().unwrap_or_else(|e| e.into_inner()) = 8 + index_len;
        Ok(())
    }

    fn push_handle(&self) -> Result<SlotId, SourceError> {
        let file = File::open(&self.path).map_err(|source| SourceError::Io {
            name: self.path.display().to_string(),
            source,
        })?;
        let mut handles = self.handles.write().unwrap_or_else(|e| e.into_inner());
        handles.push(Mutex::new(file));
        Ok(SlotId(handles.len() - 1))
    }
}

impl Source for PackSource {
    fn open(&self) -> Result<(), SourceError> {
        self.parse_index().map_err(|e| SourceError::Open {
            detail: e.to_string(),
        })?;
        // Slot 0 for the opening thread; reopening keeps existing slots.
        let issued = self.handles.read().unwrap_or_else(|e| e.into_inner()).len();
        if issued == 0 {
            self.push_handle()?;
        }
        log::debug!(
            "Pack source opened at {} ({} entries)",
            self.path.display(),
            self.index.read().map(|i| i.len()).unwrap_or(0)
        );
        Ok(())
    }

    fn size(&self, name: &str) -> u64 {
        self.index
            .read()
            .ok()
            .and_then(|index| index.get(name).map(|&(_, len)| len))
            .unwrap_or(0)
    }

    fn read(&self, name: &str, slot: SlotId) -> Result<Vec<u8>, SourceError> {
        let (offset, len) = self
            .index
            .read()
            .ok()
            .and_then(|index| index.get(name).copied())
            .ok_or_else(|| SourceError::NotFound {
                name: name.to_string(),
            })?;
        if len == 0 {
            return Err(SourceError::Empty {
                name: name.to_string(),
            });
        }

        let data_start = *self.data_start.read().unwrap_or_else(|e| e.into_inner());
        let handles = self.handles.read().unwrap_or_else(|e| e.into_inner());
        let handle = handles.get(slot.0).ok_or_else(|| SourceError::Open {
            detail: format!("slot {} was never issued", slot.0),
        })?;

        let mut file = handle.lock().unwrap_or_else(|e| e.into_inner());
        let mut buffer = vec![0u8; len as usize];
        file.seek(SeekFrom::Start(data_start + offset))
            .and_then(|_| file.read_exact(&mut buffer))
            .map_err(|source| SourceError::Io {
                name: name.to_string(),
                source,
            })?;
        Ok(buffer)
    }

    fn new_thread_slot(&self) -> Result<SlotId, SourceError> {
        self.push_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pack(dir: &Path) -> PathBuf {
        let path = dir.join("data.pack");
        PackSource::write_pack(
            &path,
            &[
                ("textures/grass.dds", b"GRASSBYTES".as_slice()),
                ("scripts/init.lua", b"print('hi')".as_slice()),
                ("empty.bin", b"".as_slice()),
            ],
        )
        .unwrap();
        path
    }

    #[test]
    fn round_trips_entries() {
        let dir = tempfile::tempdir().unwrap();
        let source = PackSource::new(sample_pack(dir.path()));
        source.open().unwrap();

        assert_eq!(source.size("textures/grass.dds"), 10);
        assert_eq!(
            source.read("textures/grass.dds", SlotId::MAIN).unwrap(),
            b"GRASSBYTES"
        );
        assert_eq!(
            source.read("scripts/init.lua", SlotId::MAIN).unwrap(),
            b"print('hi')"
        );
    }

    #[test]
    fn zero_length_entry_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = PackSource::new(sample_pack(dir.path()));
        source.open().unwrap();
        assert!(matches!(
            source.read("empty.bin", SlotId::MAIN),
            Err(SourceError::Empty { .. })
        ));
    }

    #[test]
    fn unknown_entry_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = PackSource::new(sample_pack(dir.path()));
        source.open().unwrap();
        assert!(matches!(
            source.read("nope.bin", SlotId::MAIN),
            Err(SourceError::NotFound { .. })
        ));
    }

    #[test]
    fn slots_read_independently() {
        let dir = tempfile::tempdir().unwrap();
        let source = PackSource::new(sample_pack(dir.path()));
        source.open().unwrap();
        let slot = source.new_thread_slot().unwrap();
        assert_ne!(slot, SlotId::MAIN);

        // Interleaved reads through different slots do not disturb each
        // other's cursor.
        assert_eq!(
            source.read("scripts/init.lua", slot).unwrap(),
            b"print('hi')"
        );
        assert_eq!(
            source.read("textures/grass.dds", SlotId::MAIN).unwrap(),
            b"GRASSBYTES"
        );
    }

    #[test]
    fn unissued_slot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = PackSource::new(sample_pack(dir.path()));
        source.open().unwrap();
        assert!(source.read("scripts/init.lua", SlotId(42)).is_err());
    }

    #[test]
    fn truncated_pack_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pack");
        std::fs::write(&path, [1, 2, 3]).unwrap();
        let source = PackSource::new(&path);
        assert!(matches!(source.open(), Err(SourceError::Open { .. })));
    }

    #[test]
    fn oversized_index_length_fails_to_open() {
        // A header claiming more index bytes than the file holds must be
        // rejected as corrupt, not trusted to size an allocation.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pack");
        let mut bytes = u64::MAX.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"junk");
        std::fs::write(&path, bytes).unwrap();
        let source = PackSource::new(&path);
        assert!(matches!(source.open(), Err(SourceError::Open { .. })));
    }
}
