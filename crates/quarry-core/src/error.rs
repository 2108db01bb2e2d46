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

//! Error types for the resource system.

use std::fmt;

/// An error raised while reading from a [`Source`](crate::Source).
#[derive(Debug)]
pub enum SourceError {
    /// The source could not be opened or is in an unusable state.
    Open {
        /// Description of the failure.
        detail: String,
    },
    /// The named resource does not exist in this source.
    NotFound {
        /// The resource name that was requested.
        name: String,
    },
    /// The resource exists but produced a zero-length read.
    Empty {
        /// The resource name that was requested.
        name: String,
    },
    /// An I/O error occurred while reading the resource.
    Io {
        /// The resource name that was being read.
        name: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The source's own data is structurally invalid.
    Corrupt {
        /// Description of the corruption.
        detail: String,
    },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Open { detail } => {
                write!(f, "Source could not be opened: {detail}")
            }
            SourceError::NotFound { name } => {
                write!(f, "Resource '{name}' not found in source")
            }
            SourceError::Empty { name } => {
                write!(f, "Resource '{name}' produced a zero-length read")
            }
            SourceError::Io { name, source } => {
                write!(f, "I/O error while reading '{name}': {source}")
            }
            SourceError::Corrupt { detail } => {
                write!(f, "Source data is corrupt: {detail}")
            }
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// An error raised by the load protocols of the cache registry.
#[derive(Debug)]
pub enum LoadError {
    /// The addressing string has no path separator or an empty component.
    MalformedKey {
        /// The offending addressing string.
        path: String,
    },
    /// No source is registered under the requested name.
    SourceUnregistered {
        /// The source name that was requested.
        source: String,
    },
    /// A source was registered twice under the same name.
    SourceAlreadyRegistered {
        /// The source name that was already taken.
        source: String,
    },
    /// The source failed to produce the resource's bytes.
    SourceRead {
        /// The canonical key of the resource being loaded.
        key: String,
        /// The underlying source error.
        source: SourceError,
    },
    /// The key is already present in the target cache.
    DuplicateKey {
        /// The canonical key that was rejected.
        key: String,
    },
    /// The cache could not make room and oversized residents are not allowed.
    CacheBudgetExceeded {
        /// The canonical key that was rejected.
        key: String,
        /// The size in bytes that did not fit.
        size: usize,
    },
    /// A load-completion or thread-initialization hook failed.
    InitializationFailed {
        /// The canonical key of the resource that failed.
        key: String,
        /// Description from the failing hook.
        detail: String,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::MalformedKey { path } => {
                write!(f, "Malformed resource path '{path}' (expected source/name)")
            }
            LoadError::SourceUnregistered { source } => {
                write!(f, "No source registered under '{source}'")
            }
            LoadError::SourceAlreadyRegistered { source } => {
                write!(f, "Source '{source}' is already registered")
            }
            LoadError::SourceRead { key, source } => {
                write!(f, "Failed to stream '{key}': {source}")
            }
            LoadError::DuplicateKey { key } => {
                write!(f, "'{key}' already exists in the cache")
            }
            LoadError::CacheBudgetExceeded { key, size } => {
                write!(f, "No room in cache for '{key}' ({size} bytes)")
            }
            LoadError::InitializationFailed { key, detail } => {
                write!(f, "Initialization of '{key}' failed: {detail}")
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::SourceRead { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// The outcome of one non-blocking `try_load` poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// The resource is resident and the handle has been resolved.
    Ready,
    /// The resource is still being streamed; poll again later.
    Pending,
    /// Loading failed. The failure record has been discarded, so a further
    /// poll for the same key starts a fresh attempt from scratch.
    Failed,
}
