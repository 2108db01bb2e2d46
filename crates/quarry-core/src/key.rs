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

//! Resource addressing.

use crate::error::LoadError;
use std::fmt;

/// The address of a resource: the name of the [`Source`](crate::Source) that
/// provides it, plus the resource's name within that source.
///
/// The canonical string form is `source/name`, parsed at the first path
/// separator (`/` or `\`). A string with no separator, or with an empty
/// component on either side of it, is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    source: String,
    name: String,
}

impl ResourceKey {
    /// Builds a key from its two components.
    pub fn new(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
        }
    }

    /// Parses the canonical `source/name` form.
    ///
    /// # Errors
    /// Returns [`LoadError::MalformedKey`] when no separator is present or
    /// either component is empty.
    pub fn parse(path: &str) -> Result<Self, LoadError> {
        let Some(split) = path.find(['/', '\\']) else {
            return Err(LoadError::MalformedKey {
                path: path.to_string(),
            });
        };
        let (source, name) = (&path[..split], &path[split + 1..]);
        if source.is_empty() || name.is_empty() {
            return Err(LoadError::MalformedKey {
                path: path.to_string(),
            });
        }
        Ok(Self::new(source, name))
    }

    /// The name of the source that provides this resource.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The resource's name within its source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The canonical `source/name` string, used as the cache and staging key.
    pub fn canonical(&self) -> String {
        format!("{}/{}", self.source, self.name)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.name)
    }
}
