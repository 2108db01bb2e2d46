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

//! Resource categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category a resource belongs to.
///
/// Each category is backed by exactly one cache with its own byte budget;
/// distinct categories never share a budget. `OnDemand` is conventionally
/// configured with a zero budget (loads succeed but nothing stays resident)
/// and `KeepLoaded` with the full budget (entries are effectively pinned).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceCategory {
    /// Texture image data.
    Texture,
    /// Material definitions.
    Material,
    /// Mesh and other geometry data.
    Geometry,
    /// Script sources.
    Script,
    /// Loaded on demand, never kept resident.
    OnDemand,
    /// Kept resident for the lifetime of the registry.
    KeepLoaded,
}

impl ResourceCategory {
    /// Every category, in declaration order.
    pub const ALL: [ResourceCategory; 6] = [
        ResourceCategory::Texture,
        ResourceCategory::Material,
        ResourceCategory::Geometry,
        ResourceCategory::Script,
        ResourceCategory::OnDemand,
        ResourceCategory::KeepLoaded,
    ];
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceCategory::Texture => "texture",
            ResourceCategory::Material => "material",
            ResourceCategory::Geometry => "geometry",
            ResourceCategory::Script => "script",
            ResourceCategory::OnDemand => "on-demand",
            ResourceCategory::KeepLoaded => "keep-loaded",
        };
        f.write_str(name)
    }
}
