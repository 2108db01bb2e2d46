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

//! Per-category cache budgets.

use quarry_core::ResourceCategory;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The budget one category cache is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheBudget {
    /// Maximum resident bytes.
    pub max_bytes: usize,
    /// Whether a single resident may exceed the whole budget.
    pub allow_oversized: bool,
}

/// Budgets for every category cache the registry creates.
///
/// The exact proportions are deployment policy, not core contract.
/// [`RegistryConfig::with_available_bytes`] applies the conventional split:
/// textures 35%, materials 5%, geometry 30%, scripts 20% (leaving a 10%
/// buffer), a zero-budget on-demand cache whose entries never stay
/// resident, and a keep-loaded cache spanning the full figure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Budget per category. Categories absent from the map get a zero
    /// budget with oversized admission, i.e. load-but-never-cache.
    pub budgets: HashMap<ResourceCategory, CacheBudget>,
}

impl RegistryConfig {
    /// Splits `available_bytes` across the categories using the
    /// conventional proportions.
    pub fn with_available_bytes(available_bytes: usize) -> Self {
        let fraction = |f: f64| (available_bytes as f64 * f) as usize;
        let mut budgets = HashMap::new();
        budgets.insert(
            ResourceCategory::Texture,
            CacheBudget {
                max_bytes: fraction(0.35),
                allow_oversized: true,
            },
        );
        budgets.insert(
            ResourceCategory::Material,
            CacheBudget {
                max_bytes: fraction(0.05),
                allow_oversized: true,
            },
        );
        budgets.insert(
            ResourceCategory::Geometry,
            CacheBudget {
                max_bytes: fraction(0.30),
                allow_oversized: true,
            },
        );
        budgets.insert(
            ResourceCategory::Script,
            CacheBudget {
                max_bytes: fraction(0.20),
                allow_oversized: true,
            },
        );
        // Zero budget + oversized: anything loads, nothing stays resident
        // past the next admission.
        budgets.insert(
            ResourceCategory::OnDemand,
            CacheBudget {
                max_bytes: 0,
                allow_oversized: true,
            },
        );
        budgets.insert(
            ResourceCategory::KeepLoaded,
            CacheBudget {
                max_bytes: available_bytes,
                allow_oversized: true,
            },
        );
        Self { budgets }
    }

    /// Parses a configuration from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// The budget for `category`, defaulting to load-but-never-cache.
    pub fn budget(&self, category: ResourceCategory) -> CacheBudget {
        self.budgets.get(&category).copied().unwrap_or(CacheBudget {
            max_bytes: 0,
            allow_oversized: true,
        })
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        // 512 MiB unless the deployment says otherwise.
        Self::with_available_bytes(512 * 1024 * 1024)
    }
}
