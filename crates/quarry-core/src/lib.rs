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

//! # Quarry Core
//!
//! Foundational crate containing the traits, core types, and interface
//! contracts of the quarry resource system: resource keys and categories,
//! the payload trait implemented per concrete resource kind, the byte
//! source contract, and the cross-thread event bus used by the streaming
//! pipeline.

#![warn(missing_docs)]

pub mod category;
pub mod error;
pub mod event;
pub mod key;
pub mod resource;
pub mod source;

pub use category::ResourceCategory;
pub use error::{LoadError, LoadStatus, SourceError};
pub use event::EventBus;
pub use key::ResourceKey;
pub use resource::{CacheLedger, HookError, Resource, ResourcePayload};
pub use source::{SlotId, Source};
