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

//! Concrete [`Source`](quarry_core::Source) implementations.
//!
//! - [`FilesystemSource`]: reads files under a root directory; the
//!   development workflow.
//! - [`PackSource`]: reads offset/length entries out of a packed data file;
//!   the shipping workflow.
//! - [`MemorySource`]: serves bytes from an in-memory table; synthetic
//!   providers and tests.

mod filesystem;
mod memory;
mod pack;

pub use filesystem::FilesystemSource;
pub use memory::MemorySource;
pub use pack::{PackError, PackSource};
