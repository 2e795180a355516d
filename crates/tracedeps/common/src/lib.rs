// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Shared data model for build trace dependency resolution
//!
//! This crate holds everything the resolution engine reads but never writes:
//! - the interned string table and execution records of a captured build trace
//! - the `TraceStore` query contract the engine consumes
//! - `TraceIndex`, the in-memory implementation of that contract
//! - `TraceIndexBuilder`, which materialises an index from execution records
//! - an fnmatch-compatible glob compiler shared by the builder and the engine

pub mod builder;
pub mod error;
pub mod glob;
pub mod index;
pub mod records;
pub mod store;
pub mod strings;

pub use builder::{ExecutionRecord, OpenRecord, TraceDump, TraceIndexBuilder};
pub use error::{IndexError, IndexResult};
pub use glob::{GlobPattern, GlobSet};
pub use index::{IndexStats, TraceIndex};
pub use records::{Access, Execution, ExecutionId, FileEntry, OpenFile, OpenRef, PatternBits, Pid};
pub use store::TraceStore;
pub use strings::{StringHandle, StringTable};
